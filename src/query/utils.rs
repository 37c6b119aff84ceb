//! Turns index values into terms of the store's query syntax.

use crate::schema::datatype::IndexDataType;
use crate::schema::index_value::IndexValue;
use crate::store::syntax::{escape_query_chars, escape_wildcard_chars};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerm {
    pub term: String,
    pub has_wildcard: bool,
    pub needs_quotes: bool,
    pub is_text: bool,
}

impl QueryTerm {
    fn new(term: impl Into<String>, has_wildcard: bool, needs_quotes: bool, is_text: bool) -> Self {
        QueryTerm {
            term: term.into(),
            has_wildcard,
            needs_quotes,
            is_text,
        }
    }

    /// The term as written into a query, quoted if needed
    pub fn render(&self) -> String {
        if self.needs_quotes {
            format!("\"{}\"", self.term)
        } else {
            self.term.clone()
        }
    }
}

/// Encodes a value as one or more query terms.
///
/// With `escape` every special character is escaped and text is split
/// into its words. Without, `*` and `?` stay wildcards and the value is
/// split into wildcard terms and quoted phrases.
pub fn encode_query_value(value: &IndexValue, escape: bool) -> Vec<QueryTerm> {
    match (value.data_type, escape) {
        (IndexDataType::Txt, true) => value
            .value
            .split_whitespace()
            .map(|word| QueryTerm::new(escape_query_chars(word), false, false, true))
            .collect(),
        (IndexDataType::Txt, false) => parse_wildcard_terms(&escape_wildcard_chars(&value.value), false),
        (IndexDataType::Str, true) => {
            let quoted = value.value.contains(' ');
            let term = if quoted { escape_phrase(&value.value) } else { escape_query_chars(&value.value) };
            vec![QueryTerm::new(term, false, quoted, true)]
        }
        (IndexDataType::Str, false) => parse_wildcard_terms(&escape_wildcard_chars(&value.value), true),
        _ => vec![QueryTerm::new(escape_query_chars(&value.value), false, false, false)],
    }
}

/// Escapes the characters that would end a quoted phrase
pub fn escape_phrase(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn has_unescaped_wildcard(word: &str) -> bool {
    let mut escaped = false;
    for c in word.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '*' | '?' => return true,
            _ => {}
        }
    }
    false
}

/// Splits an already wildcard-escaped value into terms. Runs of plain
/// words become one quoted phrase, words with a wildcard become single
/// (optionally lower-cased) wildcard terms.
pub fn parse_wildcard_terms(value: &str, lowercase_wildcards: bool) -> Vec<QueryTerm> {
    if !has_unescaped_wildcard(value) {
        return vec![QueryTerm::new(value, false, true, true)];
    }
    let mut terms = Vec::new();
    let mut phrase: Vec<&str> = Vec::new();
    for word in value.split_whitespace() {
        if has_unescaped_wildcard(word) {
            if !phrase.is_empty() {
                terms.push(QueryTerm::new(phrase.join(" "), false, true, true));
                phrase.clear();
            }
            let term = if lowercase_wildcards { word.to_lowercase() } else { word.to_string() };
            terms.push(QueryTerm::new(term, true, false, true));
        } else {
            phrase.push(word);
        }
    }
    if !phrase.is_empty() {
        terms.push(QueryTerm::new(phrase.join(" "), false, true, true));
    }
    terms
}

/// `"w1 w2 ..."~slop` with a slop of `5 + 3 * words`
pub fn encode_phrase_query(words: &[String]) -> String {
    format!("\"{}\"~{}", words.join(" "), 5 + 3 * words.len())
}
