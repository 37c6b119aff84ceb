use std::sync::Arc;
use regex::Regex;
use tracing::warn;
use crate::store::ast::{BoolQuery, PhraseQuery, Query, RangeQuery, RegexQuery, TermQuery, WildcardQuery};
use crate::store::document::IndexedDocument;
use crate::store::schema::{FieldType, StoreSchema};

/// Evaluates parsed queries against single documents.
///
/// Scores are the sum of the boosts of all matching clauses, each multiplied
/// with the index time boost of its field.
pub struct DocumentMatcher {
    schema: Arc<StoreSchema>,
}

impl DocumentMatcher {
    pub fn new(schema: Arc<StoreSchema>) -> Self {
        DocumentMatcher { schema }
    }

    pub fn matches(&self, doc: &IndexedDocument, query: &Query) -> bool {
        self.score(doc, query).is_some()
    }

    /// `None` if the document does not match
    pub fn score(&self, doc: &IndexedDocument, query: &Query) -> Option<f32> {
        let (matched, field) = match query {
            Query::MatchAll => return Some(1.0),
            Query::Bool(bool_query) => return self.score_bool(doc, bool_query),
            Query::Exists(field) => (!doc.values(field).is_empty(), field),
            Query::Term(q) => (self.matches_term(doc, q), &q.field),
            Query::Phrase(q) => (self.matches_phrase(doc, q), &q.field),
            Query::Range(q) => (self.matches_range(doc, q), &q.field),
            Query::Wildcard(q) => (self.matches_wildcard(doc, q), &q.field),
            Query::Regex(q) => (self.matches_regex(doc, q), &q.field),
        };
        matched.then(|| query.boost() * doc.boost(field))
    }

    fn score_bool(&self, doc: &IndexedDocument, query: &BoolQuery) -> Option<f32> {
        let mut total = 0.0;
        for clause in &query.must {
            total += self.score(doc, clause)?;
        }
        if !query.should.is_empty() {
            let mut any_match = false;
            for clause in &query.should {
                if let Some(score) = self.score(doc, clause) {
                    total += score;
                    any_match = true;
                }
            }
            if !any_match {
                return None;
            }
        }
        Some(total * query.boost.unwrap_or(1.0))
    }

    fn matches_term(&self, doc: &IndexedDocument, query: &TermQuery) -> bool {
        let values = doc.values(&query.field);
        match self.schema.field_type(&query.field) {
            FieldType::Text => {
                let terms = self.schema.text_analyzer().terms(&query.value);
                match terms.len() {
                    0 => false,
                    1 => values.iter().any(|v| self.schema.text_analyzer().terms(v).contains(&terms[0])),
                    _ => values.iter().any(|v| self.text_contains_phrase(v, &terms, 0)),
                }
            }
            FieldType::Number => match query.value.parse::<f64>() {
                Ok(wanted) => values.iter().any(|v| v.parse::<f64>().map(|n| n == wanted).unwrap_or(false)),
                Err(_) => values.iter().any(|v| *v == query.value),
            },
            FieldType::String | FieldType::Date => values.iter().any(|v| *v == query.value),
        }
    }

    fn matches_phrase(&self, doc: &IndexedDocument, query: &PhraseQuery) -> bool {
        let values = doc.values(&query.field);
        if !self.schema.is_text(&query.field) {
            return values.iter().any(|v| *v == query.phrase);
        }
        let terms = self.schema.text_analyzer().terms(&query.phrase);
        if terms.is_empty() {
            return false;
        }
        values.iter().any(|v| self.text_contains_phrase(v, &terms, query.slop))
    }

    fn text_contains_phrase(&self, text: &str, terms: &[String], slop: u32) -> bool {
        let tokens = self.schema.text_analyzer().analyze(text);
        let mut term_positions: Vec<Vec<u32>> = Vec::with_capacity(terms.len());
        for term in terms {
            let positions: Vec<u32> = tokens
                .iter()
                .filter(|t| t.text == *term)
                .map(|t| t.position)
                .collect();
            if positions.is_empty() {
                return false;
            }
            term_positions.push(positions);
        }
        if slop == 0 {
            check_adjacent_positions(&term_positions)
        } else {
            check_proximity_positions(&term_positions, slop)
        }
    }

    fn matches_range(&self, doc: &IndexedDocument, query: &RangeQuery) -> bool {
        let values = doc.values(&query.field);
        let numeric = self.schema.field_type(&query.field) == FieldType::Number;
        values.iter().any(|v| {
            if numeric {
                if let Some(in_range) = numeric_in_range(v, query) {
                    return in_range;
                }
            }
            in_range(v.as_str(), query.lower.as_deref(), query.upper.as_deref(), query)
        })
    }

    fn matches_wildcard(&self, doc: &IndexedDocument, query: &WildcardQuery) -> bool {
        match Regex::new(&wildcard_to_regex(&query.pattern)) {
            Ok(regex) => self.any_value_or_token(doc, &query.field, &regex),
            Err(err) => {
                warn!("invalid wildcard pattern '{}': {}", query.pattern, err);
                false
            }
        }
    }

    fn matches_regex(&self, doc: &IndexedDocument, query: &RegexQuery) -> bool {
        match Regex::new(&format!("^(?:{})$", query.pattern)) {
            Ok(regex) => self.any_value_or_token(doc, &query.field, &regex),
            Err(err) => {
                warn!("invalid regular expression '{}': {}", query.pattern, err);
                false
            }
        }
    }

    /// Text fields match per token, all others on the whole value
    fn any_value_or_token(&self, doc: &IndexedDocument, field: &str, regex: &Regex) -> bool {
        let values = doc.values(field);
        if self.schema.is_text(field) {
            values
                .iter()
                .flat_map(|v| self.schema.text_analyzer().terms(v))
                .any(|term| regex.is_match(&term))
        } else {
            values.iter().any(|v| regex.is_match(v))
        }
    }
}

/// Case-insensitive anchored regex for a wildcard pattern; escaped
/// characters are literal
fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::from("(?i)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    out
}

/// `None` if the value or a bound is no number
fn numeric_in_range(value: &str, query: &RangeQuery) -> Option<bool> {
    let value = value.parse::<f64>().ok()?;
    let lower = match query.lower.as_deref() {
        Some(bound) => Some(bound.parse::<f64>().ok()?),
        None => None,
    };
    let upper = match query.upper.as_deref() {
        Some(bound) => Some(bound.parse::<f64>().ok()?),
        None => None,
    };
    Some(in_range(value, lower, upper, query))
}

fn in_range<T: PartialOrd>(value: T, lower: Option<T>, upper: Option<T>, query: &RangeQuery) -> bool {
    let above = match lower {
        Some(lower) if query.include_lower => value >= lower,
        Some(lower) => value > lower,
        None => true,
    };
    let below = match upper {
        Some(upper) if query.include_upper => value <= upper,
        Some(upper) => value < upper,
        None => true,
    };
    above && below
}

/// Some start position followed by every further term at the next position
fn check_adjacent_positions(term_positions: &[Vec<u32>]) -> bool {
    let Some((first, rest)) = term_positions.split_first() else {
        return false;
    };
    first.iter().any(|start| {
        rest.iter()
            .enumerate()
            .all(|(offset, positions)| positions.contains(&(start + offset as u32 + 1)))
    })
}

/// Like [`check_adjacent_positions`] but every term may follow its
/// predecessor with up to `slop` positions in between
fn check_proximity_positions(term_positions: &[Vec<u32>], slop: u32) -> bool {
    let Some((first, rest)) = term_positions.split_first() else {
        return false;
    };
    first.iter().any(|start| {
        let mut current = *start;
        for positions in rest {
            let min_pos = current + 1;
            let max_pos = current + slop + 1;
            match positions.iter().find(|&&p| p >= min_pos && p <= max_pos) {
                Some(&next) => current = next,
                None => return false,
            }
        }
        true
    })
}
