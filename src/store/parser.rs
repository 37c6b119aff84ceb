use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1, multispace0, multispace1, one_of},
    combinator::{map, map_res, opt, value},
    error::{Error as NomError, ErrorKind as NomErrorKind},
    multi::separated_list1,
    number::complete::float,
    sequence::{delimited, pair, preceded},
};
use crate::core::error::{Error, ErrorKind, Result};
use crate::store::ast::{
    BoolQuery, PhraseQuery, Query, RangeQuery, RegexQuery, TermQuery, WildcardQuery,
};

/// Parser of the store's query syntax:
///
/// ```text
/// query  := and ("OR" and)*
/// and    := unary ("AND" unary)*
/// unary  := "(" query ")" boost? | "*:*" | field ":" value
/// value  := "*" | "\"phrase\"" ("~" slop)? | ("[" | "{") bound "TO" bound ("]" | "}")
///         | "/regex/" | term          (each but "*" followed by an optional boost)
/// boost  := "^" float
/// ```
///
/// Special characters in fields and terms are escaped with `\`. Terms
/// with an unescaped `*` or `?` are wildcard terms.
#[derive(Debug, Clone, Default)]
pub struct QueryParser;

impl QueryParser {
    pub fn new() -> Self {
        QueryParser
    }

    pub fn parse(&self, input: &str) -> Result<Query> {
        if input.trim().is_empty() {
            return Ok(Query::MatchAll);
        }
        match delimited(multispace0, or_expr, multispace0).parse(input) {
            Ok(("", query)) => Ok(query),
            Ok((rest, _)) => Err(Error::new(
                ErrorKind::Parse,
                format!("unexpected '{}' in query '{}'", rest, input),
            )),
            Err(err) => Err(Error::new(
                ErrorKind::Parse,
                format!("invalid query '{}': {}", input, err),
            )),
        }
    }
}

/// Value part of a `field:value` clause, before the field is known
enum ValueExpr {
    Exists,
    Phrase(String, u32, Option<f32>),
    Range {
        lower: Option<String>,
        upper: Option<String>,
        include_lower: bool,
        include_upper: bool,
        boost: Option<f32>,
    },
    Regex(String, Option<f32>),
    Term(RawTerm, Option<f32>),
}

impl ValueExpr {
    fn into_query(self, field: String) -> Query {
        match self {
            ValueExpr::Exists => Query::Exists(field),
            ValueExpr::Phrase(phrase, slop, boost) => Query::Phrase(PhraseQuery { field, phrase, slop, boost }),
            ValueExpr::Range { lower, upper, include_lower, include_upper, boost } => Query::Range(RangeQuery {
                field,
                lower,
                upper,
                include_lower,
                include_upper,
                boost,
            }),
            ValueExpr::Regex(pattern, boost) => Query::Regex(RegexQuery { field, pattern, boost }),
            ValueExpr::Term(term, boost) if term.wildcard => Query::Wildcard(WildcardQuery {
                field,
                pattern: term.raw,
                boost,
            }),
            ValueExpr::Term(term, boost) => Query::Term(TermQuery {
                field,
                value: term.text,
                boost,
            }),
        }
    }
}

struct RawTerm {
    text: String,  // unescaped
    raw: String,   // as written
    wildcard: bool,
}

fn fail<T>(input: &str, kind: NomErrorKind) -> IResult<&str, T> {
    Err(nom::Err::Error(NomError::new(input, kind)))
}

fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = NomError<&'a str>> {
    delimited(multispace1, tag(word), multispace1)
}

fn combine(mut clauses: Vec<Query>, conjunction: bool) -> Query {
    if clauses.len() == 1 {
        if let Some(single) = clauses.pop() {
            return single;
        }
    }
    if conjunction {
        Query::Bool(BoolQuery { must: clauses, ..BoolQuery::new() })
    } else {
        Query::Bool(BoolQuery { should: clauses, ..BoolQuery::new() })
    }
}

fn or_expr(input: &str) -> IResult<&str, Query> {
    map(separated_list1(keyword("OR"), and_expr), |clauses| combine(clauses, false)).parse(input)
}

fn and_expr(input: &str) -> IResult<&str, Query> {
    map(separated_list1(keyword("AND"), unary), |clauses| combine(clauses, true)).parse(input)
}

fn unary(input: &str) -> IResult<&str, Query> {
    alt((group, value(Query::MatchAll, tag("*:*")), clause)).parse(input)
}

fn group(input: &str) -> IResult<&str, Query> {
    map(
        pair(
            delimited(pair(char('('), multispace0), or_expr, pair(multispace0, char(')'))),
            opt(boost),
        ),
        |(query, boost)| query.with_boost(boost),
    )
    .parse(input)
}

fn boost(input: &str) -> IResult<&str, f32> {
    preceded(char('^'), float).parse(input)
}

fn clause(input: &str) -> IResult<&str, Query> {
    let (input, field) = field_name(input)?;
    let (input, _) = char(':').parse(input)?;
    let (input, value) = alt((exists, phrase, range, regex, term)).parse(input)?;
    Ok((input, value.into_query(field)))
}

/// Escaped characters up to the first unescaped `:`
fn field_name(input: &str) -> IResult<&str, String> {
    let mut name = String::new();
    let mut chars = input.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) => name.push(escaped),
                None => return fail(input, NomErrorKind::Escaped),
            },
            ':' if !name.is_empty() => return Ok((&input[i..], name)),
            c if c.is_whitespace() || matches!(c, '(' | ')' | ':') => break,
            c => name.push(c),
        }
    }
    fail(input, NomErrorKind::TakeWhile1)
}

fn ends_term(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '^' | ']' | '}')
}

fn term_text(input: &str) -> IResult<&str, RawTerm> {
    // unterminated phrases, ranges and regexes
    if input.starts_with(['"', '[', '{', '/']) {
        return fail(input, NomErrorKind::Char);
    }
    let mut text = String::new();
    let mut wildcard = false;
    let mut end = 0;
    let mut chars = input.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((j, escaped)) => {
                    text.push(escaped);
                    end = j + escaped.len_utf8();
                }
                None => return fail(input, NomErrorKind::Escaped),
            },
            c if ends_term(c) => break,
            c => {
                wildcard |= matches!(c, '*' | '?');
                text.push(c);
                end = i + c.len_utf8();
            }
        }
    }
    if end == 0 {
        return fail(input, NomErrorKind::TakeWhile1);
    }
    let raw = input[..end].to_string();
    Ok((&input[end..], RawTerm { text, raw, wildcard }))
}

fn exists(input: &str) -> IResult<&str, ValueExpr> {
    let Some(rest) = input.strip_prefix('*') else {
        return fail(input, NomErrorKind::Char);
    };
    match rest.chars().next() {
        None => Ok((rest, ValueExpr::Exists)),
        Some(c) if c.is_whitespace() || c == ')' => Ok((rest, ValueExpr::Exists)),
        Some(_) => fail(input, NomErrorKind::Char),
    }
}

fn phrase(input: &str) -> IResult<&str, ValueExpr> {
    let Some(body) = input.strip_prefix('"') else {
        return fail(input, NomErrorKind::Char);
    };
    let mut text = String::new();
    let mut chars = body.char_indices();
    let mut end = None;
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) => text.push(escaped),
                None => return fail(input, NomErrorKind::Escaped),
            },
            '"' => {
                end = Some(i + 1);
                break;
            }
            c => text.push(c),
        }
    }
    let Some(end) = end else {
        return fail(input, NomErrorKind::Char);
    };
    let rest = &body[end..];
    let (rest, slop) = opt(preceded(char('~'), map_res(digit1, str::parse::<u32>))).parse(rest)?;
    let (rest, boost) = opt(boost).parse(rest)?;
    Ok((rest, ValueExpr::Phrase(text, slop.unwrap_or(0), boost)))
}

fn bound(input: &str) -> IResult<&str, Option<String>> {
    map(term_text, |term| if term.raw == "*" { None } else { Some(term.text) }).parse(input)
}

fn range(input: &str) -> IResult<&str, ValueExpr> {
    let (input, open) = one_of("[{").parse(input)?;
    let (input, lower) = delimited(multispace0, bound, multispace1).parse(input)?;
    let (input, _) = tag("TO").parse(input)?;
    let (input, upper) = delimited(multispace1, bound, multispace0).parse(input)?;
    let (input, close) = one_of("]}").parse(input)?;
    let (input, boost) = opt(boost).parse(input)?;
    Ok((
        input,
        ValueExpr::Range {
            lower,
            upper,
            include_lower: open == '[',
            include_upper: close == ']',
            boost,
        },
    ))
}

/// `/.../` with `\/` standing for a slash; other escapes are regex syntax
fn regex(input: &str) -> IResult<&str, ValueExpr> {
    let Some(body) = input.strip_prefix('/') else {
        return fail(input, NomErrorKind::Char);
    };
    let mut pattern = String::new();
    let mut chars = body.char_indices();
    let mut end = None;
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, '/')) => pattern.push('/'),
                Some((_, escaped)) => {
                    pattern.push('\\');
                    pattern.push(escaped);
                }
                None => return fail(input, NomErrorKind::Escaped),
            },
            '/' => {
                end = Some(i + 1);
                break;
            }
            c => pattern.push(c),
        }
    }
    let Some(end) = end else {
        return fail(input, NomErrorKind::Char);
    };
    let (rest, boost) = opt(boost).parse(&body[end..])?;
    Ok((rest, ValueExpr::Regex(pattern, boost)))
}

fn term(input: &str) -> IResult<&str, ValueExpr> {
    map(pair(term_text, opt(boost)), |(term, boost)| ValueExpr::Term(term, boost)).parse(input)
}
