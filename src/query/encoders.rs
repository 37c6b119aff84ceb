//! Encoders writing the fragments of an index constraint into
//! [`EncodedConstraintParts`].

use tracing::warn;
use crate::mapping::FieldMapper;
use crate::query::constraint::{
    ConstraintPosition, ConstraintType, ConstraintValue, EncodedConstraintParts, PositionType,
};
use crate::query::field_query::ValueMode;
use crate::query::utils::{encode_phrase_query, encode_query_value, QueryTerm};
use crate::schema::consts::{FULL_TEXT_FIELD, LANG_INDICATOR, LANG_MERGER_FIELD, REFERRED_DOCUMENT_FIELD};
use crate::schema::datatype::IndexDataType;
use crate::schema::index_field::{IndexField, SpecialField};
use crate::schema::index_value::IndexValue;
use crate::store::syntax::escape_query_chars;

const OPEN_BOUND: &str = "*";

pub fn encode_field_level(
    constraint_type: ConstraintType,
    field: &IndexField,
    mapper: &FieldMapper,
    parts: &mut EncodedConstraintParts,
) {
    match constraint_type {
        ConstraintType::Lang => encode_lang(field, parts),
        ConstraintType::DataType => encode_data_type(field.data_type(), parts),
        ConstraintType::Field => encode_field(field, mapper, parts),
        other => warn!("{:?} is no field level constraint type", other),
    }
}

pub fn encode_value_level(constraint_type: ConstraintType, value: &ConstraintValue, parts: &mut EncodedConstraintParts) {
    match constraint_type {
        ConstraintType::Eq => encode_eq(value, parts),
        ConstraintType::Wildcard => encode_wildcard(value, parts),
        ConstraintType::Regex => encode_regex(value, parts),
        ConstraintType::Ge => encode_lower_bound(value, '[', parts),
        ConstraintType::Gt => encode_lower_bound(value, '{', parts),
        ConstraintType::Le => encode_upper_bound(value, ']', parts),
        ConstraintType::Lt => encode_upper_bound(value, '}', parts),
        other => warn!("{:?} is no value level constraint type", other),
    }
}

/// `@lang` alternatives, or the merger field marker when no language is
/// requested
fn encode_lang(field: &IndexField, parts: &mut EncodedConstraintParts) {
    if !field.data_type().is_language_type() {
        return;
    }
    let position = ConstraintPosition::new(PositionType::Prefix);
    if field.languages().is_empty() {
        parts.add(position, escape_query_chars(LANG_MERGER_FIELD));
    } else {
        for language in field.languages() {
            parts.add(position, format!("{}{}", LANG_INDICATOR, escape_query_chars(language)));
        }
    }
}

fn encode_data_type(data_type: IndexDataType, parts: &mut EncodedConstraintParts) {
    if let Some(prefix) = data_type.prefix() {
        parts.add(ConstraintPosition::new(PositionType::Prefix), escape_query_chars(prefix));
    }
    if let Some(suffix) = data_type.suffix() {
        parts.add(ConstraintPosition::new(PositionType::Suffix), escape_query_chars(suffix));
    }
}

fn encode_field(field: &IndexField, mapper: &FieldMapper, parts: &mut EncodedConstraintParts) {
    let position = ConstraintPosition::new(PositionType::Field);
    match field.special_field() {
        Some(SpecialField::FullText) => parts.add(position, FULL_TEXT_FIELD),
        Some(SpecialField::References) => parts.add(position, REFERRED_DOCUMENT_FIELD),
        None => parts.add(position, escape_query_chars(&mapper.encode_path(field.path()))),
    }
}

fn assignment(parts: &mut EncodedConstraintParts) {
    parts.add(ConstraintPosition::new(PositionType::Assignment), ":");
}

fn boosted(term: String, boost: Option<f64>) -> String {
    match boost {
        Some(boost) => format!("{}^{}", term, boost),
        None => term,
    }
}

/// Adds one alternative per value (`Any`) or a single alternative with
/// the terms of all values (`All`)
fn add_value_terms(value: &ConstraintValue, encoded: Vec<Vec<String>>, parts: &mut EncodedConstraintParts) {
    let position = ConstraintPosition::new(PositionType::Value);
    match value.mode {
        ValueMode::Any => {
            for terms in encoded {
                parts.add_encoded(position, terms);
            }
        }
        ValueMode::All => parts.add_encoded(position, encoded.into_iter().flatten().collect()),
    }
}

fn encode_eq(value: &ConstraintValue, parts: &mut EncodedConstraintParts) {
    assignment(parts);
    let encoded = value
        .values
        .iter()
        .map(|v| eq_terms(v, value.phrase_query, value.boost))
        .filter(|terms| !terms.is_empty())
        .collect();
    add_value_terms(value, encoded, parts);
}

fn eq_terms(value: &IndexValue, phrase_query: bool, boost: Option<f64>) -> Vec<String> {
    let terms = encode_query_value(value, true);
    if phrase_query && terms.len() > 1 && terms.iter().all(|t| t.is_text && !t.needs_quotes) {
        let words: Vec<String> = terms.into_iter().map(|t| t.term).collect();
        return vec![boosted(encode_phrase_query(&words), boost)];
    }
    terms.iter().map(|t| boosted(t.render(), boost)).collect()
}

fn encode_wildcard(value: &ConstraintValue, parts: &mut EncodedConstraintParts) {
    assignment(parts);
    let encoded = value
        .values
        .iter()
        .map(|v| {
            encode_query_value(v, false)
                .iter()
                .map(|t: &QueryTerm| boosted(t.render(), value.boost))
                .collect::<Vec<_>>()
        })
        .filter(|terms| !terms.is_empty())
        .collect();
    add_value_terms(value, encoded, parts);
}

fn encode_regex(value: &ConstraintValue, parts: &mut EncodedConstraintParts) {
    assignment(parts);
    let encoded = value
        .values
        .iter()
        .map(|v| vec![boosted(format!("/{}/", v.value.replace('/', "\\/")), value.boost)])
        .collect();
    add_value_terms(value, encoded, parts);
}

fn bound(value: &ConstraintValue) -> String {
    match value.values.first() {
        Some(v) => escape_query_chars(&v.value),
        None => OPEN_BOUND.to_string(),
    }
}

fn encode_lower_bound(value: &ConstraintValue, open: char, parts: &mut EncodedConstraintParts) {
    assignment(parts);
    parts.add(
        ConstraintPosition::at(PositionType::Value, 0),
        format!("{}{} TO ", open, bound(value)),
    );
}

fn encode_upper_bound(value: &ConstraintValue, close: char, parts: &mut EncodedConstraintParts) {
    assignment(parts);
    parts.add(
        ConstraintPosition::at(PositionType::Value, 1),
        boosted(format!("{}{}", bound(value), close), value.boost),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render_value(constraint_type: ConstraintType, value: ConstraintValue) -> String {
        let mut parts = EncodedConstraintParts::new();
        parts.add(ConstraintPosition::new(PositionType::Field), "f");
        encode_value_level(constraint_type, &value, &mut parts);
        parts.render()
    }

    fn values(data_type: IndexDataType, values: &[&str], mode: ValueMode) -> ConstraintValue {
        let mut value = ConstraintValue::new(mode, None);
        value.values = values.iter().map(|v| IndexValue::new(*v, data_type)).collect();
        value
    }

    #[test]
    fn eq_any_and_all() {
        let any = values(IndexDataType::Int, &["1", "2"], ValueMode::Any);
        assert_eq!(render_value(ConstraintType::Eq, any), "(f:1) OR (f:2)");
        let all = values(IndexDataType::Int, &["1", "2"], ValueMode::All);
        assert_eq!(render_value(ConstraintType::Eq, all), "(f:1) AND (f:2)");
    }

    #[test]
    fn eq_text_words_and_phrases() {
        let words = values(IndexDataType::Txt, &["big apple"], ValueMode::Any);
        assert_eq!(render_value(ConstraintType::Eq, words.clone()), "(f:big) AND (f:apple)");
        let mut phrase = words;
        phrase.phrase_query = true;
        assert_eq!(render_value(ConstraintType::Eq, phrase), "f:\"big apple\"~11");
    }

    #[test]
    fn boosts_are_appended() {
        let mut value = ConstraintValue::new(ValueMode::Any, Some(2.5));
        value.values.push(IndexValue::new("x", IndexDataType::Str));
        assert_eq!(render_value(ConstraintType::Eq, value), "f:x^2.5");
        // neutral boost is dropped
        assert_eq!(ConstraintValue::new(ValueMode::Any, Some(1.0)).boost, None);
    }

    #[test]
    fn range_bounds() {
        let mut parts = EncodedConstraintParts::new();
        parts.add(ConstraintPosition::new(PositionType::Field), "f");
        encode_value_level(ConstraintType::Ge, &values(IndexDataType::Int, &["3"], ValueMode::Any), &mut parts);
        encode_value_level(ConstraintType::Le, &ConstraintValue::default(), &mut parts);
        assert_eq!(parts.render(), "f:[3 TO *]");
    }

    #[test]
    fn regex_escapes_slashes() {
        let value = values(IndexDataType::Str, &["a/b.*"], ValueMode::Any);
        assert_eq!(render_value(ConstraintType::Regex, value), "f:/a\\/b.*/");
    }

    #[test]
    fn language_alternatives() {
        let field = IndexField::with_languages(vec!["http://ex/l".into()], IndexDataType::Txt, ["en", "de"]).unwrap();
        let mut parts = EncodedConstraintParts::new();
        encode_lang(&field, &mut parts);
        let prefix = parts.get(&ConstraintPosition::new(PositionType::Prefix)).cloned();
        assert_eq!(prefix, Some(vec![vec!["@de".to_string()], vec!["@en".to_string()]]));

        let any = IndexField::new(vec!["http://ex/l".into()], IndexDataType::Txt).unwrap();
        let mut parts = EncodedConstraintParts::new();
        encode_lang(&any, &mut parts);
        assert_eq!(parts.render(), "_\\!@");
    }
}
