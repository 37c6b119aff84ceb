use serde::{Serialize, Deserialize};
use std::collections::BTreeSet;
use crate::core::types::Value;
use crate::core::vocab;

/// How multiple values of one constraint combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValueMode {
    #[default]
    Any,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PatternType {
    #[default]
    None,
    Wildcard,
    Regex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueConstraint {
    pub values: Vec<Value>,
    pub data_types: Vec<String>,   // datatype URIs, only the first supported one is used
    pub mode: ValueMode,
    pub boost: Option<f64>,
}

impl ValueConstraint {
    pub fn new(values: Vec<Value>) -> Self {
        ValueConstraint {
            values,
            data_types: Vec::new(),
            mode: ValueMode::Any,
            boost: None,
        }
    }

    pub fn with_data_type(values: Vec<Value>, data_type: &str) -> Self {
        ValueConstraint {
            data_types: vec![data_type.to_string()],
            ..Self::new(values)
        }
    }

    /// Constraint on referenced entities
    pub fn references<I, S>(uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_data_type(uris.into_iter().map(Value::reference).collect(), vocab::XSD_ANY_URI)
    }

    pub fn is_reference(&self) -> bool {
        !self.values.is_empty() && self.values.iter().all(|v| matches!(v, Value::Reference(_)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextConstraint {
    pub texts: Vec<String>,
    pub languages: BTreeSet<String>,   // empty matches all languages
    pub pattern: PatternType,
    pub mode: ValueMode,
    pub proximity_ranking: bool,
    pub boost: Option<f64>,
}

impl TextConstraint {
    pub fn new<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TextConstraint {
            texts: texts.into_iter().map(Into::into).collect(),
            languages: BTreeSet::new(),
            pattern: PatternType::None,
            mode: ValueMode::Any,
            proximity_ranking: false,
            boost: None,
        }
    }

    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_pattern(mut self, pattern: PatternType) -> Self {
        self.pattern = pattern;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeConstraint {
    pub lower: Option<Value>,
    pub upper: Option<Value>,
    pub inclusive: bool,
    pub boost: Option<f64>,
}

impl RangeConstraint {
    pub fn new(lower: Option<Value>, upper: Option<Value>, inclusive: bool) -> Self {
        RangeConstraint { lower, upper, inclusive, boost: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConstraint {
    pub context: String,
    pub context_type: String,            // datatype URI of the context
    pub languages: BTreeSet<String>,
    pub additional_fields: Vec<String>,
}

impl SimilarityConstraint {
    pub fn new(context: impl Into<String>) -> Self {
        SimilarityConstraint {
            context: context.into(),
            context_type: vocab::RDF_PLAIN_LITERAL.to_string(),
            languages: BTreeSet::new(),
            additional_fields: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    Value(ValueConstraint),
    Text(TextConstraint),
    Range(RangeConstraint),
    Similarity(SimilarityConstraint),
}

impl Constraint {
    pub fn boost(&self) -> Option<f64> {
        match self {
            Constraint::Value(c) => c.boost,
            Constraint::Text(c) => c.boost,
            Constraint::Range(c) => c.boost,
            Constraint::Similarity(_) => None,
        }
    }
}

/// Structured query over entity fields. Compiling a query rewrites it in
/// place to what was actually executed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldQuery {
    constraints: Vec<(String, Constraint)>,
    selected: BTreeSet<String>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl FieldQuery {
    pub fn new() -> Self {
        FieldQuery::default()
    }

    /// Sets the constraint of a field, replacing an existing one in place
    pub fn set_constraint(&mut self, field: impl Into<String>, constraint: Constraint) {
        let field = field.into();
        match self.constraints.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = constraint,
            None => self.constraints.push((field, constraint)),
        }
    }

    pub fn constraint(&self, field: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|(f, _)| f == field).map(|(_, c)| c)
    }

    pub fn remove_constraint(&mut self, field: &str) -> Option<Constraint> {
        let pos = self.constraints.iter().position(|(f, _)| f == field)?;
        Some(self.constraints.remove(pos).1)
    }

    pub fn constraints(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.constraints.iter().map(|(f, c)| (f.as_str(), c))
    }

    pub fn take_constraints(&mut self) -> Vec<(String, Constraint)> {
        std::mem::take(&mut self.constraints)
    }

    pub fn add_selected_field(&mut self, field: impl Into<String>) {
        self.selected.insert(field.into());
    }

    pub fn selected_fields(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn clear_selected_fields(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, field: &str) -> bool {
        self.selected.contains(field)
    }
}

/// Result items together with the query as it was executed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResultList<T> {
    pub query: FieldQuery,
    pub results: Vec<T>,
}

impl<T> QueryResultList<T> {
    pub fn new(query: FieldQuery, results: Vec<T>) -> Self {
        QueryResultList { query, results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.results.iter()
    }
}

impl<T> IntoIterator for QueryResultList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraints_keep_insertion_order() {
        let mut query = FieldQuery::new();
        query.set_constraint("http://ex/b", Constraint::Text(TextConstraint::new(["x"])));
        query.set_constraint("http://ex/a", Constraint::Text(TextConstraint::new(["y"])));
        query.set_constraint("http://ex/b", Constraint::Text(TextConstraint::new(["z"])));
        let fields: Vec<&str> = query.constraints().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["http://ex/b", "http://ex/a"]);
        assert!(matches!(query.constraint("http://ex/b"), Some(Constraint::Text(t)) if t.texts == ["z"]));
    }

    #[test]
    fn reference_constraints() {
        let c = ValueConstraint::references(["http://ex/e1"]);
        assert!(c.is_reference());
        assert!(!ValueConstraint::new(vec![Value::from(3)]).is_reference());
    }
}
