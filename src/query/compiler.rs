use std::sync::Arc;
use tracing::{debug, warn};
use crate::core::config::{DEFAULT_QUERY_RESULTS, MAX_QUERY_RESULTS};
use crate::core::types::Value;
use crate::core::vocab;
use crate::mapping::FieldMapper;
use crate::query::constraint::{ConstraintType, ConstraintValue, IndexConstraint};
use crate::query::field_query::{
    Constraint, FieldQuery, PatternType, RangeConstraint, SimilarityConstraint, TextConstraint,
    ValueConstraint,
};
use crate::schema::consts::{DOCUMENT_ID_FIELD, DOMAIN_FIELD, SCORE_FIELD};
use crate::schema::datatype::IndexDataType;
use crate::schema::index_field::IndexField;
use crate::schema::index_value::IndexValue;
use crate::schema::value_factory::IndexValueFactory;
use crate::store::client::{MoreLikeThis, RequestHandler, StoreQuery, ALL_FIELDS};
use crate::store::syntax;

/// Which stored fields a query returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
    /// Only the document id; the selected fields of the query are dropped
    Id,
    /// The id when nothing is selected, everything otherwise. Physical
    /// names cannot be enumerated ahead of time, so filtering happens when
    /// documents are converted back.
    Query,
    All,
}

/// Compiles [`FieldQuery`]s into [`StoreQuery`]s.
///
/// Compiling rewrites the field query to what is executed: defaults and
/// clamped limits are filled in, invalid and extra similarity constraints
/// are removed, value constraints carry the datatype actually used.
pub struct QueryCompiler {
    mapper: Arc<FieldMapper>,
    value_factory: Arc<IndexValueFactory>,
    domain: Option<String>,
    default_query_results: usize,
    max_query_results: usize,
}

impl QueryCompiler {
    pub fn new(mapper: Arc<FieldMapper>, value_factory: Arc<IndexValueFactory>) -> Self {
        QueryCompiler {
            mapper,
            value_factory,
            domain: None,
            default_query_results: DEFAULT_QUERY_RESULTS,
            max_query_results: MAX_QUERY_RESULTS,
        }
    }

    /// Domain every query is restricted to; empty disables the filter
    pub fn set_domain(&mut self, domain: Option<String>) {
        self.domain = domain.filter(|d| !d.is_empty());
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn max_query_results(&self) -> usize {
        self.max_query_results
    }

    pub fn default_query_results(&self) -> usize {
        self.default_query_results
    }

    /// `None` resets to the built-in maximum; values not above the default
    /// are raised to the default
    pub fn set_max_query_results(&mut self, max: Option<usize>) {
        self.max_query_results = match max {
            None => MAX_QUERY_RESULTS,
            Some(max) if max <= self.default_query_results => self.default_query_results,
            Some(max) => max,
        };
    }

    /// `None` or `0` resets to the built-in default; values from the
    /// maximum up are lowered to the maximum
    pub fn set_default_query_results(&mut self, default: Option<usize>) {
        self.default_query_results = match default {
            None | Some(0) => DEFAULT_QUERY_RESULTS.min(self.max_query_results),
            Some(default) if default >= self.max_query_results => self.max_query_results,
            Some(default) => default,
        };
    }

    pub fn compile(&self, query: &mut FieldQuery, select: SelectMode) -> StoreQuery {
        let mut store_query = self.init_store_query(query);
        self.set_selected(&mut store_query, query, select);

        let mut encoded = Vec::new();
        let mut processed = Vec::new();
        let mut similarity_present = false;
        for (field, constraint) in query.take_constraints() {
            if let Constraint::Similarity(similarity) = &constraint {
                if similarity_present {
                    warn!(
                        "only one similarity constraint per query is supported, ignoring the one on {} (context: {}, additional fields: {:?})",
                        field, similarity.context, similarity.additional_fields
                    );
                    continue;
                }
                similarity_present = true;
                store_query.handler = RequestHandler::MoreLikeThis(self.more_like_this(&field, similarity));
                processed.push((field, constraint));
                continue;
            }
            let index_constraint = self.create_index_constraint(field, constraint);
            if index_constraint.is_invalid() {
                warn!(
                    "dropping constraint on field {}: {:?}",
                    index_constraint.field(),
                    index_constraint.invalid_messages()
                );
                continue;
            }
            encoded.push(index_constraint.encode(&self.mapper));
            processed.push(index_constraint.into_executed_constraint());
        }
        for (field, constraint) in processed {
            query.set_constraint(field, constraint);
        }

        if !encoded.is_empty() {
            let query_string = format!("({})", encoded.join(") AND ("));
            debug!("query string: {}", query_string);
            if store_query.is_more_like_this() {
                store_query.add_filter_query(query_string);
            } else {
                store_query.query = Some(query_string);
            }
        }
        store_query
    }

    fn init_store_query(&self, query: &mut FieldQuery) -> StoreQuery {
        let mut store_query = StoreQuery::new();
        if let Some(domain) = &self.domain {
            store_query.add_filter_query(syntax::term(DOMAIN_FIELD, domain));
        }
        store_query.start = query.offset;
        store_query.rows = match query.limit {
            Some(limit) if limit <= self.max_query_results => limit,
            Some(limit) => {
                warn!(
                    "requested {} results exceed the maximum of {}, limiting",
                    limit, self.max_query_results
                );
                query.limit = Some(self.max_query_results);
                self.max_query_results
            }
            None => {
                query.limit = Some(self.default_query_results);
                self.default_query_results
            }
        };
        store_query
    }

    fn set_selected(&self, store_query: &mut StoreQuery, query: &mut FieldQuery, select: SelectMode) {
        match select {
            SelectMode::Id => {
                store_query.add_field(DOCUMENT_ID_FIELD);
                query.clear_selected_fields();
            }
            SelectMode::Query if query.selected_fields().is_empty() => store_query.add_field(DOCUMENT_ID_FIELD),
            SelectMode::Query | SelectMode::All => store_query.add_field(ALL_FIELDS),
        }
        store_query.add_field(SCORE_FIELD);
        query.add_selected_field(vocab::RESULT_SCORE);
    }

    fn more_like_this(&self, field: &str, similarity: &SimilarityConstraint) -> MoreLikeThis {
        let data_type = IndexDataType::for_uri(&similarity.context_type).unwrap_or(IndexDataType::Txt);
        let mut fields = Vec::new();
        for logical in std::iter::once(field).chain(similarity.additional_fields.iter().map(String::as_str)) {
            match IndexField::with_languages(vec![logical.to_string()], data_type, &similarity.languages) {
                Ok(index_field) => {
                    for name in self.mapper.query_field_names(&index_field) {
                        if !fields.contains(&name) {
                            fields.push(name);
                        }
                    }
                }
                Err(e) => warn!("ignoring similarity field {}: {}", logical, e),
            }
        }
        MoreLikeThis {
            fields,
            stream_body: similarity.context.clone(),
            min_term_freq: 1,
            min_doc_freq: 1,
            match_include: false,
            boost: true,
        }
    }

    fn create_index_constraint(&self, field: String, constraint: Constraint) -> IndexConstraint {
        let mut index_constraint = IndexConstraint::new(field, constraint.clone());
        match &constraint {
            Constraint::Value(value) => self.init_value_constraint(&mut index_constraint, value),
            Constraint::Text(text) => self.init_text_constraint(&mut index_constraint, text),
            Constraint::Range(range) => self.init_range_constraint(&mut index_constraint, range),
            Constraint::Similarity(_) => index_constraint.set_invalid("similarity constraints are compiled separately"),
        }
        index_constraint
    }

    fn init_value_constraint(&self, ic: &mut IndexConstraint, constraint: &ValueConstraint) {
        if constraint.values.is_empty() {
            ic.set_invalid(format!(
                "value constraint without values (datatypes {:?}) is not supported",
                constraint.data_types
            ));
            return;
        }
        let mut data_type = None;
        for uri in &constraint.data_types {
            match IndexDataType::for_uri(uri) {
                Some(dt) if data_type.is_none() => data_type = Some(dt),
                Some(_) => warn!("only a single datatype is supported for value constraints, ignoring {}", uri),
                None => warn!("unsupported datatype {} in value constraint is ignored", uri),
            }
        }

        let mut value = ConstraintValue::new(constraint.mode, constraint.boost);
        for v in &constraint.values {
            let index_value = match data_type {
                Some(dt) => self.index_value_as(v, dt),
                None => match self.value_factory.create_index_value_or_string(v) {
                    Ok(index_value) => {
                        // the first value decides the datatype of the query
                        data_type = Some(index_value.data_type);
                        index_value
                    }
                    Err(e) => {
                        ic.set_invalid(format!("unable to convert value {}: {}", v, e));
                        return;
                    }
                },
            };
            value.values.push(index_value);
        }
        let Some(data_type) = data_type else {
            ic.set_invalid("unable to determine the datatype of the value constraint");
            return;
        };

        // text takes the language of the first value
        let language = value.values.first().and_then(|v| v.language.clone());
        let index_field = IndexField::with_languages(ic.path(), data_type, language);
        match index_field {
            Ok(index_field) => ic.set_index_field_constraints(index_field),
            Err(e) => {
                ic.set_invalid(e.to_string());
                return;
            }
        }
        ic.set_field_constraint(ConstraintType::Eq, value);
        if !constraint.is_reference() {
            ic.set_executed_constraint(Constraint::Value(ValueConstraint {
                values: constraint.values.clone(),
                data_types: vec![data_type.uri().to_string()],
                mode: constraint.mode,
                boost: constraint.boost,
            }));
        }
    }

    /// Index value of `value` typed as `data_type`, taking the converter's
    /// lexical form when the types agree
    fn index_value_as(&self, value: &Value, data_type: IndexDataType) -> IndexValue {
        match self.value_factory.create_index_value(value) {
            Ok(index_value) if index_value.data_type == data_type => index_value,
            _ => {
                let lexical = match value {
                    Value::Text(text) => text.text.clone(),
                    other => other.to_string(),
                };
                IndexValue::with_language(lexical, data_type, value.language())
            }
        }
    }

    fn init_text_constraint(&self, ic: &mut IndexConstraint, constraint: &TextConstraint) {
        let mut value = ConstraintValue::new(constraint.mode, constraint.boost);
        value.phrase_query = constraint.proximity_ranking;
        value.values = constraint
            .texts
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| IndexValue::new(t.as_str(), IndexDataType::Txt))
            .collect();
        if value.values.is_empty() {
            ic.set_invalid("text constraint without any text");
            return;
        }
        match IndexField::with_languages(ic.path(), IndexDataType::Txt, &constraint.languages) {
            Ok(index_field) => ic.set_index_field_constraints(index_field),
            Err(e) => {
                ic.set_invalid(e.to_string());
                return;
            }
        }
        let constraint_type = match constraint.pattern {
            PatternType::None => ConstraintType::Eq,
            PatternType::Wildcard => ConstraintType::Wildcard,
            PatternType::Regex => ConstraintType::Regex,
        };
        ic.set_field_constraint(constraint_type, value);
    }

    fn init_range_constraint(&self, ic: &mut IndexConstraint, constraint: &RangeConstraint) {
        let mut lower = ConstraintValue::new(Default::default(), constraint.boost);
        let mut upper = ConstraintValue::new(Default::default(), constraint.boost);
        let mut data_type = None;
        if let Some(bound) = &constraint.lower {
            match self.value_factory.create_index_value(bound) {
                Ok(v) => {
                    data_type = Some(v.data_type);
                    lower.values.push(v);
                }
                Err(e) => ic.set_invalid(format!("unsupported lower bound {}: {}", bound, e)),
            }
        }
        if let Some(bound) = &constraint.upper {
            match self.value_factory.create_index_value(bound) {
                Ok(v) => {
                    match data_type {
                        Some(dt) if dt != v.data_type => ic.set_invalid(format!(
                            "upper and lower bound of a range must use the same datatype (lower: {:?}, upper: {:?})",
                            dt, v.data_type
                        )),
                        _ => data_type = Some(v.data_type),
                    }
                    upper.values.push(v);
                }
                Err(e) => ic.set_invalid(format!("unsupported upper bound {}: {}", bound, e)),
            }
        }
        let Some(data_type) = data_type else {
            ic.set_invalid("a range constraint needs a lower or an upper bound");
            return;
        };
        match IndexField::new(ic.path(), data_type) {
            Ok(index_field) => ic.set_index_field_constraints(index_field),
            Err(e) => ic.set_invalid(e.to_string()),
        }
        if constraint.inclusive {
            ic.set_field_constraint(ConstraintType::Ge, lower);
            ic.set_field_constraint(ConstraintType::Le, upper);
        } else {
            ic.set_field_constraint(ConstraintType::Gt, lower);
            ic.set_field_constraint(ConstraintType::Lt, upper);
        }
    }
}
