use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use crate::core::config::YardConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Representation, Value};
use crate::mapping::FieldMapper;
use crate::query::compiler::{QueryCompiler, SelectMode};
use crate::query::field_query::{FieldQuery, QueryResultList};
use crate::schema::consts::{CONFIG_DOCUMENT_ID, DOCUMENT_ID_FIELD, DOMAIN_FIELD};
use crate::schema::value_factory::IndexValueFactory;
use crate::store::client::{DocumentStore, StoreQuery, ALL_FIELDS};
use crate::store::document::{InputDocument, StoredDocument};
use crate::store::syntax::{self, MATCH_ALL};
use crate::yard::Yard;

/// Yard keeping its representations in a [`DocumentStore`].
///
/// Fields are written under the physical names of the [`FieldMapper`];
/// queries are compiled by a [`QueryCompiler`] sharing that mapper. With a
/// multi-yard layout every document is tagged with the yard id and all
/// reads and deletes are restricted to that tag.
pub struct IndexYard {
    config: YardConfig,
    store: Arc<dyn DocumentStore>,
    mapper: Arc<FieldMapper>,
    value_factory: Arc<IndexValueFactory>,
    compiler: QueryCompiler,
}

fn store_error(context: &str) -> impl FnOnce(Error) -> Error + '_ {
    move |e| match e.kind {
        ErrorKind::Store => Error::store(format!("{}: {}", context, e.context)),
        _ => Error::store(format!("{}: {}", context, e)),
    }
}

fn check_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::invalid_argument("the representation id must not be empty"));
    }
    Ok(())
}

impl IndexYard {
    pub fn new(config: YardConfig, store: Arc<dyn DocumentStore>) -> Result<Self> {
        Self::with_value_factory(config, store, Arc::new(IndexValueFactory::new()))
    }

    pub fn with_value_factory(
        config: YardConfig,
        store: Arc<dyn DocumentStore>,
        value_factory: Arc<IndexValueFactory>,
    ) -> Result<Self> {
        config.validate()?;
        let mapper = Arc::new(FieldMapper::new(store.clone()));
        let mut compiler = QueryCompiler::new(mapper.clone(), value_factory.clone());
        compiler.set_max_query_results(Some(config.max_query_results));
        compiler.set_default_query_results(Some(config.default_query_results));
        if config.multi_yard_layout {
            compiler.set_domain(Some(config.id.clone()));
        }
        info!(
            "yard {} ready (multi yard layout: {}, immediate commit: {})",
            config.id, config.multi_yard_layout, config.immediate_commit
        );
        Ok(IndexYard {
            config,
            store,
            mapper,
            value_factory,
            compiler,
        })
    }

    pub fn config(&self) -> &YardConfig {
        &self.config
    }

    pub fn field_mapper(&self) -> &Arc<FieldMapper> {
        &self.mapper
    }

    pub fn query_compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    fn commit_within(&self) -> Option<Duration> {
        if self.config.immediate_commit {
            None
        } else {
            Some(self.config.commit_within)
        }
    }

    fn send(&self, docs: Vec<InputDocument>) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }
        self.store.add(docs, self.commit_within()).map_err(store_error("unable to add documents"))?;
        if self.config.immediate_commit {
            self.store.commit().map_err(store_error("unable to commit"))?;
        }
        Ok(())
    }

    fn domain_filter(&self) -> Option<String> {
        self.config
            .multi_yard_layout
            .then(|| syntax::term(DOMAIN_FIELD, &self.config.id))
    }

    /// Boost read from the configured document boost field; negative or
    /// unparsable values are ignored
    fn document_boost(&self, representation: &Representation) -> Option<f32> {
        let field = self.config.document_boost_field.as_deref()?;
        let boost = representation.get(field).iter().find_map(|value| {
            let parsed = match value {
                Value::Str(s) => s.trim().parse::<f32>().ok(),
                Value::Typed { lexical, .. } => lexical.trim().parse::<f32>().ok(),
                other => other.as_f64().map(|v| v as f32),
            };
            if parsed.is_none() {
                warn!("document boost {}={} is no number", field, value);
            }
            parsed
        })?;
        (boost >= 0.0).then_some(boost)
    }

    /// Index time boosts apply to fields with a configured field boost,
    /// multiplied by the document boost. The first value of a physical
    /// field carries the boost; once all values are added it is corrected
    /// to `boost * sqrt(values)` to compensate the length normalisation of
    /// multi-valued fields.
    pub fn create_input_document(&self, representation: &Representation) -> InputDocument {
        let mut doc = InputDocument::new();
        if self.config.multi_yard_layout {
            doc.add_field(DOMAIN_FIELD, self.config.id.as_str());
        }
        doc.add_field(DOCUMENT_ID_FIELD, representation.id.as_str());
        let document_boost = self.document_boost(representation);
        for (field, values) in &representation.fields {
            let boost = self
                .config
                .field_boosts
                .get(field)
                .map(|field_boost| field_boost * document_boost.unwrap_or(1.0));
            let path = [field.clone()];
            let mut value_counts: BTreeMap<String, usize> = BTreeMap::new();
            for value in values {
                let index_value = match self.value_factory.create_index_value_or_string(value) {
                    Ok(index_value) => index_value,
                    Err(e) => {
                        warn!("unable to index value {} of field {}: {}", value, field, e);
                        continue;
                    }
                };
                let names = match self.mapper.field_names_for_value(&path, &index_value) {
                    Ok(names) => names,
                    Err(e) => {
                        warn!("no index field for value {} of field {}: {}", value, field, e);
                        continue;
                    }
                };
                for name in names {
                    match boost {
                        Some(boost) => {
                            let count = value_counts.entry(name.clone()).or_insert(0);
                            if *count == 0 {
                                doc.add_field_with_boost(&name, index_value.value.as_str(), boost);
                            } else {
                                doc.add_field(&name, index_value.value.as_str());
                            }
                            *count += 1;
                        }
                        None => doc.add_field(&name, index_value.value.as_str()),
                    }
                }
            }
            if let Some(boost) = boost {
                for (name, count) in value_counts.into_iter().filter(|(_, count)| *count > 1) {
                    doc.set_boost(&name, boost * (count as f32).sqrt());
                }
            }
        }
        doc
    }

    /// Converts a stored document back. With `selected` only those fields
    /// are kept. Fields that are no logical field are skipped; names
    /// pointing at unknown namespace prefixes fail.
    pub fn create_representation(&self, doc: &StoredDocument, selected: Option<&BTreeSet<String>>) -> Result<Representation> {
        let id = doc.id().ok_or_else(|| {
            Error::new(ErrorKind::InvalidState, format!("stored document without {} field", DOCUMENT_ID_FIELD))
        })?;
        let mut representation = Representation::new(id);
        for name in doc.field_names() {
            let Some(index_field) = self.mapper.index_field_for(name)? else {
                continue;
            };
            let [field] = index_field.path() else {
                warn!("unable to process index field {} (document field {})", index_field, name);
                continue;
            };
            if selected.is_some_and(|s| !s.contains(field)) {
                continue;
            }
            for lexical in doc.values(name) {
                match self.value_factory.create_value(index_field.data_type(), lexical, index_field.language()) {
                    Ok(value) => representation.add(field.as_str(), value),
                    Err(e) => warn!("unable to convert {} of field {}: {}", lexical, name, e),
                }
            }
        }
        Ok(representation)
    }

    fn execute(&self, store_query: &StoreQuery) -> Result<Vec<StoredDocument>> {
        let response = self
            .store
            .query(store_query)
            .map_err(store_error("error while querying the document store"))?;
        Ok(response
            .docs
            .into_iter()
            .filter(|doc| doc.id() != Some(CONFIG_DOCUMENT_ID))
            .collect())
    }

    fn get_document(&self, id: &str, fields: &[&str]) -> Result<Option<StoredDocument>> {
        let mut query = StoreQuery::with_query(syntax::term(DOCUMENT_ID_FIELD, id));
        for field in fields {
            query.add_field(field);
        }
        if let Some(filter) = self.domain_filter() {
            query.add_filter_query(filter);
        }
        query.rows = 1;
        Ok(self.execute(&query)?.into_iter().next())
    }

    /// Ids of the given set that are stored, asked in chunks of at most
    /// `max_boolean_clauses` ids
    fn check_representations(&self, ids: &BTreeSet<String>) -> Result<BTreeSet<String>> {
        let mut found = BTreeSet::new();
        let ids: Vec<&String> = ids.iter().collect();
        for chunk in ids.chunks(self.config.max_boolean_clauses.max(1)) {
            let clauses: Vec<String> = chunk.iter().map(|id| syntax::term(DOCUMENT_ID_FIELD, id)).collect();
            let mut query = StoreQuery::with_query(clauses.join(" OR "));
            query.add_field(DOCUMENT_ID_FIELD);
            query.rows = chunk.len();
            if let Some(filter) = self.domain_filter() {
                query.add_filter_query(filter);
            }
            debug!("existence check for {} ids", chunk.len());
            for doc in self.execute(&query)? {
                if let Some(id) = doc.id() {
                    found.insert(id.to_string());
                }
            }
        }
        Ok(found)
    }

    fn delete_ids(&self, ids: &[String]) -> Result<()> {
        if self.config.multi_yard_layout {
            // ids of other yards sharing the index must stay untouched
            for id in ids {
                let query = format!(
                    "{} AND {}",
                    syntax::term(DOMAIN_FIELD, &self.config.id),
                    syntax::term(DOCUMENT_ID_FIELD, id)
                );
                self.store
                    .delete_by_query(&query)
                    .map_err(store_error("unable to delete documents"))?;
            }
        } else {
            self.store
                .delete_by_ids(ids)
                .map_err(store_error("unable to delete documents"))?;
        }
        self.store.commit().map_err(store_error("unable to commit"))
    }

    fn find_with(&self, query: &FieldQuery, select: SelectMode) -> Result<QueryResultList<Representation>> {
        let start = Instant::now();
        let mut executed = query.clone();
        let store_query = self.compiler.compile(&mut executed, select);
        let selected = (select == SelectMode::Query).then(|| executed.selected_fields().clone());
        let docs = self.execute(&store_query)?;
        let results = docs
            .iter()
            .map(|doc| self.create_representation(doc, selected.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        debug!("find returned {} results in {:?}", results.len(), start.elapsed());
        Ok(QueryResultList::new(executed, results))
    }
}

impl Yard for IndexYard {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn name(&self) -> &str {
        self.config.name.as_deref().unwrap_or(&self.config.id)
    }

    fn description(&self) -> Option<&str> {
        self.config.description.as_deref()
    }

    fn store(&self, representation: Representation) -> Result<Representation> {
        check_id(&representation.id)?;
        debug!("store {}", representation.id);
        let doc = self.create_input_document(&representation);
        self.send(vec![doc])?;
        Ok(representation)
    }

    fn store_all(&self, representations: Vec<Representation>) -> Result<Vec<Representation>> {
        for representation in &representations {
            check_id(&representation.id)?;
        }
        let docs = representations.iter().map(|r| self.create_input_document(r)).collect();
        self.send(docs)?;
        debug!("stored {} representations", representations.len());
        Ok(representations)
    }

    fn update(&self, representation: Representation) -> Result<Representation> {
        check_id(&representation.id)?;
        if !self.is_representation(&representation.id)? {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("representation {} is not managed by yard {}", representation.id, self.config.id),
            ));
        }
        self.store(representation)
    }

    fn update_all(&self, representations: Vec<Representation>) -> Result<Vec<Representation>> {
        let requested: BTreeSet<String> = representations
            .iter()
            .filter(|r| !r.id.trim().is_empty())
            .map(|r| r.id.clone())
            .collect();
        let found = self.check_representations(&requested)?;
        let updated: Vec<Representation> = representations
            .into_iter()
            .filter(|r| found.contains(&r.id))
            .collect();
        let docs = updated.iter().map(|r| self.create_input_document(r)).collect();
        self.send(docs)?;
        info!(
            "update of {} representations: {} stored, {} updated",
            requested.len(),
            found.len(),
            updated.len()
        );
        Ok(updated)
    }

    fn remove(&self, id: &str) -> Result<()> {
        check_id(id)?;
        self.delete_ids(&[id.to_string()])
    }

    fn remove_all_ids(&self, ids: &[String]) -> Result<()> {
        let ids: Vec<String> = ids.iter().filter(|id| !id.trim().is_empty()).cloned().collect();
        if ids.is_empty() {
            return Ok(());
        }
        self.delete_ids(&ids)
    }

    fn remove_all(&self) -> Result<()> {
        // load the prefix table before its document is deleted
        let prefixes = self.mapper.prefix_table().mappings().len();
        let query = match self.config.multi_yard_layout {
            true => syntax::term(DOMAIN_FIELD, &self.config.id),
            false => MATCH_ALL.to_string(),
        };
        self.store
            .delete_by_query(&query)
            .map_err(store_error("unable to delete documents"))?;
        self.mapper.prefix_table().save(false)?;
        self.store.commit().map_err(store_error("unable to commit"))?;
        debug!("removed all representations of {}, kept {} namespace prefixes", self.config.id, prefixes);
        Ok(())
    }

    fn get_representation(&self, id: &str) -> Result<Option<Representation>> {
        check_id(id)?;
        match self.get_document(id, &[ALL_FIELDS])? {
            Some(doc) => self.create_representation(&doc, None).map(Some),
            None => Ok(None),
        }
    }

    fn is_representation(&self, id: &str) -> Result<bool> {
        check_id(id)?;
        Ok(self.get_document(id, &[DOCUMENT_ID_FIELD])?.is_some())
    }

    fn find(&self, query: &FieldQuery) -> Result<QueryResultList<Representation>> {
        self.find_with(query, SelectMode::Query)
    }

    fn find_references(&self, query: &FieldQuery) -> Result<QueryResultList<String>> {
        let mut executed = query.clone();
        let store_query = self.compiler.compile(&mut executed, SelectMode::Id);
        let ids = self
            .execute(&store_query)?
            .iter()
            .filter_map(|doc| doc.id().map(str::to_string))
            .collect();
        Ok(QueryResultList::new(executed, ids))
    }

    fn find_representation(&self, query: &FieldQuery) -> Result<QueryResultList<Representation>> {
        self.find_with(query, SelectMode::All)
    }

    fn optimize(&self) -> Result<()> {
        self.store.optimize().map_err(store_error("unable to optimize the index"))
    }
}
