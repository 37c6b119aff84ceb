use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use parking_lot::RwLock;
use tracing::{debug, trace};
use crate::core::error::{Error, Result};
use crate::schema::consts::SCORE_FIELD;
use crate::store::ast::Query;
use crate::store::client::{DocumentStore, MoreLikeThis, RequestHandler, StoreQuery, StoreResponse, ALL_FIELDS};
use crate::store::document::{IndexedDocument, InputDocument, StoredDocument};
use crate::store::matcher::DocumentMatcher;
use crate::store::parser::QueryParser;
use crate::store::schema::StoreSchema;

enum PendingOp {
    Add(Vec<IndexedDocument>),
    DeleteIds(Vec<String>),
    DeleteQuery(Query),
}

#[derive(Default)]
struct StoreState {
    docs: BTreeMap<String, IndexedDocument>,  // committed, by id
    pending: Vec<PendingOp>,
    commit_deadline: Option<Instant>,
}

impl StoreState {
    fn apply_pending(&mut self, matcher: &DocumentMatcher) -> usize {
        let ops = std::mem::take(&mut self.pending);
        let count = ops.len();
        for op in ops {
            match op {
                PendingOp::Add(docs) => {
                    for doc in docs {
                        if let Some(id) = doc.id().map(str::to_string) {
                            self.docs.insert(id, doc);
                        }
                    }
                }
                PendingOp::DeleteIds(ids) => {
                    for id in ids {
                        self.docs.remove(&id);
                    }
                }
                PendingOp::DeleteQuery(query) => self.docs.retain(|_, doc| !matcher.matches(doc, &query)),
            }
        }
        self.commit_deadline = None;
        count
    }
}

/// Document store held in memory.
///
/// Writes are queued and become visible on [`commit`](DocumentStore::commit)
/// or with the first query after their commit-within deadline passed.
/// Queries use the same syntax and field rules as the remote index.
pub struct MemoryStore {
    schema: Arc<StoreSchema>,
    parser: QueryParser,
    matcher: DocumentMatcher,
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_schema(StoreSchema::entityhub())
    }

    pub fn with_schema(schema: StoreSchema) -> Self {
        let schema = Arc::new(schema);
        MemoryStore {
            matcher: DocumentMatcher::new(schema.clone()),
            parser: QueryParser::new(),
            schema,
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Number of committed documents
    pub fn len(&self) -> usize {
        self.state.read().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_operations(&self) -> usize {
        self.state.read().pending.len()
    }

    fn commit_if_due(&self) {
        let due = matches!(self.state.read().commit_deadline, Some(deadline) if deadline <= Instant::now());
        if due {
            let mut state = self.state.write();
            // another query may have committed meanwhile
            if matches!(state.commit_deadline, Some(deadline) if deadline <= Instant::now()) {
                let applied = state.apply_pending(&self.matcher);
                debug!("commit within deadline passed, applied {} operations", applied);
            }
        }
    }

    fn enqueue(&self, op: PendingOp, commit_within: Option<Duration>) {
        let mut state = self.state.write();
        state.pending.push(op);
        if let Some(within) = commit_within {
            let deadline = Instant::now() + within;
            state.commit_deadline = Some(match state.commit_deadline {
                Some(current) if current < deadline => current,
                _ => deadline,
            });
        }
    }

    fn more_like_this_score(&self, doc: &IndexedDocument, mlt: &MoreLikeThis, interesting: &BTreeSet<String>) -> Option<f32> {
        if interesting.is_empty() {
            return None;
        }
        let analyzer = self.schema.text_analyzer();
        let doc_terms: BTreeSet<String> = mlt
            .fields
            .iter()
            .flat_map(|field| doc.values(field).iter())
            .flat_map(|value| analyzer.terms(value))
            .collect();
        let shared = interesting.intersection(&doc_terms).count();
        (shared > 0).then(|| shared as f32 / interesting.len() as f32)
    }

    /// Terms of the stream body that occur often enough in it and in the
    /// candidate documents
    fn interesting_terms(&self, mlt: &MoreLikeThis, candidates: &[&IndexedDocument]) -> BTreeSet<String> {
        let analyzer = self.schema.text_analyzer();
        let mut term_freq: BTreeMap<String, usize> = BTreeMap::new();
        for term in analyzer.terms(&mlt.stream_body) {
            *term_freq.entry(term).or_default() += 1;
        }
        term_freq
            .into_iter()
            .filter(|(_, freq)| *freq >= mlt.min_term_freq)
            .map(|(term, _)| term)
            .filter(|term| {
                let doc_freq = candidates
                    .iter()
                    .filter(|doc| {
                        mlt.fields
                            .iter()
                            .flat_map(|field| doc.values(field).iter())
                            .any(|value| analyzer.terms(value).contains(term))
                    })
                    .count();
                doc_freq >= mlt.min_doc_freq
            })
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn project(doc: &IndexedDocument, score: f32, fields: &[String]) -> StoredDocument {
    let all = fields.is_empty() || fields.iter().any(|f| f == ALL_FIELDS);
    let mut projected = if all {
        doc.stored.clone()
    } else {
        StoredDocument {
            fields: doc
                .stored
                .fields
                .iter()
                .filter(|(name, _)| fields.contains(name))
                .map(|(name, values)| (name.clone(), values.clone()))
                .collect(),
        }
    };
    if fields.iter().any(|f| f == SCORE_FIELD) {
        projected.fields.insert(SCORE_FIELD.to_string(), vec![score.to_string()]);
    }
    projected
}

impl DocumentStore for MemoryStore {
    fn add(&self, docs: Vec<InputDocument>, commit_within: Option<Duration>) -> Result<()> {
        let mut indexed = Vec::with_capacity(docs.len());
        for doc in &docs {
            if doc.id().is_none() {
                return Err(Error::store("document without id field"));
            }
            indexed.push(IndexedDocument::new(doc, &self.schema));
        }
        trace!("queued {} documents", indexed.len());
        self.enqueue(PendingOp::Add(indexed), commit_within);
        Ok(())
    }

    fn delete_by_ids(&self, ids: &[String]) -> Result<()> {
        self.enqueue(PendingOp::DeleteIds(ids.to_vec()), None);
        Ok(())
    }

    fn delete_by_query(&self, query: &str) -> Result<()> {
        let query = self.parser.parse(query)?;
        self.enqueue(PendingOp::DeleteQuery(query), None);
        Ok(())
    }

    fn query(&self, query: &StoreQuery) -> Result<StoreResponse> {
        self.commit_if_due();
        let main = match &query.query {
            Some(q) => Some(self.parser.parse(q)?),
            None => None,
        };
        let filters = query
            .filter_queries
            .iter()
            .map(|f| self.parser.parse(f))
            .collect::<Result<Vec<_>>>()?;

        let state = self.state.read();
        let candidates: Vec<&IndexedDocument> = state
            .docs
            .values()
            .filter(|doc| filters.iter().all(|f| self.matcher.matches(doc, f)))
            .collect();

        let mut hits: Vec<(f32, &IndexedDocument)> = match &query.handler {
            RequestHandler::Select => {
                let main = main.unwrap_or(Query::MatchAll);
                candidates
                    .into_iter()
                    .filter_map(|doc| self.matcher.score(doc, &main).map(|score| (score, doc)))
                    .collect()
            }
            RequestHandler::MoreLikeThis(mlt) => {
                let interesting = self.interesting_terms(mlt, &candidates);
                candidates
                    .into_iter()
                    .filter(|doc| main.as_ref().map(|m| self.matcher.matches(doc, m)).unwrap_or(true))
                    .filter_map(|doc| self.more_like_this_score(doc, mlt, &interesting).map(|score| (score, doc)))
                    .collect()
            }
        };
        // candidates come in id order, the sort is stable
        hits.sort_by(|a, b| b.0.total_cmp(&a.0));

        let num_found = hits.len();
        let docs = hits
            .into_iter()
            .skip(query.start)
            .take(query.rows)
            .map(|(score, doc)| project(doc, score, &query.fields))
            .collect();
        Ok(StoreResponse { docs, num_found })
    }

    fn commit(&self) -> Result<()> {
        let applied = self.state.write().apply_pending(&self.matcher);
        if applied > 0 {
            debug!("committed {} operations", applied);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::consts::DOCUMENT_ID_FIELD;
    use crate::core::error::ErrorKind;

    fn doc(id: &str, label: &str, legs: i32) -> InputDocument {
        let mut doc = InputDocument::new();
        doc.add_field(DOCUMENT_ID_FIELD, id);
        doc.add_field("@en/rdfs:label/", label);
        doc.add_field("int/ns1:legs/", legs.to_string());
        doc
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .add(vec![doc("urn:cat", "black cat", 4), doc("urn:bird", "small bird", 2), doc("urn:dog", "black dog", 4)], None)
            .unwrap();
        store.commit().unwrap();
        store
    }

    fn ids(response: &StoreResponse) -> Vec<&str> {
        response.docs.iter().filter_map(StoredDocument::id).collect()
    }

    #[test]
    fn writes_are_visible_after_commit() {
        let store = MemoryStore::new();
        store.add(vec![doc("urn:cat", "cat", 4)], None).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.pending_operations(), 1);
        store.commit().unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn commit_within_deadline_applies_on_query() {
        let store = MemoryStore::new();
        store.add(vec![doc("urn:cat", "cat", 4)], Some(Duration::ZERO)).unwrap();
        let response = store.query(&StoreQuery::new()).unwrap();
        assert_eq!(response.num_found, 1);
    }

    #[test]
    fn select_with_paging_and_fields() {
        let store = store();
        let mut query = StoreQuery::with_query("@en\\/rdfs\\:label\\/:black");
        query.rows = 1;
        query.add_field(DOCUMENT_ID_FIELD);
        query.add_field(SCORE_FIELD);
        let response = store.query(&query).unwrap();
        assert_eq!(response.num_found, 2);
        assert_eq!(ids(&response), vec!["urn:cat"]);
        let first = &response.docs[0];
        assert_eq!(first.first_value(SCORE_FIELD), Some("1"));
        assert!(first.values("@en/rdfs:label/").is_empty());

        query.start = 1;
        assert_eq!(ids(&store.query(&query).unwrap()), vec!["urn:dog"]);
    }

    #[test]
    fn filters_restrict_results() {
        let store = store();
        let mut query = StoreQuery::new();
        query.add_filter_query("int\\/ns1\\:legs\\/:[3 TO *]");
        assert_eq!(ids(&store.query(&query).unwrap()), vec!["urn:cat", "urn:dog"]);
    }

    #[test]
    fn deletes() {
        let store = store();
        store.delete_by_ids(&["urn:cat".to_string()]).unwrap();
        store.delete_by_query("int\\/ns1\\:legs\\/:2").unwrap();
        store.commit().unwrap();
        assert_eq!(ids(&store.query(&StoreQuery::new()).unwrap()), vec!["urn:dog"]);
    }

    #[test]
    fn more_like_this_ranks_by_shared_terms() {
        let store = store();
        let mut query = StoreQuery::new();
        query.handler = RequestHandler::MoreLikeThis(MoreLikeThis {
            fields: vec!["_text".to_string()],
            stream_body: "a black cat".to_string(),
            min_term_freq: 1,
            min_doc_freq: 1,
            match_include: false,
            boost: true,
        });
        let response = store.query(&query).unwrap();
        assert_eq!(ids(&response), vec!["urn:cat", "urn:dog"]);
    }

    #[test]
    fn invalid_input_is_rejected() {
        let store = MemoryStore::new();
        let err = store.add(vec![InputDocument::new()], None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Store);
        let err = store.query(&StoreQuery::with_query("(broken")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
    }
}
