use std::time::Duration;
use serde::{Serialize, Deserialize};
use crate::core::error::Result;
use crate::store::document::{InputDocument, StoredDocument};

pub const ALL_FIELDS: &str = "*";

/// Parameters of a more-like-this request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoreLikeThis {
    pub fields: Vec<String>,
    pub stream_body: String,     // the text similar documents are searched for
    pub min_term_freq: usize,
    pub min_doc_freq: usize,
    pub match_include: bool,
    pub boost: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RequestHandler {
    Select,
    MoreLikeThis(MoreLikeThis),
}

/// A request in the store's native query language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreQuery {
    pub query: Option<String>,        // None matches all documents
    pub filter_queries: Vec<String>,  // must match, do not affect scores
    pub fields: Vec<String>,          // returned fields, `*` for all
    pub start: usize,
    pub rows: usize,
    pub handler: RequestHandler,
}

impl StoreQuery {
    pub fn new() -> Self {
        StoreQuery {
            query: None,
            filter_queries: Vec::new(),
            fields: Vec::new(),
            start: 0,
            rows: 10,
            handler: RequestHandler::Select,
        }
    }

    pub fn with_query(query: impl Into<String>) -> Self {
        StoreQuery {
            query: Some(query.into()),
            ..Self::new()
        }
    }

    pub fn add_field(&mut self, field: &str) {
        if !self.fields.iter().any(|f| f == field) {
            self.fields.push(field.to_string());
        }
    }

    pub fn add_filter_query(&mut self, filter: impl Into<String>) {
        self.filter_queries.push(filter.into());
    }

    pub fn is_more_like_this(&self) -> bool {
        matches!(self.handler, RequestHandler::MoreLikeThis(_))
    }
}

impl Default for StoreQuery {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreResponse {
    pub docs: Vec<StoredDocument>,
    pub num_found: usize,
}

/// Client of the document store holding the index. All calls block.
///
/// Writes become visible after [`commit`](DocumentStore::commit) or, when
/// a commit-within duration is given, once that duration has passed.
pub trait DocumentStore: Send + Sync {
    /// Adds or replaces (by id) all documents in one request
    fn add(&self, docs: Vec<InputDocument>, commit_within: Option<Duration>) -> Result<()>;

    fn delete_by_ids(&self, ids: &[String]) -> Result<()>;

    fn delete_by_query(&self, query: &str) -> Result<()>;

    fn query(&self, query: &StoreQuery) -> Result<StoreResponse>;

    fn commit(&self) -> Result<()>;

    /// Merges index structures; plain commit by default
    fn optimize(&self) -> Result<()> {
        self.commit()
    }
}
