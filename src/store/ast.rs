use serde::{Serialize, Deserialize};

/// Parsed form of a query in the store's query syntax
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    Term(TermQuery),         // field:value
    Phrase(PhraseQuery),     // field:"w1 w2"~slop
    Bool(BoolQuery),
    Range(RangeQuery),       // field:[a TO b}
    Wildcard(WildcardQuery), // field:va?u*
    Regex(RegexQuery),       // field:/pattern/
    Exists(String),          // field:*
    MatchAll,                // *:*
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub field: String,
    pub value: String,
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseQuery {
    pub field: String,
    pub phrase: String,
    pub slop: u32,  // max number of positions terms may be moved
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    pub must: Vec<Query>,      // AND
    pub should: Vec<Query>,    // OR, at least one
    pub boost: Option<f32>,
}

/// `None` bounds are open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery {
    pub field: String,
    pub lower: Option<String>,
    pub upper: Option<String>,
    pub include_lower: bool,
    pub include_upper: bool,
    pub boost: Option<f32>,
}

/// The pattern keeps the escapes of the query so literal `*` and `?`
/// can be told apart from wildcards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WildcardQuery {
    pub field: String,
    pub pattern: String,
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexQuery {
    pub field: String,
    pub pattern: String,
    pub boost: Option<f32>,
}

impl Query {
    pub fn boost(&self) -> f32 {
        let boost = match self {
            Query::Term(q) => q.boost,
            Query::Phrase(q) => q.boost,
            Query::Bool(q) => q.boost,
            Query::Range(q) => q.boost,
            Query::Wildcard(q) => q.boost,
            Query::Regex(q) => q.boost,
            Query::Exists(_) | Query::MatchAll => None,
        };
        boost.unwrap_or(1.0)
    }

    /// Sets the boost of a group. Clauses without a boost slot are wrapped.
    pub fn with_boost(self, boost: Option<f32>) -> Query {
        let Some(boost) = boost else {
            return self;
        };
        match self {
            Query::Term(mut q) => {
                q.boost = Some(boost);
                Query::Term(q)
            }
            Query::Phrase(mut q) => {
                q.boost = Some(boost);
                Query::Phrase(q)
            }
            Query::Bool(mut q) => {
                q.boost = Some(boost);
                Query::Bool(q)
            }
            Query::Range(mut q) => {
                q.boost = Some(boost);
                Query::Range(q)
            }
            Query::Wildcard(mut q) => {
                q.boost = Some(boost);
                Query::Wildcard(q)
            }
            Query::Regex(mut q) => {
                q.boost = Some(boost);
                Query::Regex(q)
            }
            other => Query::Bool(BoolQuery {
                must: vec![other],
                should: Vec::new(),
                boost: Some(boost),
            }),
        }
    }
}

impl BoolQuery {
    pub fn new() -> Self {
        BoolQuery::default()
    }

    pub fn with_must(mut self, query: Query) -> Self {
        self.must.push(query);
        self
    }

    pub fn with_should(mut self, query: Query) -> Self {
        self.should.push(query);
        self
    }
}
