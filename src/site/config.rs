use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, ErrorKind, Result};

/// How a site uses its local cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    /// Every read goes to the remote services
    #[default]
    None,
    /// Lookups check the cache first and warm it from the remote site
    Used,
    /// The cache holds the whole dataset and is authoritative
    All,
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            CacheStrategy::None => "none",
            CacheStrategy::Used => "used",
            CacheStrategy::All => "all",
        };
        f.write_str(name)
    }
}

impl FromStr for CacheStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(CacheStrategy::None),
            "used" => Ok(CacheStrategy::Used),
            "all" => Ok(CacheStrategy::All),
            other => Err(Error::new(ErrorKind::Config, format!("unknown cache strategy '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfiguration {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub cache_strategy: CacheStrategy,
    pub cache_id: Option<String>,          // yard used as cache
    pub access_uri: Option<String>,        // dereferencer endpoint
    pub query_uri: Option<String>,         // searcher endpoint
    pub entity_prefixes: Vec<String>,      // empty: the site accepts any entity id
    pub offline_mode: bool,                // remote services are never contacted
}

impl SiteConfiguration {
    pub fn new(id: impl Into<String>, cache_strategy: CacheStrategy) -> Self {
        SiteConfiguration {
            id: id.into(),
            name: None,
            description: None,
            cache_strategy,
            cache_id: None,
            access_uri: None,
            query_uri: None,
            entity_prefixes: Vec::new(),
            offline_mode: false,
        }
    }

    pub fn with_cache(mut self, cache_id: impl Into<String>) -> Self {
        self.cache_id = Some(cache_id.into());
        self
    }

    pub fn with_access_uri(mut self, uri: impl Into<String>) -> Self {
        self.access_uri = Some(uri.into());
        self
    }

    pub fn with_query_uri(mut self, uri: impl Into<String>) -> Self {
        self.query_uri = Some(uri.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.entity_prefixes.push(prefix.into());
        self
    }

    pub fn offline(mut self) -> Self {
        self.offline_mode = true;
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn has_remote(&self) -> bool {
        self.access_uri.is_some() || self.query_uri.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::new(ErrorKind::Config, "site id must not be empty"));
        }
        let has_cache = self.cache_id.is_some();
        match self.cache_strategy {
            CacheStrategy::None if has_cache => Err(Error::new(
                ErrorKind::Config,
                format!("site '{}': cache strategy none does not permit a cache", self.id),
            )),
            CacheStrategy::None if !self.has_remote() => Err(Error::new(
                ErrorKind::Config,
                format!("site '{}': cache strategy none requires a dereferencer or searcher", self.id),
            )),
            CacheStrategy::Used if !has_cache || !self.has_remote() => Err(Error::new(
                ErrorKind::Config,
                format!("site '{}': cache strategy used requires a cache and a remote service", self.id),
            )),
            CacheStrategy::All if !has_cache => Err(Error::new(
                ErrorKind::Config,
                format!("site '{}': cache strategy all requires a cache", self.id),
            )),
            _ => Ok(()),
        }
    }
}
