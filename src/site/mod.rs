pub mod config;
pub mod entity;
pub mod backend;
pub mod referenced;
pub mod manager;

pub use backend::{select_backend, EntityDereferencer, EntitySearcher, Ranked, Selection};
pub use config::{CacheStrategy, SiteConfiguration};
pub use entity::Entity;
pub use manager::SiteManager;
pub use referenced::{BackendCandidates, ReferencedSite, SiteBackends};

use crate::core::error::Result;
use crate::core::types::Representation;
use crate::query::field_query::{FieldQuery, QueryResultList};

/// A source of entities managed by the [`SiteManager`]
pub trait Site: Send + Sync {
    fn id(&self) -> &str;

    fn configuration(&self) -> &SiteConfiguration;

    fn get_entity(&self, id: &str) -> Result<Option<Entity>>;

    fn find_references(&self, query: &FieldQuery) -> Result<QueryResultList<String>>;

    fn find(&self, query: &FieldQuery) -> Result<QueryResultList<Representation>>;

    fn find_entities(&self, query: &FieldQuery) -> Result<QueryResultList<Entity>>;

    /// Whether the site answers every request from local data
    fn supports_local_mode(&self) -> bool;

    fn supports_search(&self) -> bool;
}
