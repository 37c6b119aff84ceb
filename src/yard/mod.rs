pub mod index_yard;

pub use index_yard::IndexYard;

use crate::core::error::Result;
use crate::core::types::Representation;
use crate::query::field_query::{FieldQuery, QueryResultList};

/// Storage of representations with query support.
///
/// The three query operations differ in what they return: `find` the
/// selected fields of each match, `find_references` only the ids and
/// `find_representation` complete representations. All of them return
/// the query as it was executed.
pub trait Yard: Send + Sync {
    fn id(&self) -> &str;

    /// The configured name, the id if none is set
    fn name(&self) -> &str;

    fn description(&self) -> Option<&str>;

    /// Adds or replaces the representation
    fn store(&self, representation: Representation) -> Result<Representation>;

    fn store_all(&self, representations: Vec<Representation>) -> Result<Vec<Representation>>;

    /// Replaces a representation; fails with `NotFound` if it is not stored
    fn update(&self, representation: Representation) -> Result<Representation>;

    /// Replaces those representations that are stored and skips the others
    fn update_all(&self, representations: Vec<Representation>) -> Result<Vec<Representation>>;

    fn remove(&self, id: &str) -> Result<()>;

    fn remove_all_ids(&self, ids: &[String]) -> Result<()>;

    /// Removes every representation of this yard
    fn remove_all(&self) -> Result<()>;

    fn get_representation(&self, id: &str) -> Result<Option<Representation>>;

    fn is_representation(&self, id: &str) -> Result<bool>;

    fn find(&self, query: &FieldQuery) -> Result<QueryResultList<Representation>>;

    fn find_references(&self, query: &FieldQuery) -> Result<QueryResultList<String>>;

    fn find_representation(&self, query: &FieldQuery) -> Result<QueryResultList<Representation>>;

    fn optimize(&self) -> Result<()> {
        Ok(())
    }
}
