use crate::core::error::Result;
use crate::core::types::Representation;
use crate::query::field_query::{FieldQuery, QueryResultList};

/// Fetches the representation of a single entity from a remote service
pub trait EntityDereferencer: Send + Sync {
    fn access_uri(&self) -> &str;

    fn dereference(&self, id: &str) -> Result<Option<Representation>>;
}

/// Executes field queries against a remote service
pub trait EntitySearcher: Send + Sync {
    fn query_uri(&self) -> &str;

    /// Ids of the matching entities
    fn find_entities(&self, query: &FieldQuery) -> Result<QueryResultList<String>>;

    /// Matching entities with the selected fields
    fn find(&self, query: &FieldQuery) -> Result<QueryResultList<Representation>>;
}

/// A backend candidate as registered with its service id and ranking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked<T> {
    pub service_id: u64,
    pub ranking: i32,
    pub service: T,
}

impl<T> Ranked<T> {
    pub fn new(service_id: u64, ranking: i32, service: T) -> Self {
        Ranked { service_id, ranking, service }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Selection<'a, T> {
    /// The current backend is still the best candidate
    Keep,
    Switch(&'a Ranked<T>),
    /// No candidate is left
    Clear,
}

/// Picks the active backend among `candidates`: the highest ranking wins,
/// equal rankings go to the lowest service id.
pub fn select_backend<'a, T>(current: Option<&Ranked<T>>, candidates: &'a [Ranked<T>]) -> Selection<'a, T> {
    let best = candidates.iter().min_by(|a, b| {
        b.ranking.cmp(&a.ranking).then(a.service_id.cmp(&b.service_id))
    });
    match (current, best) {
        (None, None) => Selection::Keep,
        (Some(_), None) => Selection::Clear,
        (Some(current), Some(best)) if current.service_id == best.service_id => Selection::Keep,
        (_, Some(best)) => Selection::Switch(best),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_ranking_wins() {
        let candidates = vec![Ranked::new(3, 0, "a"), Ranked::new(7, 10, "b"), Ranked::new(9, 5, "c")];
        assert_eq!(select_backend(None, &candidates), Selection::Switch(&candidates[1]));
    }

    #[test]
    fn ties_go_to_lowest_service_id() {
        let candidates = vec![Ranked::new(12, 1, "a"), Ranked::new(4, 1, "b")];
        assert_eq!(select_backend(None, &candidates), Selection::Switch(&candidates[1]));
    }

    #[test]
    fn current_best_is_kept() {
        let current = Ranked::new(4, 1, "b");
        let candidates = vec![Ranked::new(12, 1, "a"), current.clone()];
        assert_eq!(select_backend(Some(&current), &candidates), Selection::Keep);
    }

    #[test]
    fn no_candidates() {
        let current = Ranked::new(4, 1, "b");
        assert_eq!(select_backend::<&str>(Some(&current), &[]), Selection::Clear);
        assert_eq!(select_backend::<&str>(None, &[]), Selection::Keep);
    }
}
