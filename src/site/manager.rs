use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;
use parking_lot::RwLock;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Representation;
use crate::query::field_query::{FieldQuery, QueryResultList};
use crate::site::entity::Entity;
use crate::site::Site;

#[derive(Default)]
struct Registry {
    sites: Vec<Arc<dyn Site>>,
    by_prefix: BTreeMap<String, Vec<Arc<dyn Site>>>,
    // sites without entity prefixes are asked for every id
    unprefixed: Vec<Arc<dyn Site>>,
}

/// Federates lookups and queries over all registered sites.
///
/// Queries run on all searchable sites in parallel. Results are merged in
/// registration order: an entity returned by more than one site is taken
/// from the first site only. A failing site contributes no results.
pub struct SiteManager {
    registry: RwLock<Registry>,
}

impl Default for SiteManager {
    fn default() -> Self {
        SiteManager::new()
    }
}

impl SiteManager {
    pub fn new() -> Self {
        SiteManager {
            registry: RwLock::new(Registry::default()),
        }
    }

    pub fn add_site(&self, site: Arc<dyn Site>) -> Result<()> {
        let mut registry = self.registry.write();
        if registry.sites.iter().any(|s| s.id() == site.id()) {
            return Err(Error::new(ErrorKind::Config, format!("site '{}' is already registered", site.id())));
        }
        let prefixes = &site.configuration().entity_prefixes;
        if prefixes.is_empty() {
            registry.unprefixed.push(site.clone());
        } else {
            for prefix in prefixes {
                registry.by_prefix.entry(prefix.clone()).or_default().push(site.clone());
            }
        }
        info!("registered site {} (prefixes {:?})", site.id(), prefixes);
        registry.sites.push(site);
        Ok(())
    }

    pub fn remove_site(&self, id: &str) -> Option<Arc<dyn Site>> {
        let mut registry = self.registry.write();
        let pos = registry.sites.iter().position(|s| s.id() == id)?;
        let site = registry.sites.remove(pos);
        registry.unprefixed.retain(|s| s.id() != id);
        registry.by_prefix.retain(|_, sites| {
            sites.retain(|s| s.id() != id);
            !sites.is_empty()
        });
        info!("removed site {}", id);
        Some(site)
    }

    pub fn site(&self, id: &str) -> Option<Arc<dyn Site>> {
        self.registry.read().sites.iter().find(|s| s.id() == id).cloned()
    }

    pub fn site_ids(&self) -> Vec<String> {
        self.registry.read().sites.iter().map(|s| s.id().to_string()).collect()
    }

    pub fn is_referred(&self, id: &str) -> bool {
        self.site(id).is_some()
    }

    /// Sites that may know the entity: those registered for the longest
    /// prefix sorting at or before the id, if the id starts with it,
    /// followed by the sites without prefixes
    pub fn sites_for_entity(&self, entity_id: &str) -> Vec<Arc<dyn Site>> {
        let registry = self.registry.read();
        let mut sites = Vec::new();
        let nearest = registry
            .by_prefix
            .range::<str, _>((Bound::Unbounded, Bound::Included(entity_id)))
            .next_back();
        if let Some((prefix, prefixed)) = nearest {
            if entity_id.starts_with(prefix.as_str()) {
                debug!("prefix {} matches entity {}", prefix, entity_id);
                sites.extend(prefixed.iter().cloned());
            }
        }
        sites.extend(registry.unprefixed.iter().cloned());
        sites
    }

    /// The entity from the first routed site that knows it
    pub fn get_entity(&self, entity_id: &str) -> Option<Entity> {
        let sites = self.sites_for_entity(entity_id);
        if sites.is_empty() {
            info!("no site registered for entity {}", entity_id);
            return None;
        }
        for site in &sites {
            match site.get_entity(entity_id) {
                Ok(Some(entity)) => {
                    debug!("entity {} returned by site {}", entity_id, site.id());
                    return Some(entity);
                }
                Ok(None) => {}
                Err(err) => warn!("unable to access site {}: {}", site.id(), err),
            }
        }
        debug!("entity {} not found on any of {} sites", entity_id, sites.len());
        None
    }

    pub fn find_ids(&self, query: &FieldQuery) -> QueryResultList<String> {
        let results = self.query_all(|site| site.find_references(query));
        merge(query, results, |id| id.as_str())
    }

    pub fn find(&self, query: &FieldQuery) -> QueryResultList<Representation> {
        let results = self.query_all(|site| site.find(query));
        merge(query, results, |rep| rep.id.as_str())
    }

    pub fn find_entities(&self, query: &FieldQuery) -> QueryResultList<Entity> {
        let results = self.query_all(|site| site.find_entities(query));
        merge(query, results, |entity| entity.id())
    }

    /// Runs `op` on every searchable site; failures are logged and dropped
    fn query_all<T, F>(&self, op: F) -> Vec<(String, QueryResultList<T>)>
    where
        T: Send,
        F: Fn(&dyn Site) -> Result<QueryResultList<T>> + Sync,
    {
        let sites = self.registry.read().sites.clone();
        sites
            .par_iter()
            .filter_map(|site| {
                if !site.supports_search() {
                    debug!("site {} does not support queries", site.id());
                    return None;
                }
                match op(site.as_ref()) {
                    Ok(results) => Some((site.id().to_string(), results)),
                    Err(err) => {
                        warn!("unable to query site {}: {}", site.id(), err);
                        None
                    }
                }
            })
            .collect()
    }
}

/// First site wins. The returned query is the one executed by the first
/// site with results, else by the first site that answered.
fn merge<T>(
    query: &FieldQuery,
    site_results: Vec<(String, QueryResultList<T>)>,
    id_of: impl Fn(&T) -> &str,
) -> QueryResultList<T> {
    let mut executed: Option<FieldQuery> = None;
    let mut with_results: Option<FieldQuery> = None;
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for (site_id, results) in site_results {
        if executed.is_none() {
            executed = Some(results.query.clone());
        }
        if with_results.is_none() && !results.is_empty() {
            with_results = Some(results.query.clone());
        }
        for item in results.results {
            if seen.insert(id_of(&item).to_string()) {
                merged.push(item);
            } else {
                info!("entity {} found on more than one site, ignoring the one of site {}", id_of(&item), site_id);
            }
        }
    }
    let query = with_results.or(executed).unwrap_or_else(|| query.clone());
    QueryResultList::new(query, merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::config::{CacheStrategy, SiteConfiguration};

    struct FixedSite {
        config: SiteConfiguration,
        ids: Vec<&'static str>,
        fail: bool,
    }

    impl FixedSite {
        fn new(id: &str, ids: Vec<&'static str>) -> Arc<dyn Site> {
            Arc::new(FixedSite { config: SiteConfiguration::new(id, CacheStrategy::None), ids, fail: false })
        }

        fn failing(id: &str) -> Arc<dyn Site> {
            Arc::new(FixedSite { config: SiteConfiguration::new(id, CacheStrategy::None), ids: vec![], fail: true })
        }

        fn with_prefix(id: &str, prefix: &str, ids: Vec<&'static str>) -> Arc<dyn Site> {
            let config = SiteConfiguration::new(id, CacheStrategy::None).with_prefix(prefix);
            Arc::new(FixedSite { config, ids, fail: false })
        }

        fn check(&self) -> Result<()> {
            if self.fail {
                return Err(Error::new(ErrorKind::Site, format!("{} is down", self.config.id)));
            }
            Ok(())
        }

        fn executed(&self) -> FieldQuery {
            let mut query = FieldQuery::new();
            query.limit = Some(self.ids.len());
            query
        }
    }

    impl Site for FixedSite {
        fn id(&self) -> &str {
            &self.config.id
        }

        fn configuration(&self) -> &SiteConfiguration {
            &self.config
        }

        fn get_entity(&self, id: &str) -> Result<Option<Entity>> {
            self.check()?;
            Ok(self.ids.contains(&id).then(|| Entity::new(Representation::new(id), &self.config.id, Some(false))))
        }

        fn find_references(&self, _query: &FieldQuery) -> Result<QueryResultList<String>> {
            self.check()?;
            Ok(QueryResultList::new(self.executed(), self.ids.iter().map(|s| s.to_string()).collect()))
        }

        fn find(&self, _query: &FieldQuery) -> Result<QueryResultList<Representation>> {
            self.check()?;
            let mut reps = Vec::new();
            for id in &self.ids {
                let mut rep = Representation::new(*id);
                rep.add("http://example.org/source", self.config.id.as_str());
                reps.push(rep);
            }
            Ok(QueryResultList::new(self.executed(), reps))
        }

        fn find_entities(&self, query: &FieldQuery) -> Result<QueryResultList<Entity>> {
            let found = self.find(query)?;
            let entities = found.results.into_iter().map(|rep| Entity::new(rep, &self.config.id, None)).collect();
            Ok(QueryResultList::new(found.query, entities))
        }

        fn supports_local_mode(&self) -> bool {
            false
        }

        fn supports_search(&self) -> bool {
            true
        }
    }

    fn manager(sites: Vec<Arc<dyn Site>>) -> SiteManager {
        let manager = SiteManager::new();
        for site in sites {
            manager.add_site(site).unwrap();
        }
        manager
    }

    #[test]
    fn first_site_wins_on_duplicates() {
        let manager = manager(vec![
            FixedSite::new("a", vec!["urn:1", "urn:2"]),
            FixedSite::new("b", vec!["urn:2", "urn:3"]),
        ]);
        let found = manager.find(&FieldQuery::new());
        let ids: Vec<&str> = found.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["urn:1", "urn:2", "urn:3"]);
        assert_eq!(found.results[1].first("http://example.org/source"), Some(&"a".into()));

        let entities = manager.find_entities(&FieldQuery::new());
        assert_eq!(entities.results[1].site_id, "a");
        assert_eq!(manager.find_ids(&FieldQuery::new()).len(), 3);
    }

    #[test]
    fn failing_site_contributes_nothing() {
        let manager = manager(vec![FixedSite::failing("down"), FixedSite::new("up", vec!["urn:1"])]);
        let found = manager.find_ids(&FieldQuery::new());
        assert_eq!(found.results, vec!["urn:1".to_string()]);
        assert_eq!(found.query.limit, Some(1));
        assert_eq!(manager.get_entity("urn:1").map(|e| e.site_id), Some("up".to_string()));
    }

    #[test]
    fn executed_query_of_first_site_with_results() {
        let manager = manager(vec![FixedSite::new("empty", vec![]), FixedSite::new("full", vec!["urn:1", "urn:2"])]);
        assert_eq!(manager.find(&FieldQuery::new()).query.limit, Some(2));

        let nothing = SiteManager::new();
        let mut query = FieldQuery::new();
        query.offset = 5;
        assert_eq!(nothing.find(&query).query.offset, 5);
    }

    #[test]
    fn entities_are_routed_by_prefix() {
        let manager = manager(vec![
            FixedSite::with_prefix("dbpedia", "http://dbpedia.org/resource/", vec!["http://dbpedia.org/resource/Paris"]),
            FixedSite::with_prefix("geonames", "http://sws.geonames.org/", vec!["http://dbpedia.org/resource/Paris"]),
            FixedSite::new("any", vec![]),
        ]);
        let routed: Vec<String> = manager
            .sites_for_entity("http://dbpedia.org/resource/Paris")
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        assert_eq!(routed, vec!["dbpedia", "any"]);
        assert_eq!(manager.sites_for_entity("urn:x").len(), 1);
        // the prefix itself is routed, an id sorting right after it is not
        assert_eq!(manager.sites_for_entity("http://sws.geonames.org/").len(), 2);
        assert_eq!(manager.sites_for_entity("http://dbpedia.org/resourceX").len(), 1);
        assert_eq!(manager.get_entity("http://dbpedia.org/resource/Paris").unwrap().site_id, "dbpedia");
    }

    #[test]
    fn registration() {
        let manager = manager(vec![FixedSite::with_prefix("dbpedia", "http://dbpedia.org/", vec![])]);
        assert!(manager.add_site(FixedSite::new("dbpedia", vec![])).is_err());
        assert!(manager.is_referred("dbpedia"));
        assert!(manager.remove_site("dbpedia").is_some());
        assert!(manager.site_ids().is_empty());
        assert!(manager.sites_for_entity("http://dbpedia.org/x").is_empty());
    }
}
