use std::sync::Arc;
use std::time::Instant;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Representation, Value};
use crate::core::vocab::RESULT_SCORE;
use crate::query::field_query::{FieldQuery, QueryResultList};
use crate::site::backend::{select_backend, EntityDereferencer, EntitySearcher, Ranked, Selection};
use crate::site::config::{CacheStrategy, SiteConfiguration};
use crate::site::entity::Entity;
use crate::site::Site;
use crate::yard::Yard;

/// The backends a site starts with
#[derive(Default, Clone)]
pub struct SiteBackends {
    pub cache: Option<Ranked<Arc<dyn Yard>>>,
    pub dereferencer: Option<Ranked<Arc<dyn EntityDereferencer>>>,
    pub searcher: Option<Ranked<Arc<dyn EntitySearcher>>>,
}

impl SiteBackends {
    pub fn new() -> Self {
        SiteBackends::default()
    }

    pub fn with_cache(mut self, cache: Arc<dyn Yard>) -> Self {
        self.cache = Some(Ranked::new(0, 0, cache));
        self
    }

    pub fn with_dereferencer(mut self, dereferencer: Arc<dyn EntityDereferencer>) -> Self {
        self.dereferencer = Some(Ranked::new(0, 0, dereferencer));
        self
    }

    pub fn with_searcher(mut self, searcher: Arc<dyn EntitySearcher>) -> Self {
        self.searcher = Some(Ranked::new(0, 0, searcher));
        self
    }
}

/// Candidate backends offered to [`ReferencedSite::reconfigure`]
#[derive(Default)]
pub struct BackendCandidates {
    pub caches: Vec<Ranked<Arc<dyn Yard>>>,
    pub dereferencers: Vec<Ranked<Arc<dyn EntityDereferencer>>>,
    pub searchers: Vec<Ranked<Arc<dyn EntitySearcher>>>,
}

fn apply<T: Clone>(slot: &mut Option<Ranked<T>>, candidates: &[Ranked<T>], kind: &str, site: &str) -> bool {
    match select_backend(slot.as_ref(), candidates) {
        Selection::Keep => false,
        Selection::Switch(best) => {
            info!("site {}: switching {} to service {} (ranking {})", site, kind, best.service_id, best.ranking);
            *slot = Some(best.clone());
            true
        }
        Selection::Clear => {
            info!("site {}: no {} available any more", site, kind);
            *slot = None;
            true
        }
    }
}

enum Found {
    Local(QueryResultList<Representation>),
    Remote(QueryResultList<String>),
}

/// A remote entity source combined with an optional local cache.
///
/// The [`CacheStrategy`] decides where reads go:
///
/// ```text
///   strategy  lookup                         query
///   none      dereferencer                   searcher
///   used      cache, then dereferencer (*)   searcher
///   all       cache only                     cache, searcher on cache failure
///
///   (*) entities found remotely are stored in the cache
/// ```
///
/// Offline mode disables both remote services.
pub struct ReferencedSite {
    config: SiteConfiguration,
    backends: RwLock<SiteBackends>,
}

impl ReferencedSite {
    pub fn new(config: SiteConfiguration, backends: SiteBackends) -> Result<Self> {
        config.validate()?;
        let checks = [
            ("cache", config.cache_id.is_some(), backends.cache.is_some()),
            ("dereferencer", config.access_uri.is_some(), backends.dereferencer.is_some()),
            ("searcher", config.query_uri.is_some(), backends.searcher.is_some()),
        ];
        for (kind, configured, supplied) in checks {
            if configured != supplied {
                return Err(Error::new(
                    ErrorKind::Config,
                    format!("site '{}': {} is {} but {}", config.id, kind,
                        if configured { "configured" } else { "not configured" },
                        if supplied { "one was supplied" } else { "none was supplied" }),
                ));
            }
        }
        info!("site {} created (cache strategy {})", config.id, config.cache_strategy);
        Ok(ReferencedSite {
            config,
            backends: RwLock::new(backends),
        })
    }

    /// Swaps the active backends for the best of the offered candidates.
    /// Returns whether any backend changed.
    pub fn reconfigure(&self, candidates: &BackendCandidates) -> bool {
        let site = self.config.id.as_str();
        let mut backends = self.backends.write();
        let mut changed = false;
        if self.config.cache_strategy != CacheStrategy::None {
            changed |= apply(&mut backends.cache, &candidates.caches, "cache", site);
        }
        if self.config.access_uri.is_some() {
            changed |= apply(&mut backends.dereferencer, &candidates.dereferencers, "dereferencer", site);
        }
        if self.config.query_uri.is_some() {
            changed |= apply(&mut backends.searcher, &candidates.searchers, "searcher", site);
        }
        changed
    }

    fn cache(&self) -> Option<Arc<dyn Yard>> {
        self.backends.read().cache.as_ref().map(|r| r.service.clone())
    }

    fn dereferencer(&self) -> Option<Arc<dyn EntityDereferencer>> {
        if self.config.offline_mode {
            return None;
        }
        self.backends.read().dereferencer.as_ref().map(|r| r.service.clone())
    }

    fn searcher(&self) -> Option<Arc<dyn EntitySearcher>> {
        if self.config.offline_mode {
            return None;
        }
        self.backends.read().searcher.as_ref().map(|r| r.service.clone())
    }

    fn site_error(&self, context: String, cause: Option<Error>) -> Error {
        match cause {
            Some(cause) => Error::new(ErrorKind::Site, format!("site {}: {}: {}", self.config.id, context, cause)),
            None => Error::new(ErrorKind::Site, format!("site {}: {}", self.config.id, context)),
        }
    }

    fn offline_error(&self, context: String) -> Error {
        Error::new(ErrorKind::Offline, format!("site {} is offline: {}", self.config.id, context))
    }

    /// Runs a query on the cache when the strategy is `all`, and on the
    /// remote searcher otherwise or when the cache fails.
    fn query<R>(
        &self,
        on_cache: impl FnOnce(&dyn Yard) -> Result<R>,
        on_remote: impl FnOnce(&dyn EntitySearcher) -> Result<R>,
    ) -> Result<R> {
        let searcher = self.searcher();
        if self.config.cache_strategy == CacheStrategy::All {
            match self.cache() {
                Some(cache) => match on_cache(cache.as_ref()) {
                    Ok(results) => return Ok(results),
                    Err(err) if searcher.is_some() => {
                        warn!("site {}: query on cache failed, falling back to the remote site: {}", self.config.id, err);
                    }
                    Err(err) => return Err(self.site_error("query on cache failed".into(), Some(err))),
                },
                None if searcher.is_some() => {
                    warn!("site {}: cache not active, querying the remote site", self.config.id);
                }
                None => return Err(self.site_error("cache is not active".into(), None)),
            }
        }
        let searcher = searcher.ok_or_else(|| {
            if self.config.offline_mode {
                self.offline_error("remote queries are disabled".into())
            } else {
                self.site_error("no searcher available".into(), None)
            }
        })?;
        on_remote(searcher.as_ref())
            .map_err(|err| self.site_error(format!("query on {} failed", searcher.query_uri()), Some(err)))
    }

    /// Looks up every id found by the remote searcher. The score of an
    /// entity is the number of results minus its position. Failed lookups
    /// are skipped unless all of them fail.
    fn dereference_all(&self, ids: QueryResultList<String>) -> Result<QueryResultList<Entity>> {
        let total = ids.len();
        let mut entities = Vec::with_capacity(total);
        let mut errors = 0;
        let mut last_error = None;
        for (pos, id) in ids.results.iter().enumerate() {
            match self.get_entity(id) {
                Ok(Some(mut entity)) => {
                    entity.representation.set(RESULT_SCORE, Value::Float((total - pos) as f32));
                    entities.push(entity);
                }
                Ok(None) => warn!("site {}: no representation for query result {}", self.config.id, id),
                Err(err) => {
                    errors += 1;
                    warn!("site {}: unable to get {} ({} of {} results failed): {}", self.config.id, id, errors, total, err);
                    last_error = Some(err);
                }
            }
        }
        if let Some(err) = last_error {
            if entities.is_empty() {
                return Err(self.site_error("unable to get any entity selected by the query".into(), Some(err)));
            }
            warn!("site {}: {}/{} selected entities could not be loaded", self.config.id, errors, total);
        }
        Ok(QueryResultList::new(ids.query, entities))
    }

    fn cache_remote(&self, cache: Option<&Arc<dyn Yard>>, representation: Representation) -> Entity {
        let Some(cache) = cache else {
            return Entity::new(representation, &self.config.id, Some(false));
        };
        let start = Instant::now();
        match cache.store(representation.clone()) {
            Ok(stored) => {
                debug!("site {}: cached {} in {:?}", self.config.id, stored.id, start.elapsed());
                Entity::new(stored, &self.config.id, Some(true))
            }
            Err(err) => {
                warn!("site {}: unable to cache {}: {}", self.config.id, representation.id, err);
                Entity::new(representation, &self.config.id, Some(false))
            }
        }
    }
}

impl Site for ReferencedSite {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn configuration(&self) -> &SiteConfiguration {
        &self.config
    }

    fn get_entity(&self, id: &str) -> Result<Option<Entity>> {
        if id.trim().is_empty() {
            return Err(Error::invalid_argument("the entity id must not be empty"));
        }
        let strategy = self.config.cache_strategy;
        let dereferencer = self.dereferencer();
        let cache = match strategy {
            CacheStrategy::None => None,
            _ => self.cache(),
        };

        if strategy != CacheStrategy::None {
            match &cache {
                Some(yard) => match yard.get_representation(id) {
                    Ok(Some(rep)) => return Ok(Some(Entity::new(rep, &self.config.id, Some(true)))),
                    Ok(None) if strategy == CacheStrategy::All => return Ok(None),
                    Ok(None) if self.config.offline_mode => {
                        return Err(self.offline_error(format!("{} is not cached", id)));
                    }
                    Ok(None) => {}
                    Err(err) if strategy == CacheStrategy::Used && dereferencer.is_some() => {
                        warn!("site {}: cache lookup of {} failed, dereferencing remotely: {}", self.config.id, id, err);
                    }
                    Err(err) => return Err(self.site_error(format!("cache lookup of {} failed", id), Some(err))),
                },
                None if strategy == CacheStrategy::Used && dereferencer.is_some() => {
                    warn!("site {}: cache not active, dereferencing {} remotely", self.config.id, id);
                }
                None => return Err(self.site_error(format!("cache not active for lookup of {}", id), None)),
            }
        }

        let dereferencer = dereferencer.ok_or_else(|| {
            if self.config.offline_mode {
                self.offline_error(format!("{} cannot be dereferenced", id))
            } else {
                self.site_error("no dereferencer available".into(), None)
            }
        })?;
        let representation = dereferencer
            .dereference(id)
            .map_err(|err| self.site_error(format!("dereferencing {} from {} failed", id, dereferencer.access_uri()), Some(err)))?;
        Ok(representation.map(|rep| self.cache_remote(cache.as_ref(), rep)))
    }

    fn find_references(&self, query: &FieldQuery) -> Result<QueryResultList<String>> {
        self.query(|cache| cache.find_references(query), |searcher| searcher.find_entities(query))
    }

    fn find(&self, query: &FieldQuery) -> Result<QueryResultList<Representation>> {
        self.query(|cache| cache.find(query), |searcher| searcher.find(query))
    }

    fn find_entities(&self, query: &FieldQuery) -> Result<QueryResultList<Entity>> {
        let found = self.query(
            |cache| cache.find_representation(query).map(Found::Local),
            |searcher| searcher.find_entities(query).map(Found::Remote),
        )?;
        match found {
            Found::Local(found) => {
                let entities = found
                    .results
                    .into_iter()
                    .map(|rep| Entity::new(rep, &self.config.id, Some(true)))
                    .collect();
                Ok(QueryResultList::new(found.query, entities))
            }
            Found::Remote(ids) => self.dereference_all(ids),
        }
    }

    fn supports_local_mode(&self) -> bool {
        self.config.cache_strategy == CacheStrategy::All && self.cache().is_some()
    }

    fn supports_search(&self) -> bool {
        self.supports_local_mode() || self.searcher().is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use parking_lot::Mutex;
    use super::*;
    use crate::core::config::YardConfig;
    use crate::store::{DocumentStore, InputDocument, MemoryStore, StoreQuery, StoreResponse};
    use crate::yard::IndexYard;

    const LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";

    /// Store that can be switched off
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        down: AtomicBool,
    }

    impl FlakyStore {
        fn check(&self) -> Result<()> {
            if self.down.load(Ordering::SeqCst) {
                return Err(Error::store("connection refused"));
            }
            Ok(())
        }
    }

    impl DocumentStore for FlakyStore {
        fn add(&self, docs: Vec<InputDocument>, commit_within: Option<Duration>) -> Result<()> {
            self.check()?;
            self.inner.add(docs, commit_within)
        }

        fn delete_by_ids(&self, ids: &[String]) -> Result<()> {
            self.check()?;
            self.inner.delete_by_ids(ids)
        }

        fn delete_by_query(&self, query: &str) -> Result<()> {
            self.check()?;
            self.inner.delete_by_query(query)
        }

        fn query(&self, query: &StoreQuery) -> Result<StoreResponse> {
            self.check()?;
            self.inner.query(query)
        }

        fn commit(&self) -> Result<()> {
            self.check()?;
            self.inner.commit()
        }
    }

    #[derive(Default)]
    struct Remote {
        entities: Mutex<BTreeMap<String, Representation>>,
        lookups: AtomicUsize,
        down: AtomicBool,
    }

    impl Remote {
        fn with(ids: &[&str]) -> Arc<Remote> {
            let remote = Remote::default();
            for id in ids {
                let mut rep = Representation::new(*id);
                rep.add(LABEL, Value::text(id.trim_start_matches("urn:zoo:"), Some("en")));
                remote.entities.lock().insert(id.to_string(), rep);
            }
            Arc::new(remote)
        }

        fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    impl EntityDereferencer for Remote {
        fn access_uri(&self) -> &str {
            "http://remote.example.org/entity/"
        }

        fn dereference(&self, id: &str) -> Result<Option<Representation>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.down.load(Ordering::SeqCst) {
                return Err(Error::new(ErrorKind::Io, "remote timed out"));
            }
            Ok(self.entities.lock().get(id).cloned())
        }
    }

    impl EntitySearcher for Remote {
        fn query_uri(&self) -> &str {
            "http://remote.example.org/query"
        }

        fn find_entities(&self, query: &FieldQuery) -> Result<QueryResultList<String>> {
            Ok(QueryResultList::new(query.clone(), self.entities.lock().keys().cloned().collect()))
        }

        fn find(&self, query: &FieldQuery) -> Result<QueryResultList<Representation>> {
            Ok(QueryResultList::new(query.clone(), self.entities.lock().values().cloned().collect()))
        }
    }

    fn cache() -> (Arc<dyn Yard>, Arc<FlakyStore>) {
        let store = Arc::new(FlakyStore::default());
        let yard = IndexYard::new(YardConfig::new("zoo-cache"), store.clone()).unwrap();
        (Arc::new(yard), store)
    }

    fn used_site(remote: &Arc<Remote>, cache: Arc<dyn Yard>, offline: bool) -> ReferencedSite {
        let mut config = SiteConfiguration::new("zoo", CacheStrategy::Used)
            .with_cache("zoo-cache")
            .with_access_uri(remote.access_uri());
        config.offline_mode = offline;
        let backends = SiteBackends::new().with_cache(cache).with_dereferencer(remote.clone());
        ReferencedSite::new(config, backends).unwrap()
    }

    fn all_site(remote: Option<&Arc<Remote>>, cache: Arc<dyn Yard>) -> ReferencedSite {
        let mut config = SiteConfiguration::new("zoo", CacheStrategy::All).with_cache("zoo-cache");
        let mut backends = SiteBackends::new().with_cache(cache);
        if let Some(remote) = remote {
            config = config.with_access_uri(remote.access_uri()).with_query_uri(remote.query_uri());
            backends = backends.with_dereferencer(remote.clone()).with_searcher(remote.clone());
        }
        ReferencedSite::new(config, backends).unwrap()
    }

    #[test]
    fn used_cache_is_warmed_by_remote_lookups() {
        let remote = Remote::with(&["urn:zoo:cat"]);
        let (cache, _) = cache();
        let site = used_site(&remote, cache.clone(), false);

        let entity = site.get_entity("urn:zoo:cat").unwrap().unwrap();
        assert_eq!(entity.is_cached(), Some(true));
        assert_eq!(entity.site_id, "zoo");
        assert!(cache.get_representation("urn:zoo:cat").unwrap().is_some());

        let again = site.get_entity("urn:zoo:cat").unwrap().unwrap();
        assert_eq!(again.is_cached(), Some(true));
        assert_eq!(remote.lookups(), 1);
        assert_eq!(site.get_entity("urn:zoo:dog").unwrap(), None);
    }

    #[test]
    fn used_cache_failure_falls_back_to_remote() {
        let remote = Remote::with(&["urn:zoo:cat"]);
        let (cache, store) = cache();
        store.down.store(true, Ordering::SeqCst);
        let site = used_site(&remote, cache, false);

        let entity = site.get_entity("urn:zoo:cat").unwrap().unwrap();
        assert_eq!(entity.is_cached(), Some(false));
        assert_eq!(remote.lookups(), 1);
    }

    #[test]
    fn offline_site_surfaces_cache_failures() {
        let remote = Remote::with(&["urn:zoo:cat"]);
        let (cache, store) = cache();
        let site = used_site(&remote, cache.clone(), true);
        // a miss is not reported as "not found" while the remote is unreachable
        assert_eq!(site.get_entity("urn:zoo:cat").unwrap_err().kind, ErrorKind::Offline);
        assert_eq!(site.find(&FieldQuery::new()).unwrap_err().kind, ErrorKind::Offline);

        let mut cat = Representation::new("urn:zoo:cat");
        cat.add(LABEL, Value::text("cat", Some("en")));
        cache.store(cat).unwrap();
        assert_eq!(site.get_entity("urn:zoo:cat").unwrap().unwrap().is_cached(), Some(true));

        store.down.store(true, Ordering::SeqCst);
        let err = site.get_entity("urn:zoo:cat").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Site);
        assert_eq!(remote.lookups(), 0);
    }

    #[test]
    fn remote_errors_are_site_errors() {
        let remote = Remote::with(&["urn:zoo:cat"]);
        remote.down.store(true, Ordering::SeqCst);
        let (cache, _) = cache();
        let site = used_site(&remote, cache, false);
        assert!(site.get_entity("urn:zoo:cat").unwrap_err().is(ErrorKind::Site));
        assert!(site.get_entity(" ").unwrap_err().is(ErrorKind::InvalidArgument));
    }

    #[test]
    fn all_cache_is_authoritative_for_lookups() {
        let remote = Remote::with(&["urn:zoo:cat"]);
        let (cache, store) = cache();
        let site = all_site(Some(&remote), cache);
        assert_eq!(site.get_entity("urn:zoo:cat").unwrap(), None);

        store.down.store(true, Ordering::SeqCst);
        assert!(site.get_entity("urn:zoo:cat").is_err());
        assert_eq!(remote.lookups(), 0);
    }

    #[test]
    fn all_queries_use_the_cache() {
        let (cache, _) = cache();
        let mut rep = Representation::new("urn:zoo:cat");
        rep.add(LABEL, Value::text("cat", Some("en")));
        cache.store(rep).unwrap();
        let site = all_site(None, cache);
        assert!(site.supports_local_mode());
        assert!(site.supports_search());

        let entities = site.find_entities(&FieldQuery::new()).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities.results[0].is_cached(), Some(true));
        assert_eq!(site.find_references(&FieldQuery::new()).unwrap().results, vec!["urn:zoo:cat".to_string()]);
    }

    #[test]
    fn all_failing_cache_without_searcher_is_an_error() {
        let (cache, store) = cache();
        store.down.store(true, Ordering::SeqCst);
        let site = all_site(None, cache);
        assert!(site.find(&FieldQuery::new()).unwrap_err().is(ErrorKind::Site));
        assert!(site.get_entity("urn:zoo:cat").unwrap_err().is(ErrorKind::Site));
    }

    #[test]
    fn all_failing_cache_queries_fall_back_to_searcher() {
        let remote = Remote::with(&["urn:zoo:cat", "urn:zoo:dog"]);
        let (cache, store) = cache();
        store.down.store(true, Ordering::SeqCst);
        let site = all_site(Some(&remote), cache);
        assert_eq!(site.find(&FieldQuery::new()).unwrap().len(), 2);
    }

    #[test]
    fn remote_find_entities_scores_by_position() {
        let remote = Remote::with(&["urn:zoo:cat", "urn:zoo:dog"]);
        let config = SiteConfiguration::new("zoo", CacheStrategy::None)
            .with_access_uri(remote.access_uri())
            .with_query_uri(remote.query_uri());
        let backends = SiteBackends::new().with_dereferencer(remote.clone()).with_searcher(remote.clone());
        let site = ReferencedSite::new(config, backends).unwrap();
        assert!(!site.supports_local_mode());

        let entities = site.find_entities(&FieldQuery::new()).unwrap();
        let scores: Vec<_> = entities
            .iter()
            .map(|e| (e.id().to_string(), e.representation.first(RESULT_SCORE).cloned()))
            .collect();
        assert_eq!(scores, vec![
            ("urn:zoo:cat".to_string(), Some(Value::Float(2.0))),
            ("urn:zoo:dog".to_string(), Some(Value::Float(1.0))),
        ]);
        assert_eq!(entities.results[0].is_cached(), Some(false));
    }

    #[test]
    fn backends_must_match_configuration() {
        let remote = Remote::with(&[]);
        let config = SiteConfiguration::new("zoo", CacheStrategy::None).with_access_uri(remote.access_uri());
        let err = ReferencedSite::new(config.clone(), SiteBackends::new().with_searcher(remote.clone()))
            .err()
            .unwrap();
        assert_eq!(err.kind, ErrorKind::Config);
        assert!(ReferencedSite::new(config, SiteBackends::new().with_dereferencer(remote)).is_ok());
    }

    #[test]
    fn reconfigure_swaps_to_the_best_dereferencer() {
        let first = Remote::with(&[]);
        let second = Remote::with(&["urn:zoo:cat"]);
        let config = SiteConfiguration::new("zoo", CacheStrategy::None).with_access_uri(first.access_uri());
        let site = ReferencedSite::new(config, SiteBackends::new().with_dereferencer(first.clone())).unwrap();
        assert_eq!(site.get_entity("urn:zoo:cat").unwrap(), None);

        let candidates = BackendCandidates {
            dereferencers: vec![
                Ranked::new(1, 0, first.clone() as Arc<dyn EntityDereferencer>),
                Ranked::new(2, 5, second.clone() as Arc<dyn EntityDereferencer>),
            ],
            ..Default::default()
        };
        assert!(site.reconfigure(&candidates));
        assert!(!site.reconfigure(&candidates));
        assert!(site.get_entity("urn:zoo:cat").unwrap().is_some());
        assert_eq!(second.lookups(), 1);

        assert!(site.reconfigure(&BackendCandidates::default()));
        assert!(site.get_entity("urn:zoo:cat").unwrap_err().is(ErrorKind::Site));
    }
}
