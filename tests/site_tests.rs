use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use entityhub::core::config::YardConfig;
use entityhub::query::{Constraint, FieldQuery, QueryResultList, TextConstraint};
use entityhub::site::{
    CacheStrategy, EntityDereferencer, EntitySearcher, ReferencedSite, SiteBackends, SiteConfiguration,
    SiteManager,
};
use entityhub::store::MemoryStore;
use entityhub::yard::{IndexYard, Yard};
use entityhub::{Representation, Result, Value};

const LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
const DBPEDIA: &str = "http://dbpedia.org/resource/";
const GEONAMES: &str = "http://sws.geonames.org/";

fn place(id: &str, label: &str) -> Representation {
    let mut rep = Representation::new(id);
    rep.add(LABEL, Value::text(label, Some("en")));
    rep
}

fn yard(id: &str) -> Arc<IndexYard> {
    Arc::new(IndexYard::new(YardConfig::new(id), Arc::new(MemoryStore::new())).unwrap())
}

#[derive(Default)]
struct GeonamesService {
    places: Mutex<BTreeMap<String, Representation>>,
    lookups: AtomicUsize,
}

impl EntityDereferencer for GeonamesService {
    fn access_uri(&self) -> &str {
        "http://sws.geonames.org/"
    }

    fn dereference(&self, id: &str) -> Result<Option<Representation>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.places.lock().get(id).cloned())
    }
}

impl EntitySearcher for GeonamesService {
    fn query_uri(&self) -> &str {
        "http://api.geonames.org/search"
    }

    fn find_entities(&self, query: &FieldQuery) -> Result<QueryResultList<String>> {
        Ok(QueryResultList::new(query.clone(), self.places.lock().keys().cloned().collect()))
    }

    fn find(&self, query: &FieldQuery) -> Result<QueryResultList<Representation>> {
        Ok(QueryResultList::new(query.clone(), self.places.lock().values().cloned().collect()))
    }
}

struct Hub {
    manager: SiteManager,
    geonames: Arc<GeonamesService>,
    geonames_cache: Arc<IndexYard>,
}

fn hub() -> Hub {
    let dbpedia_cache = yard("dbpedia-cache");
    dbpedia_cache
        .store_all(vec![
            place("http://dbpedia.org/resource/Paris", "Paris"),
            place("http://dbpedia.org/resource/Berlin", "Berlin"),
        ])
        .unwrap();
    let dbpedia = ReferencedSite::new(
        SiteConfiguration::new("dbpedia", CacheStrategy::All)
            .with_cache("dbpedia-cache")
            .with_prefix(DBPEDIA),
        SiteBackends::new().with_cache(dbpedia_cache),
    )
    .unwrap();

    let geonames = Arc::new(GeonamesService::default());
    geonames.places.lock().insert(
        "http://sws.geonames.org/2988507/".to_string(),
        place("http://sws.geonames.org/2988507/", "Paris"),
    );
    let geonames_cache = yard("geonames-cache");
    let geonames_site = ReferencedSite::new(
        SiteConfiguration::new("geonames", CacheStrategy::Used)
            .with_cache("geonames-cache")
            .with_access_uri(geonames.access_uri())
            .with_query_uri(geonames.query_uri())
            .with_prefix(GEONAMES),
        SiteBackends::new()
            .with_cache(geonames_cache.clone())
            .with_dereferencer(geonames.clone())
            .with_searcher(geonames.clone()),
    )
    .unwrap();

    let manager = SiteManager::new();
    manager.add_site(Arc::new(dbpedia)).unwrap();
    manager.add_site(Arc::new(geonames_site)).unwrap();
    Hub { manager, geonames, geonames_cache }
}

#[test]
fn lookups_are_routed_by_prefix() {
    let hub = hub();
    let paris = hub.manager.get_entity("http://dbpedia.org/resource/Paris").unwrap();
    assert_eq!(paris.site_id, "dbpedia");
    assert_eq!(paris.is_cached(), Some(true));
    assert_eq!(hub.manager.sites_for_entity("http://sws.geonames.org/1/").len(), 1);
    assert!(hub.manager.sites_for_entity("urn:unknown").is_empty());
    assert!(hub.manager.get_entity("http://dbpedia.org/resource/Rome").is_none());
}

#[test]
fn used_cache_is_filled_on_first_lookup() {
    let hub = hub();
    let id = "http://sws.geonames.org/2988507/";
    assert!(!hub.geonames_cache.is_representation(id).unwrap());

    let first = hub.manager.get_entity(id).unwrap();
    assert_eq!(first.site_id, "geonames");
    assert_eq!(hub.geonames.lookups.load(Ordering::SeqCst), 1);
    assert!(hub.geonames_cache.is_representation(id).unwrap());

    let second = hub.manager.get_entity(id).unwrap();
    assert_eq!(second.is_cached(), Some(true));
    assert_eq!(second.representation.texts(LABEL, &["en"]).count(), 1);
    assert_eq!(hub.geonames.lookups.load(Ordering::SeqCst), 1);
}

#[test]
fn queries_merge_the_results_of_all_sites() {
    let hub = hub();
    let mut query = FieldQuery::new();
    query.set_constraint(LABEL, Constraint::Text(TextConstraint::new(["Paris"])));
    let ids = hub.manager.find_ids(&query);
    assert_eq!(
        ids.results,
        vec!["http://dbpedia.org/resource/Paris".to_string(), "http://sws.geonames.org/2988507/".to_string()]
    );
    // the executed query of the cache yard carries the default limit
    assert_eq!(ids.query.limit, Some(10));

    let entities = hub.manager.find_entities(&query);
    let sites: Vec<_> = entities.results.iter().map(|e| e.site_id.as_str()).collect();
    assert_eq!(sites, vec!["dbpedia", "geonames"]);
}

#[test]
fn removed_sites_are_no_longer_consulted() {
    let hub = hub();
    assert!(hub.manager.remove_site("dbpedia").is_some());
    assert!(hub.manager.get_entity("http://dbpedia.org/resource/Paris").is_none());
    assert_eq!(hub.manager.site_ids(), vec!["geonames".to_string()]);
}
