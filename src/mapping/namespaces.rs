use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};
use crate::core::error::Result;
use crate::core::vocab;
use crate::schema::consts::{
    config_field_name, CONFIG_DOCUMENT_ID, DEFAULT_NS_PREFIX, DOCUMENT_ID_FIELD, PATH_SEPARATOR,
    SPECIAL_CONFIG_FIELD, URN_NAMESPACE, URN_PREFIX,
};
use crate::store::client::{DocumentStore, StoreQuery, ALL_FIELDS};
use crate::store::document::InputDocument;
use crate::store::syntax;

#[derive(Debug, Default)]
struct PrefixState {
    prefix_to_ns: HashMap<String, String>,
    ns_to_prefix: HashMap<String, String>,
    last_number: u32,   // highest N of generated `nsN` prefixes
}

impl PrefixState {
    fn insert(&mut self, prefix: String, namespace: String) {
        if let Some(n) = prefix.strip_prefix(DEFAULT_NS_PREFIX).and_then(|n| n.parse::<u32>().ok()) {
            self.last_number = self.last_number.max(n);
        }
        self.ns_to_prefix.insert(namespace.clone(), prefix.clone());
        self.prefix_to_ns.insert(prefix, namespace);
    }

    fn next_generated_prefix(&mut self) -> String {
        loop {
            self.last_number += 1;
            let candidate = format!("{}{}", DEFAULT_NS_PREFIX, self.last_number);
            if !self.prefix_to_ns.contains_key(&candidate) && !vocab::is_default_prefix(&candidate) {
                return candidate;
            }
        }
    }
}

/// Namespace ⇄ prefix table used to shorten field URIs in physical field
/// names. Loaded lazily from the config document of the store on first
/// use; every newly minted prefix is written back immediately.
///
/// The write back is a plain read-modify-write of the config document. Two
/// processes sharing one index can overwrite each other's new prefixes.
pub struct NamespacePrefixTable {
    store: Option<Arc<dyn DocumentStore>>,
    state: RwLock<Option<PrefixState>>,
}

impl NamespacePrefixTable {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        NamespacePrefixTable {
            store: Some(store),
            state: RwLock::new(None),
        }
    }

    /// Table that is neither loaded nor persisted
    pub fn detached() -> Self {
        NamespacePrefixTable {
            store: None,
            state: RwLock::new(Some(PrefixState::default())),
        }
    }

    /// Runs `f` on the loaded state, loading it first if needed
    fn read_state<R>(&self, f: impl FnOnce(&PrefixState) -> R) -> R {
        // Fast path: already loaded
        {
            let state = self.state.read();
            if let Some(state) = state.as_ref() {
                return f(state);
            }
        }

        // Slow path: another thread may have loaded it meanwhile
        let mut state = self.state.write();
        let state = state.get_or_insert_with(|| self.load());
        f(state)
    }

    pub fn namespace(&self, prefix: &str) -> Option<String> {
        if prefix == URN_PREFIX {
            return Some(URN_NAMESPACE.to_string());
        }
        self.read_state(|s| s.prefix_to_ns.get(prefix).cloned())
    }

    pub fn prefix(&self, namespace: &str) -> Option<String> {
        if namespace == URN_NAMESPACE {
            return Some(URN_PREFIX.to_string());
        }
        self.read_state(|s| s.ns_to_prefix.get(namespace).cloned())
    }

    /// Returns the prefix of the namespace, minting and persisting a new
    /// one if needed. Well-known namespaces get their usual prefix when it
    /// is still free, all others `nsN`.
    pub fn get_or_create_prefix(&self, namespace: &str) -> String {
        if let Some(prefix) = self.prefix(namespace) {
            return prefix;
        }
        let prefix = {
            let mut guard = self.state.write();
            let state = guard.get_or_insert_with(|| self.load());
            // added by another thread while we waited for the lock
            if let Some(prefix) = state.ns_to_prefix.get(namespace) {
                return prefix.clone();
            }
            let prefix = match vocab::default_prefix_for(namespace) {
                Some(p) if !state.prefix_to_ns.contains_key(p) => p.to_string(),
                _ => state.next_generated_prefix(),
            };
            debug!("add namespace prefix '{}' for '{}'", prefix, namespace);
            state.insert(prefix.clone(), namespace.to_string());
            prefix
        };
        if let Err(e) = self.save(true) {
            error!("unable to persist namespace prefix '{}' for '{}': {}", prefix, namespace, e);
        }
        prefix
    }

    /// Snapshot of all prefix → namespace mappings
    pub fn mappings(&self) -> BTreeMap<String, String> {
        self.read_state(|s| s.prefix_to_ns.iter().map(|(p, n)| (p.clone(), n.clone())).collect())
    }

    /// Writes the whole table as the config document
    pub fn save(&self, commit: bool) -> Result<()> {
        let store = match &self.store {
            Some(store) => store,
            None => {
                debug!("namespace table is detached, nothing saved");
                return Ok(());
            }
        };
        let mut doc = InputDocument::new();
        doc.add_field(DOCUMENT_ID_FIELD, CONFIG_DOCUMENT_ID);
        for (prefix, namespace) in self.mappings() {
            doc.add_field(&config_field_name(&prefix), namespace);
        }
        store.add(vec![doc], None)?;
        if commit {
            store.commit()?;
        }
        Ok(())
    }

    fn load(&self) -> PrefixState {
        let mut state = PrefixState::default();
        let store = match &self.store {
            Some(store) => store,
            None => return state,
        };
        let mut query = StoreQuery::with_query(syntax::term(DOCUMENT_ID_FIELD, CONFIG_DOCUMENT_ID));
        query.add_field(ALL_FIELDS);
        query.rows = 1;
        let config = match store.query(&query) {
            Ok(mut response) if !response.docs.is_empty() => response.docs.swap_remove(0),
            Ok(_) => {
                info!("no namespace prefix configuration present, starting with an empty table");
                return state;
            }
            Err(e) => {
                error!("unable to load namespace prefix configuration (may be OK on first use): {}", e);
                return state;
            }
        };
        for name in config.field_names() {
            let mut parts = name.split(PATH_SEPARATOR);
            if parts.next() != Some(SPECIAL_CONFIG_FIELD) {
                continue;
            }
            let prefix = match parts.next() {
                Some(p) if !p.is_empty() => p,
                _ => {
                    warn!("malformed namespace config field {}", name);
                    continue;
                }
            };
            let namespace = match config.first_value(name) {
                Some(ns) => ns,
                None => {
                    warn!("no namespace for prefix {} in config field {}", prefix, name);
                    continue;
                }
            };
            if let Some(existing) = state.ns_to_prefix.get(namespace) {
                error!("found prefixes {} and {} for namespace {}, keeping the first", existing, prefix, namespace);
                continue;
            }
            state.insert(prefix.to_string(), namespace.to_string());
        }
        debug!("loaded {} namespace prefixes", state.prefix_to_ns.len());
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[test]
    fn well_known_namespaces_keep_their_prefix() {
        let table = NamespacePrefixTable::detached();
        assert_eq!(table.get_or_create_prefix(vocab::RDFS_NS), "rdfs");
        assert_eq!(table.get_or_create_prefix("http://example.org/ns#"), "ns1");
        assert_eq!(table.get_or_create_prefix("http://example.org/other/"), "ns2");
        assert_eq!(table.get_or_create_prefix("http://example.org/ns#"), "ns1");
        assert_eq!(table.namespace("ns2").as_deref(), Some("http://example.org/other/"));
    }

    #[test]
    fn urn_prefix_is_fixed() {
        let table = NamespacePrefixTable::detached();
        assert_eq!(table.get_or_create_prefix("urn:"), "urn");
        assert_eq!(table.namespace("urn").as_deref(), Some("urn:"));
        assert!(table.mappings().is_empty());
    }

    #[test]
    fn prefixes_survive_a_reload() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let table = NamespacePrefixTable::new(store.clone());
        table.get_or_create_prefix(vocab::SKOS_NS);
        table.get_or_create_prefix("http://example.org/a/");

        let reloaded = NamespacePrefixTable::new(store);
        assert_eq!(reloaded.prefix(vocab::SKOS_NS).as_deref(), Some("skos"));
        assert_eq!(reloaded.prefix("http://example.org/a/").as_deref(), Some("ns1"));
        // numbering continues after the highest loaded prefix
        assert_eq!(reloaded.get_or_create_prefix("http://example.org/b/"), "ns2");
    }
}
