use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use crate::core::error::Result;
use crate::directory::archive::INDEX_ARCHIVE_EXTENSION;

/// Property holding the archive an uninitialised index waits for
pub const ARCHIVE_NAME_KEY: &str = "Uninitialised-Index-Archive-Name";

/// An index requested before its archive was available
#[derive(Debug, Clone, PartialEq)]
pub struct PendingIndex {
    pub archive_name: String,
    pub properties: BTreeMap<String, String>,
}

/// Durable record of uninitialised indexes.
///
/// Every entry is a JSON object in `<dir>/<index>.solrindex.ref`; the
/// archive name is stored under [`ARCHIVE_NAME_KEY`] next to the
/// properties passed to the data file provider.
pub struct PendingIndexRegistry {
    dir: PathBuf,
    entries: Mutex<BTreeMap<String, PendingIndex>>,
}

fn file_suffix() -> String {
    format!(".{}.ref", INDEX_ARCHIVE_EXTENSION)
}

impl PendingIndexRegistry {
    /// Loads the entries recorded in `dir`; the directory is created on the
    /// first write
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let mut entries = BTreeMap::new();
        if dir.is_dir() {
            let suffix = file_suffix();
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let Some(name) = file_name.strip_suffix(&suffix) else {
                    continue;
                };
                match load(&path) {
                    Ok(Some(pending)) => {
                        entries.insert(name.to_string(), pending);
                    }
                    Ok(None) => warn!("pending index file {} names no archive", path.display()),
                    Err(err) => warn!("unable to read pending index file {}: {}", path.display(), err),
                }
            }
        }
        debug!("loaded {} uninitialised indexes from {}", entries.len(), dir.display());
        Ok(PendingIndexRegistry {
            dir,
            entries: Mutex::new(entries),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", name, file_suffix()))
    }

    /// Records (or replaces) the pending index
    pub fn add(&self, name: &str, archive_name: &str, properties: BTreeMap<String, String>) -> Result<()> {
        let mut entries = self.entries.lock();
        let mut payload = properties.clone();
        payload.insert(ARCHIVE_NAME_KEY.to_string(), archive_name.to_string());
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(name), serde_json::to_vec_pretty(&payload)?)?;
        entries.insert(name.to_string(), PendingIndex {
            archive_name: archive_name.to_string(),
            properties,
        });
        info!("index {} waits for archive {}", name, archive_name);
        Ok(())
    }

    /// Returns whether the index was pending
    pub fn remove(&self, name: &str) -> Result<bool> {
        let mut entries = self.entries.lock();
        if entries.remove(name).is_none() {
            return Ok(false);
        }
        let path = self.path(name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(true)
    }

    pub fn get(&self, name: &str) -> Option<PendingIndex> {
        self.entries.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Indexes waiting for the given archive
    pub fn waiting_for(&self, archive_name: &str) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|(_, pending)| pending.archive_name == archive_name)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

fn load(path: &Path) -> Result<Option<PendingIndex>> {
    let data = fs::read(path)?;
    let mut properties: BTreeMap<String, String> = serde_json::from_slice(&data)?;
    Ok(properties
        .remove(ARCHIVE_NAME_KEY)
        .map(|archive_name| PendingIndex { archive_name, properties }))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn entries_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let pending_dir = dir.path().join(".config/uninitialised-index");
        let registry = PendingIndexRegistry::open(&pending_dir).unwrap();
        registry.add("dbpedia", "dbpedia.solrindex.zip", props(&[("Description", "DBpedia")])).unwrap();
        registry.add("geonames", "geonames.solrindex.zip", BTreeMap::new()).unwrap();
        assert!(pending_dir.join("dbpedia.solrindex.ref").is_file());

        let reopened = PendingIndexRegistry::open(&pending_dir).unwrap();
        assert_eq!(reopened.names(), vec!["dbpedia".to_string(), "geonames".to_string()]);
        assert_eq!(reopened.get("dbpedia"), Some(PendingIndex {
            archive_name: "dbpedia.solrindex.zip".into(),
            properties: props(&[("Description", "DBpedia")]),
        }));
    }

    #[test]
    fn removed_entries_are_gone_for_good() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PendingIndexRegistry::open(dir.path()).unwrap();
        registry.add("dbpedia", "dbpedia.solrindex.zip", BTreeMap::new()).unwrap();
        assert!(registry.remove("dbpedia").unwrap());
        assert!(!registry.remove("dbpedia").unwrap());
        assert!(PendingIndexRegistry::open(dir.path()).unwrap().names().is_empty());
    }

    #[test]
    fn waiting_for_an_archive() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PendingIndexRegistry::open(dir.path()).unwrap();
        registry.add("a", "shared.solrindex.zip", BTreeMap::new()).unwrap();
        registry.add("b", "shared.solrindex.zip", BTreeMap::new()).unwrap();
        registry.add("c", "other.solrindex.zip", BTreeMap::new()).unwrap();
        assert_eq!(registry.waiting_for("shared.solrindex.zip"), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn files_without_archive_name_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.solrindex.ref"), b"{\"Description\": \"x\"}").unwrap();
        fs::write(dir.path().join("garbage.solrindex.ref"), b"not json").unwrap();
        assert!(PendingIndexRegistry::open(dir.path()).unwrap().names().is_empty());
    }
}
