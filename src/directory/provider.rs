use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::RwLock;
use tracing::debug;
use crate::core::error::Result;

pub type DataFile = Box<dyn Read + Send>;

/// Source of the archives index directories are initialised from
pub trait DataFileProvider: Send + Sync {
    /// `None` if the data file is not (yet) available
    fn open(&self, name: &str, properties: &BTreeMap<String, String>) -> Result<Option<DataFile>>;
}

/// Looks up data files in a list of directories, first match wins
#[derive(Debug, Clone, Default)]
pub struct DirectoryDataFileProvider {
    dirs: Vec<PathBuf>,
}

impl DirectoryDataFileProvider {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        DirectoryDataFileProvider { dirs }
    }
}

impl DataFileProvider for DirectoryDataFileProvider {
    fn open(&self, name: &str, _properties: &BTreeMap<String, String>) -> Result<Option<DataFile>> {
        for dir in &self.dirs {
            let path = dir.join(name);
            if path.is_file() {
                debug!("data file {} found at {}", name, path.display());
                return Ok(Some(Box::new(File::open(path)?)));
            }
        }
        Ok(None)
    }
}

/// Data files held in memory; files can be added while the provider is in
/// use
#[derive(Default)]
pub struct InMemoryDataFileProvider {
    files: RwLock<HashMap<String, Vec<u8>>>,
    opened: AtomicUsize,
}

impl InMemoryDataFileProvider {
    pub fn new() -> Self {
        InMemoryDataFileProvider::default()
    }

    pub fn insert(&self, name: impl Into<String>, data: Vec<u8>) {
        self.files.write().insert(name.into(), data);
    }

    /// Number of data files handed out so far
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl DataFileProvider for InMemoryDataFileProvider {
    fn open(&self, name: &str, _properties: &BTreeMap<String, String>) -> Result<Option<DataFile>> {
        let Some(data) = self.files.read().get(name).cloned() else {
            return Ok(None);
        };
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Box::new(Cursor::new(data))))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use super::*;

    #[test]
    fn first_directory_with_the_file_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(second.path().join("a.solrindex.zip"), b"second").unwrap();
        let provider = DirectoryDataFileProvider::new(vec![first.path().to_path_buf(), second.path().to_path_buf()]);

        let mut content = String::new();
        provider.open("a.solrindex.zip", &BTreeMap::new()).unwrap().unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "second");
        assert!(provider.open("b.solrindex.zip", &BTreeMap::new()).unwrap().is_none());
    }

    #[test]
    fn in_memory_files_appear_when_inserted() {
        let provider = InMemoryDataFileProvider::new();
        assert!(provider.open("a", &BTreeMap::new()).unwrap().is_none());
        provider.insert("a", b"data".to_vec());
        assert!(provider.open("a", &BTreeMap::new()).unwrap().is_some());
        assert_eq!(provider.opened(), 1);
    }
}
