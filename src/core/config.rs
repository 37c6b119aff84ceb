use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use crate::core::error::{Error, ErrorKind, Result};

pub const DEFAULT_QUERY_RESULTS: usize = 10;
pub const MAX_QUERY_RESULTS: usize = 1024;
pub const DEFAULT_MAX_BOOLEAN_CLAUSES: usize = 1024;
pub const DEFAULT_COMMIT_WITHIN: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct YardConfig {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,

    // Several yards share one index; documents are tagged with the yard id
    pub multi_yard_layout: bool,

    pub immediate_commit: bool,
    pub commit_within: Duration,              // used when immediate_commit is off
    pub max_boolean_clauses: usize,           // ids per existence-check query

    pub document_boost_field: Option<String>, // field holding a per-entity boost
    pub field_boosts: HashMap<String, f32>,   // field URI -> boost

    pub default_query_results: usize,
    pub max_query_results: usize,
}

impl Default for YardConfig {
    fn default() -> Self {
        YardConfig {
            id: String::new(),
            name: None,
            description: None,
            multi_yard_layout: false,
            immediate_commit: true,
            commit_within: DEFAULT_COMMIT_WITHIN,
            max_boolean_clauses: DEFAULT_MAX_BOOLEAN_CLAUSES,
            document_boost_field: None,
            field_boosts: HashMap::new(),
            default_query_results: DEFAULT_QUERY_RESULTS,
            max_query_results: MAX_QUERY_RESULTS,
        }
    }
}

impl YardConfig {
    pub fn new(id: impl Into<String>) -> Self {
        YardConfig {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::new(ErrorKind::Config, "yard id must not be empty"));
        }
        if self.max_boolean_clauses == 0 {
            return Err(Error::new(ErrorKind::Config, "max_boolean_clauses must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub root: PathBuf,                 // all managed index directories live here
    pub config_dir_name: String,
    pub pending_dir_name: String,      // below config_dir_name
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        DirectoryConfig {
            root: PathBuf::from("./indexes"),
            config_dir_name: ".config".to_string(),
            pending_dir_name: "uninitialised-index".to_string(),
        }
    }
}

impl DirectoryConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryConfig {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn pending_dir(&self) -> PathBuf {
        self.root.join(&self.config_dir_name).join(&self.pending_dir_name)
    }
}
