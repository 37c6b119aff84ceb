use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};
use crate::core::config::DirectoryConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::directory::archive::{self, ArchiveFormat, IndexReference};
use crate::directory::pending::{PendingIndex, PendingIndexRegistry};
use crate::directory::provider::{DataFile, DataFileProvider};

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::invalid_argument("the index name must not be empty"));
    }
    if name.starts_with('.') || name.contains(['/', '\\']) {
        return Err(Error::invalid_argument(format!("'{}' is no valid index name", name)));
    }
    Ok(())
}

/// Provisions index directories below the managed root.
///
/// An index directory is created by extracting an archive obtained from the
/// [`DataFileProvider`]. Indexes whose archive is not yet available are
/// recorded in the [`PendingIndexRegistry`] and initialised later, either
/// on the next request or when [`update_for_data_file`] announces the
/// archive.
///
/// ```text
///   absent --request--> initializing --copied--> active
///                            |
///                            +--archive missing--> pending (recorded)
///                            +--copy failed------> absent (error)
/// ```
///
/// Only one thread initialises a given index; others asking for it wait
/// until it is done. Archives are extracted into a hidden staging
/// directory and renamed into place, so a directory under its final name
/// is always complete.
///
/// [`update_for_data_file`]: IndexDirectoryManager::update_for_data_file
pub struct IndexDirectoryManager {
    config: DirectoryConfig,
    provider: Arc<dyn DataFileProvider>,
    pending: PendingIndexRegistry,
    initializing: Mutex<HashSet<String>>,
    initialized: Condvar,
}

impl IndexDirectoryManager {
    pub fn new(config: DirectoryConfig, provider: Arc<dyn DataFileProvider>) -> Result<Self> {
        fs::create_dir_all(&config.root)?;
        let pending = PendingIndexRegistry::open(config.pending_dir())?;
        info!("managing index directories in {}", config.root.display());
        Ok(IndexDirectoryManager {
            config,
            provider,
            pending,
            initializing: Mutex::new(HashSet::new()),
            initialized: Condvar::new(),
        })
    }

    pub fn managed_directory(&self) -> &Path {
        &self.config.root
    }

    fn index_dir(&self, name: &str) -> PathBuf {
        self.config.root.join(name)
    }

    /// Whether the index has a directory or is waiting for its archive
    pub fn is_managed_index(&self, name: &str) -> Result<bool> {
        check_name(name)?;
        Ok(self.index_dir(name).exists() || self.pending.contains(name))
    }

    /// All managed indexes; uninitialised ones map to `None`
    pub fn get_managed_indexes(&self) -> Result<BTreeMap<String, Option<PathBuf>>> {
        let mut indexes = BTreeMap::new();
        for entry in fs::read_dir(&self.config.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            // hidden entries are the config and staging directories
            if name.starts_with('.') || !entry.file_type()?.is_dir() {
                continue;
            }
            indexes.insert(name, Some(entry.path()));
        }
        for name in self.pending.names() {
            indexes.entry(name).or_insert(None);
        }
        Ok(indexes)
    }

    /// False while the index is being initialised
    pub fn is_initialised_index(&self, name: &str) -> Result<bool> {
        check_name(name)?;
        if self.initializing.lock().contains(name) {
            return Ok(false);
        }
        Ok(self.index_dir(name).is_dir())
    }

    /// The directory of the index, `None` if it is not initialised. With
    /// `create` a pending index is initialised if its archive is available.
    pub fn get_index_directory(&self, name: &str, create: bool) -> Result<Option<PathBuf>> {
        check_name(name)?;
        if create {
            return self.initialize(name, false);
        }
        let mut initializing = self.initializing.lock();
        while initializing.contains(name) {
            debug!("waiting for initialisation of index {}", name);
            self.initialized.wait(&mut initializing);
        }
        let dir = self.index_dir(name);
        Ok(dir.is_dir().then_some(dir))
    }

    /// Registers the index with its archive and initialises it if the
    /// archive is available. `None` means the index stays pending. Fails
    /// for an index that is already managed; use [`update_index`] to
    /// replace its data.
    ///
    /// [`update_index`]: IndexDirectoryManager::update_index
    pub fn create_index_directory(
        &self,
        name: &str,
        archive_name: &str,
        properties: BTreeMap<String, String>,
    ) -> Result<Option<PathBuf>> {
        if self.is_managed_index(name)? {
            return Err(Error::invalid_argument(format!("index '{}' is already managed", name)));
        }
        let archive_name = archive::with_archive_extension(archive_name);
        self.pending.add(name, &archive_name, properties)?;
        self.initialize(name, false)
    }

    /// Replaces the data of an index with the content of another archive
    pub fn update_index(&self, name: &str, archive_name: &str) -> Result<Option<PathBuf>> {
        check_name(name)?;
        let archive_name = archive::with_archive_extension(archive_name);
        let properties = self.pending.get(name).map(|p| p.properties).unwrap_or_default();
        self.pending.add(name, &archive_name, properties)?;
        self.initialize(name, true)
    }

    /// Removes the directory and any pending record. Returns whether there
    /// was anything to remove.
    pub fn remove_index(&self, name: &str) -> Result<bool> {
        check_name(name)?;
        let mut initializing = self.initializing.lock();
        while initializing.contains(name) {
            self.initialized.wait(&mut initializing);
        }
        let was_pending = self.pending.remove(name)?;
        let dir = self.index_dir(name);
        let had_dir = dir.exists();
        if had_dir {
            fs::remove_dir_all(&dir)?;
        }
        if was_pending || had_dir {
            info!("removed index {}", name);
        }
        Ok(was_pending || had_dir)
    }

    /// Initialises every pending index waiting for `archive_name`.
    /// Returns the names of the indexes initialised now.
    pub fn update_for_data_file(&self, archive_name: &str) -> Vec<String> {
        let mut initialised = Vec::new();
        for name in self.pending.waiting_for(archive_name) {
            match self.initialize(&name, false) {
                Ok(Some(_)) => initialised.push(name),
                Ok(None) => debug!("index {} still waits for {}", name, archive_name),
                Err(err) => warn!("unable to initialise index {} from {}: {}", name, archive_name, err),
            }
        }
        initialised
    }

    fn initialize(&self, name: &str, replace: bool) -> Result<Option<PathBuf>> {
        let dir = self.index_dir(name);
        {
            let mut initializing = self.initializing.lock();
            while initializing.contains(name) {
                info!("waiting for initialisation of index {}", name);
                self.initialized.wait(&mut initializing);
            }
            if dir.is_dir() && !replace {
                return Ok(Some(dir));
            }
            initializing.insert(name.to_string());
        }
        let result = self.copy_pending(name, &dir);
        if let Err(err) = &result {
            warn!("initialisation of index {} failed: {}", name, err);
            if let Err(remove_err) = self.pending.remove(name) {
                warn!("unable to drop pending record of index {}: {}", name, remove_err);
            }
        }
        // waiters are released whatever the outcome
        let mut initializing = self.initializing.lock();
        initializing.remove(name);
        self.initialized.notify_all();
        result
    }

    fn copy_pending(&self, name: &str, dir: &Path) -> Result<Option<PathBuf>> {
        let existing = || dir.is_dir().then(|| dir.to_path_buf());
        let Some(pending) = self.pending.get(name) else {
            return Ok(existing());
        };
        let Some((archive_name, data)) = self.open_archive(name, &pending)? else {
            return Ok(existing());
        };
        let format = ArchiveFormat::from_name(&archive_name)?;
        let index = archive::index_name(&archive_name);

        let staging = tempfile::Builder::new()
            .prefix(&format!(".{}-", name))
            .tempdir_in(&self.config.root)?;
        let copied = archive::extract(format, data, staging.path(), index)?;
        if copied == 0 {
            return Err(Error::new(
                ErrorKind::Corrupt,
                format!("archive {} holds no files of index {}", archive_name, index),
            ));
        }
        if dir.exists() {
            let retired = tempfile::Builder::new().prefix(".retired-").tempdir_in(&self.config.root)?;
            fs::rename(dir, retired.path().join(name))?;
        }
        fs::rename(staging.path(), dir)?;
        self.pending.remove(name)?;
        info!("initialised index {} from {} ({} files)", name, archive_name, copied);
        Ok(Some(dir.to_path_buf()))
    }

    /// Opens the archive of a pending index, following a reference archive
    /// to the archive it names. `None` if the provider does not have it.
    fn open_archive(&self, name: &str, pending: &PendingIndex) -> Result<Option<(String, DataFile)>> {
        let Some(mut data) = self.lookup(name, &pending.archive_name, pending)? else {
            return Ok(None);
        };
        if ArchiveFormat::from_name(&pending.archive_name)? != ArchiveFormat::Reference {
            return Ok(Some((pending.archive_name.clone(), data)));
        }
        let mut text = String::new();
        data.read_to_string(&mut text)?;
        let reference = IndexReference::parse(&text)?;
        if ArchiveFormat::from_name(&reference.archive_name)? == ArchiveFormat::Reference {
            return Err(Error::invalid_argument(format!(
                "reference {} points to another reference {}", pending.archive_name, reference.archive_name
            )));
        }
        let mut properties = pending.properties.clone();
        properties.extend(reference.properties);
        self.pending.add(name, &reference.archive_name, properties)?;
        let resolved = self.pending.get(name).unwrap_or_else(|| PendingIndex {
            archive_name: reference.archive_name.clone(),
            properties: BTreeMap::new(),
        });
        Ok(self
            .lookup(name, &resolved.archive_name, &resolved)?
            .map(|data| (resolved.archive_name.clone(), data)))
    }

    fn lookup(&self, name: &str, archive_name: &str, pending: &PendingIndex) -> Result<Option<DataFile>> {
        match self.provider.open(archive_name, &pending.properties) {
            Ok(Some(data)) => Ok(Some(data)),
            Ok(None) => {
                info!("archive {} for index {} is not available yet", archive_name, name);
                Ok(None)
            }
            Err(err) => {
                warn!("unable to open archive {} for index {}: {}", archive_name, name, err);
                Ok(None)
            }
        }
    }
}
