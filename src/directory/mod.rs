pub mod archive;
pub mod pending;
pub mod provider;
pub mod manager;

pub use archive::{ArchiveFormat, IndexReference};
pub use manager::IndexDirectoryManager;
pub use pending::{PendingIndex, PendingIndexRegistry};
pub use provider::{DataFileProvider, DirectoryDataFileProvider, InMemoryDataFileProvider};
