pub mod client;
pub mod document;
pub mod syntax;
pub mod ast;
pub mod parser;
pub mod schema;
pub mod matcher;
pub mod memory;

pub use client::{DocumentStore, StoreQuery, StoreResponse};
pub use document::{InputDocument, StoredDocument};
pub use memory::MemoryStore;
