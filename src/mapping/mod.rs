pub mod cache;
pub mod namespaces;
pub mod field_mapper;

pub use field_mapper::FieldMapper;
pub use namespaces::NamespacePrefixTable;
