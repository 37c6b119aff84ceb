pub mod field_query;
pub mod constraint;
pub mod encoders;
pub mod utils;
pub mod compiler;

pub use compiler::{QueryCompiler, SelectMode};
pub use field_query::{
    Constraint, FieldQuery, PatternType, QueryResultList, RangeConstraint, SimilarityConstraint,
    TextConstraint, ValueConstraint, ValueMode,
};
