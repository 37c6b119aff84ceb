pub mod consts;
pub mod datatype;
pub mod index_field;
pub mod index_value;
pub mod value_factory;
