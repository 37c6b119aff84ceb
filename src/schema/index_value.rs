use serde::{Serialize, Deserialize};
use std::fmt;
use crate::schema::datatype::IndexDataType;

/// A value as it is written to and queried from the index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexValue {
    pub value: String,
    pub data_type: IndexDataType,
    pub language: Option<String>,
}

impl IndexValue {
    pub fn new(value: impl Into<String>, data_type: IndexDataType) -> Self {
        IndexValue {
            value: value.into(),
            data_type,
            language: None,
        }
    }

    /// Languages are only kept for language types
    pub fn with_language(value: impl Into<String>, data_type: IndexDataType, language: Option<&str>) -> Self {
        let language = if data_type.is_language_type() {
            language.filter(|l| !l.is_empty()).map(str::to_string)
        } else {
            None
        };
        IndexValue {
            value: value.into(),
            data_type,
            language,
        }
    }

    pub fn has_language(&self) -> bool {
        self.language.is_some()
    }
}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.language {
            Some(lang) => write!(f, "{}@{}^^{:?}", self.value, lang, self.data_type),
            None => write!(f, "{}^^{:?}", self.value, self.data_type),
        }
    }
}
