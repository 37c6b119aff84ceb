use serde::{Serialize, Deserialize};
use std::collections::BTreeSet;
use std::fmt;
use crate::core::error::{Error, Result};
use crate::core::vocab;
use crate::schema::datatype::IndexDataType;

/// Language tag standing for "explicitly untagged text"
pub const NO_LANGUAGE: &str = "";

/// Reserved logical fields that map to one fixed physical field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialField {
    FullText,
    References,
}

impl SpecialField {
    pub fn for_uri(uri: &str) -> Option<SpecialField> {
        match uri {
            vocab::FULL_TEXT_FIELD => Some(SpecialField::FullText),
            vocab::REFERENCES_FIELD => Some(SpecialField::References),
            _ => None,
        }
    }
}

/// Identity of a logical field: path of property URIs, datatype and the
/// languages it is restricted to. Used as cache key and to generate the
/// physical field names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexField {
    path: Vec<String>,
    data_type: IndexDataType,
    languages: BTreeSet<String>,
}

impl IndexField {
    pub fn new(path: Vec<String>, data_type: IndexDataType) -> Result<Self> {
        Self::with_languages(path, data_type, std::iter::empty::<&str>())
    }

    /// Languages only apply to language types and are dropped otherwise.
    /// [`NO_LANGUAGE`] selects untagged values.
    pub fn with_languages<I, S>(path: Vec<String>, data_type: IndexDataType, languages: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if path.is_empty() {
            return Err(Error::invalid_argument("the path of an IndexField must not be empty"));
        }
        if path.iter().any(|p| p.is_empty()) {
            return Err(Error::invalid_argument(format!("empty element in IndexField path {:?}", path)));
        }
        let languages = if data_type.is_language_type() {
            languages.into_iter().map(|l| l.as_ref().to_string()).collect()
        } else {
            BTreeSet::new()
        };
        Ok(IndexField { path, data_type, languages })
    }

    pub fn single(field: &str, data_type: IndexDataType) -> Result<Self> {
        Self::new(vec![field.to_string()], data_type)
    }

    /// Pseudo field carrying the relevance score of query results
    pub fn score() -> Self {
        IndexField {
            path: vec![vocab::RESULT_SCORE.to_string()],
            data_type: IndexDataType::Float,
            languages: BTreeSet::new(),
        }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn data_type(&self) -> IndexDataType {
        self.data_type
    }

    pub fn languages(&self) -> &BTreeSet<String> {
        &self.languages
    }

    pub fn has_language(&self) -> bool {
        !self.languages.is_empty()
    }

    /// The first language, `None` for untagged or unrestricted fields
    pub fn language(&self) -> Option<&str> {
        self.languages.iter().next().map(String::as_str).filter(|l| !l.is_empty())
    }

    pub fn special_field(&self) -> Option<SpecialField> {
        match self.path.as_slice() {
            [single] => SpecialField::for_uri(single),
            _ => None,
        }
    }

    pub fn is_special_field(&self) -> bool {
        self.special_field().is_some()
    }
}

impl fmt::Display for IndexField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}[{:?}", self.path.join(" > "), self.data_type)?;
        if !self.languages.is_empty() {
            let langs: Vec<&str> = self.languages.iter().map(String::as_str).collect();
            write!(f, "|{}", langs.join(","))?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_covers_path_type_and_languages() {
        let a = IndexField::with_languages(vec!["http://ex/label".into()], IndexDataType::Txt, ["en", "de"]).unwrap();
        let b = IndexField::with_languages(vec!["http://ex/label".into()], IndexDataType::Txt, ["de", "en"]).unwrap();
        let c = IndexField::with_languages(vec!["http://ex/label".into()], IndexDataType::Txt, ["en"]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn languages_dropped_for_non_language_types() {
        let f = IndexField::with_languages(vec!["http://ex/n".into()], IndexDataType::Int, ["en"]).unwrap();
        assert!(!f.has_language());
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(IndexField::new(Vec::new(), IndexDataType::Str).is_err());
    }

    #[test]
    fn special_fields_detected() {
        let f = IndexField::single(vocab::FULL_TEXT_FIELD, IndexDataType::Txt).unwrap();
        assert_eq!(f.special_field(), Some(SpecialField::FullText));
    }
}
