use serde::{Serialize, Deserialize};
use crate::core::types::ValueKind;
use crate::core::vocab;

/// Closed set of datatypes the index distinguishes. Each one owns a fixed
/// field-name prefix/suffix so values of different types never share a
/// physical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexDataType {
    Boolean,
    Byte,
    Int,
    Long,
    Float,
    Double,
    Ref,
    Date,
    Dur,
    Str,
    Txt,
    Id,
}

pub const ALL_DATATYPES: [IndexDataType; 12] = [
    IndexDataType::Boolean,
    IndexDataType::Byte,
    IndexDataType::Int,
    IndexDataType::Long,
    IndexDataType::Float,
    IndexDataType::Double,
    IndexDataType::Ref,
    IndexDataType::Date,
    IndexDataType::Dur,
    IndexDataType::Str,
    IndexDataType::Txt,
    IndexDataType::Id,
];

impl IndexDataType {
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            IndexDataType::Boolean => Some("bool"),
            IndexDataType::Byte => Some("byte"),
            IndexDataType::Int => Some("int"),
            IndexDataType::Long => Some("long"),
            IndexDataType::Float => Some("float"),
            IndexDataType::Double => Some("double"),
            IndexDataType::Ref => Some("ref"),
            IndexDataType::Date => Some("cal"),
            IndexDataType::Dur => Some("dur"),
            IndexDataType::Str => Some("str"),
            IndexDataType::Txt => None,
            IndexDataType::Id => Some("id"),
        }
    }

    /// No datatype currently uses a suffix; decoding still honours one
    pub fn suffix(&self) -> Option<&'static str> {
        None
    }

    pub fn uri(&self) -> &'static str {
        match self {
            IndexDataType::Boolean => vocab::XSD_BOOLEAN,
            IndexDataType::Byte => vocab::XSD_BYTE,
            IndexDataType::Int => vocab::XSD_INT,
            IndexDataType::Long => vocab::XSD_LONG,
            IndexDataType::Float => vocab::XSD_FLOAT,
            IndexDataType::Double => vocab::XSD_DOUBLE,
            IndexDataType::Ref => vocab::XSD_ANY_URI,
            IndexDataType::Date => vocab::XSD_DATE_TIME,
            IndexDataType::Dur => vocab::XSD_DURATION,
            IndexDataType::Str => vocab::XSD_STRING,
            IndexDataType::Txt => vocab::RDF_PLAIN_LITERAL,
            IndexDataType::Id => vocab::ENTITYHUB_UUID,
        }
    }

    /// Native value kind produced when decoding this datatype
    pub fn value_kind(&self) -> ValueKind {
        match self {
            IndexDataType::Boolean => ValueKind::Bool,
            IndexDataType::Byte => ValueKind::Byte,
            IndexDataType::Int => ValueKind::Int,
            IndexDataType::Long => ValueKind::Long,
            IndexDataType::Float => ValueKind::Float,
            IndexDataType::Double => ValueKind::Double,
            IndexDataType::Ref => ValueKind::Reference,
            IndexDataType::Date => ValueKind::Date,
            IndexDataType::Dur => ValueKind::Duration,
            IndexDataType::Str => ValueKind::Str,
            IndexDataType::Txt => ValueKind::Text,
            IndexDataType::Id => ValueKind::Uuid,
        }
    }

    /// Language-bearing types fan out per language and feed the merger field
    pub fn is_language_type(&self) -> bool {
        matches!(self, IndexDataType::Txt)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self,
            IndexDataType::Byte | IndexDataType::Int | IndexDataType::Long
            | IndexDataType::Float | IndexDataType::Double)
    }

    pub fn for_uri(uri: &str) -> Option<IndexDataType> {
        if uri == vocab::XSD_INTEGER {
            return Some(IndexDataType::Long);
        }
        ALL_DATATYPES.iter().copied().find(|dt| dt.uri() == uri)
    }

    /// Reverse lookup used when decoding physical field names. An empty
    /// string counts as absent.
    pub fn for_prefix_suffix(prefix: Option<&str>, suffix: Option<&str>) -> Option<IndexDataType> {
        let prefix = prefix.filter(|p| !p.is_empty());
        let suffix = suffix.filter(|s| !s.is_empty());
        ALL_DATATYPES
            .iter()
            .copied()
            .find(|dt| dt.prefix() == prefix && dt.suffix() == suffix)
    }

    pub fn for_value_kind(kind: ValueKind) -> Option<IndexDataType> {
        ALL_DATATYPES.iter().copied().find(|dt| dt.value_kind() == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_are_unique() {
        for a in ALL_DATATYPES {
            for b in ALL_DATATYPES {
                if a != b {
                    assert_ne!((a.prefix(), a.suffix()), (b.prefix(), b.suffix()));
                }
            }
        }
    }

    #[test]
    fn reverse_lookups() {
        assert_eq!(IndexDataType::for_prefix_suffix(Some("bool"), None), Some(IndexDataType::Boolean));
        assert_eq!(IndexDataType::for_prefix_suffix(None, Some("")), Some(IndexDataType::Txt));
        assert_eq!(IndexDataType::for_prefix_suffix(Some("xyz"), None), None);
        assert_eq!(IndexDataType::for_uri(vocab::XSD_STRING), Some(IndexDataType::Str));
        assert_eq!(IndexDataType::for_uri(vocab::XSD_INTEGER), Some(IndexDataType::Long));
        assert_eq!(IndexDataType::for_uri("http://ex/custom"), None);
    }

    #[test]
    fn only_text_is_language_type() {
        assert!(IndexDataType::Txt.is_language_type());
        assert!(!IndexDataType::Str.is_language_type());
    }
}
