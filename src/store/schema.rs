use serde::{Serialize, Deserialize};
use crate::analysis::Analyzer;
use crate::schema::consts::{
    FULL_TEXT_FIELD, LANG_INDICATOR, LANG_MERGER_FIELD, PATH_SEPARATOR, REFERRED_DOCUMENT_FIELD,
};
use crate::schema::datatype::{IndexDataType, ALL_DATATYPES};

/// How the store indexes and compares the values of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,     // analysed into lower-cased words
    String,   // exact value
    Number,
    Date,     // ISO 8601, compared lexically
}

/// Dynamic field: every name starting with `prefix`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub prefix: String,
    pub field_type: FieldType,
}

/// Values of fields starting with `source_prefix` are also indexed in `dest`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyField {
    pub source_prefix: String,
    pub dest: String,
}

/// Field rules of the in-process store, mirroring the index schema the
/// field-name encoding was designed for
pub struct StoreSchema {
    rules: Vec<FieldRule>,
    copy_fields: Vec<CopyField>,
    default_type: FieldType,
    text_analyzer: Analyzer,
    keyword_analyzer: Analyzer,
}

impl StoreSchema {
    pub fn new(default_type: FieldType) -> Self {
        StoreSchema {
            rules: Vec::new(),
            copy_fields: Vec::new(),
            default_type,
            text_analyzer: Analyzer::text(),
            keyword_analyzer: Analyzer::keyword(),
        }
    }

    pub fn add_rule(mut self, prefix: impl Into<String>, field_type: FieldType) -> Self {
        self.rules.push(FieldRule {
            prefix: prefix.into(),
            field_type,
        });
        self
    }

    pub fn add_copy_field(mut self, source_prefix: impl Into<String>, dest: impl Into<String>) -> Self {
        self.copy_fields.push(CopyField {
            source_prefix: source_prefix.into(),
            dest: dest.into(),
        });
        self
    }

    /// Language fields and the full text field are text, datatype prefixed
    /// fields follow their datatype, everything else is an exact string.
    /// Language specific text is copied into the full text field and
    /// references into the references field.
    pub fn entityhub() -> Self {
        let mut schema = StoreSchema::new(FieldType::String)
            .add_rule(LANG_MERGER_FIELD, FieldType::Text)
            .add_rule(FULL_TEXT_FIELD, FieldType::Text)
            .add_rule(LANG_INDICATOR.to_string(), FieldType::Text);
        for data_type in ALL_DATATYPES {
            let Some(prefix) = data_type.prefix() else {
                continue;
            };
            let field_type = match data_type {
                IndexDataType::Date => FieldType::Date,
                dt if dt.is_numeric() => FieldType::Number,
                _ => continue,
            };
            schema = schema.add_rule(format!("{}{}", prefix, PATH_SEPARATOR), field_type);
        }
        let reference_prefix = IndexDataType::Ref.prefix().unwrap_or_default();
        schema
            .add_copy_field(LANG_INDICATOR.to_string(), FULL_TEXT_FIELD)
            .add_copy_field(format!("{}{}", reference_prefix, PATH_SEPARATOR), REFERRED_DOCUMENT_FIELD)
    }

    pub fn field_type(&self, name: &str) -> FieldType {
        self.rules
            .iter()
            .find(|rule| name.starts_with(&rule.prefix))
            .map(|rule| rule.field_type)
            .unwrap_or(self.default_type)
    }

    pub fn is_text(&self, name: &str) -> bool {
        self.field_type(name) == FieldType::Text
    }

    pub fn analyzer(&self, name: &str) -> &Analyzer {
        match self.field_type(name) {
            FieldType::Text => &self.text_analyzer,
            _ => &self.keyword_analyzer,
        }
    }

    pub fn text_analyzer(&self) -> &Analyzer {
        &self.text_analyzer
    }

    /// Fields the values of `name` are copied to
    pub fn copy_targets<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.copy_fields
            .iter()
            .filter(move |c| name.starts_with(&c.source_prefix) && c.dest != name)
            .map(|c| c.dest.as_str())
    }
}

impl Default for StoreSchema {
    fn default() -> Self {
        Self::entityhub()
    }
}
