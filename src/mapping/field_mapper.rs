use std::sync::Arc;
use tracing::{trace, warn};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::vocab;
use crate::mapping::cache::{CacheStats, MappingCache, DEFAULT_MAPPING_CACHE_SIZE};
use crate::mapping::namespaces::NamespacePrefixTable;
use crate::schema::consts::{
    DOCUMENT_ID_FIELD, FULL_TEXT_FIELD, LANG_INDICATOR, LANG_MERGER_FIELD,
    NAMESPACE_PREFIX_SEPARATOR, PATH_SEPARATOR, REFERRED_DOCUMENT_FIELD, SCORE_FIELD,
    SPECIAL_FIELD_PREFIX,
};
use crate::schema::datatype::IndexDataType;
use crate::schema::index_field::{IndexField, SpecialField, NO_LANGUAGE};
use crate::schema::index_value::IndexValue;
use crate::store::client::DocumentStore;

/// Bidirectional codec between [`IndexField`]s and physical field names.
///
/// A physical name is `<marker><PATH_SEP><prefix:local>...<PATH_SEP>[suffix]`
/// where the marker is the datatype prefix, `@<lang>` for text in one
/// language or `_!@` for the field merging all languages of a text field.
/// Namespaces are replaced by short prefixes managed by the
/// [`NamespacePrefixTable`].
pub struct FieldMapper {
    prefixes: NamespacePrefixTable,
    field_names: MappingCache<IndexField, Vec<String>>,
    index_fields: MappingCache<String, IndexField>,
    score_field: IndexField,
}

impl FieldMapper {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_prefix_table(NamespacePrefixTable::new(store))
    }

    /// Mapper whose prefix table lives in memory only
    pub fn detached() -> Self {
        Self::with_prefix_table(NamespacePrefixTable::detached())
    }

    pub fn with_prefix_table(prefixes: NamespacePrefixTable) -> Self {
        FieldMapper {
            prefixes,
            field_names: MappingCache::new(DEFAULT_MAPPING_CACHE_SIZE),
            index_fields: MappingCache::new(DEFAULT_MAPPING_CACHE_SIZE),
            score_field: IndexField::score(),
        }
    }

    pub fn prefix_table(&self) -> &NamespacePrefixTable {
        &self.prefixes
    }

    pub fn document_id_field(&self) -> &'static str {
        DOCUMENT_ID_FIELD
    }

    pub fn score_field(&self) -> &IndexField {
        &self.score_field
    }

    /// All physical names values of this field are stored in. Text fields
    /// yield one name per language plus the language merger field.
    pub fn field_names(&self, field: &IndexField) -> Vec<String> {
        if let Some(names) = self.field_names.get(field) {
            return names;
        }
        let names = self.encode_field_names(field);
        self.field_names.put(field.clone(), names.clone());
        names
    }

    /// Physical names of the field that a value with this datatype and
    /// language is stored in
    pub fn field_names_for_value(&self, path: &[String], value: &IndexValue) -> Result<Vec<String>> {
        let field = match value.language.as_deref() {
            Some(lang) => IndexField::with_languages(path.to_vec(), value.data_type, [lang])?,
            None if value.data_type.is_language_type() => {
                IndexField::with_languages(path.to_vec(), value.data_type, [NO_LANGUAGE])?
            }
            None => IndexField::new(path.to_vec(), value.data_type)?,
        };
        Ok(self.field_names(&field))
    }

    /// Names to search in: like [`field_names`](Self::field_names) but
    /// without the merger field when specific languages are requested
    pub fn query_field_names(&self, field: &IndexField) -> Vec<String> {
        let mut names = self.field_names(field);
        if field.has_language() && field.data_type().is_language_type() {
            names.pop();
        }
        names
    }

    fn encode_field_names(&self, field: &IndexField) -> Vec<String> {
        match field.special_field() {
            Some(SpecialField::FullText) => return vec![FULL_TEXT_FIELD.to_string()],
            Some(SpecialField::References) => return vec![REFERRED_DOCUMENT_FIELD.to_string()],
            None => {}
        }
        let path_name = self.encode_path(field.path());
        let data_type = field.data_type();
        let mut names = Vec::with_capacity(field.languages().len() + 2);
        if data_type.prefix().is_some() || data_type.suffix().is_some() {
            names.push(format!(
                "{}{}{}",
                data_type.prefix().unwrap_or_default(),
                path_name,
                data_type.suffix().unwrap_or_default()
            ));
        }
        for language in field.languages() {
            names.push(format!("{}{}{}", LANG_INDICATOR, language, path_name));
        }
        if data_type.is_language_type() {
            names.push(format!("{}{}", LANG_MERGER_FIELD, path_name));
        }
        trace!("{} -> {:?}", field, names);
        names
    }

    /// `/prefix1:local1/prefix2:local2/`, minting namespace prefixes as
    /// needed
    pub fn encode_path(&self, path: &[String]) -> String {
        let mut encoded = String::new();
        encoded.push(PATH_SEPARATOR);
        for element in path {
            encoded.push_str(&self.encode_path_element(element));
            encoded.push(PATH_SEPARATOR);
        }
        encoded
    }

    fn encode_path_element(&self, uri: &str) -> String {
        match vocab::split_namespace(uri) {
            (Some(namespace), local) => {
                let prefix = self.prefixes.get_or_create_prefix(namespace);
                format!("{}{}{}", prefix, NAMESPACE_PREFIX_SEPARATOR, local)
            }
            // a leading '_' would read as special field marker
            (None, local) if local.starts_with(SPECIAL_FIELD_PREFIX) => {
                format!("{}{}", SPECIAL_FIELD_PREFIX, local)
            }
            (None, local) => local.to_string(),
        }
    }

    /// Decodes a physical field name.
    ///
    /// `Ok(None)` marks names that are no logical field (the document id
    /// and all `_` special fields) or that use an unknown datatype code.
    /// Names referring to unknown namespace prefixes are reported as
    /// [`ErrorKind::Corrupt`].
    pub fn index_field_for(&self, name: &str) -> Result<Option<IndexField>> {
        if name.is_empty() {
            return Err(Error::invalid_argument("the field name must not be empty"));
        }
        if let Some(field) = self.index_fields.get(&name.to_string()) {
            return Ok(Some(field));
        }
        if name == DOCUMENT_ID_FIELD || name.starts_with(SPECIAL_FIELD_PREFIX) {
            return Ok(None);
        }
        if name == SCORE_FIELD {
            return Ok(Some(self.score_field.clone()));
        }

        let mut tokens: Vec<&str> = name.split(PATH_SEPARATOR).collect();
        let prefix = if tokens.len() >= 2 { Some(tokens.remove(0)) } else { None };
        // the path always ends with a separator, anything after it is the suffix
        let suffix = if tokens.len() >= 2 { tokens.pop().filter(|s| !s.is_empty()) } else { None };

        let field = self.parse_index_field(prefix, suffix, &tokens)?;
        if let Some(field) = &field {
            self.index_fields.put(name.to_string(), field.clone());
        }
        Ok(field)
    }

    fn parse_index_field(&self, prefix: Option<&str>, suffix: Option<&str>, elements: &[&str]) -> Result<Option<IndexField>> {
        let (language, data_type_prefix) = match prefix {
            Some(p) if p.starts_with(LANG_INDICATOR) => (Some(&p[LANG_INDICATOR.len_utf8()..]), None),
            Some(p) => (None, Some(p)),
            None => (None, None),
        };
        let data_type = match IndexDataType::for_prefix_suffix(data_type_prefix, suffix) {
            Some(dt) => dt,
            None => {
                warn!(
                    "no datatype registered for prefix {:?} and suffix {:?}, skipping path {:?}",
                    data_type_prefix, suffix, elements
                );
                return Ok(None);
            }
        };

        let mut path = Vec::with_capacity(elements.len());
        for element in elements {
            if let Some(rest) = element.strip_prefix(SPECIAL_FIELD_PREFIX) {
                if !rest.starts_with(SPECIAL_FIELD_PREFIX) {
                    return Err(Error::new(
                        ErrorKind::Corrupt,
                        format!("special field {} inside path {:?}", element, elements),
                    ));
                }
                path.push(self.full_name(rest)?);
            } else {
                path.push(self.full_name(element)?);
            }
        }

        let field = match language {
            Some(lang) => IndexField::with_languages(path, data_type, [lang])?,
            None => IndexField::new(path, data_type)?,
        };
        Ok(Some(field))
    }

    /// `prefix:local` → full URI
    fn full_name(&self, short: &str) -> Result<String> {
        match short.split_once(NAMESPACE_PREFIX_SEPARATOR) {
            Some((prefix, local)) => match self.prefixes.namespace(prefix) {
                Some(namespace) => Ok(format!("{}{}", namespace, local)),
                None => Err(Error::new(
                    ErrorKind::Corrupt,
                    format!("unknown namespace prefix {} in field {}", prefix, short),
                )),
            },
            None => Ok(short.to_string()),
        }
    }

    pub fn cache_stats(&self) -> (CacheStats, CacheStats) {
        (self.field_names.stats(), self.index_fields.stats())
    }
}
