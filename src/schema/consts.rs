//! Physical field names and markers of the index layout. Changing any of
//! these makes existing indexes unreadable.

pub const PATH_SEPARATOR: char = '/';
pub const SPECIAL_FIELD_PREFIX: char = '_';
pub const MERGER_INDICATOR: char = '!';
pub const LANG_INDICATOR: char = '@';
pub const NAMESPACE_PREFIX_SEPARATOR: char = ':';

/// Prefix of the field every language-tagged text value is mirrored into
pub const LANG_MERGER_FIELD: &str = "_!@";

pub const DOCUMENT_ID_FIELD: &str = "uri";
pub const SCORE_FIELD: &str = "score";
pub const DOMAIN_FIELD: &str = "_domain";
pub const REFERRED_DOCUMENT_FIELD: &str = "_ref";
pub const DEPENDENT_DOCUMENT_FIELD: &str = "_dep";
pub const FULL_TEXT_FIELD: &str = "_text";
pub const SPECIAL_CONFIG_FIELD: &str = "_config";

/// Id of the document holding the namespace prefix table
pub const CONFIG_DOCUMENT_ID: &str = "urn:entityhub:index:config:namespaces";

/// Prefix standing for the bare `urn:` namespace
pub const URN_PREFIX: &str = "urn";
pub const URN_NAMESPACE: &str = "urn:";

/// Stem of generated namespace prefixes (`ns1`, `ns2`, ...)
pub const DEFAULT_NS_PREFIX: &str = "ns";

pub fn config_field_name(prefix: &str) -> String {
    format!("{}{}{}", SPECIAL_CONFIG_FIELD, PATH_SEPARATOR, prefix)
}

pub fn is_special_field(name: &str) -> bool {
    name.starts_with(SPECIAL_FIELD_PREFIX)
}
