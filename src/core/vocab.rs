//! Well-known namespaces and URIs used across the hub.

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";
pub const OWL_NS: &str = "http://www.w3.org/2002/07/owl#";
pub const SKOS_NS: &str = "http://www.w3.org/2004/02/skos/core#";
pub const FOAF_NS: &str = "http://xmlns.com/foaf/0.1/";
pub const DC_NS: &str = "http://purl.org/dc/terms/";
pub const GEO_NS: &str = "http://www.w3.org/2003/01/geo/wgs84_pos#";
pub const SCHEMA_NS: &str = "http://schema.org/";
pub const DBPEDIA_ONT_NS: &str = "http://dbpedia.org/ontology/";
pub const ENTITYHUB_NS: &str = "http://stanbol.apache.org/ontology/entityhub/entityhub#";
pub const QUERY_NS: &str = "http://stanbol.apache.org/ontology/entityhub/query#";

/// Default prefix for each well-known namespace. Used when minting index
/// prefixes so that field names stay readable.
pub const DEFAULT_NAMESPACES: [(&str, &str); 12] = [
    ("rdf", RDF_NS),
    ("rdfs", RDFS_NS),
    ("xsd", XSD_NS),
    ("owl", OWL_NS),
    ("skos", SKOS_NS),
    ("foaf", FOAF_NS),
    ("dc", DC_NS),
    ("geo", GEO_NS),
    ("schema", SCHEMA_NS),
    ("dbp-ont", DBPEDIA_ONT_NS),
    ("entityhub", ENTITYHUB_NS),
    ("query", QUERY_NS),
];

pub fn default_prefix_for(namespace: &str) -> Option<&'static str> {
    DEFAULT_NAMESPACES
        .iter()
        .find(|(_, ns)| *ns == namespace)
        .map(|(prefix, _)| *prefix)
}

pub fn is_default_prefix(prefix: &str) -> bool {
    DEFAULT_NAMESPACES.iter().any(|(p, _)| *p == prefix)
}

// Pseudo fields
pub const RESULT_SCORE: &str = "http://stanbol.apache.org/ontology/entityhub/query#score";
pub const FULL_TEXT_FIELD: &str = "http://stanbol.apache.org/ontology/entityhub/entityhub#fullText";
pub const REFERENCES_FIELD: &str = "http://stanbol.apache.org/ontology/entityhub/entityhub#references";

// Entity metadata
pub const IS_CACHED: &str = "http://stanbol.apache.org/ontology/entityhub/entityhub#isCached";
pub const ASSOCIATED_SITE: &str = "http://stanbol.apache.org/ontology/entityhub/entityhub#site";
pub const ABOUT: &str = "http://stanbol.apache.org/ontology/entityhub/entityhub#about";

// Datatypes
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_BYTE: &str = "http://www.w3.org/2001/XMLSchema#byte";
pub const XSD_INT: &str = "http://www.w3.org/2001/XMLSchema#int";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_LONG: &str = "http://www.w3.org/2001/XMLSchema#long";
pub const XSD_FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
pub const XSD_ANY_URI: &str = "http://www.w3.org/2001/XMLSchema#anyURI";
pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
pub const XSD_DURATION: &str = "http://www.w3.org/2001/XMLSchema#duration";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const RDF_PLAIN_LITERAL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#PlainLiteral";
pub const ENTITYHUB_UUID: &str = "http://stanbol.apache.org/ontology/entityhub/entityhub#uuid";

/// Splits a URI into namespace and local name at the last `#` or `/`,
/// falling back to the last `:`. A string without any of them is returned
/// as a local name only.
pub fn split_namespace(uri: &str) -> (Option<&str>, &str) {
    match uri.rfind(|c| c == '#' || c == '/') {
        Some(pos) => (Some(&uri[..=pos]), &uri[pos + 1..]),
        // urn:foo:bar style identifiers split at the last ':'
        None => match uri.rfind(':') {
            Some(pos) => (Some(&uri[..=pos]), &uri[pos + 1..]),
            None => (None, uri),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_hash_and_slash_namespaces() {
        assert_eq!(split_namespace("http://www.w3.org/2000/01/rdf-schema#label"),
                   (Some(RDFS_NS), "label"));
        assert_eq!(split_namespace("http://xmlns.com/foaf/0.1/name"), (Some(FOAF_NS), "name"));
        assert_eq!(split_namespace("plain"), (None, "plain"));
    }

    #[test]
    fn urn_splits_at_last_colon() {
        assert_eq!(split_namespace("urn:test:field"), (Some("urn:test:"), "field"));
        assert_eq!(split_namespace("urn:x"), (Some("urn:"), "x"));
    }

    #[test]
    fn default_prefixes() {
        assert_eq!(default_prefix_for(RDFS_NS), Some("rdfs"));
        assert!(is_default_prefix("skos"));
        assert!(!is_default_prefix("ns1"));
    }
}
