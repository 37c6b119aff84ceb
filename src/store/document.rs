use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use crate::schema::consts::DOCUMENT_ID_FIELD;
use crate::store::schema::StoreSchema;

/// One field of a document about to be written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputField {
    pub values: Vec<String>,
    pub boost: f32,
}

/// Document sent to the store. Field boosts multiply with every boosted
/// value added, the way the store's client API accumulates them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputDocument {
    pub fields: BTreeMap<String, InputField>,
}

impl InputDocument {
    pub fn new() -> Self {
        InputDocument::default()
    }

    pub fn add_field(&mut self, name: &str, value: impl Into<String>) {
        self.add_field_with_boost(name, value, 1.0);
    }

    pub fn add_field_with_boost(&mut self, name: &str, value: impl Into<String>, boost: f32) {
        match self.fields.get_mut(name) {
            Some(field) => {
                field.values.push(value.into());
                field.boost *= boost;
            }
            None => {
                self.fields.insert(name.to_string(), InputField {
                    values: vec![value.into()],
                    boost,
                });
            }
        }
    }

    pub fn set_boost(&mut self, name: &str, boost: f32) {
        if let Some(field) = self.fields.get_mut(name) {
            field.boost = boost;
        }
    }

    pub fn field(&self, name: &str) -> Option<&InputField> {
        self.fields.get(name)
    }

    pub fn id(&self) -> Option<&str> {
        self.fields
            .get(DOCUMENT_ID_FIELD)
            .and_then(|f| f.values.first())
            .map(String::as_str)
    }
}

/// Document as returned by a store query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub fields: BTreeMap<String, Vec<String>>,
}

impl StoredDocument {
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn values(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.first_value(DOCUMENT_ID_FIELD)
    }
}

impl From<&InputDocument> for StoredDocument {
    fn from(doc: &InputDocument) -> Self {
        StoredDocument {
            fields: doc
                .fields
                .iter()
                .map(|(name, field)| (name.clone(), field.values.clone()))
                .collect(),
        }
    }
}

/// Document as held by the in-process store: the stored fields, their
/// index time boosts and the values copied into catch-all fields. Copied
/// values are searchable but never returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedDocument {
    pub stored: StoredDocument,
    boosts: BTreeMap<String, f32>,
    copies: BTreeMap<String, Vec<String>>,
}

impl IndexedDocument {
    pub fn new(doc: &InputDocument, schema: &StoreSchema) -> Self {
        let mut boosts = BTreeMap::new();
        let mut copies: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, field) in &doc.fields {
            if field.boost != 1.0 {
                boosts.insert(name.clone(), field.boost);
            }
            for target in schema.copy_targets(name) {
                copies.entry(target.to_string()).or_default().extend(field.values.iter().cloned());
            }
        }
        IndexedDocument {
            stored: StoredDocument::from(doc),
            boosts,
            copies,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.stored.id()
    }

    /// Stored values, or the copied ones for catch-all fields
    pub fn values(&self, name: &str) -> &[String] {
        match self.stored.fields.get(name) {
            Some(values) => values,
            None => self.copies.get(name).map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    pub fn boost(&self, name: &str) -> f32 {
        self.boosts.get(name).copied().unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boosts_accumulate_per_field() {
        let mut doc = InputDocument::new();
        doc.add_field_with_boost("@en/rdfs:label/", "cat", 2.0);
        doc.add_field("@en/rdfs:label/", "kitten");
        let field = doc.field("@en/rdfs:label/").unwrap();
        assert_eq!(field.values, vec!["cat", "kitten"]);
        assert_eq!(field.boost, 2.0);

        doc.set_boost("@en/rdfs:label/", 3.0);
        assert_eq!(doc.field("@en/rdfs:label/").unwrap().boost, 3.0);
    }

    #[test]
    fn id_comes_from_the_id_field() {
        let mut doc = InputDocument::new();
        assert_eq!(doc.id(), None);
        doc.add_field(DOCUMENT_ID_FIELD, "urn:x");
        assert_eq!(StoredDocument::from(&doc).id(), Some("urn:x"));
    }

    #[test]
    fn copied_values_are_searchable_but_not_stored() {
        let mut doc = InputDocument::new();
        doc.add_field(DOCUMENT_ID_FIELD, "urn:x");
        doc.add_field_with_boost("@en/rdfs:label/", "Cat", 2.0);
        doc.add_field("ref/rdf:type/", "urn:animal");
        let indexed = IndexedDocument::new(&doc, &StoreSchema::entityhub());
        assert_eq!(indexed.values("_text"), ["Cat".to_string()]);
        assert_eq!(indexed.values("_ref"), ["urn:animal".to_string()]);
        assert!(indexed.stored.values("_text").is_empty());
        assert_eq!(indexed.boost("@en/rdfs:label/"), 2.0);
        assert_eq!(indexed.boost("uri"), 1.0);
    }
}
