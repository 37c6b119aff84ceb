use serde::{Deserialize, Serialize};
use crate::core::types::{Representation, Value};
use crate::core::vocab::{ABOUT, ASSOCIATED_SITE, IS_CACHED};

/// A representation as returned by a site, together with metadata about
/// where it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub representation: Representation,
    pub site_id: String,
    pub metadata: Representation,
}

impl Entity {
    pub fn new(representation: Representation, site_id: impl Into<String>, cached: Option<bool>) -> Self {
        let site_id = site_id.into();
        let mut metadata = Representation::new(format!("{}.meta", representation.id));
        metadata.set(ABOUT, Value::reference(representation.id.clone()));
        metadata.set(ASSOCIATED_SITE, Value::Str(site_id.clone()));
        if let Some(cached) = cached {
            metadata.set(IS_CACHED, cached);
        }
        Entity { representation, site_id, metadata }
    }

    pub fn id(&self) -> &str {
        &self.representation.id
    }

    /// `None` if the site did not record where the representation was read from
    pub fn is_cached(&self) -> Option<bool> {
        match self.metadata.first(IS_CACHED) {
            Some(Value::Bool(cached)) => Some(*cached),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_describes_origin() {
        let entity = Entity::new(Representation::new("urn:zoo:cat"), "zoo", Some(true));
        assert_eq!(entity.metadata.id, "urn:zoo:cat.meta");
        assert_eq!(entity.is_cached(), Some(true));
        assert_eq!(entity.metadata.first(ASSOCIATED_SITE), Some(&Value::Str("zoo".into())));
        assert_eq!(entity.metadata.references(ABOUT).collect::<Vec<_>>(), vec!["urn:zoo:cat"]);
    }

    #[test]
    fn cache_flag_is_optional() {
        assert_eq!(Entity::new(Representation::new("urn:x"), "s", None).is_cached(), None);
    }
}
