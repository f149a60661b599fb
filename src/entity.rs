//! Output entity records handed to the storage sink.
//!
//! An [`Entity`] is the wire form of one warehouse object: a class name, a
//! flat attribute map, and named references/collections pointing at other
//! entities by id. The exact warehouse schema is owned by the downstream
//! collaborator; this crate only guarantees the shape.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Opaque per-run entity identifier, assigned at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One typed entity record.
///
/// Attribute and reference maps are ordered so the emitted stream is
/// deterministic for a given input.
#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    pub id: EntityId,
    pub class: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub references: BTreeMap<String, EntityId>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub collections: BTreeMap<String, Vec<EntityId>>,
}

impl Entity {
    #[must_use]
    pub fn new(id: EntityId, class: &str) -> Self {
        Self {
            id,
            class: class.to_string(),
            attributes: BTreeMap::new(),
            references: BTreeMap::new(),
            collections: BTreeMap::new(),
        }
    }

    /// Set an attribute, replacing any previous value.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Set a named single-valued reference, replacing any previous target.
    pub fn set_reference(&mut self, name: &str, target: EntityId) -> &mut Self {
        self.references.insert(name.to_string(), target);
        self
    }

    /// Add to a named collection, skipping ids already present.
    pub fn add_to_collection(&mut self, name: &str, target: EntityId) -> &mut Self {
        let coll = self.collections.entry(name.to_string()).or_default();
        if !coll.contains(&target) {
            coll.push(target);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_last_write_wins() {
        let mut e = Entity::new(EntityId(1), "Gene");
        e.set_attribute("primaryIdentifier", "Foo");
        e.set_attribute("primaryIdentifier", "Bar");
        assert_eq!(e.attributes["primaryIdentifier"], "Bar");
    }

    #[test]
    fn collection_is_a_set() {
        let mut e = Entity::new(EntityId(1), "Gene");
        e.add_to_collection("dataSets", EntityId(7));
        e.add_to_collection("dataSets", EntityId(7));
        e.add_to_collection("dataSets", EntityId(8));
        assert_eq!(e.collections["dataSets"], vec![EntityId(7), EntityId(8)]);
    }

    #[test]
    fn serializes_without_empty_maps() {
        let e = Entity::new(EntityId(3), "Organism");
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, r#"{"id":3,"class":"Organism"}"#);
    }
}
