//! Biological feature arena values and location records.
//!
//! Features live in the session's registry and are mutated in place every
//! time a record re-visits them; cross-references are typed [`EntityId`]
//! handles rather than embedded object graphs. Each feature becomes exactly
//! one [`Entity`] when the registry is flushed at the end of the run.

use crate::entity::{Entity, EntityId};
use crate::strand::Strand;

/// The closed set of feature kinds this engine produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Chromosome,
    Supercontig,
    Gene,
    MRna,
    NcRna,
    TRna,
    RRna,
    Transcript,
    Exon,
    Cds,
    Protein,
}

impl FeatureKind {
    /// Warehouse class name for this kind.
    #[must_use]
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Chromosome => "Chromosome",
            Self::Supercontig => "Supercontig",
            Self::Gene => "Gene",
            Self::MRna => "MRNA",
            Self::NcRna => "NcRNA",
            Self::TRna => "TRNA",
            Self::RRna => "RRNA",
            Self::Transcript => "Transcript",
            Self::Exon => "Exon",
            Self::Cds => "CDS",
            Self::Protein => "Protein",
        }
    }
}

/// One feature under construction.
///
/// `key` is the registry lookup key (the GFF `ID`, a sequence accession, or
/// a synthetic key); `primary_identifier` is the externally meaningful name
/// chosen by the identifier resolver. Optional fields fill in progressively
/// as records re-visit the feature.
#[derive(Debug, Clone)]
pub struct Feature {
    pub id: EntityId,
    pub key: String,
    pub kind: FeatureKind,
    pub primary_identifier: Option<String>,
    pub secondary_identifier: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub length: Option<u64>,
    pub score: Option<f64>,
    pub md5_checksum: Option<String>,
    pub assembly_version: Option<String>,
    pub annotation_version: Option<String>,
    pub organism: Option<EntityId>,
    pub strain: Option<EntityId>,
    pub data_sets: Vec<EntityId>,
    /// Containing sequence: exactly one of these is set for placed features.
    pub chromosome: Option<EntityId>,
    pub supercontig: Option<EntityId>,
    /// Location back-references, mutually exclusive like the sequence refs.
    pub chromosome_location: Option<EntityId>,
    pub supercontig_location: Option<EntityId>,
    /// Owning gene, for transcript-family features.
    pub gene: Option<EntityId>,
    /// Owning transcript, for exons.
    pub transcript: Option<EntityId>,
    /// Protein product, for CDS features.
    pub protein: Option<EntityId>,
    pub protein_domains: Vec<EntityId>,
}

impl Feature {
    #[must_use]
    pub fn new(id: EntityId, key: &str, kind: FeatureKind) -> Self {
        Self {
            id,
            key: key.to_string(),
            kind,
            primary_identifier: None,
            secondary_identifier: None,
            name: None,
            description: None,
            length: None,
            score: None,
            md5_checksum: None,
            assembly_version: None,
            annotation_version: None,
            organism: None,
            strain: None,
            data_sets: Vec::new(),
            chromosome: None,
            supercontig: None,
            chromosome_location: None,
            supercontig_location: None,
            gene: None,
            transcript: None,
            protein: None,
            protein_domains: Vec::new(),
        }
    }

    /// Add a provenance data set, keeping the collection a set.
    pub fn add_data_set(&mut self, data_set: EntityId) {
        if !self.data_sets.contains(&data_set) {
            self.data_sets.push(data_set);
        }
    }

    /// Convert into the output entity record.
    #[must_use]
    pub fn into_entity(self) -> Entity {
        let mut entity = Entity::new(self.id, self.kind.class_name());
        if let Some(v) = self.primary_identifier {
            entity.set_attribute("primaryIdentifier", v);
        }
        if let Some(v) = self.secondary_identifier {
            entity.set_attribute("secondaryIdentifier", v);
        }
        if let Some(v) = self.name {
            entity.set_attribute("name", v);
        }
        if let Some(v) = self.description {
            entity.set_attribute("description", v);
        }
        if let Some(v) = self.length {
            entity.set_attribute("length", v.to_string());
        }
        if let Some(v) = self.score {
            entity.set_attribute("score", v.to_string());
        }
        if let Some(v) = self.md5_checksum {
            entity.set_attribute("md5checksum", v);
        }
        if let Some(v) = self.assembly_version {
            entity.set_attribute("assemblyVersion", v);
        }
        if let Some(v) = self.annotation_version {
            entity.set_attribute("annotationVersion", v);
        }
        if let Some(v) = self.organism {
            entity.set_reference("organism", v);
        }
        if let Some(v) = self.strain {
            entity.set_reference("strain", v);
        }
        if let Some(v) = self.chromosome {
            entity.set_reference("chromosome", v);
        }
        if let Some(v) = self.supercontig {
            entity.set_reference("supercontig", v);
        }
        if let Some(v) = self.chromosome_location {
            entity.set_reference("chromosomeLocation", v);
        }
        if let Some(v) = self.supercontig_location {
            entity.set_reference("supercontigLocation", v);
        }
        if let Some(v) = self.gene {
            entity.set_reference("gene", v);
        }
        if let Some(v) = self.transcript {
            entity.set_reference("transcript", v);
        }
        if let Some(v) = self.protein {
            entity.set_reference("protein", v);
        }
        for data_set in self.data_sets {
            entity.add_to_collection("dataSets", data_set);
        }
        for domain in self.protein_domains {
            entity.add_to_collection("proteinDomains", domain);
        }
        entity
    }
}

/// A placement of a feature on a chromosome or supercontig.
///
/// Locations are forward-only: each placement event creates a new record,
/// stored immediately, never revisited or deduplicated.
#[derive(Debug, Clone)]
pub struct Location {
    pub id: EntityId,
    pub located_on: EntityId,
    pub feature: EntityId,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
}

impl Location {
    #[must_use]
    pub fn into_entity(self) -> Entity {
        let mut entity = Entity::new(self.id, "Location");
        entity
            .set_attribute("start", self.start.to_string())
            .set_attribute("end", self.end.to_string())
            .set_attribute("strand", self.strand.to_string())
            .set_reference("locatedOn", self.located_on)
            .set_reference("feature", self.feature);
        entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_names() {
        assert_eq!(FeatureKind::Gene.class_name(), "Gene");
        assert_eq!(FeatureKind::MRna.class_name(), "MRNA");
        assert_eq!(FeatureKind::Cds.class_name(), "CDS");
    }

    #[test]
    fn into_entity_maps_fields() {
        let mut feature = Feature::new(EntityId(5), "gene-X", FeatureKind::Gene);
        feature.primary_identifier = Some("X".to_string());
        feature.length = Some(300);
        feature.organism = Some(EntityId(1));
        feature.add_data_set(EntityId(2));
        feature.add_data_set(EntityId(2));

        let entity = feature.into_entity();
        assert_eq!(entity.class, "Gene");
        assert_eq!(entity.attributes["primaryIdentifier"], "X");
        assert_eq!(entity.attributes["length"], "300");
        assert_eq!(entity.references["organism"], EntityId(1));
        assert_eq!(entity.collections["dataSets"], vec![EntityId(2)]);
    }

    #[test]
    fn location_entity() {
        let loc = Location {
            id: EntityId(9),
            located_on: EntityId(1),
            feature: EntityId(2),
            start: 100,
            end: 200,
            strand: Strand::Reverse,
        };
        let entity = loc.into_entity();
        assert_eq!(entity.class, "Location");
        assert_eq!(entity.attributes["start"], "100");
        assert_eq!(entity.attributes["strand"], "-");
        assert_eq!(entity.references["locatedOn"], EntityId(1));
    }
}
