//! Conversion-session state: the registries, caches, and singleton entities
//! shared by every converter within one run.
//!
//! A session lives for exactly one conversion job. Registries are initialized
//! empty at job start, persist across input files (a gene defined in file A
//! can be referenced as a stub from file B), and are flushed to the sink and
//! cleared by [`ConversionSession::close`]. Join records (locations, ontology
//! annotations) and the singleton Organism/Strain/DataSource/DataSet entities
//! are stored immediately on creation and never revisited.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::config::ConversionConfig;
use crate::entity::{Entity, EntityId};
use crate::error::Error;
use crate::feature::{Feature, FeatureKind};
use crate::sink::EntitySink;

pub struct ConversionSession<S: EntitySink> {
    config: ConversionConfig,
    sink: S,
    next_id: u32,

    /// Feature Registry: one entity per key for the lifetime of the run.
    features: IndexMap<String, Feature>,
    /// Gene names already claimed as primary identifiers.
    pub gene_primary_identifiers: HashSet<String>,
    /// Per-key monotonic counters for synthetic `.<n>` identifiers.
    pub suffix_counters: HashMap<String, u32>,

    /// Side tables, deduplicated globally across the run.
    ontology_terms: IndexMap<String, Entity>,
    protein_domains: IndexMap<String, Entity>,

    organism: Option<EntityId>,
    strain: Option<EntityId>,
    data_source: Option<EntityId>,
    data_set: Option<EntityId>,

    // Run metadata, seeded from config and overridable by GFF header lines.
    data_set_name: Option<String>,
    data_set_description: Option<String>,
    assembly_version: Option<String>,
    annotation_version: Option<String>,
}

impl<S: EntitySink> ConversionSession<S> {
    pub fn new(config: ConversionConfig, sink: S) -> Self {
        let data_set_name = config.data_set_name.clone();
        let data_set_description = config.data_set_description.clone();
        let assembly_version = config.assembly_version.clone();
        let annotation_version = config.annotation_version.clone();
        Self {
            config,
            sink,
            next_id: 0,
            features: IndexMap::new(),
            gene_primary_identifiers: HashSet::new(),
            suffix_counters: HashMap::new(),
            ontology_terms: IndexMap::new(),
            protein_domains: IndexMap::new(),
            organism: None,
            strain: None,
            data_source: None,
            data_set: None,
            data_set_name,
            data_set_description,
            assembly_version,
            annotation_version,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Allocate a fresh entity id.
    pub fn allocate(&mut self) -> EntityId {
        self.next_id += 1;
        EntityId(self.next_id)
    }

    /// Hand an entity to the sink immediately.
    pub fn store(&mut self, entity: &Entity) -> Result<(), Error> {
        self.sink.store(entity)
    }

    // ── registry ─────────────────────────────────────────

    /// Look up a feature by registry key.
    #[must_use]
    pub fn feature(&self, key: &str) -> Option<&Feature> {
        self.features.get(key)
    }

    #[must_use]
    pub fn feature_mut(&mut self, key: &str) -> Option<&mut Feature> {
        self.features.get_mut(key)
    }

    /// Create-if-absent, else return the existing feature for mutation.
    ///
    /// Repeated visits with the same key converge on one entity; attribute
    /// writes are last-write-wins. The kind of an existing feature is left
    /// untouched, so a stub created by a forward reference keeps the type
    /// the referencing record assigned it.
    pub fn get_or_create_feature(&mut self, key: &str, kind: FeatureKind) -> &mut Feature {
        if !self.features.contains_key(key) {
            let id = self.allocate();
            self.features
                .insert(key.to_string(), Feature::new(id, key, kind));
        }
        // just inserted if absent
        self.features.get_mut(key).unwrap()
    }

    // ── singleton entities ───────────────────────────────

    /// The run's Organism entity, created and stored on first use.
    pub fn organism(&mut self) -> Result<EntityId, Error> {
        if let Some(id) = self.organism {
            return Ok(id);
        }
        let id = self.allocate();
        let mut entity = Entity::new(id, "Organism");
        entity.set_attribute("taxonId", self.config.taxon_id.clone());
        self.store(&entity)?;
        self.organism = Some(id);
        Ok(id)
    }

    /// The run's Strain entity, created and stored on first use.
    pub fn strain(&mut self) -> Result<EntityId, Error> {
        if let Some(id) = self.strain {
            return Ok(id);
        }
        let organism = self.organism()?;
        let id = self.allocate();
        let mut entity = Entity::new(id, "Strain");
        entity
            .set_attribute("identifier", self.config.strain_identifier.clone())
            .set_reference("organism", organism);
        self.store(&entity)?;
        self.strain = Some(id);
        Ok(id)
    }

    pub fn data_source(&mut self) -> Result<EntityId, Error> {
        if let Some(id) = self.data_source {
            return Ok(id);
        }
        let id = self.allocate();
        let mut entity = Entity::new(id, "DataSource");
        entity.set_attribute("name", self.config.data_source_name.clone());
        self.store(&entity)?;
        self.data_source = Some(id);
        Ok(id)
    }

    pub fn data_set(&mut self) -> Result<EntityId, Error> {
        if let Some(id) = self.data_set {
            return Ok(id);
        }
        let name = self
            .data_set_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "dataSetName is not set (neither in config nor a GFF header)".to_string(),
                )
            })?;
        let data_source = self.data_source()?;
        let id = self.allocate();
        let mut entity = Entity::new(id, "DataSet");
        entity
            .set_attribute("name", name)
            .set_reference("dataSource", data_source);
        if let Some(description) = &self.data_set_description {
            entity.set_attribute("description", description.clone());
        }
        if let Some(version) = &self.config.data_set_version {
            entity.set_attribute("version", version.clone());
        }
        if let Some(licence) = &self.config.data_set_licence {
            entity.set_attribute("licence", licence.clone());
        }
        self.store(&entity)?;
        self.data_set = Some(id);
        Ok(id)
    }

    // ── run metadata ─────────────────────────────────────

    /// From a `#!genome-build-accession` header line.
    pub fn set_genome_build(&mut self, value: &str) {
        self.data_set_name = Some(value.to_string());
        self.assembly_version = Some(value.to_string());
    }

    /// From a `#!annotation-source` header line.
    pub fn set_annotation_source(&mut self, value: &str) {
        self.data_set_description = Some(value.to_string());
        self.annotation_version = Some(value.to_string());
    }

    #[must_use]
    pub fn assembly_version(&self) -> Option<&str> {
        self.assembly_version.as_deref()
    }

    #[must_use]
    pub fn annotation_version(&self) -> Option<&str> {
        self.annotation_version.as_deref()
    }

    // ── side tables ──────────────────────────────────────

    /// Deduplicated ontology term for the given identifier.
    ///
    /// `GO:`-prefixed identifiers become GOTerm entities, everything else a
    /// plain OntologyTerm. Stored once at session close.
    pub fn ontology_term(&mut self, identifier: &str) -> EntityId {
        if let Some(entity) = self.ontology_terms.get(identifier) {
            return entity.id;
        }
        let id = self.allocate();
        let class = if identifier.starts_with("GO:") {
            "GOTerm"
        } else {
            "OntologyTerm"
        };
        let mut entity = Entity::new(id, class);
        entity.set_attribute("identifier", identifier);
        self.ontology_terms.insert(identifier.to_string(), entity);
        id
    }

    /// Deduplicated protein domain for the given identifier, stored at close.
    pub fn protein_domain(&mut self, primary_identifier: &str) -> EntityId {
        if let Some(entity) = self.protein_domains.get(primary_identifier) {
            return entity.id;
        }
        let id = self.allocate();
        let mut entity = Entity::new(id, "ProteinDomain");
        entity.set_attribute("primaryIdentifier", primary_identifier);
        self.protein_domains
            .insert(primary_identifier.to_string(), entity);
        id
    }

    /// Create and immediately store an OntologyAnnotation join record.
    pub fn store_ontology_annotation(
        &mut self,
        subject: EntityId,
        term: EntityId,
    ) -> Result<EntityId, Error> {
        let data_set = self.data_set()?;
        let id = self.allocate();
        let mut entity = Entity::new(id, "OntologyAnnotation");
        entity
            .set_reference("subject", subject)
            .set_reference("ontologyTerm", term)
            .add_to_collection("dataSets", data_set);
        self.store(&entity)?;
        Ok(id)
    }

    // ── flush ────────────────────────────────────────────

    /// Flush every accumulated entity to the sink exactly once and clear the
    /// registries.
    pub fn close(&mut self) -> Result<(), Error> {
        let features: Vec<Feature> = self.features.drain(..).map(|(_, f)| f).collect();
        for feature in features {
            let entity = feature.into_entity();
            self.sink.store(&entity)?;
        }
        let terms: Vec<Entity> = self.ontology_terms.drain(..).map(|(_, e)| e).collect();
        for entity in terms {
            self.sink.store(&entity)?;
        }
        let domains: Vec<Entity> = self.protein_domains.drain(..).map(|(_, e)| e).collect();
        for entity in domains {
            self.sink.store(&entity)?;
        }
        self.gene_primary_identifiers.clear();
        self.suffix_counters.clear();
        Ok(())
    }

    /// Consume the session and return the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
pub(crate) fn test_config(source: crate::config::SourceVariant) -> ConversionConfig {
    let secondary = source == crate::config::SourceVariant::Secondary;
    ConversionConfig {
        taxon_id: "3827".to_string(),
        strain_identifier: "CDC Frontier".to_string(),
        data_source_name: "NCBI".to_string(),
        data_set_name: Some("test set".to_string()),
        data_set_description: None,
        data_set_version: None,
        data_set_licence: None,
        assembly_version: Some("ASM33114v1".to_string()),
        annotation_version: Some("Release 102".to_string()),
        source,
        chromosome_prefix: secondary.then(|| "Ca".to_string()),
        supercontig_prefix: secondary.then(|| "scaffold".to_string()),
        taxon_ids: Vec::new(),
    }
}
