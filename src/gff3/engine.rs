//! The GFF3 feature-resolution engine.
//!
//! One engine processes one annotation stream line by line: header lines
//! contribute run metadata, data lines are dispatched by feature type, and
//! every dispatched record flows through identifier resolution, the feature
//! registry upsert path, parent linking, and location attachment. Entities
//! accumulate in the session and are flushed when the session closes.
//!
//! The engine is parameterized by three independently injectable policies
//! (sequence classification, unknown-sequence handling, and whether sequence
//! IDs are primary or secondary identifiers), which is what distinguishes
//! primary NCBI exports from secondary annotation sources.

use std::io::BufRead;

use indexmap::IndexMap;
use log::warn;

use crate::classify::{ClassifierPolicy, SequenceClass, UnknownSequencePolicy};
use crate::config::{ConversionConfig, SourceVariant};
use crate::entity::EntityId;
use crate::error::Error;
use crate::feature::{FeatureKind, Location};
use crate::gff3::identifier::resolve_primary_identifier;
use crate::gff3::record::{FeatureType, GbKey, Gff3Record};
use crate::session::ConversionSession;
use crate::sink::EntitySink;

/// Whether sequence IDs become primary or secondary identifiers.
///
/// Secondary sources record the sequence ID as a secondary identifier so the
/// warehouse can merge their chromosomes/supercontigs with existing NCBI
/// entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierRole {
    Primary,
    Secondary,
}

pub struct GffEngine {
    classifier: ClassifierPolicy,
    on_unknown: UnknownSequencePolicy,
    id_role: IdentifierRole,
}

impl GffEngine {
    #[must_use]
    pub fn new(
        classifier: ClassifierPolicy,
        on_unknown: UnknownSequencePolicy,
        id_role: IdentifierRole,
    ) -> Self {
        Self {
            classifier,
            on_unknown,
            id_role,
        }
    }

    #[must_use]
    pub fn from_config(config: &ConversionConfig) -> Self {
        let id_role = match config.source {
            SourceVariant::Primary => IdentifierRole::Primary,
            SourceVariant::Secondary => IdentifierRole::Secondary,
        };
        Self::new(
            config.classifier_policy(),
            config.unknown_sequence_policy(),
            id_role,
        )
    }

    /// Process one annotation stream. Returns the per-type record tallies,
    /// which are also logged at end of file regardless of outcome.
    pub fn process_file<S: EntitySink, R: BufRead>(
        &self,
        session: &mut ConversionSession<S>,
        reader: R,
        file_name: &str,
    ) -> Result<IndexMap<String, u64>, Error> {
        let mut counts: IndexMap<String, u64> = IndexMap::new();
        let result = self.process_lines(session, reader, file_name, &mut counts);
        for (record_type, n) in &counts {
            log::info!("{file_name}: {n} {record_type} records");
        }
        result?;
        Ok(counts)
    }

    fn process_lines<S: EntitySink, R: BufRead>(
        &self,
        session: &mut ConversionSession<S>,
        reader: R,
        file_name: &str,
        counts: &mut IndexMap<String, u64>,
    ) -> Result<(), Error> {
        for (num, line) in reader.lines().enumerate() {
            let line = line?;
            let line_num = num + 1;
            if let Some(value) = line.strip_prefix("#!genome-build-accession ") {
                session.set_genome_build(value.trim());
            } else if let Some(value) = line.strip_prefix("#!annotation-source ") {
                session.set_annotation_source(value.trim());
            } else if line.starts_with('#') || line.trim().is_empty() {
                // comment or blank
            } else {
                let record = Gff3Record::parse(&line)
                    .map_err(|e| at_line(e, file_name, line_num))?;
                *counts.entry(record.raw_type.clone()).or_insert(0) += 1;
                self.process_record(session, &record)
                    .map_err(|e| at_line(e, file_name, line_num))?;
            }
        }
        Ok(())
    }

    /// Dispatch one parsed record by its feature type.
    pub fn process_record<S: EntitySink>(
        &self,
        session: &mut ConversionSession<S>,
        record: &Gff3Record,
    ) -> Result<(), Error> {
        match record.feature_type {
            FeatureType::Region => self.process_region(session, record),
            FeatureType::Gene => self.process_gene(session, record),
            FeatureType::MRna => self.process_transcript(session, record, FeatureKind::MRna),
            FeatureType::OtherRna => self.process_transcript(session, record, FeatureKind::NcRna),
            FeatureType::Transcript => {
                self.process_transcript(session, record, FeatureKind::Transcript)
            }
            FeatureType::Exon => self.process_exon(session, record),
            // tallied by the caller, otherwise ignored
            FeatureType::Unsupported => Ok(()),
        }
    }

    /// Create or update the chromosome/supercontig for a `region` record.
    ///
    /// The registry key is the sequence ID from column 1, never the `ID`
    /// attribute, which varies unpredictably across exports.
    fn process_region<S: EntitySink>(
        &self,
        session: &mut ConversionSession<S>,
        record: &Gff3Record,
    ) -> Result<(), Error> {
        let Some((_, _)) = self.sequence_feature(session, &record.sequence_id)? else {
            // unknown sequence under the skip policy: feature omitted
            return Ok(());
        };
        if self.id_role == IdentifierRole::Primary {
            let name = record.first("Name").map(String::from);
            let feature = session
                .feature_mut(&record.sequence_id)
                .expect("sequence feature just resolved");
            feature.length = Some(record.end);
            feature.score = record.score;
            if let Some(name) = name {
                feature.secondary_identifier = Some(name);
            }
        }
        Ok(())
    }

    fn process_gene<S: EntitySink>(
        &self,
        session: &mut ConversionSession<S>,
        record: &Gff3Record,
    ) -> Result<(), Error> {
        let (key, gene_id) = self.upsert_feature(session, record, FeatureKind::Gene)?;

        if let Some(note) = record.first("Note").map(String::from) {
            if let Some(feature) = session.feature_mut(&key) {
                feature.description = Some(note);
            }
        }

        // Ontology_term → deduplicated term + one annotation per citation
        let terms: Vec<String> = record.values("Ontology_term").to_vec();
        for identifier in terms {
            let term = session.ontology_term(&identifier);
            session.store_ontology_annotation(gene_id, term)?;
        }

        // Dbxref InterPro entries → protein-domain membership
        let xrefs: Vec<String> = record.values("Dbxref").to_vec();
        for xref in xrefs {
            if let Some(identifier) = xref.strip_prefix("InterPro:") {
                let domain = session.protein_domain(identifier);
                if let Some(feature) = session.feature_mut(&key) {
                    if !feature.protein_domains.contains(&domain) {
                        feature.protein_domains.push(domain);
                    }
                }
            }
        }
        Ok(())
    }

    /// mRNA, ncRNA-family, and generic transcript records: upsert plus a
    /// link to the parent gene, stub-created if not yet defined.
    fn process_transcript<S: EntitySink>(
        &self,
        session: &mut ConversionSession<S>,
        record: &Gff3Record,
        kind: FeatureKind,
    ) -> Result<(), Error> {
        let (key, _) = self.upsert_feature(session, record, kind)?;
        // only the first Parent is honored
        if let Some(parent_key) = record.first("Parent").map(String::from) {
            let gene = self.stub_feature(
                session,
                FeatureKind::Gene,
                &parent_key,
                &record.sequence_id,
            )?;
            if let Some(feature) = session.feature_mut(&key) {
                feature.gene = Some(gene);
            }
        } else {
            warn!("{} record '{}' has no Parent attribute", record.raw_type, key);
        }
        Ok(())
    }

    /// Exon records: the parent's concrete transcript type comes from the
    /// exon's `gbkey` attribute.
    fn process_exon<S: EntitySink>(
        &self,
        session: &mut ConversionSession<S>,
        record: &Gff3Record,
    ) -> Result<(), Error> {
        let (key, _) = self.upsert_feature(session, record, FeatureKind::Exon)?;

        let parent_kind = match record.first("gbkey") {
            Some(raw) => match GbKey::parse(raw) {
                Some(GbKey::MRna) => Some(FeatureKind::MRna),
                Some(GbKey::NcRna) => Some(FeatureKind::NcRna),
                Some(GbKey::TRna) => Some(FeatureKind::TRna),
                Some(GbKey::RRna) => Some(FeatureKind::RRna),
                Some(GbKey::MiscRna) => Some(FeatureKind::Transcript),
                Some(GbKey::Exon) => None,
                None => {
                    warn!("unusual exon gbkey={raw} on '{key}', parent link skipped");
                    None
                }
            },
            None => {
                warn!("exon '{key}' has no gbkey attribute, parent link skipped");
                None
            }
        };

        if let Some(parent_kind) = parent_kind {
            if let Some(parent_key) = record.first("Parent").map(String::from) {
                let transcript =
                    self.stub_feature(session, parent_kind, &parent_key, &record.sequence_id)?;
                if let Some(feature) = session.feature_mut(&key) {
                    feature.transcript = Some(transcript);
                }
            } else {
                warn!("exon '{key}' has no Parent attribute");
            }
        }
        Ok(())
    }

    /// The shared create-or-update path for every feature record: identifier
    /// resolution, common-attribute stamping, sequence containment, and
    /// location attachment. Returns `(registry key, entity id)`. When the
    /// record's sequence is unclassifiable under the skip policy the feature
    /// is still created, but carries no sequence reference and no location.
    fn upsert_feature<S: EntitySink>(
        &self,
        session: &mut ConversionSession<S>,
        record: &Gff3Record,
        kind: FeatureKind,
    ) -> Result<(String, EntityId), Error> {
        let key = record
            .id()
            .map(String::from)
            .ok_or_else(|| Error::Parse(format!("{} record has no ID attribute", record.raw_type)))?;

        let primary_identifier = resolve_primary_identifier(
            record,
            &mut session.gene_primary_identifiers,
            &mut session.suffix_counters,
        )?;

        let organism = session.organism()?;
        let strain = session.strain()?;
        let data_set = session.data_set()?;
        let assembly = session.assembly_version().map(String::from);
        let annotation = session.annotation_version().map(String::from);
        let sequence = self.sequence_feature(session, &record.sequence_id)?;

        let feature = session.get_or_create_feature(&key, kind);
        let feature_id = feature.id;
        feature.primary_identifier = Some(primary_identifier);
        feature.organism = Some(organism);
        feature.strain = Some(strain);
        feature.add_data_set(data_set);
        feature.assembly_version = assembly;
        feature.annotation_version = annotation;
        feature.length = Some(record.end - record.start);
        if record.score.is_some() {
            feature.score = record.score;
        }
        match sequence {
            Some((seq_id, SequenceClass::Chromosome)) => feature.chromosome = Some(seq_id),
            Some((seq_id, SequenceClass::Supercontig)) => feature.supercontig = Some(seq_id),
            _ => {}
        }

        // Locations are forward-only: a new record per placement event,
        // stored immediately.
        if let Some((seq_id, class)) = sequence {
            let location = Location {
                id: session.allocate(),
                located_on: seq_id,
                feature: feature_id,
                start: record.start,
                end: record.end,
                strand: record.strand,
            };
            let location_id = location.id;
            session.store(&location.into_entity())?;
            let feature = session
                .feature_mut(&key)
                .expect("feature just upserted");
            match class {
                SequenceClass::Chromosome => feature.chromosome_location = Some(location_id),
                SequenceClass::Supercontig => feature.supercontig_location = Some(location_id),
                SequenceClass::Unknown => unreachable!("unknown class has no sequence id"),
            }
        }

        Ok((key, feature_id))
    }

    /// Stub-creation path for forward references: create a minimally
    /// populated placeholder carrying identity, provenance, and sequence
    /// containment, to be enriched if its own record arrives later.
    fn stub_feature<S: EntitySink>(
        &self,
        session: &mut ConversionSession<S>,
        kind: FeatureKind,
        key: &str,
        sequence_id: &str,
    ) -> Result<EntityId, Error> {
        if let Some(feature) = session.feature(key) {
            return Ok(feature.id);
        }
        let organism = session.organism()?;
        let strain = session.strain()?;
        let data_set = session.data_set()?;
        let assembly = session.assembly_version().map(String::from);
        let annotation = session.annotation_version().map(String::from);
        let sequence = self.sequence_feature(session, sequence_id)?;

        let feature = session.get_or_create_feature(key, kind);
        feature.primary_identifier = Some(key.to_string());
        feature.organism = Some(organism);
        feature.strain = Some(strain);
        feature.add_data_set(data_set);
        feature.assembly_version = assembly;
        feature.annotation_version = annotation;
        match sequence {
            Some((seq_id, SequenceClass::Chromosome)) => feature.chromosome = Some(seq_id),
            Some((seq_id, SequenceClass::Supercontig)) => feature.supercontig = Some(seq_id),
            _ => {}
        }
        Ok(feature.id)
    }

    /// Resolve the chromosome/supercontig feature for a sequence ID,
    /// creating it if this is the first reference. `Ok(None)` means the ID
    /// was unclassifiable and the skip policy is in force.
    fn sequence_feature<S: EntitySink>(
        &self,
        session: &mut ConversionSession<S>,
        sequence_id: &str,
    ) -> Result<Option<(EntityId, SequenceClass)>, Error> {
        let class = self.classifier.classify(sequence_id);
        let kind = match class {
            SequenceClass::Chromosome => FeatureKind::Chromosome,
            SequenceClass::Supercontig => FeatureKind::Supercontig,
            SequenceClass::Unknown => return self.on_unknown.on_unknown(sequence_id),
        };
        if let Some(feature) = session.feature(sequence_id) {
            return Ok(Some((feature.id, class)));
        }

        let organism = session.organism()?;
        let strain = session.strain()?;
        let data_set = session.data_set()?;
        let assembly = session.assembly_version().map(String::from);
        let annotation = session.annotation_version().map(String::from);

        let feature = session.get_or_create_feature(sequence_id, kind);
        match self.id_role {
            IdentifierRole::Primary => {
                feature.primary_identifier = Some(sequence_id.to_string());
            }
            IdentifierRole::Secondary => {
                feature.secondary_identifier = Some(sequence_id.to_string());
            }
        }
        feature.organism = Some(organism);
        feature.strain = Some(strain);
        feature.add_data_set(data_set);
        feature.assembly_version = assembly;
        feature.annotation_version = annotation;
        Ok(Some((feature.id, class)))
    }
}

fn at_line(e: Error, file_name: &str, line_num: usize) -> Error {
    match e {
        Error::Parse(msg) => Error::Parse(format!("{file_name} line {line_num}: {msg}")),
        Error::Validation(msg) => {
            Error::Validation(format!("{file_name} line {line_num}: {msg}"))
        }
        other => other,
    }
}
