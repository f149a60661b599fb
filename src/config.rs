//! Run configuration, loaded from JSON and validated before any input line
//! is processed.

use std::path::Path;

use serde::Deserialize;

use crate::classify::{ClassifierPolicy, UnknownSequencePolicy};
use crate::error::Error;

/// Which kind of data source this run ingests.
///
/// The variant decides the whole sequence-handling policy bundle: primary
/// NCBI sources use fixed accession prefixes, treat unknown sequence IDs as
/// fatal, and record sequence accessions as primary identifiers; secondary
/// sources use configured prefixes, drop features on unknown sequences, and
/// record sequence IDs as secondary identifiers for cross-source merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceVariant {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConversionConfig {
    /// Organism NCBI taxon ID, e.g. "3827".
    pub taxon_id: String,
    /// Strain identifier, e.g. "CDC Frontier".
    pub strain_identifier: String,
    /// Data source name, e.g. "NCBI".
    pub data_source_name: String,
    /// Data set name; may instead be supplied by GFF `#!` header lines.
    pub data_set_name: Option<String>,
    pub data_set_description: Option<String>,
    pub data_set_version: Option<String>,
    pub data_set_licence: Option<String>,
    pub assembly_version: Option<String>,
    pub annotation_version: Option<String>,
    pub source: SourceVariant,
    /// Sequence-ID prefixes; required for (and only used by) secondary sources.
    pub chromosome_prefix: Option<String>,
    pub supercontig_prefix: Option<String>,
    /// Taxon IDs retained from taxonomy dumps. Defaults to `[taxon_id]`.
    #[serde(default)]
    pub taxon_ids: Vec<String>,
}

impl ConversionConfig {
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "failed to parse config file {}: {e}",
                path.display()
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.taxon_id.trim().is_empty() {
            return Err(Error::Config("taxonId is not set".to_string()));
        }
        if self.strain_identifier.trim().is_empty() {
            return Err(Error::Config("strainIdentifier is not set".to_string()));
        }
        if self.data_source_name.trim().is_empty() {
            return Err(Error::Config("dataSourceName is not set".to_string()));
        }
        if self.source == SourceVariant::Secondary {
            match (&self.chromosome_prefix, &self.supercontig_prefix) {
                (Some(c), Some(s)) if !c.is_empty() && !s.is_empty() => {}
                _ => {
                    return Err(Error::Config(
                        "secondary sources require chromosomePrefix and supercontigPrefix"
                            .to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Sequence classifier derived from the source variant.
    #[must_use]
    pub fn classifier_policy(&self) -> ClassifierPolicy {
        match self.source {
            SourceVariant::Primary => ClassifierPolicy::Ncbi,
            SourceVariant::Secondary => ClassifierPolicy::Prefixes {
                // validate() guarantees both prefixes are present
                chromosome: self.chromosome_prefix.clone().unwrap_or_default(),
                supercontig: self.supercontig_prefix.clone().unwrap_or_default(),
            },
        }
    }

    /// Unknown-sequence handling derived from the source variant.
    #[must_use]
    pub fn unknown_sequence_policy(&self) -> UnknownSequencePolicy {
        match self.source {
            SourceVariant::Primary => UnknownSequencePolicy::Fail,
            SourceVariant::Secondary => UnknownSequencePolicy::Skip,
        }
    }

    /// Taxon IDs to retain from taxonomy dumps.
    #[must_use]
    pub fn taxonomy_allow_list(&self) -> Vec<String> {
        if self.taxon_ids.is_empty() {
            vec![self.taxon_id.clone()]
        } else {
            self.taxon_ids.clone()
        }
    }
}
