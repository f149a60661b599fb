//! Primary-identifier resolution for GFF3 features.
//!
//! Raw GFF `ID` values are often implementation artifacts (`id0`,
//! `rna-XM_1`) unsuitable as stable external identifiers, so the resolver
//! prefers better material in strict priority order:
//!
//! 1. the `Name` attribute (with collision fallback for genes),
//! 2. a `gene` or `transcript_id` attribute plus a per-key `.<n>` counter,
//! 3. the raw `ID`, verbatim.

use std::collections::{HashMap, HashSet};

use crate::error::Error;
use crate::gff3::record::{FeatureType, Gff3Record};

/// Resolve the stable primary identifier for a feature record.
///
/// `gene_names` is the run-wide set of names already claimed by genes;
/// `suffix_counters` the run-wide per-key counters. Both are mutated here
/// and owned by the conversion session.
pub fn resolve_primary_identifier(
    record: &Gff3Record,
    gene_names: &mut HashSet<String>,
    suffix_counters: &mut HashMap<String, u32>,
) -> Result<String, Error> {
    // 1. Name attribute, collision-checked for genes only
    if let Some(name) = record.first("Name") {
        if record.feature_type == FeatureType::Gene {
            if gene_names.contains(name) {
                return record_id(record);
            }
            gene_names.insert(name.to_string());
        }
        return Ok(name.to_string());
    }

    // 2. gene or transcript_id attribute, counter-suffixed
    let counter_key = record.first("gene").or_else(|| record.first("transcript_id"));
    if let Some(key) = counter_key {
        let count = suffix_counters
            .entry(key.to_string())
            .and_modify(|c| *c += 1)
            .or_insert(1);
        return Ok(format!("{key}.{count}"));
    }

    // 3. raw ID, last resort
    record_id(record)
}

fn record_id(record: &Gff3Record) -> Result<String, Error> {
    record
        .id()
        .map(String::from)
        .ok_or_else(|| Error::Parse("GFF3 record has no ID attribute".to_string()))
}
