//! NCBI assembly report conversion.
//!
//! Assembly reports map human sequence names to stable accessions:
//!
//! ```text
//! # Sequence-Name Sequence-Role      Assigned-Molecule Assigned-Molecule-Location/Type GenBank-Accn Relationship RefSeq-Accn    Assembly-Unit    Sequence-Length UCSC-name
//! Ca1             assembled-molecule Ca1               Chromosome                      CM001764.1   =            NC_021160.1    Primary Assembly 48359943        na
//! scaffold1       unplaced-scaffold  na                na                              KB210354.1   =            NW_004515636.1 Primary Assembly 1037            na
//! ```
//!
//! Rows route through the session's feature registry keyed by RefSeq
//! accession, so a chromosome named here and annotated in a GFF3 file in the
//! same run converges on one entity.

use std::io::BufRead;

use crate::error::Error;
use crate::feature::FeatureKind;
use crate::session::ConversionSession;
use crate::sink::EntitySink;

const COLUMN_COUNT: usize = 10;

/// Read one assembly report and upsert a Chromosome or Supercontig per
/// qualifying row. Returns the number of rows converted.
pub fn process_assembly_report<S: EntitySink, R: BufRead>(
    session: &mut ConversionSession<S>,
    reader: R,
    file_name: &str,
) -> Result<u64, Error> {
    let mut converted = 0u64;
    for (num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != COLUMN_COUNT {
            return Err(Error::Parse(format!(
                "{file_name} line {}: expected {COLUMN_COUNT} tab-separated columns, found {}",
                num + 1,
                fields.len()
            )));
        }

        let sequence_name = fields[0];
        let sequence_role = fields[1];
        let molecule_location = fields[3];
        let relationship = fields[5];
        let refseq_accession = fields[6];
        let sequence_length = fields[8];

        // only rows asserting GenBank/RefSeq equivalence carry a usable accession
        if relationship != "=" {
            continue;
        }
        if refseq_accession.trim().is_empty() {
            return Err(Error::Parse(format!(
                "{file_name} line {}: row is missing its RefSeq accession",
                num + 1
            )));
        }

        let kind = if molecule_location == "Chromosome" {
            FeatureKind::Chromosome
        } else if sequence_role.contains("scaffold") {
            FeatureKind::Supercontig
        } else {
            continue;
        };

        let length = sequence_length.parse::<u64>().ok();
        let organism = session.organism()?;
        let strain = session.strain()?;
        let data_set = session.data_set()?;
        let assembly = session.assembly_version().map(String::from);

        let feature = session.get_or_create_feature(refseq_accession, kind);
        feature.primary_identifier = Some(refseq_accession.to_string());
        feature.secondary_identifier = Some(sequence_name.to_string());
        if length.is_some() {
            feature.length = length;
        }
        feature.organism = Some(organism);
        feature.strain = Some(strain);
        feature.add_data_set(data_set);
        feature.assembly_version = assembly;
        converted += 1;
    }
    log::info!("{file_name}: {converted} sequences converted");
    Ok(converted)
}
