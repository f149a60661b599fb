//! FASTA sequence file conversion.
//!
//! Headers carry three layers of information:
//!
//! ```text
//! >NP_001265926.1 rab-type small GTP-binding protein [Cicer arietinum]
//! >lcl|NC_021160.1_cds_XP_004485403.1_1 [gene=LOC101488545] [protein_id=XP_004485403.1] [gbkey=CDS]
//! ```
//!
//! The token before the first space is the identifier (for `|`-delimited
//! tokens, the second sub-field); the remaining tokens up to the first `[`
//! form the free-text name; bracketed `key=value` tags supply cross-references
//! for CDS records. Residues are not persisted, only length and an MD5 hex
//! digest of the concatenated sequence.

use std::collections::HashMap;
use std::io::BufRead;

use md5::{Digest, Md5};

use crate::classify::{ClassifierPolicy, SequenceClass};
use crate::error::Error;
use crate::feature::FeatureKind;
use crate::session::ConversionSession;
use crate::sink::EntitySink;

/// What a FASTA file contains, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastaKind {
    /// `.fna`: genomic sequences or CDS extracts.
    Dna,
    /// `.faa`: protein sequences.
    Protein,
}

impl FastaKind {
    #[must_use]
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let base = file_name.strip_suffix(".gz").unwrap_or(file_name);
        if base.ends_with(".fna") {
            Some(Self::Dna)
        } else if base.ends_with(".faa") {
            Some(Self::Protein)
        } else {
            None
        }
    }
}

/// One header plus the digest/length of the sequence that followed it.
#[derive(Debug)]
struct FastaEntry {
    header: String,
    length: u64,
    md5_checksum: String,
}

/// Read one FASTA file and upsert a feature per sequence. Returns the number
/// of sequences converted.
pub fn process_fasta<S: EntitySink, R: BufRead>(
    session: &mut ConversionSession<S>,
    reader: R,
    file_name: &str,
    kind: FastaKind,
) -> Result<u64, Error> {
    let mut converted = 0u64;
    let mut current: Option<(String, Md5, u64)> = None;

    for line in reader.lines() {
        let line = line?;
        if let Some(header) = line.strip_prefix('>') {
            if let Some(entry) = finish_entry(current.take()) {
                convert_entry(session, &entry, kind)?;
                converted += 1;
            }
            current = Some((header.to_string(), Md5::new(), 0));
        } else if let Some((_, hasher, length)) = current.as_mut() {
            let residues = line.trim();
            hasher.update(residues.as_bytes());
            *length += residues.len() as u64;
        } else if !line.trim().is_empty() {
            return Err(Error::Parse(format!(
                "{file_name}: sequence data before the first FASTA header"
            )));
        }
    }
    if let Some(entry) = finish_entry(current.take()) {
        convert_entry(session, &entry, kind)?;
        converted += 1;
    }

    log::info!("{file_name}: {converted} sequences converted");
    Ok(converted)
}

fn finish_entry(current: Option<(String, Md5, u64)>) -> Option<FastaEntry> {
    current.map(|(header, hasher, length)| FastaEntry {
        header,
        length,
        md5_checksum: format!("{:x}", hasher.finalize()),
    })
}

fn convert_entry<S: EntitySink>(
    session: &mut ConversionSession<S>,
    entry: &FastaEntry,
    kind: FastaKind,
) -> Result<(), Error> {
    let identifier = header_identifier(&entry.header);
    let name = header_name(&entry.header);
    let tags = bracket_tags(&entry.header);

    let organism = session.organism()?;
    let strain = session.strain()?;
    let data_set = session.data_set()?;
    let assembly = session.assembly_version().map(String::from);
    let annotation = session.annotation_version().map(String::from);

    let feature_kind = match kind {
        FastaKind::Protein => FeatureKind::Protein,
        FastaKind::Dna if tags.contains_key("protein_id") || tags.contains_key("gene") => {
            FeatureKind::Cds
        }
        FastaKind::Dna => match ClassifierPolicy::Ncbi.classify(&identifier) {
            SequenceClass::Chromosome => FeatureKind::Chromosome,
            SequenceClass::Supercontig => FeatureKind::Supercontig,
            SequenceClass::Unknown => {
                return Err(Error::Validation(format!(
                    "cannot tell whether sequence '{identifier}' is a chromosome or a supercontig"
                )));
            }
        },
    };

    // CDS cross-references come from the bracket tags
    let gene = match tags.get("gene") {
        Some(gene_name) if feature_kind == FeatureKind::Cds => {
            let feature = session.get_or_create_feature(gene_name, FeatureKind::Gene);
            if feature.primary_identifier.is_none() {
                feature.primary_identifier = Some(gene_name.clone());
            }
            Some(feature.id)
        }
        _ => None,
    };
    let protein = match tags.get("protein_id") {
        Some(protein_id) if feature_kind == FeatureKind::Cds => {
            let feature = session.get_or_create_feature(protein_id, FeatureKind::Protein);
            if feature.primary_identifier.is_none() {
                feature.primary_identifier = Some(protein_id.clone());
            }
            Some(feature.id)
        }
        _ => None,
    };

    let feature = session.get_or_create_feature(&identifier, feature_kind);
    feature.primary_identifier = Some(identifier);
    if let Some(name) = name {
        feature.name = Some(name);
    }
    if let Some(description) = tags.get("protein") {
        feature.description = Some(description.clone());
    }
    feature.length = Some(entry.length);
    feature.md5_checksum = Some(entry.md5_checksum.clone());
    feature.organism = Some(organism);
    feature.strain = Some(strain);
    feature.add_data_set(data_set);
    feature.assembly_version = assembly;
    feature.annotation_version = annotation;
    if gene.is_some() {
        feature.gene = gene;
    }
    if protein.is_some() {
        feature.protein = protein;
    }
    Ok(())
}

/// The token before the first space; for `lcl|...`-style tokens, the second
/// `|`-delimited sub-field.
fn header_identifier(header: &str) -> String {
    let first = header.split(' ').next().unwrap_or(header);
    if first.contains('|') {
        let mut subfields = first.split('|');
        subfields.next();
        if let Some(second) = subfields.next() {
            return second.to_string();
        }
    }
    first.to_string()
}

/// Free-text name: tokens after the identifier, up to the first `[`.
fn header_name(header: &str) -> Option<String> {
    let mut words = Vec::new();
    for token in header.split(' ').skip(1) {
        if token.contains('[') {
            break;
        }
        words.push(token);
    }
    let name = words.join(" ");
    (!name.trim().is_empty()).then(|| name.trim().to_string())
}

/// `[key=value]` tags. Values may contain spaces, so scanning is bracket
/// delimited rather than token based.
fn bracket_tags(header: &str) -> HashMap<String, String> {
    let mut tags = HashMap::new();
    let mut rest = header;
    while let Some(open) = rest.find('[') {
        let Some(close_offset) = rest[open + 1..].find(']') else {
            break;
        };
        let inner = &rest[open + 1..open + 1 + close_offset];
        if let Some((key, value)) = inner.split_once('=') {
            tags.insert(key.trim().to_string(), value.trim().to_string());
        }
        rest = &rest[open + 1 + close_offset + 1..];
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceVariant;
    use crate::session::test_config;
    use crate::sink::MemorySink;
    use std::io::Cursor;

    fn session() -> ConversionSession<MemorySink> {
        ConversionSession::new(test_config(SourceVariant::Primary), MemorySink::new())
    }

    #[test]
    fn kind_from_file_name() {
        assert_eq!(
            FastaKind::from_file_name("GCF_000331145.1_ASM33114v1_genomic.fna"),
            Some(FastaKind::Dna)
        );
        assert_eq!(
            FastaKind::from_file_name("protein.faa.gz"),
            Some(FastaKind::Protein)
        );
        assert_eq!(FastaKind::from_file_name("names.dmp"), None);
    }

    #[test]
    fn identifier_plain_and_piped() {
        assert_eq!(
            header_identifier("NP_001265926.1 rab-type small GTP-binding protein"),
            "NP_001265926.1"
        );
        assert_eq!(
            header_identifier("lcl|NC_021160.1_cds_XP_004485403.1_1 [gene=LOC101488545]"),
            "NC_021160.1_cds_XP_004485403.1_1"
        );
    }

    #[test]
    fn name_stops_at_bracket() {
        assert_eq!(
            header_name("NP_001265926.1 rab-type small GTP-binding protein [Cicer arietinum]"),
            Some("rab-type small GTP-binding protein".to_string())
        );
        assert_eq!(header_name("NC_021160.1"), None);
    }

    #[test]
    fn bracket_tags_with_spaces() {
        let tags = bracket_tags(
            "lcl|x_1 [gene=LOC101488545] [protein=protein phosphatase 1 regulatory subunit INH3-like] [protein_id=XP_004485403.1]",
        );
        assert_eq!(tags["gene"], "LOC101488545");
        assert_eq!(tags["protein_id"], "XP_004485403.1");
        assert_eq!(
            tags["protein"],
            "protein phosphatase 1 regulatory subunit INH3-like"
        );
    }

    #[test]
    fn genomic_fna_classifies_sequences() {
        let fasta = ">NC_021160.1 Cicer arietinum chromosome 1\nACGTACGT\nACGT\n>NW_004515636.1 unplaced scaffold\nGGCC\n";
        let mut s = session();
        let n = process_fasta(&mut s, Cursor::new(fasta.as_bytes()), "genomic.fna", FastaKind::Dna)
            .unwrap();
        assert_eq!(n, 2);
        s.close().unwrap();
        let sink = s.into_sink();

        let chromosomes = sink.of_class("Chromosome");
        assert_eq!(chromosomes.len(), 1);
        assert_eq!(chromosomes[0].attributes["primaryIdentifier"], "NC_021160.1");
        assert_eq!(chromosomes[0].attributes["length"], "12");
        // md5 of "ACGTACGTACGT"
        assert_eq!(
            chromosomes[0].attributes["md5checksum"],
            "31e91beccf6059ff57c696827c0c6a4b"
        );
        assert_eq!(sink.of_class("Supercontig").len(), 1);
    }

    #[test]
    fn unclassifiable_genomic_sequence_is_fatal() {
        let fasta = ">chrUn_random\nACGT\n";
        let mut s = session();
        let err =
            process_fasta(&mut s, Cursor::new(fasta.as_bytes()), "genomic.fna", FastaKind::Dna)
                .unwrap_err();
        assert!(err.to_string().contains("chrUn_random"));
    }

    #[test]
    fn cds_fna_links_gene_and_protein() {
        let fasta = ">lcl|NC_021160.1_cds_XP_004485403.1_1 [gene=LOC101488545] [protein=INH3-like] [protein_id=XP_004485403.1] [gbkey=CDS]\nATGGCC\n";
        let mut s = session();
        process_fasta(&mut s, Cursor::new(fasta.as_bytes()), "cds.fna", FastaKind::Dna).unwrap();
        s.close().unwrap();
        let sink = s.into_sink();

        let cds = sink.of_class("CDS");
        assert_eq!(cds.len(), 1);
        assert_eq!(
            cds[0].attributes["primaryIdentifier"],
            "NC_021160.1_cds_XP_004485403.1_1"
        );
        assert_eq!(cds[0].attributes["description"], "INH3-like");
        let genes = sink.of_class("Gene");
        assert_eq!(genes.len(), 1);
        assert_eq!(genes[0].attributes["primaryIdentifier"], "LOC101488545");
        assert_eq!(cds[0].references["gene"], genes[0].id);
        let proteins = sink.of_class("Protein");
        assert_eq!(proteins.len(), 1);
        assert_eq!(cds[0].references["protein"], proteins[0].id);
    }

    #[test]
    fn faa_stores_proteins() {
        let fasta = ">NP_001265926.1 rab-type small GTP-binding protein [Cicer arietinum]\nMSRRT\nKLV\n";
        let mut s = session();
        process_fasta(&mut s, Cursor::new(fasta.as_bytes()), "protein.faa", FastaKind::Protein)
            .unwrap();
        s.close().unwrap();
        let sink = s.into_sink();

        let proteins = sink.of_class("Protein");
        assert_eq!(proteins.len(), 1);
        assert_eq!(proteins[0].attributes["primaryIdentifier"], "NP_001265926.1");
        assert_eq!(
            proteins[0].attributes["name"],
            "rab-type small GTP-binding protein"
        );
        assert_eq!(proteins[0].attributes["length"], "8");
    }

    #[test]
    fn cds_entry_merges_with_existing_protein() {
        let mut s = session();
        // protein first, CDS second: the protein_id cross-reference must
        // find the existing entity
        let faa = ">XP_004485403.1 INH3-like [Cicer arietinum]\nMAV\n";
        process_fasta(&mut s, Cursor::new(faa.as_bytes()), "protein.faa", FastaKind::Protein)
            .unwrap();
        let fna = ">lcl|NC_021160.1_cds_XP_004485403.1_1 [gene=LOC101488545] [protein_id=XP_004485403.1]\nATG\n";
        process_fasta(&mut s, Cursor::new(fna.as_bytes()), "cds.fna", FastaKind::Dna).unwrap();
        s.close().unwrap();
        let sink = s.into_sink();

        let proteins = sink.of_class("Protein");
        assert_eq!(proteins.len(), 1);
        assert_eq!(
            sink.of_class("CDS")[0].references["protein"],
            proteins[0].id
        );
    }

    #[test]
    fn data_before_header_is_fatal() {
        let mut s = session();
        let err = process_fasta(
            &mut s,
            Cursor::new(b"ACGT\n".as_slice()),
            "genomic.fna",
            FastaKind::Dna,
        )
        .unwrap_err();
        assert!(err.to_string().contains("header"));
    }
}
