//! GFF3 line, attribute, and dispatch-type parsing.

use std::collections::HashMap;

use crate::error::Error;
use crate::strand::Strand;

/// The closed set of record types the engine dispatches on.
///
/// Anything else routes to `Unsupported`, which is tallied for diagnostics
/// and otherwise ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureType {
    Region,
    Gene,
    MRna,
    Exon,
    /// Any other type containing "RNA" (ncRNA, tRNA, rRNA, lnc_RNA, ...).
    OtherRna,
    Transcript,
    Unsupported,
}

impl FeatureType {
    /// Classify a raw column-3 type string. Order matters: `mRNA` must win
    /// over the contains-"RNA" arm.
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        match raw {
            "region" => Self::Region,
            "gene" => Self::Gene,
            "mRNA" => Self::MRna,
            "exon" => Self::Exon,
            "transcript" => Self::Transcript,
            _ if raw.contains("RNA") => Self::OtherRna,
            _ => Self::Unsupported,
        }
    }
}

/// Exon `gbkey` values that select the parent transcript subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GbKey {
    MRna,
    NcRna,
    TRna,
    RRna,
    MiscRna,
    Exon,
}

impl GbKey {
    /// Parse a gbkey attribute value; `None` for unrecognized values, which
    /// callers log and skip.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "mRNA" => Some(Self::MRna),
            "ncRNA" => Some(Self::NcRna),
            "tRNA" => Some(Self::TRna),
            "rRNA" => Some(Self::RRna),
            "misc_RNA" => Some(Self::MiscRna),
            "exon" => Some(Self::Exon),
            _ => None,
        }
    }
}

/// A single parsed GFF3 data line.
#[derive(Debug, Clone)]
pub struct Gff3Record {
    pub sequence_id: String,
    pub source: String,
    /// Raw column-3 type, kept for diagnostics tallies.
    pub raw_type: String,
    pub feature_type: FeatureType,
    pub start: u64,
    pub end: u64,
    pub score: Option<f64>,
    pub strand: Strand,
    attributes: HashMap<String, Vec<String>>,
}

impl Gff3Record {
    /// Parse a tab-delimited GFF3 data line (9 columns).
    pub fn parse(line: &str) -> Result<Self, Error> {
        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() != 9 {
            return Err(Error::Parse(format!(
                "GFF3 line has {} columns, expected 9",
                columns.len()
            )));
        }

        let start: u64 = columns[3]
            .parse()
            .map_err(|e| Error::Parse(format!("invalid start '{}': {e}", columns[3])))?;
        let end: u64 = columns[4]
            .parse()
            .map_err(|e| Error::Parse(format!("invalid end '{}': {e}", columns[4])))?;
        if start > end {
            return Err(Error::Parse(format!(
                "start {start} is greater than end {end}"
            )));
        }

        let score = match columns[5] {
            "." => None,
            s => Some(
                s.parse::<f64>()
                    .map_err(|e| Error::Parse(format!("invalid score '{s}': {e}")))?,
            ),
        };

        Ok(Self {
            sequence_id: columns[0].to_string(),
            source: columns[1].to_string(),
            raw_type: columns[2].to_string(),
            feature_type: FeatureType::classify(columns[2]),
            start,
            end,
            score,
            strand: Strand::from_gff3(columns[6]),
            attributes: parse_attributes(columns[8])?,
        })
    }

    /// The `ID` attribute; required for every feature record but absent on
    /// some region lines.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.first("ID")
    }

    /// First value of a possibly multi-valued attribute.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// All values of an attribute, empty if absent.
    #[must_use]
    pub fn values(&self, key: &str) -> &[String] {
        self.attributes.get(key).map_or(&[], Vec::as_slice)
    }
}

/// Parse GFF3 column 9: `;`-separated `key=value` pairs, values `,`-split.
fn parse_attributes(attrs_str: &str) -> Result<HashMap<String, Vec<String>>, Error> {
    let mut attributes: HashMap<String, Vec<String>> = HashMap::new();

    for pair in attrs_str.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let eq_pos = pair
            .find('=')
            .ok_or_else(|| Error::Parse(format!("attribute missing '=': '{pair}'")))?;
        let key = &pair[..eq_pos];
        let value = &pair[eq_pos + 1..];

        let values = attributes.entry(key.to_string()).or_default();
        for v in value.split(',') {
            values.push(url_decode(v));
        }
    }

    Ok(attributes)
}

/// Decode the percent escapes GFF3 reserves for its delimiters.
fn url_decode(value: &str) -> String {
    if !value.contains('%') {
        return value.to_string();
    }
    value
        .replace("%2C", ",")
        .replace("%3B", ";")
        .replace("%3D", "=")
        .replace("%26", "&")
        .replace("%25", "%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_gene_line() {
        let line = "NC_021160.1\tGnomon\tgene\t91418\t106326\t.\t+\t.\tID=gene-LOC101490835;Dbxref=GeneID:101490835;Name=LOC101490835;gbkey=Gene;gene=LOC101490835;gene_biotype=protein_coding";
        let record = Gff3Record::parse(line).unwrap();
        assert_eq!(record.sequence_id, "NC_021160.1");
        assert_eq!(record.feature_type, FeatureType::Gene);
        assert_eq!(record.start, 91418);
        assert_eq!(record.end, 106326);
        assert_eq!(record.score, None);
        assert_eq!(record.strand, Strand::Forward);
        assert_eq!(record.id(), Some("gene-LOC101490835"));
        assert_eq!(record.first("Name"), Some("LOC101490835"));
    }

    #[test]
    fn parse_multi_valued_attributes() {
        let line = "Ca1\tGLEAN\tgene\t482805\t485863\t0.985033\t+\t.\tID=Ca_00054;Ontology_term=GO:0003824,GO:0004372;Dbxref=InterPro:IPR001085,Pfam:PF00464";
        let record = Gff3Record::parse(line).unwrap();
        assert_eq!(record.score, Some(0.985033));
        assert_eq!(
            record.values("Ontology_term"),
            &["GO:0003824".to_string(), "GO:0004372".to_string()]
        );
        assert_eq!(record.values("Dbxref").len(), 2);
        assert!(record.values("missing").is_empty());
    }

    #[test]
    fn wrong_column_count() {
        assert!(Gff3Record::parse("a\tb\tc").is_err());
    }

    #[test]
    fn inverted_coordinates() {
        let line = "NC_021160.1\tGnomon\tgene\t200\t100\t.\t+\t.\tID=gene-A;Name=A";
        let err = Gff3Record::parse(line).unwrap_err();
        assert!(err.to_string().contains("greater than end"));
    }

    #[test]
    fn attribute_missing_equals() {
        let line = "Ca1\tX\tgene\t1\t2\t.\t+\t.\tID=g1;broken";
        assert!(Gff3Record::parse(line).is_err());
    }

    #[test]
    fn url_decoded_values() {
        let line = "Ca1\tX\tgene\t1\t2\t.\t+\t.\tID=g1;Note=serine hydroxymethyltransferase 7%3B IPR001085";
        let record = Gff3Record::parse(line).unwrap();
        assert_eq!(
            record.first("Note"),
            Some("serine hydroxymethyltransferase 7; IPR001085")
        );
    }

    #[test]
    fn classify_types() {
        assert_eq!(FeatureType::classify("region"), FeatureType::Region);
        assert_eq!(FeatureType::classify("gene"), FeatureType::Gene);
        assert_eq!(FeatureType::classify("mRNA"), FeatureType::MRna);
        assert_eq!(FeatureType::classify("exon"), FeatureType::Exon);
        assert_eq!(FeatureType::classify("transcript"), FeatureType::Transcript);
        assert_eq!(FeatureType::classify("ncRNA"), FeatureType::OtherRna);
        assert_eq!(FeatureType::classify("tRNA"), FeatureType::OtherRna);
        assert_eq!(FeatureType::classify("lnc_RNA"), FeatureType::OtherRna);
        assert_eq!(FeatureType::classify("CDS"), FeatureType::Unsupported);
        assert_eq!(FeatureType::classify("cDNA_match"), FeatureType::Unsupported);
    }

    #[test]
    fn gbkey_parsing() {
        assert_eq!(GbKey::parse("mRNA"), Some(GbKey::MRna));
        assert_eq!(GbKey::parse("misc_RNA"), Some(GbKey::MiscRna));
        assert_eq!(GbKey::parse("exon"), Some(GbKey::Exon));
        assert_eq!(GbKey::parse("Src"), None);
    }

    #[test]
    fn unstranded_region() {
        let line = "NC_021160.1\tRefSeq\tregion\t1\t48359943\t.\t.\t.\tID=NC_021160.1:1..48359943;Name=Ca1";
        let record = Gff3Record::parse(line).unwrap();
        assert_eq!(record.feature_type, FeatureType::Region);
        assert_eq!(record.strand, Strand::Unstranded);
    }
}
