//! Sequence classification: chromosome vs. supercontig by identifier shape.

use crate::error::Error;

/// Outcome of classifying a sequence identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceClass {
    Chromosome,
    Supercontig,
    Unknown,
}

/// How sequence identifiers are recognized.
///
/// Primary NCBI exports use fixed RefSeq accession prefixes; secondary
/// sources declare their own prefixes in configuration. Both policies must
/// coexist, so this is data rather than a compile-time choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierPolicy {
    /// Fixed NCBI RefSeq prefixes: `NC_` chromosome, `NW_` supercontig.
    Ncbi,
    /// Configured prefixes, compared with starts-with.
    Prefixes {
        chromosome: String,
        supercontig: String,
    },
}

impl ClassifierPolicy {
    #[must_use]
    pub fn classify(&self, sequence_id: &str) -> SequenceClass {
        let (chr, sup): (&str, &str) = match self {
            Self::Ncbi => ("NC_", "NW_"),
            Self::Prefixes {
                chromosome,
                supercontig,
            } => (chromosome, supercontig),
        };
        if sequence_id.starts_with(chr) {
            SequenceClass::Chromosome
        } else if sequence_id.starts_with(sup) {
            SequenceClass::Supercontig
        } else {
            SequenceClass::Unknown
        }
    }
}

/// What to do when a sequence identifier classifies as [`SequenceClass::Unknown`].
///
/// Primary sources are trusted to be well-formed, so an unknown identifier
/// there is a hard error; secondary sources drop the feature instead. The
/// two behaviors are intentionally not merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownSequencePolicy {
    /// Abort the run with a descriptive error.
    Fail,
    /// Omit the feature and continue.
    Skip,
}

impl UnknownSequencePolicy {
    /// Apply the policy: `Err` under `Fail`, `Ok(None)` under `Skip`.
    pub fn on_unknown<T>(self, sequence_id: &str) -> Result<Option<T>, Error> {
        match self {
            Self::Fail => Err(Error::Validation(format!(
                "sequence ID is neither a chromosome nor a supercontig: {sequence_id}"
            ))),
            Self::Skip => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ncbi_prefixes() {
        let policy = ClassifierPolicy::Ncbi;
        assert_eq!(
            policy.classify("NC_021160.1"),
            SequenceClass::Chromosome
        );
        assert_eq!(
            policy.classify("NW_004515636.1"),
            SequenceClass::Supercontig
        );
        assert_eq!(policy.classify("Ca1"), SequenceClass::Unknown);
    }

    #[test]
    fn configured_prefixes() {
        let policy = ClassifierPolicy::Prefixes {
            chromosome: "Ca".to_string(),
            supercontig: "scaffold".to_string(),
        };
        assert_eq!(policy.classify("Ca1"), SequenceClass::Chromosome);
        assert_eq!(policy.classify("scaffold12"), SequenceClass::Supercontig);
        assert_eq!(policy.classify("NC_021160.1"), SequenceClass::Unknown);
    }

    #[test]
    fn fail_policy_errors() {
        let result: Result<Option<()>, _> =
            UnknownSequencePolicy::Fail.on_unknown("chrUn");
        assert!(result.is_err());
    }

    #[test]
    fn skip_policy_drops() {
        let result: Option<()> = UnknownSequencePolicy::Skip.on_unknown("chrUn").unwrap();
        assert!(result.is_none());
    }
}
