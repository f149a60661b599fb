//! Strand orientation for genomic features.

use std::fmt;

/// Strand orientation from GFF3 column 7.
///
/// Locations preserve the unstranded `.` value rather than collapsing it,
/// because the warehouse distinguishes "forward" from "not stated".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
    Unstranded,
}

impl Strand {
    /// Parse from GFF3 column 7. Anything other than `+` or `-` is unstranded.
    #[must_use]
    pub fn from_gff3(s: &str) -> Self {
        match s {
            "+" => Self::Forward,
            "-" => Self::Reverse,
            _ => Self::Unstranded,
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "+"),
            Self::Reverse => write!(f, "-"),
            Self::Unstranded => write!(f, "."),
        }
    }
}
