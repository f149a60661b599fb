//! GFF3 annotation handling: record parsing, identifier resolution, and the
//! feature-resolution engine.

pub mod engine;
pub mod identifier;
pub mod record;

pub use engine::{GffEngine, IdentifierRole};
pub use record::{FeatureType, GbKey, Gff3Record};
