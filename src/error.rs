//! Error types for the seedmine library.

use thiserror::Error;

/// Errors that can occur during a conversion run.
///
/// There is no internal recovery anywhere in this crate: every variant is
/// fatal to the run that raised it.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A parse error occurred while reading input data.
    #[error("{0}")]
    Parse(String),

    /// A validation constraint was violated.
    #[error("{0}")]
    Validation(String),

    /// A required configuration value is missing or malformed.
    #[error("{0}")]
    Config(String),

    /// The storage sink rejected an entity.
    #[error("store failed: {0}")]
    Store(String),
}
