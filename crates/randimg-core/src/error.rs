//! Error types for image selection.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving requests or loading image sets.
#[derive(Error, Debug)]
pub enum Error {
    /// The `type` parameter named neither an image set nor auto-detection.
    #[error("invalid type '{0}': expected pc, pe or ua")]
    InvalidType(String),

    /// An image manifest could not be interpreted.
    #[error("manifest error at line {line}: {reason}")]
    Manifest {
        /// One-based line number of the offending entry.
        line: usize,
        /// Description of what's wrong.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
