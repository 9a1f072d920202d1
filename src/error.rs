use std::io;

/// Unified error type for the view layer and the bundled engine.
///
/// Only calls that cross into the engine produce these. Key, interval and
/// snapshot composition never fails.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Point lookup miss surfaced as an error by engine-level calls.
    #[error("Not found")]
    NotFound,
    /// Data corruption detected (CRC mismatch, bad format, checksum failure).
    #[error("Corruption: {0}")]
    Corruption(String),
    /// IO error from disk operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Rejected configuration or call arguments.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Uncategorized engine failure.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Numeric status code, stable across releases.
    pub fn code(&self) -> i32 {
        match self {
            Error::NotFound => 1,
            Error::Corruption(_) => 2,
            Error::InvalidArgument(_) => 4,
            Error::Io(_) => 5,
            Error::Other(_) => -1,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_))
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
