//! Error types for the mmdb-census library
use std::fmt;
use std::io;

/// Result type alias for census operations
pub type Result<T> = std::result::Result<T, CensusError>;

/// Main error type for locating sections and decoding MMDB files
#[derive(Debug)]
pub enum CensusError {
    /// File open, map or read failure
    Io(io::Error),

    /// Ran out of input in the middle of a value encoding
    TruncatedInput {
        /// File offset where the short read started
        offset: u64,
        /// Number of bytes that were required
        needed: usize,
    },

    /// Caller supplied an unusable argument (empty marker, reversed range)
    InvalidArgument(String),

    /// Section offsets do not describe a consistent file layout
    InvalidLayout(String),

    /// The metadata start marker does not occur in the file
    MetadataNotFound,

    /// The metadata map is missing, malformed or has bad field values
    InvalidMetadata(String),
}

impl fmt::Display for CensusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CensusError::Io(e) => write!(f, "I/O error: {}", e),
            CensusError::TruncatedInput { offset, needed } => write!(
                f,
                "Truncated input: needed {} byte(s) at offset {}",
                needed, offset
            ),
            CensusError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CensusError::InvalidLayout(msg) => write!(f, "Invalid section layout: {}", msg),
            CensusError::MetadataNotFound => write!(f, "MMDB metadata marker not found"),
            CensusError::InvalidMetadata(msg) => write!(f, "Invalid metadata: {}", msg),
        }
    }
}

impl std::error::Error for CensusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CensusError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CensusError {
    fn from(err: io::Error) -> Self {
        CensusError::Io(err)
    }
}
