//! Error types for harp-export

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Audio bridge error type
#[derive(Error, Debug)]
pub enum ExportError {
    /// Filesystem write failed (disk full, permission denied, ...)
    #[error("Failed to write audio: {0}")]
    IoWrite(#[from] io::Error),

    /// Input file could not be opened or read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Input file could not be decoded
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    /// Unsupported format or feature not enabled
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Invalid audio data
    #[error("Invalid audio data: {0}")]
    InvalidData(String),
}

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(feature = "wav")]
impl From<hound::Error> for ExportError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => ExportError::IoWrite(io),
            other => ExportError::IoWrite(io::Error::other(other)),
        }
    }
}

// Write failures stay IoWrite at the endpoint boundary; anything else is a
// processing failure of the function that called the bridge.
impl From<ExportError> for harp_core::Error {
    fn from(e: ExportError) -> Self {
        match e {
            ExportError::IoWrite(io) => harp_core::Error::IoWrite(io),
            other => harp_core::Error::Processing(other.to_string()),
        }
    }
}
