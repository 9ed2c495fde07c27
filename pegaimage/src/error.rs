//! Error types and result definitions for pega container operations.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Result type used throughout the pegaimage crate.
pub type Result<T> = std::result::Result<T, SignError>;

/// Errors produced while building, sealing, or verifying a container.
#[derive(Debug, Error)]
pub enum SignError {
    /// A record value exceeded the fixed 32-byte limit.
    #[error("record type {rtype} carries {len} value bytes, limit is {limit}")]
    ValueTooLong {
        /// Type tag of the offending record.
        rtype: u16,
        /// Actual value length in bytes.
        len: usize,
        /// Maximum allowed value length.
        limit: usize,
    },

    /// The source firmware image could not be read.
    #[error("failed to read source image '{path}': {source}")]
    Source {
        /// Path of the source image.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The destination container could not be written.
    #[error("failed to write container '{path}': {source}")]
    Destination {
        /// Path of the destination container.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The container bytes do not form a valid sealed pega image.
    #[error("invalid container: {0}")]
    InvalidContainer(String),

    /// Stream-level I/O failure while encoding or decoding records.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SignError {
    /// Creates a source read error for the given path.
    pub fn source_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Source {
            path: path.into(),
            source,
        }
    }

    /// Creates a destination write error for the given path.
    pub fn destination_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Destination {
            path: path.into(),
            source,
        }
    }

    /// Creates a container validation error.
    pub fn invalid_container(msg: impl Into<String>) -> Self {
        Self::InvalidContainer(msg.into())
    }
}
