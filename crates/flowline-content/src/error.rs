//! Error types for content ingestion.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while ingesting request content.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The spill directory could not be created or is not writable.
    /// Fatal at startup.
    #[error("spill directory {path} unusable: {source}")]
    SpillDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// IO failure on a spill file.
    #[error("spill file {path}: {source}")]
    SpillIo {
        path: PathBuf,
        source: std::io::Error,
    },
}
