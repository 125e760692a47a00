//! Error types for scan orchestration

use crate::repository::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    /// Discovery failed; no content model was published.
    #[error("Failed to fetch content type schema: {0}")]
    SchemaFetch(#[source] RepositoryError),

    #[error("A scan is already in progress")]
    InProgress,

    /// A newer scan started while this one was running; its results were discarded.
    #[error("Scan generation {generation} was superseded by a newer scan")]
    Superseded { generation: u64 },

    #[error("No locale selected for the scan")]
    NoLocale,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ScanError>;
