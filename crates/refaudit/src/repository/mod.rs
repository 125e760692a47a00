//! Content Repository Abstraction
//!
//! The audit engine only reads from a repository through [`ContentRepository`].
//! Two bindings exist:
//! - [`contentful::ContentfulRepository`]: Delivery/Management HTTP APIs
//! - [`memory::MemoryRepository`]: in-process fixture with deterministic responses

pub mod contentful;
pub mod memory;

use async_trait::async_trait;
use refaudit_protocol::{
    ContentTypeId, ContentTypeRecord, EntryPage, EntryPageQuery, LocaleRecord, SettingsError,
};
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while reading from a repository
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("{operation} failed with status {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The response body did not have the expected shape
    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(#[from] SettingsError),

    /// Repository refused the call (injected failures, closed gates)
    #[error("Repository unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

// =============================================================================
// Repository Trait
// =============================================================================

/// Read access to a content repository.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Full content type schema, in repository order.
    async fn list_content_types(&self) -> Result<Vec<ContentTypeRecord>>;

    /// Number of entries of a content type.
    async fn count_entries(&self, content_type: &ContentTypeId) -> Result<u64>;

    /// One page of entries in a locale, with the link errors of that fetch.
    async fn fetch_entry_page(&self, query: &EntryPageQuery) -> Result<EntryPage>;

    /// Locales configured in the repository.
    async fn list_locales(&self) -> Result<Vec<LocaleRecord>>;
}
