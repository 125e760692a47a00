//! refaudit - broken reference auditor
//!
//! Finds entries of a content repository whose link fields point at entries
//! that no longer exist, and reports them per content type.

pub mod audit;
pub mod navigator;
pub mod repository;

pub use audit::{
    ContentModel, ModelStatus, ScanError, ScanEvent, ScanOrchestrator, ScanOutcome, ScanState,
    ScanStatus,
};
pub use navigator::{EntryNavigator, RecordingNavigator, WebAppLinks};
pub use repository::contentful::ContentfulRepository;
pub use repository::memory::MemoryRepository;
pub use repository::{ContentRepository, RepositoryError};
