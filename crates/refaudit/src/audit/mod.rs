//! Broken reference audit engine
//!
//! - [`schema`]: find content types with link fields
//! - [`pager`]: page through the entries of one type
//! - [`correlate`]: match per-page link errors back to entries
//! - [`orchestrator`]: drive a full scan and publish progress
//! - [`state`]: the published scan state and its reducer

pub mod correlate;
pub mod error;
pub mod orchestrator;
pub mod pager;
pub mod schema;
pub mod state;

pub use correlate::{classify_batch, BrokenEntries, LinkShape};
pub use error::{Result, ScanError};
pub use orchestrator::{ScanOrchestrator, ScanOutcome};
pub use pager::{EntryBatch, EntryPager};
pub use schema::{discover_models, is_link_field};
pub use state::{ContentModel, ModelStatus, ScanEvent, ScanState, ScanStatus};
