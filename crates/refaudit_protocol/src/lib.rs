//! Shared record shapes for the reference auditor.
//!
//! Everything the audit engine exchanges with a content repository lives here:
//! identifier newtypes, content type and entry records, per-fetch link errors,
//! connection settings and the filesystem locations used by the binaries.
//!
//! The shapes are repository-neutral. Bindings (HTTP, in-memory) translate
//! their own wire formats into these types.

pub mod config;
pub mod defaults;
pub mod ids;
pub mod paths;
pub mod types;

pub use config::{RepositorySettings, SettingsError};
pub use ids::{ContentTypeId, EntryId, FieldId, IdParseError, LocaleCode};
pub use types::{
    ContentTypeRecord, Entry, EntryPage, EntryPageQuery, FieldItems, FieldRecord,
    LinkResolutionError, LocaleRecord, ARRAY_FIELD_TYPE, LINK_ERROR_KIND, LINK_FIELD_TYPE,
};
