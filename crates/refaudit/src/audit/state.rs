//! Scan state and the reducer that evolves it
//!
//! The orchestrator is the only writer. Every update is a [`ScanEvent`] folded
//! into a fresh copy of the state, and readers only ever see whole snapshots.
//!
//! Reducer guarantees within one generation:
//! - no model is `ready` while the overall status is `loading`
//! - a `ready` model never returns to `pending`
//! - the broken list of a `ready` model is frozen

use chrono::{DateTime, Utc};
use refaudit_protocol::{ContentTypeId, ContentTypeRecord, Entry, FieldId, LocaleCode};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Lifecycle of one content model within a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Pending,
    Ready,
}

/// Overall scan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// No scan has been started yet
    Idle,
    /// Discovering content models
    Loading,
    /// Models are known; per-type scans may still be running
    Loaded,
    /// Discovery failed
    Error,
}

/// A content type that can hold entry links
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentModel {
    pub id: ContentTypeId,
    pub name: String,
    pub link_fields: Vec<FieldId>,
    pub display_field: Option<FieldId>,
    pub status: ModelStatus,
    pub total_entries: Option<u64>,
    /// Set when paging this type failed; results up to the failure are kept.
    pub failure: Option<String>,
}

impl ContentModel {
    pub fn pending(
        record: ContentTypeRecord,
        link_fields: Vec<FieldId>,
        total_entries: Option<u64>,
    ) -> Self {
        Self {
            id: record.id,
            name: record.name,
            link_fields,
            display_field: record.display_field,
            status: ModelStatus::Pending,
            total_entries,
            failure: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == ModelStatus::Ready
    }

    /// Human-readable title of an entry of this type, falling back to its id.
    pub fn entry_title(&self, entry: &Entry) -> String {
        let value = self
            .display_field
            .as_ref()
            .and_then(|field| entry.field(field));
        match value {
            Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
            Some(Value::Number(number)) => number.to_string(),
            Some(Value::Bool(flag)) => flag.to_string(),
            _ => entry.id.to_string(),
        }
    }
}

/// Updates applied to [`ScanState`]
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// A new scan replaces everything from the previous one.
    ScanStarted {
        generation: u64,
        locale: LocaleCode,
        at: DateTime<Utc>,
    },
    ModelsDiscovered(Vec<ContentModel>),
    /// Replaces the accumulated broken list of one type.
    BatchClassified {
        content_type: ContentTypeId,
        entries: Vec<Entry>,
    },
    TypeCompleted {
        content_type: ContentTypeId,
    },
    /// Paging failed; the type becomes ready with what was accumulated.
    TypeFailed {
        content_type: ContentTypeId,
        reason: String,
    },
    ScanFailed {
        reason: String,
    },
    ScanFinished {
        at: DateTime<Utc>,
    },
    /// Locale for the next scan; does not touch results.
    LocaleChanged(LocaleCode),
}

/// Aggregate state published to observers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanState {
    pub generation: u64,
    pub status: ScanStatus,
    /// Locale the next scan will use
    pub locale: Option<LocaleCode>,
    /// Locale the current results were produced with
    pub scanned_locale: Option<LocaleCode>,
    pub content_models: Vec<ContentModel>,
    pub broken_references: BTreeMap<ContentTypeId, Vec<Entry>>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for ScanState {
    fn default() -> Self {
        Self {
            generation: 0,
            status: ScanStatus::Idle,
            locale: None,
            scanned_locale: None,
            content_models: Vec::new(),
            broken_references: BTreeMap::new(),
            error: None,
            started_at: None,
            finished_at: None,
        }
    }
}

impl ScanState {
    /// Fold one event into the state. Returns whether anything changed.
    pub fn apply(&mut self, event: ScanEvent) -> bool {
        match event {
            ScanEvent::ScanStarted {
                generation,
                locale,
                at,
            } => {
                *self = ScanState {
                    generation,
                    status: ScanStatus::Loading,
                    locale: Some(locale.clone()),
                    scanned_locale: Some(locale),
                    started_at: Some(at),
                    ..ScanState::default()
                };
                true
            }
            ScanEvent::ModelsDiscovered(models) => {
                if self.status != ScanStatus::Loading {
                    return false;
                }
                self.content_models = models
                    .into_iter()
                    .map(|mut model| {
                        model.status = ModelStatus::Pending;
                        model.failure = None;
                        model
                    })
                    .collect();
                self.broken_references = BTreeMap::new();
                self.status = ScanStatus::Loaded;
                true
            }
            ScanEvent::BatchClassified {
                content_type,
                entries,
            } => {
                if self.status != ScanStatus::Loaded {
                    return false;
                }
                match self.model(&content_type) {
                    Some(model) if !model.is_ready() => {}
                    _ => return false,
                }
                let mut broken = self.broken_references.clone();
                broken.insert(content_type, entries);
                self.broken_references = broken;
                true
            }
            ScanEvent::TypeCompleted { content_type } => self.mark_ready(&content_type, None),
            ScanEvent::TypeFailed {
                content_type,
                reason,
            } => self.mark_ready(&content_type, Some(reason)),
            ScanEvent::ScanFailed { reason } => {
                if self.status != ScanStatus::Loading {
                    return false;
                }
                self.status = ScanStatus::Error;
                self.error = Some(reason);
                self.content_models = Vec::new();
                self.broken_references = BTreeMap::new();
                true
            }
            ScanEvent::ScanFinished { at } => {
                if self.status != ScanStatus::Loaded || self.finished_at.is_some() {
                    return false;
                }
                self.finished_at = Some(at);
                true
            }
            ScanEvent::LocaleChanged(locale) => {
                if self.locale.as_ref() == Some(&locale) {
                    return false;
                }
                self.locale = Some(locale);
                true
            }
        }
    }

    fn mark_ready(&mut self, content_type: &ContentTypeId, failure: Option<String>) -> bool {
        if self.status != ScanStatus::Loaded {
            return false;
        }
        let mut models = self.content_models.clone();
        let Some(model) = models.iter_mut().find(|model| &model.id == content_type) else {
            return false;
        };
        if model.is_ready() {
            return false;
        }
        model.status = ModelStatus::Ready;
        model.failure = failure;
        self.content_models = models;
        self.broken_references
            .entry(content_type.clone())
            .or_default();
        true
    }

    pub fn model(&self, content_type: &ContentTypeId) -> Option<&ContentModel> {
        self.content_models
            .iter()
            .find(|model| &model.id == content_type)
    }

    /// A scan is loading, or some discovered model is still pending.
    pub fn is_processing(&self) -> bool {
        self.status == ScanStatus::Loading
            || self
                .content_models
                .iter()
                .any(|model| model.status == ModelStatus::Pending)
    }

    pub fn ready_count(&self) -> usize {
        self.content_models
            .iter()
            .filter(|model| model.is_ready())
            .count()
    }

    pub fn broken_entries(&self, content_type: &ContentTypeId) -> &[Entry] {
        self.broken_references
            .get(content_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn broken_count(&self, content_type: &ContentTypeId) -> usize {
        self.broken_entries(content_type).len()
    }

    pub fn total_broken(&self) -> usize {
        self.broken_references.values().map(Vec::len).sum()
    }

    pub fn failed_models(&self) -> Vec<&ContentModel> {
        self.content_models
            .iter()
            .filter(|model| model.failure.is_some())
            .collect()
    }
}
