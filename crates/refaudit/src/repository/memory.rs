//! In-memory repository for deterministic tests and demos
//!
//! Entries live in insertion order per content type. Entry pages report a
//! `Link` error for every referenced target that does not exist, the same way
//! the Delivery API reports unresolvable includes. Failures, scripted pages and
//! per-locale gates can be injected to exercise the orchestrator's edge cases.

use async_trait::async_trait;
use refaudit_protocol::{
    ContentTypeId, ContentTypeRecord, Entry, EntryId, EntryPage, EntryPageQuery,
    LinkResolutionError, LocaleCode, LocaleRecord,
};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;

use super::{ContentRepository, RepositoryError, Result};

const FALLBACK_LOCALE: &str = "en-US";

/// A call received by the repository (for assertions)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryCall {
    ListContentTypes,
    CountEntries(ContentTypeId),
    FetchEntryPage(EntryPageQuery),
    ListLocales,
}

#[derive(Debug, Clone)]
struct StoredEntry {
    content_type: ContentTypeId,
    id: EntryId,
    fields: HashMap<LocaleCode, Map<String, Value>>,
}

#[derive(Default)]
struct MemoryState {
    content_types: Vec<ContentTypeRecord>,
    entries: Vec<StoredEntry>,
    locales: Vec<LocaleRecord>,
    scripted_pages: HashMap<ContentTypeId, Vec<EntryPage>>,
    injected_errors: HashMap<ContentTypeId, Vec<LinkResolutionError>>,
    schema_failure: Option<String>,
    count_failure: Option<String>,
    page_failures: HashMap<(ContentTypeId, u64), String>,
    gates: HashMap<LocaleCode, Arc<Semaphore>>,
    calls: Vec<RepositoryCall>,
}

/// Repository backed by in-process collections
#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panicking test thread must not hide the state from later assertions.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // === Fixture setup ===

    pub fn add_locale(&self, code: &str, name: &str, default: bool) {
        self.lock().locales.push(LocaleRecord {
            code: code.into(),
            name: name.to_string(),
            default,
        });
    }

    pub fn add_content_type(&self, content_type: ContentTypeRecord) {
        self.lock().content_types.push(content_type);
    }

    /// Add an entry in the default locale
    pub fn add_entry(&self, content_type: &str, entry: Entry) {
        let locale = self.default_locale();
        self.add_localized_entry(content_type, locale.as_str(), entry);
    }

    /// Add (or extend) an entry with field values for one locale
    pub fn add_localized_entry(&self, content_type: &str, locale: &str, entry: Entry) {
        let mut state = self.lock();
        let content_type = ContentTypeId::from(content_type);
        let locale = LocaleCode::from(locale);

        if let Some(existing) = state
            .entries
            .iter_mut()
            .find(|stored| stored.id == entry.id && stored.content_type == content_type)
        {
            existing.fields.insert(locale, entry.fields);
            return;
        }

        let mut fields = HashMap::new();
        fields.insert(locale, entry.fields);
        state.entries.push(StoredEntry {
            content_type,
            id: entry.id,
            fields,
        });
    }

    /// Delete an entry, leaving any links to it dangling
    pub fn remove_entry(&self, id: &str) -> bool {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|stored| stored.id.as_str() != id);
        state.entries.len() != before
    }

    /// Serve these pages verbatim for a content type, indexed by `skip / limit`
    pub fn script_pages(&self, content_type: &str, pages: Vec<EntryPage>) {
        self.lock()
            .scripted_pages
            .insert(ContentTypeId::from(content_type), pages);
    }

    /// Attach an extra error to every page of a content type
    pub fn inject_error(&self, content_type: &str, error: LinkResolutionError) {
        self.lock()
            .injected_errors
            .entry(ContentTypeId::from(content_type))
            .or_default()
            .push(error);
    }

    // === Failure injection ===

    pub fn fail_schema(&self, message: &str) {
        self.lock().schema_failure = Some(message.to_string());
    }

    pub fn fail_counts(&self, message: &str) {
        self.lock().count_failure = Some(message.to_string());
    }

    /// Fail the entry page of a content type requested at `skip`
    pub fn fail_page(&self, content_type: &str, skip: u64, message: &str) {
        self.lock()
            .page_failures
            .insert((ContentTypeId::from(content_type), skip), message.to_string());
    }

    /// Hold every entry page request for a locale until permits are added
    pub fn gate_locale(&self, locale: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.lock()
            .gates
            .insert(LocaleCode::from(locale), Arc::clone(&gate));
        gate
    }

    // === Inspection ===

    pub fn calls(&self) -> Vec<RepositoryCall> {
        self.lock().calls.clone()
    }

    /// Entry page requests issued for a content type, in order
    pub fn page_requests(&self, content_type: &str) -> Vec<EntryPageQuery> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RepositoryCall::FetchEntryPage(query)
                    if query.content_type.as_str() == content_type =>
                {
                    Some(query.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn default_locale(&self) -> LocaleCode {
        self.lock()
            .locales
            .iter()
            .find(|locale| locale.default)
            .map(|locale| locale.code.clone())
            .unwrap_or_else(|| LocaleCode::from(FALLBACK_LOCALE))
    }

    fn record(&self, call: RepositoryCall) {
        self.lock().calls.push(call);
    }
}

fn reference_targets(value: &Value) -> Vec<&str> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get("sys")?.get("id")?.as_str())
            .collect(),
        Value::Object(_) => value
            .get("sys")
            .and_then(|sys| sys.get("id"))
            .and_then(Value::as_str)
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl ContentRepository for MemoryRepository {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_content_types(&self) -> Result<Vec<ContentTypeRecord>> {
        self.record(RepositoryCall::ListContentTypes);
        tokio::task::yield_now().await;

        let state = self.lock();
        if let Some(message) = &state.schema_failure {
            return Err(RepositoryError::Unavailable(message.clone()));
        }
        Ok(state.content_types.clone())
    }

    async fn count_entries(&self, content_type: &ContentTypeId) -> Result<u64> {
        self.record(RepositoryCall::CountEntries(content_type.clone()));
        tokio::task::yield_now().await;

        let state = self.lock();
        if let Some(message) = &state.count_failure {
            return Err(RepositoryError::Unavailable(message.clone()));
        }
        if let Some(pages) = state.scripted_pages.get(content_type) {
            return Ok(pages.iter().map(|page| page.items.len() as u64).sum());
        }
        Ok(state
            .entries
            .iter()
            .filter(|stored| &stored.content_type == content_type)
            .count() as u64)
    }

    async fn fetch_entry_page(&self, query: &EntryPageQuery) -> Result<EntryPage> {
        self.record(RepositoryCall::FetchEntryPage(query.clone()));

        let gate = self.lock().gates.get(&query.locale).cloned();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|_| RepositoryError::Unavailable("locale gate closed".to_string()))?
                .forget();
        }
        tokio::task::yield_now().await;

        let state = self.lock();
        if let Some(message) = state
            .page_failures
            .get(&(query.content_type.clone(), query.skip))
        {
            return Err(RepositoryError::Unavailable(message.clone()));
        }

        if let Some(pages) = state.scripted_pages.get(&query.content_type) {
            let index = (query.skip / query.limit.max(1)) as usize;
            return Ok(pages.get(index).cloned().unwrap_or_default());
        }

        let default_locale = state
            .locales
            .iter()
            .find(|locale| locale.default)
            .map(|locale| locale.code.clone())
            .unwrap_or_else(|| LocaleCode::from(FALLBACK_LOCALE));

        let matching: Vec<&StoredEntry> = state
            .entries
            .iter()
            .filter(|stored| stored.content_type == query.content_type)
            .collect();
        let total = matching.len() as u64;

        let items: Vec<Entry> = matching
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit as usize)
            .map(|stored| Entry {
                id: stored.id.clone(),
                fields: stored
                    .fields
                    .get(&query.locale)
                    .or_else(|| stored.fields.get(&default_locale))
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect();

        let existing: HashSet<&str> = state.entries.iter().map(|stored| stored.id.as_str()).collect();
        let mut seen = HashSet::new();
        let mut errors = Vec::new();
        for item in &items {
            for value in item.fields.values() {
                for target in reference_targets(value) {
                    if !existing.contains(target) && seen.insert(target.to_string()) {
                        errors.push(LinkResolutionError::link(target));
                    }
                }
            }
        }
        if !items.is_empty() {
            if let Some(injected) = state.injected_errors.get(&query.content_type) {
                errors.extend(injected.iter().cloned());
            }
        }

        Ok(EntryPage {
            items,
            errors,
            total: Some(total),
        })
    }

    async fn list_locales(&self) -> Result<Vec<LocaleRecord>> {
        self.record(RepositoryCall::ListLocales);
        Ok(self.lock().locales.clone())
    }
}
