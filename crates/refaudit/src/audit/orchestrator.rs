//! Scan orchestration
//!
//! Runs discovery once per scan, then pages and classifies every content model
//! in discovery order. Progress is published as whole [`ScanState`] snapshots
//! on a `watch` channel, so observers never see a half-applied update.
//!
//! Each scan gets a new generation. Events from an older generation are
//! dropped inside the channel update and the older run stops at its next
//! repository call.

use super::correlate::{classify_batch, BrokenEntries};
use super::error::{Result, ScanError};
use super::pager::EntryPager;
use super::schema::discover_models;
use super::state::{ContentModel, ScanEvent, ScanState};
use crate::repository::ContentRepository;
use chrono::Utc;
use refaudit_protocol::defaults::DEFAULT_PAGE_SIZE;
use refaudit_protocol::{ContentTypeId, LocaleCode};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Summary of a finished scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanOutcome {
    pub generation: u64,
    pub locale: LocaleCode,
    pub models_scanned: usize,
    pub broken_entries: usize,
    pub failed_models: Vec<ContentTypeId>,
}

impl ScanOutcome {
    /// No broken references and no failed content type
    pub fn is_clean(&self) -> bool {
        self.broken_entries == 0 && self.failed_models.is_empty()
    }
}

/// How one content model's scan ended
enum ModelResult {
    Completed { broken: usize },
    Failed { broken: usize },
}

pub struct ScanOrchestrator {
    repository: Arc<dyn ContentRepository>,
    page_size: u64,
    generation: AtomicU64,
    state: watch::Sender<Arc<ScanState>>,
}

impl ScanOrchestrator {
    pub fn new(repository: Arc<dyn ContentRepository>) -> Self {
        let (state, _) = watch::channel(Arc::new(ScanState::default()));
        Self {
            repository,
            page_size: DEFAULT_PAGE_SIZE,
            generation: AtomicU64::new(0),
            state,
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Receiver that observes every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<ScanState>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> Arc<ScanState> {
        Arc::clone(&self.state.borrow())
    }

    pub fn is_processing(&self) -> bool {
        self.state.borrow().is_processing()
    }

    /// Set the locale used by the next [`rescan`](Self::rescan). Does not scan.
    pub fn set_locale(&self, locale: LocaleCode) -> bool {
        self.state.send_if_modified(|current| {
            let mut next = (**current).clone();
            if !next.apply(ScanEvent::LocaleChanged(locale)) {
                return false;
            }
            *current = Arc::new(next);
            true
        })
    }

    /// Scan again at the active locale.
    pub async fn rescan(&self) -> Result<ScanOutcome> {
        let locale = self.snapshot().locale.clone().ok_or(ScanError::NoLocale)?;
        self.run_scan(locale).await
    }

    /// Scan unless one is already running.
    pub async fn try_run_scan(&self, locale: LocaleCode) -> Result<ScanOutcome> {
        if self.is_processing() {
            return Err(ScanError::InProgress);
        }
        self.run_scan(locale).await
    }

    /// Run a full scan at `locale`, superseding any scan in flight.
    pub async fn run_scan(&self, locale: LocaleCode) -> Result<ScanOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            generation,
            locale = %locale,
            repository = self.repository.name(),
            "Starting broken reference scan"
        );

        self.publish(
            generation,
            ScanEvent::ScanStarted {
                generation,
                locale: locale.clone(),
                at: Utc::now(),
            },
        )?;

        let models = match discover_models(self.repository.as_ref()).await {
            Ok(models) => models,
            Err(e) => {
                warn!(generation, error = %e, "Content model discovery failed");
                self.publish(
                    generation,
                    ScanEvent::ScanFailed {
                        reason: e.to_string(),
                    },
                )?;
                return Err(ScanError::SchemaFetch(e));
            }
        };

        self.publish(generation, ScanEvent::ModelsDiscovered(models.clone()))?;

        let mut broken_entries = 0;
        let mut failed_models = Vec::new();
        for model in &models {
            match self.scan_model(generation, model, &locale).await? {
                ModelResult::Completed { broken } => broken_entries += broken,
                ModelResult::Failed { broken } => {
                    broken_entries += broken;
                    failed_models.push(model.id.clone());
                }
            }
        }

        self.publish(generation, ScanEvent::ScanFinished { at: Utc::now() })?;

        let outcome = ScanOutcome {
            generation,
            locale,
            models_scanned: models.len(),
            broken_entries,
            failed_models,
        };
        info!(
            generation,
            models = outcome.models_scanned,
            broken = outcome.broken_entries,
            failed = outcome.failed_models.len(),
            "Scan finished"
        );
        Ok(outcome)
    }

    async fn scan_model(
        &self,
        generation: u64,
        model: &ContentModel,
        locale: &LocaleCode,
    ) -> Result<ModelResult> {
        let mut pager = EntryPager::new(
            Arc::clone(&self.repository),
            model.id.clone(),
            locale.clone(),
            self.page_size,
        );
        let mut broken = BrokenEntries::new();

        loop {
            let next = pager.next_batch().await;
            self.ensure_current(generation)?;

            match next {
                Ok(Some(batch)) => {
                    let found = classify_batch(&batch, &model.link_fields);
                    if found.is_empty() {
                        continue;
                    }
                    let added = broken.extend(found);
                    debug!(
                        content_type = %model.id,
                        page = batch.page_index,
                        added,
                        "Classified broken entries"
                    );
                    self.publish(
                        generation,
                        ScanEvent::BatchClassified {
                            content_type: model.id.clone(),
                            entries: broken.to_vec(),
                        },
                    )?;
                }
                Ok(None) => {
                    self.publish(
                        generation,
                        ScanEvent::TypeCompleted {
                            content_type: model.id.clone(),
                        },
                    )?;
                    info!(
                        content_type = %model.id,
                        pages = pager.requests_issued(),
                        broken = broken.len(),
                        "Content model scanned"
                    );
                    return Ok(ModelResult::Completed {
                        broken: broken.len(),
                    });
                }
                Err(e) => {
                    warn!(
                        content_type = %model.id,
                        error = %e,
                        broken = broken.len(),
                        "Entry paging failed, keeping partial results"
                    );
                    self.publish(
                        generation,
                        ScanEvent::TypeFailed {
                            content_type: model.id.clone(),
                            reason: e.to_string(),
                        },
                    )?;
                    return Ok(ModelResult::Failed {
                        broken: broken.len(),
                    });
                }
            }
        }
    }

    fn ensure_current(&self, generation: u64) -> Result<()> {
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Scan superseded, stopping");
            return Err(ScanError::Superseded { generation });
        }
        Ok(())
    }

    /// Fold an event into the published state if `generation` is still current.
    fn publish(&self, generation: u64, event: ScanEvent) -> Result<()> {
        let mut stale = false;
        self.state.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                stale = true;
                return false;
            }
            let mut next = (**current).clone();
            if !next.apply(event) {
                return false;
            }
            *current = Arc::new(next);
            true
        });

        if stale {
            debug!(generation, "Dropped event from superseded scan");
            return Err(ScanError::Superseded { generation });
        }
        Ok(())
    }
}
