//! Scan command - find entries with broken references
//!
//! Progress lines go to stderr as content models finish. The final report is
//! a summary table plus one table per content model with broken entries, or
//! a single JSON document with `--json`.

use crate::cli::config::{self, ConnectionArgs};
use crate::cli::error::HelpfulError;
use crate::cli::output::{format_count, pluralize, print_table};
use refaudit::audit::{ScanError, ScanOrchestrator, ScanOutcome, ScanState, ScanStatus};
use refaudit::{ContentRepository, ContentfulRepository, WebAppLinks};
use refaudit_protocol::{ContentTypeId, LocaleCode};
use serde::Serialize;
use std::collections::HashSet;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::warn;

/// Exit code when the scan found broken references or a content model failed
pub const EXIT_BROKEN: u8 = 2;

/// Arguments for the scan command
#[derive(Debug)]
pub struct ScanArgs {
    pub locale: Option<String>,
    pub page_size: Option<u64>,
    pub json: bool,
    pub quiet: bool,
}

pub fn run(args: ScanArgs, connection: &ConnectionArgs) -> anyhow::Result<ExitCode> {
    let settings = config::resolve_settings(connection, args.page_size)?;
    let links = WebAppLinks::from_settings(&settings)
        .map_err(|e| HelpfulError::invalid_setting("web_app_host", &e.to_string()))?;
    let page_size = settings.page_size;
    let repository: Arc<dyn ContentRepository> = Arc::new(ContentfulRepository::new(settings)?);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(async { run_async(args, repository, page_size, &links).await })
}

async fn run_async(
    args: ScanArgs,
    repository: Arc<dyn ContentRepository>,
    page_size: u64,
    links: &WebAppLinks,
) -> anyhow::Result<ExitCode> {
    let locale = resolve_locale(repository.as_ref(), args.locale.as_deref()).await?;

    let orchestrator = ScanOrchestrator::new(repository).with_page_size(page_size);
    orchestrator.set_locale(locale);

    let mut progress = ProgressReporter::new(!(args.quiet || args.json));
    let mut updates = orchestrator.subscribe();
    let scan = orchestrator.rescan();
    tokio::pin!(scan);

    let result = loop {
        tokio::select! {
            biased;

            result = &mut scan => break result,

            changed = updates.changed() => {
                if changed.is_err() {
                    break (&mut scan).await;
                }
                let state = Arc::clone(&updates.borrow_and_update());
                progress.report(&state);
            }
        }
    };

    let state = orchestrator.snapshot();
    progress.report(&state);

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(ScanError::SchemaFetch(e)) => {
            return Err(HelpfulError::repository_unreachable(
                "fetch the content model schema",
                &e.to_string(),
            )
            .into());
        }
        Err(e) => return Err(e.into()),
    };

    if args.json {
        let report = ScanReport::build(&state, &outcome, links);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if args.quiet {
        for entries in state.broken_references.values() {
            for entry in entries {
                println!("{}", entry.id);
            }
        }
    } else {
        print_report(&state, &outcome, links);
    }

    Ok(if outcome.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_BROKEN)
    })
}

/// Pick the requested locale, or the space default when none was given.
async fn resolve_locale(
    repository: &dyn ContentRepository,
    requested: Option<&str>,
) -> anyhow::Result<LocaleCode> {
    let requested = match requested {
        Some(raw) => Some(
            LocaleCode::parse(raw)
                .map_err(|e| HelpfulError::invalid_setting("locale", &e.to_string()))?,
        ),
        None => None,
    };

    let locales = match repository.list_locales().await {
        Ok(locales) => locales,
        Err(e) => match requested {
            Some(locale) => {
                warn!(error = %e, locale = %locale, "Could not list locales, using requested locale as-is");
                return Ok(locale);
            }
            None => {
                return Err(
                    HelpfulError::repository_unreachable("list locales", &e.to_string()).into(),
                )
            }
        },
    };

    match requested {
        Some(locale) => {
            if locales.iter().any(|known| known.code == locale) {
                Ok(locale)
            } else {
                let available: Vec<String> =
                    locales.iter().map(|known| known.code.to_string()).collect();
                Err(HelpfulError::unknown_locale(locale.as_str(), &available).into())
            }
        }
        None => locales
            .iter()
            .find(|known| known.default)
            .or_else(|| locales.first())
            .map(|known| known.code.clone())
            .ok_or_else(|| {
                anyhow::Error::from(
                    HelpfulError::new("No locales configured in this space environment")
                        .with_suggestion("TRY: Pass a locale explicitly: refaudit scan --locale en-US"),
                )
            }),
    }
}

/// Prints one line per content model as it becomes ready
struct ProgressReporter {
    enabled: bool,
    announced: HashSet<ContentTypeId>,
    discovered: bool,
}

impl ProgressReporter {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            announced: HashSet::new(),
            discovered: false,
        }
    }

    fn report(&mut self, state: &ScanState) {
        if !self.enabled || state.status != ScanStatus::Loaded {
            return;
        }
        let total = state.content_models.len();
        if !self.discovered {
            self.discovered = true;
            eprintln!(
                "Scanning {} in locale {}...",
                pluralize(total, "content model", "content models"),
                state.scanned_locale.as_ref().map(|l| l.as_str()).unwrap_or("?")
            );
        }
        for model in state.content_models.iter().filter(|model| model.is_ready()) {
            if !self.announced.insert(model.id.clone()) {
                continue;
            }
            let broken = state.broken_count(&model.id);
            match &model.failure {
                None => eprintln!(
                    "  [{}/{}] {}: {} broken",
                    self.announced.len(),
                    total,
                    model.name,
                    pluralize(broken, "entry", "entries")
                ),
                Some(failure) => eprintln!(
                    "  [{}/{}] {}: FAILED after {} broken ({})",
                    self.announced.len(),
                    total,
                    model.name,
                    pluralize(broken, "entry", "entries"),
                    failure
                ),
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ScanReport {
    ok: bool,
    locale: LocaleCode,
    generation: u64,
    started_at: Option<String>,
    finished_at: Option<String>,
    total_broken: usize,
    /// False when at least one content model could not be scanned to the end
    complete: bool,
    failed_models: Vec<ContentTypeId>,
    models: Vec<ModelReport>,
}

#[derive(Debug, Serialize)]
struct ModelReport {
    id: ContentTypeId,
    name: String,
    total_entries: Option<u64>,
    link_fields: Vec<String>,
    failure: Option<String>,
    content_type_url: String,
    entries_url: String,
    broken: Vec<BrokenEntryReport>,
}

#[derive(Debug, Serialize)]
struct BrokenEntryReport {
    id: String,
    title: String,
    url: String,
}

impl ScanReport {
    fn build(state: &ScanState, outcome: &ScanOutcome, links: &WebAppLinks) -> Self {
        let models = state
            .content_models
            .iter()
            .map(|model| ModelReport {
                id: model.id.clone(),
                name: model.name.clone(),
                total_entries: model.total_entries,
                link_fields: model.link_fields.iter().map(|f| f.to_string()).collect(),
                failure: model.failure.clone(),
                content_type_url: links.content_type_url(&model.id),
                entries_url: links.entries_url(&model.id),
                broken: state
                    .broken_entries(&model.id)
                    .iter()
                    .map(|entry| BrokenEntryReport {
                        id: entry.id.to_string(),
                        title: model.entry_title(entry),
                        url: links.entry_url(&entry.id),
                    })
                    .collect(),
            })
            .collect();

        Self {
            ok: true,
            locale: outcome.locale.clone(),
            generation: outcome.generation,
            started_at: state.started_at.map(|t| t.to_rfc3339()),
            finished_at: state.finished_at.map(|t| t.to_rfc3339()),
            total_broken: state.total_broken(),
            complete: outcome.failed_models.is_empty(),
            failed_models: outcome.failed_models.clone(),
            models,
        }
    }
}

fn print_report(state: &ScanState, outcome: &ScanOutcome, links: &WebAppLinks) {
    println!();
    println!("BROKEN REFERENCES ({})", outcome.locale);
    println!();

    if state.content_models.is_empty() {
        println!("No content models have link fields. Nothing to check.");
        return;
    }

    let rows: Vec<Vec<String>> = state
        .content_models
        .iter()
        .map(|model| {
            let broken = match &model.failure {
                Some(_) => format!("{} (incomplete)", state.broken_count(&model.id)),
                None => state.broken_count(&model.id).to_string(),
            };
            vec![
                model.name.clone(),
                format_count(model.total_entries),
                model
                    .link_fields
                    .iter()
                    .map(|f| f.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                broken,
            ]
        })
        .collect();
    print_table(
        &["Content Model", "Total entries", "Link Fields", "Broken References"],
        rows,
    );

    for model in &state.content_models {
        let entries = state.broken_entries(&model.id);
        if entries.is_empty() {
            continue;
        }
        println!();
        println!(
            "{} ({})",
            model.name,
            pluralize(entries.len(), "broken entry", "broken entries")
        );
        println!("  {}", links.entries_url(&model.id));
        let rows = entries
            .iter()
            .map(|entry| {
                vec![
                    model.entry_title(entry),
                    entry.id.to_string(),
                    links.entry_url(&entry.id),
                ]
            })
            .collect();
        print_table(&["Entry", "ID", "Editor"], rows);
    }

    for model in state.failed_models() {
        eprintln!();
        eprintln!(
            "WARNING: Scanning '{}' failed: {}",
            model.name,
            model.failure.as_deref().unwrap_or_default()
        );
        eprintln!("         Results for this content model may be incomplete.");
    }

    println!();
    if outcome.is_clean() {
        println!("No broken references found.");
    } else {
        println!(
            "Found {} across {}.",
            pluralize(outcome.broken_entries, "broken entry", "broken entries"),
            pluralize(outcome.models_scanned, "content model", "content models")
        );
    }
}
