//! Paging behaviour seen from outside the crate.

use futures::TryStreamExt;
use refaudit::audit::{EntryBatch, EntryPager, ScanOrchestrator};
use refaudit::{ContentRepository, MemoryRepository};
use refaudit_protocol::{ContentTypeRecord, Entry, FieldRecord};
use std::sync::Arc;

fn repo_with_articles(count: usize) -> Arc<MemoryRepository> {
    let repo = Arc::new(MemoryRepository::new());
    repo.add_content_type(
        ContentTypeRecord::new("article", "Article").with_field(FieldRecord::link("author")),
    );
    for i in 0..count {
        repo.add_entry("article", Entry::new(format!("e{:04}", i)));
    }
    repo
}

#[tokio::test]
async fn default_page_size_covers_large_types() -> anyhow::Result<()> {
    let repo = repo_with_articles(2500);
    let repository: Arc<dyn ContentRepository> = repo.clone();
    let pager = EntryPager::new(repository, "article".into(), "en-US".into(), 1000);

    let batches: Vec<EntryBatch> = pager.into_stream().try_collect().await?;
    let sizes: Vec<usize> = batches.iter().map(|batch| batch.items.len()).collect();
    assert_eq!(sizes, vec![1000, 1000, 500]);
    assert_eq!(batches[2].items[0].id.as_str(), "e2000");

    let skips: Vec<u64> = repo.page_requests("article").iter().map(|q| q.skip).collect();
    assert_eq!(skips, vec![0, 1000, 2000, 3000]);
    assert!(repo.page_requests("article").iter().all(|q| q.limit == 1000));
    Ok(())
}

#[tokio::test]
async fn empty_type_is_probed_once_per_scan() -> anyhow::Result<()> {
    let repo = repo_with_articles(0);
    let orchestrator = ScanOrchestrator::new(repo.clone());

    let outcome = orchestrator.run_scan("en-US".into()).await?;
    assert_eq!(outcome.models_scanned, 1);
    assert!(outcome.is_clean());
    assert_eq!(repo.page_requests("article").len(), 1);

    let state = orchestrator.snapshot();
    assert!(state.content_models[0].is_ready());
    assert_eq!(state.content_models[0].total_entries, Some(0));
    Ok(())
}

#[tokio::test]
async fn each_scan_pages_from_the_start() -> anyhow::Result<()> {
    let repo = repo_with_articles(3);
    let orchestrator = ScanOrchestrator::new(repo.clone()).with_page_size(2);

    orchestrator.run_scan("en-US".into()).await?;
    orchestrator.run_scan("en-US".into()).await?;

    let skips: Vec<u64> = repo.page_requests("article").iter().map(|q| q.skip).collect();
    assert_eq!(skips, vec![0, 2, 4, 0, 2, 4]);
    Ok(())
}
