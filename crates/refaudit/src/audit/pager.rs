//! Entry pagination for one content type
//!
//! A pager is a fresh cursor: page `n` is requested at `skip = n * page_size`
//! and the sequence ends after the first page with no items. Fetch failures
//! end the sequence too and are not retried.

use crate::repository::{ContentRepository, RepositoryError};
use futures::stream::{self, Stream};
use refaudit_protocol::{ContentTypeId, Entry, EntryPageQuery, LinkResolutionError, LocaleCode};
use std::sync::Arc;
use tracing::debug;

/// One non-empty page of entries and the errors reported with it
#[derive(Debug, Clone, PartialEq)]
pub struct EntryBatch {
    pub page_index: u64,
    pub skip: u64,
    pub items: Vec<Entry>,
    pub errors: Vec<LinkResolutionError>,
}

pub struct EntryPager {
    repository: Arc<dyn ContentRepository>,
    content_type: ContentTypeId,
    locale: LocaleCode,
    page_size: u64,
    page_index: u64,
    requests: u64,
    exhausted: bool,
}

impl EntryPager {
    pub fn new(
        repository: Arc<dyn ContentRepository>,
        content_type: ContentTypeId,
        locale: LocaleCode,
        page_size: u64,
    ) -> Self {
        Self {
            repository,
            content_type,
            locale,
            page_size: page_size.max(1),
            page_index: 0,
            requests: 0,
            exhausted: false,
        }
    }

    /// Page requests sent so far, including the final empty probe.
    pub fn requests_issued(&self) -> u64 {
        self.requests
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fetch the next batch, or `None` once the type has no more entries.
    pub async fn next_batch(&mut self) -> Result<Option<EntryBatch>, RepositoryError> {
        if self.exhausted {
            return Ok(None);
        }

        let query = EntryPageQuery {
            content_type: self.content_type.clone(),
            locale: self.locale.clone(),
            skip: self.page_index * self.page_size,
            limit: self.page_size,
        };
        self.requests += 1;

        let page = match self.repository.fetch_entry_page(&query).await {
            Ok(page) => page,
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        };

        if page.items.is_empty() {
            debug!(
                content_type = %self.content_type,
                skip = query.skip,
                "Reached end of entries"
            );
            self.exhausted = true;
            return Ok(None);
        }

        debug!(
            content_type = %self.content_type,
            page = self.page_index,
            skip = query.skip,
            items = page.items.len(),
            errors = page.errors.len(),
            "Fetched entry page"
        );

        let batch = EntryBatch {
            page_index: self.page_index,
            skip: query.skip,
            items: page.items,
            errors: page.errors,
        };
        self.page_index += 1;
        Ok(Some(batch))
    }

    /// Adapt the pager into a stream of batches that ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<EntryBatch, RepositoryError>> + Send {
        stream::try_unfold(self, |mut pager| async move {
            let next = pager.next_batch().await?;
            Ok::<_, RepositoryError>(next.map(|batch| (batch, pager)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryRepository;
    use futures::TryStreamExt;
    use refaudit_protocol::EntryPage;
    use serde_json::json;

    fn repo_with_entries(count: usize) -> Arc<MemoryRepository> {
        let repo = Arc::new(MemoryRepository::new());
        for i in 0..count {
            repo.add_entry("article", Entry::new(format!("e{}", i)));
        }
        repo
    }

    fn pager(repo: &Arc<MemoryRepository>, page_size: u64) -> EntryPager {
        EntryPager::new(
            repo.clone() as Arc<dyn ContentRepository>,
            "article".into(),
            "en-US".into(),
            page_size,
        )
    }

    #[tokio::test]
    async fn yields_ceil_batches_then_stops() {
        let repo = repo_with_entries(25);
        let mut pager = pager(&repo, 10);

        let mut sizes = Vec::new();
        while let Some(batch) = pager.next_batch().await.unwrap() {
            sizes.push(batch.items.len());
        }

        assert_eq!(sizes, vec![10, 10, 5]);
        assert_eq!(pager.requests_issued(), 4);
        let skips: Vec<u64> = repo.page_requests("article").iter().map(|q| q.skip).collect();
        assert_eq!(skips, vec![0, 10, 20, 30]);
    }

    #[tokio::test]
    async fn empty_type_needs_one_probe() {
        let repo = repo_with_entries(0);
        let mut pager = pager(&repo, 1000);

        assert!(pager.next_batch().await.unwrap().is_none());
        assert!(pager.next_batch().await.unwrap().is_none());
        assert_eq!(pager.requests_issued(), 1);
        assert_eq!(repo.page_requests("article").len(), 1);
    }

    #[tokio::test]
    async fn exact_multiple_still_probes_past_the_end() {
        let repo = repo_with_entries(20);
        let mut pager = pager(&repo, 10);

        let mut batches = 0;
        while pager.next_batch().await.unwrap().is_some() {
            batches += 1;
        }
        assert_eq!(batches, 2);
        assert_eq!(pager.requests_issued(), 3);
    }

    #[tokio::test]
    async fn batches_carry_only_their_own_errors() {
        let repo = Arc::new(MemoryRepository::new());
        repo.script_pages(
            "article",
            vec![
                EntryPage {
                    items: vec![Entry::new("e1")],
                    errors: vec![LinkResolutionError::link("x1")],
                    total: None,
                },
                EntryPage {
                    items: vec![Entry::new("e2")],
                    errors: Vec::new(),
                    total: None,
                },
            ],
        );
        let mut pager = pager(&repo, 1);

        let first = pager.next_batch().await.unwrap().unwrap();
        let second = pager.next_batch().await.unwrap().unwrap();
        assert_eq!(first.errors, vec![LinkResolutionError::link("x1")]);
        assert!(second.errors.is_empty());
        assert_eq!(second.page_index, 1);
        assert_eq!(second.skip, 1);
    }

    #[tokio::test]
    async fn fetch_failure_is_returned_without_retry() {
        let repo = repo_with_entries(15);
        repo.fail_page("article", 10, "gateway timeout");
        let mut pager = pager(&repo, 10);

        assert!(pager.next_batch().await.unwrap().is_some());
        let err = pager.next_batch().await.unwrap_err();
        assert!(matches!(err, RepositoryError::Unavailable(_)));
        assert!(pager.is_exhausted());
        assert!(pager.next_batch().await.unwrap().is_none());
        assert_eq!(repo.page_requests("article").len(), 2);
    }

    #[tokio::test]
    async fn stream_collects_all_batches() {
        let repo = Arc::new(MemoryRepository::new());
        for i in 0..3 {
            repo.add_entry(
                "article",
                Entry::new(format!("e{}", i)).with_field("title", json!(format!("T{}", i))),
            );
        }

        let batches: Vec<EntryBatch> = pager(&repo, 2).into_stream().try_collect().await.unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].items[0].id.as_str(), "e2");
    }

    #[tokio::test]
    async fn stream_surfaces_errors() {
        let repo = repo_with_entries(3);
        repo.fail_page("article", 0, "down");

        let result: Result<Vec<EntryBatch>, _> = pager(&repo, 2).into_stream().try_collect().await;
        assert!(result.is_err());
    }
}
