//! Chunked full reindex with a durable resume watermark.
//!
//! A pass asks the record source how many rows changed since the stored
//! watermark and over which id range, then pulls the range page by page.
//! The watermark moves to "now" only once the last page has been handed
//! out, so a run that dies halfway starts over from the previous watermark.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use search_types::{IndexWatermark, IndexableEntity};

use crate::engine::IndexEngine;
use crate::error::EngineError;

/// Changed-row statistics reported by a [`ReindexSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReindexRange {
    /// Rows changed since the watermark
    pub count: i64,
    /// Largest id among them
    pub max: i64,
    /// Smallest id among them
    pub min: i64,
}

impl ReindexRange {
    pub fn new(count: i64, max: i64, min: i64) -> Self {
        Self { count, max, min }
    }

    /// Width of the id window requested per page.
    ///
    /// Rows are spread evenly over `[min, max]`, rounded up, and the window
    /// never drops below `floor`.
    pub fn page_step(&self, floor: i64) -> i64 {
        let span = self.max.saturating_sub(self.min).saturating_add(1);
        let even = if self.count > 0 && span > 0 {
            (span + self.count - 1) / self.count
        } else {
            0
        };
        even.max(1).max(floor)
    }
}

/// The relational side of a reindex: counts and pages of changed records.
#[async_trait]
pub trait ReindexSource<T: IndexableEntity>: Send + Sync {
    /// Statistics of rows modified after `since`.
    async fn count_since(&self, since: DateTime<Utc>) -> Result<ReindexRange, EngineError>;

    /// Rows with ids in `[start, start + step)` modified after `since`.
    async fn fetch_page(
        &self,
        start: i64,
        step: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<T>, EngineError>;
}

/// Result of [`IndexEngine::reindex_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReindexSummary {
    /// Watermark the pass started from
    pub since: DateTime<Utc>,
    pub pages: usize,
    pub entities: usize,
    pub indexed: usize,
    pub failed: usize,
}

/// One reindex pass, consumed page by page.
pub struct ReindexPass<'a, T: IndexableEntity, S: ReindexSource<T> + ?Sized> {
    engine: &'a IndexEngine<T>,
    source: &'a S,
    since: DateTime<Utc>,
    range: ReindexRange,
    step: i64,
    next_start: Option<i64>,
    completed: bool,
}

impl<'a, T: IndexableEntity, S: ReindexSource<T> + ?Sized> ReindexPass<'a, T, S> {
    /// Watermark this pass reads changes after.
    pub fn watermark(&self) -> DateTime<Utc> {
        self.since
    }

    pub fn range(&self) -> ReindexRange {
        self.range
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Fetch the next page, or persist the new watermark once all pages
    /// have been handed out and return `None`.
    ///
    /// A failed fetch is returned as is and can be retried; the watermark
    /// stays where it was.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>, EngineError> {
        if let Some(start) = self.next_start {
            let page = self.source.fetch_page(start, self.step, self.since).await?;
            self.next_start = start
                .checked_add(self.step)
                .filter(|next| *next <= self.range.max);
            debug!(
                index = T::index_name(),
                start,
                step = self.step,
                rows = page.len(),
                "Fetched reindex page"
            );
            return Ok(Some(page));
        }

        if !self.completed {
            let index = T::index_name();
            self.engine
                .watermarks()
                .upsert_watermark(&IndexWatermark::now(index))
                .await?;
            self.completed = true;
            info!(index, "Reindex pass completed");
        }
        Ok(None)
    }
}

impl<T: IndexableEntity> IndexEngine<T> {
    /// Start a reindex pass from the stored watermark.
    pub async fn reindex_pass<'a, S>(
        &'a self,
        source: &'a S,
    ) -> Result<ReindexPass<'a, T, S>, EngineError>
    where
        S: ReindexSource<T> + ?Sized,
    {
        let index = T::index_name();
        let since = self
            .watermarks()
            .get_last_modified(index)
            .await?
            .unwrap_or_else(IndexWatermark::beginning_of_time);

        let range = source.count_since(since).await?;
        let step = range.page_step(self.config().reindex_page_floor);
        info!(
            index,
            since = %since,
            count = range.count,
            max = range.max,
            min = range.min,
            step,
            "Starting reindex pass"
        );

        let next_start = (range.count > 0 && range.min <= range.max).then_some(range.min);
        Ok(ReindexPass {
            engine: self,
            source,
            since,
            range,
            step,
            next_start,
            completed: false,
        })
    }

    /// Run a full pass, writing every page through [`index_many`](Self::index_many).
    ///
    /// The first failing page or bulk call stops the pass before the
    /// watermark moves.
    pub async fn reindex_all<S>(&self, source: &S) -> Result<ReindexSummary, EngineError>
    where
        S: ReindexSource<T> + ?Sized,
    {
        let mut pass = self.reindex_pass(source).await?;
        let mut summary = ReindexSummary {
            since: pass.watermark(),
            pages: 0,
            entities: 0,
            indexed: 0,
            failed: 0,
        };

        while let Some(mut page) = pass.next_page().await? {
            summary.pages += 1;
            summary.entities += page.len();
            let written = self.index_many(&mut page, false).await?;
            summary.indexed += written.indexed;
            summary.failed += written.failed;
        }
        Ok(summary)
    }
}
