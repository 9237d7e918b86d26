//! Memory-bounded grouping of entities into bulk requests.
//!
//! The planner only sees payload sizes, so it can be exercised without a
//! backend. Execution lives in [`IndexEngine::index_many`](crate::IndexEngine::index_many).

use std::ops::Range;

/// One unit of work produced by [`BatchPlanner::plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedBatch {
    /// Contiguous entities submitted in one bulk call
    Bulk(Range<usize>),
    /// A single entity whose payload alone reaches the budget
    Oversized(usize),
}

impl PlannedBatch {
    /// Input positions covered by this batch.
    pub fn range(&self) -> Range<usize> {
        match self {
            PlannedBatch::Bulk(range) => range.clone(),
            PlannedBatch::Oversized(index) => *index..*index + 1,
        }
    }
}

/// Splits entity lists so no bulk group holds `budget` payload bytes or more.
#[derive(Debug, Clone, Copy)]
pub struct BatchPlanner {
    budget: u64,
}

impl BatchPlanner {
    pub fn new(budget: u64) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Plan the groups for entities with the given payload sizes.
    ///
    /// Entities of non-document types carry no payload and always form a
    /// single group. For document types, entities without a payload count as
    /// zero bytes.
    pub fn plan<'a>(&self, sizes: &'a [u64], documents: bool) -> BatchPlan<'a> {
        BatchPlan {
            sizes,
            budget: self.budget,
            documents,
            pos: 0,
            group_start: 0,
            running: 0,
            queued: None,
        }
    }
}

/// Lazy, single-pass iterator over planned batches, in input order.
#[derive(Debug)]
pub struct BatchPlan<'a> {
    sizes: &'a [u64],
    budget: u64,
    documents: bool,
    pos: usize,
    group_start: usize,
    running: u64,
    queued: Option<PlannedBatch>,
}

impl BatchPlan<'_> {
    fn take_pending(&mut self, end: usize) -> Range<usize> {
        let pending = self.group_start..end;
        self.group_start = end;
        pending
    }
}

impl Iterator for BatchPlan<'_> {
    type Item = PlannedBatch;

    fn next(&mut self) -> Option<PlannedBatch> {
        if let Some(queued) = self.queued.take() {
            return Some(queued);
        }

        let total = self.sizes.len();
        if !self.documents {
            if self.group_start == total {
                return None;
            }
            self.pos = total;
            return Some(PlannedBatch::Bulk(self.take_pending(total)));
        }

        while self.pos < total {
            let index = self.pos;
            let size = self.sizes[index];

            if size >= self.budget {
                // The pending group goes first so writes keep input order.
                let pending = self.take_pending(index);
                self.pos += 1;
                self.group_start = self.pos;
                self.running = 0;
                if pending.is_empty() {
                    return Some(PlannedBatch::Oversized(index));
                }
                self.queued = Some(PlannedBatch::Oversized(index));
                return Some(PlannedBatch::Bulk(pending));
            }

            if self.running.saturating_add(size) >= self.budget {
                // The triggering entity heads the next group.
                let pending = self.take_pending(index);
                self.running = size;
                self.pos += 1;
                return Some(PlannedBatch::Bulk(pending));
            }

            self.running += size;
            self.pos += 1;
        }

        if self.group_start < total {
            self.running = 0;
            return Some(PlannedBatch::Bulk(self.take_pending(total)));
        }
        None
    }
}
