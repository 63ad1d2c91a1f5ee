// session_feed - Virtualized terminal viewer for recorded AI-assistant sessions
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Incremental content loading for the mounted window.
//!
//! [`RangeLoader`] turns window updates into debounced, non-overlapping fetch
//! batches of contiguous index ranges. [`load_and_settle`] runs one batch
//! against a [`ContentSource`] and re-settles the list when freshly loaded
//! rows pushed a bottom-anchored viewport away from the bottom.

use super::settle::{SettleCoordinator, SettleOutcome, wait_for_quiet};
use super::{VirtualList, WindowUpdate};
use crate::error::LoadError;
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::hash::Hash;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_LOAD_DEBOUNCE: Duration = Duration::from_millis(150);
pub const DEFAULT_LOAD_AHEAD: usize = 10;

/// Merge line numbers into sorted, inclusive, contiguous ranges.
///
/// `[1, 2, 3, 5, 6, 10]` becomes `[(1, 3), (5, 6), (10, 10)]`. Input order and
/// duplicates do not matter.
#[must_use]
pub fn line_nums_to_ranges(line_nums: &[usize]) -> Vec<(usize, usize)> {
    let mut sorted = line_nums.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for n in sorted {
        match ranges.last_mut() {
            Some((_, end)) if *end + 1 == n => *end = n,
            _ => ranges.push((n, n)),
        }
    }
    ranges
}

/// Supplies content for index ranges. An index missing from the result keeps
/// its placeholder.
#[async_trait(?Send)]
pub trait ContentSource {
    type Content;

    async fn fetch(&self, ranges: &[(usize, usize)]) -> Result<Vec<(usize, Self::Content)>, LoadError>;
}

/// One dispatched fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadBatch {
    pub ranges: Vec<(usize, usize)>,
}

impl LoadBatch {
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.ranges.iter().flat_map(|&(start, end)| start..=end)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.iter().map(|(start, end)| end - start + 1).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RangeLoader {
    load_ahead: usize,
    debounce: Duration,
    pending: BTreeSet<usize>,
    in_flight: BTreeSet<usize>,
    failed: BTreeSet<usize>,
    deadline: Option<Instant>,
}

impl Default for RangeLoader {
    fn default() -> Self {
        Self::new(DEFAULT_LOAD_AHEAD, DEFAULT_LOAD_DEBOUNCE)
    }
}

impl RangeLoader {
    #[must_use]
    pub fn new(load_ahead: usize, debounce: Duration) -> Self {
        Self {
            load_ahead,
            debounce,
            pending: BTreeSet::new(),
            in_flight: BTreeSet::new(),
            failed: BTreeSet::new(),
            deadline: None,
        }
    }

    /// Rescan the mount window (plus `load_ahead` on each side) for rows
    /// without content. The pending set is replaced and the debounce restarts.
    /// Rows already in flight or whose last load failed are skipped.
    pub fn on_update(&mut self, update: &WindowUpdate, len: usize, has_content: impl Fn(usize) -> bool) {
        self.pending.clear();
        if len > 0 {
            let start = update.start_index.saturating_sub(self.load_ahead);
            let end = update.end_index.saturating_add(self.load_ahead).min(len - 1);
            self.pending.extend((start..=end).filter(|&i| {
                !has_content(i) && !self.in_flight.contains(&i) && !self.failed.contains(&i)
            }));
        }
        self.deadline = if self.pending.is_empty() { None } else { Some(Instant::now() + self.debounce) };
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn pending(&self) -> &BTreeSet<usize> {
        &self.pending
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Take the pending set as a batch once the debounce expired. The
    /// returned indices are marked in flight.
    pub fn take_due(&mut self, now: Instant) -> Option<LoadBatch> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;
        if self.pending.is_empty() {
            return None;
        }
        let indices: Vec<usize> = std::mem::take(&mut self.pending).into_iter().collect();
        self.in_flight.extend(indices.iter().copied());
        let batch = LoadBatch { ranges: line_nums_to_ranges(&indices) };
        tracing::debug!(ranges = ?batch.ranges, rows = batch.len(), "dispatching load batch");
        Some(batch)
    }

    /// Wait for the debounce to expire and take the batch. Never resolves
    /// while nothing is pending.
    pub async fn next_batch(&mut self) -> LoadBatch {
        loop {
            match self.deadline {
                Some(deadline) => {
                    tokio::time::sleep_until(deadline).await;
                    if let Some(batch) = self.take_due(Instant::now()) {
                        return batch;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        }
    }

    pub fn complete(&mut self, batch: &LoadBatch) {
        for index in batch.indices() {
            self.in_flight.remove(&index);
        }
    }

    /// Park the rows of a failed batch until [`RangeLoader::retry`].
    pub fn fail(&mut self, batch: &LoadBatch) {
        for index in batch.indices() {
            self.in_flight.remove(&index);
            self.failed.insert(index);
        }
    }

    /// Re-queue every failed row for immediate dispatch.
    pub fn retry(&mut self) {
        if self.failed.is_empty() {
            return;
        }
        self.pending.append(&mut self.failed);
        self.deadline = Some(Instant::now());
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.in_flight.clear();
        self.failed.clear();
        self.deadline = None;
    }
}

/// Fetch `batch`, hand each loaded row to `apply`, and re-settle when the
/// viewport sat at the bottom before the fetch but the loaded rows' measured
/// heights pushed it away.
///
/// Returns `None` when no settle was needed, or when `settle` was reset
/// (list swap) while the batch was in flight. In that case nothing is applied.
pub async fn load_and_settle<T, K, S>(
    list: &Rc<RefCell<VirtualList<T, K>>>,
    source: &S,
    batch: &LoadBatch,
    settle: &SettleCoordinator<T, K>,
    mut apply: impl FnMut(&mut VirtualList<T, K>, usize, S::Content),
) -> Result<Option<SettleOutcome>, LoadError>
where
    K: Eq + Hash + Clone,
    S: ContentSource + ?Sized,
{
    let generation = settle.generation();
    let (was_at_bottom, mut events) = {
        let mut list = list.borrow_mut();
        (list.is_at_bottom(0), list.subscribe())
    };
    let loaded = source.fetch(&batch.ranges).await?;
    if settle.generation() != generation {
        tracing::debug!(ranges = ?batch.ranges, "list swapped during fetch, dropping loaded rows");
        return Ok(None);
    }
    {
        let mut list = list.borrow_mut();
        for (index, content) in loaded {
            apply(&mut list, index, content);
        }
    }
    if !was_at_bottom {
        return Ok(None);
    }
    // Let the loaded rows get measured before judging drift.
    wait_for_quiet(&mut events, settle.quiet_window()).await;
    if settle.generation() != generation || list.borrow().is_at_bottom(0) {
        return Ok(None);
    }
    tracing::debug!("loaded rows moved the viewport off the bottom, settling");
    Ok(Some(settle.settle().await))
}
