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

//! Virtualized list renderer.
//!
//! Only the rows inside the render window are mounted. Heights of unmounted or
//! not yet measured rows come from a per-key height cache that falls back to a
//! minimum estimate, and cumulative offsets live in a Fenwick tree so every
//! scroll or resize recomputes the window in O(log n).
//!
//! The list is UI-agnostic: callers feed it viewport sizes, user scrolls and
//! measured heights, and read back the scroll offset, the mount window and
//! [`ListEvent`] notifications.

mod config;
mod events;
mod height_cache;
pub mod measure;
mod offsets;
pub mod range_loader;
mod scroll;
pub mod settle;
mod window;

pub use config::{
    DEFAULT_BOTTOM_THRESHOLD, DEFAULT_BUFFER, DEFAULT_MIN_ITEM_HEIGHT, DEFAULT_UNLOAD_BUFFER,
    VirtualListConfig,
};
pub use events::{EventEmitter, ListEvent};
pub use height_cache::{HeightCache, HeightRecord};
pub use measure::{MeasureLoop, Measurement, MeasurementProvider, MeasurementSink, PollingProvider};
pub use offsets::OffsetIndex;
pub use range_loader::{ContentSource, LoadBatch, RangeLoader, line_nums_to_ranges};
pub use scroll::{Align, ScrollBehavior, ScrollState, StickMode};
pub use settle::{SettleCoordinator, SettleOutcome, SettlePhase};
pub use window::{RenderWindow, VisibleRange, WindowManager, WindowUpdate, mount_window, visible_range};

use crate::error::VirtualListError;
use scroll::ScrollIntent;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use tokio::sync::mpsc;

type KeyFn<T, K> = Box<dyn Fn(&T) -> Option<K>>;

pub struct VirtualList<T, K> {
    config: VirtualListConfig,
    items: Vec<T>,
    keys: Vec<K>,
    /// O(1) lookup: key → index.
    positions: HashMap<K, usize>,
    item_key: KeyFn<T, K>,
    heights: HeightCache<K>,
    offsets: OffsetIndex,
    window: WindowManager,
    events: EventEmitter,
    scroll_top: u64,
    client_height: u32,
    /// Last imperative scroll request, re-applied as measurements arrive.
    intent: Option<ScrollIntent>,
    stick: StickMode,
    focused: Option<usize>,
    /// Bumped on every change to items or effective heights.
    layout_epoch: u64,
}

impl<T, K> fmt::Debug for VirtualList<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualList")
            .field("len", &self.items.len())
            .field("scroll_top", &self.scroll_top)
            .field("client_height", &self.client_height)
            .field("window", &self.window.window())
            .field("stick", &self.stick)
            .field("layout_epoch", &self.layout_epoch)
            .finish_non_exhaustive()
    }
}

impl<T, K: Eq + Hash + Clone> VirtualList<T, K> {
    pub fn new(
        config: VirtualListConfig,
        item_key: impl Fn(&T) -> Option<K> + 'static,
    ) -> Result<Self, VirtualListError> {
        config.validate()?;
        Ok(Self {
            config,
            items: Vec::new(),
            keys: Vec::new(),
            positions: HashMap::new(),
            item_key: Box::new(item_key),
            heights: HeightCache::new(config.min_item_height),
            offsets: OffsetIndex::default(),
            window: WindowManager::new(config.buffer, config.unload_buffer),
            events: EventEmitter::default(),
            scroll_top: 0,
            client_height: 0,
            intent: None,
            stick: StickMode::Off,
            focused: None,
            layout_epoch: 0,
        })
    }

    #[must_use]
    pub fn config(&self) -> &VirtualListConfig {
        &self.config
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    #[must_use]
    pub fn key_of(&self, index: usize) -> Option<&K> {
        self.keys.get(index)
    }

    #[must_use]
    pub fn index_of(&self, key: &K) -> Option<usize> {
        self.positions.get(key).copied()
    }

    /// Mounted rows in display order.
    pub fn mounted(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        let range = self.window.window().map_or(0..0, |w| w.start_index..w.end_index + 1);
        self.items[range.clone()].iter().enumerate().map(move |(i, item)| (range.start + i, item))
    }

    /// Top edge of the row at `index`, from measured heights and estimates.
    #[must_use]
    pub fn offset_of(&self, index: usize) -> u64 {
        self.offsets.offset_of(index)
    }

    /// Effective height of the row at `index`.
    #[must_use]
    pub fn height_of(&self, index: usize) -> u32 {
        self.offsets.height(index)
    }

    #[must_use]
    pub fn height_record(&self, index: usize) -> Option<HeightRecord<K>> {
        self.keys.get(index).map(|key| self.heights.record(key))
    }

    #[must_use]
    pub fn measured_count(&self) -> usize {
        self.heights.len()
    }

    #[must_use]
    pub fn layout_epoch(&self) -> u64 {
        self.layout_epoch
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ListEvent> {
        self.events.subscribe()
    }

    /// Replace the whole list, e.g. when switching sessions. Heights, window,
    /// scroll position, stick mode and focus start over.
    pub fn set_items(&mut self, items: Vec<T>) -> Result<(), VirtualListError> {
        let (keys, positions) = self.index_keys(&items)?;
        self.items = items;
        self.keys = keys;
        self.positions = positions;
        self.heights.clear();
        self.offsets = OffsetIndex::from_heights(vec![self.config.min_item_height; self.items.len()]);
        self.window.reset();
        self.scroll_top = 0;
        self.intent = None;
        self.stick = StickMode::Off;
        self.focused = None;
        self.layout_epoch += 1;
        tracing::debug!(len = self.items.len(), "virtual list items replaced");
        self.recompute();
        Ok(())
    }

    /// Incremental update: measured heights of surviving keys are kept, vanished
    /// keys are evicted and the row under the viewport top stays put.
    pub fn sync_items(&mut self, items: Vec<T>) -> Result<(), VirtualListError> {
        let (keys, positions) = self.index_keys(&items)?;
        let anchor = self.anchor(|key| positions.contains_key(key));
        let focused_key = self.focused.and_then(|i| self.keys.get(i).cloned());
        for key in &self.keys {
            if !positions.contains_key(key) {
                self.heights.evict(key);
            }
        }
        self.items = items;
        self.keys = keys;
        self.positions = positions;
        self.rebuild_offsets();
        self.focused = focused_key.and_then(|key| self.index_of(&key));
        self.restore_anchor(anchor);
        self.layout_epoch += 1;
        tracing::debug!(len = self.items.len(), "virtual list items synced");
        self.after_content_change();
        Ok(())
    }

    /// Append rows at the end, the common streaming case.
    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) -> Result<(), VirtualListError> {
        let items: Vec<T> = items.into_iter().collect();
        if items.is_empty() {
            return Ok(());
        }
        let base = self.items.len();
        let mut fresh: HashMap<K, usize> = HashMap::with_capacity(items.len());
        let mut new_keys = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let index = base + i;
            let key = self.key_for(item, index)?;
            if let Some(first) = self.positions.get(&key).or_else(|| fresh.get(&key)).copied() {
                tracing::error!(index, first, "duplicate key in appended items");
                return Err(VirtualListError::DuplicateKey { index, first });
            }
            fresh.insert(key.clone(), index);
            new_keys.push(key);
        }
        for (key, item) in new_keys.into_iter().zip(items) {
            self.offsets.push(self.heights.get(&key));
            self.positions.insert(key.clone(), self.items.len());
            self.keys.push(key);
            self.items.push(item);
        }
        self.layout_epoch += 1;
        self.after_content_change();
        Ok(())
    }

    /// Remove one row permanently, evicting its height record.
    pub fn remove(&mut self, key: &K) -> Option<T> {
        let index = self.index_of(key)?;
        let anchor = self.anchor(|k| k != key);
        let item = self.items.remove(index);
        self.keys.remove(index);
        self.heights.evict(key);
        self.positions = self.keys.iter().cloned().enumerate().map(|(i, k)| (k, i)).collect();
        self.rebuild_offsets();
        self.focused = match self.focused {
            Some(f) if f > index => Some(f - 1),
            Some(f) if f == index => (!self.items.is_empty()).then(|| f.min(self.items.len() - 1)),
            other => other,
        };
        self.restore_anchor(anchor);
        self.layout_epoch += 1;
        self.after_content_change();
        Some(item)
    }

    /// Swap the payload of a row in place, e.g. once its content has loaded.
    /// The key must not change.
    pub fn update_item(&mut self, index: usize, item: T) -> Result<T, VirtualListError> {
        let len = self.items.len();
        let Some(current) = self.keys.get(index) else {
            return Err(VirtualListError::IndexOutOfBounds { index, len });
        };
        if self.key_for(&item, index)? != *current {
            tracing::error!(index, "item replacement changed its key");
            return Err(VirtualListError::KeyChanged { index });
        }
        Ok(std::mem::replace(&mut self.items[index], item))
    }

    /// Mutable access for payload updates that cannot affect the key.
    pub fn with_item_mut<R>(&mut self, index: usize, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.items.get_mut(index).map(f)
    }

    /// Record one measured height.
    pub fn set_height(&mut self, key: K, height: u32) -> bool {
        self.apply_measurements([(key, height)]) > 0
    }

    /// Feed a batch of measured heights back into the cache. Returns how many
    /// rows changed effective height.
    ///
    /// Rows entirely above the viewport shift the scroll offset by their
    /// growth so the content under the viewport does not move, unless
    /// stick-to-bottom is active, in which case the list re-pins to the bottom.
    pub fn apply_measurements(&mut self, batch: impl IntoIterator<Item = (K, u32)>) -> usize {
        let mut changed = 0;
        for (key, height) in batch {
            let Some(index) = self.index_of(&key) else {
                tracing::trace!("dropping measurement for a key no longer in the list");
                continue;
            };
            let Some(previous) = self.heights.set(key, height) else {
                continue;
            };
            let above_viewport = self.offsets.offset_of(index + 1) <= self.scroll_top;
            self.offsets.set(index, height);
            if above_viewport && self.stick != StickMode::Active {
                self.scroll_top = if height > previous {
                    self.scroll_top + u64::from(height - previous)
                } else {
                    self.scroll_top.saturating_sub(u64::from(previous - height))
                };
            }
            changed += 1;
            self.events.emit(ListEvent::ItemResized { index, height });
        }
        if changed > 0 {
            self.layout_epoch += 1;
            self.after_content_change();
        }
        self.resolve_intent();
        changed
    }

    /// Whether every row in the visible range has a measured height.
    #[must_use]
    pub fn visible_rows_measured(&self) -> bool {
        let visible = self.window.visible();
        !visible.is_empty()
            && self.keys[visible.start..visible.end].iter().all(|key| self.heights.is_measured(key))
    }

    fn key_for(&self, item: &T, index: usize) -> Result<K, VirtualListError> {
        (self.item_key)(item).ok_or_else(|| {
            tracing::error!(index, "virtual list item has no key");
            VirtualListError::MissingKey { index }
        })
    }

    fn index_keys(&self, items: &[T]) -> Result<(Vec<K>, HashMap<K, usize>), VirtualListError> {
        let mut keys = Vec::with_capacity(items.len());
        let mut positions = HashMap::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let key = self.key_for(item, index)?;
            if let Some(first) = positions.insert(key.clone(), index) {
                tracing::error!(index, first, "duplicate key in virtual list items");
                return Err(VirtualListError::DuplicateKey { index, first });
            }
            keys.push(key);
        }
        Ok((keys, positions))
    }

    fn rebuild_offsets(&mut self) {
        let heights = self.keys.iter().map(|key| self.heights.get(key)).collect();
        self.offsets = OffsetIndex::from_heights(heights);
    }

    /// First row under the viewport top that survives an update, with the
    /// distance from its top edge to the viewport top.
    fn anchor(&self, survives: impl Fn(&K) -> bool) -> Option<(K, u64)> {
        if self.keys.is_empty() {
            return None;
        }
        let first = self.offsets.index_at(self.scroll_top).min(self.keys.len() - 1);
        if survives(&self.keys[first]) {
            let delta = self.scroll_top.saturating_sub(self.offsets.offset_of(first));
            return Some((self.keys[first].clone(), delta));
        }
        self.keys[first + 1..].iter().find(|key| survives(key)).map(|key| (key.clone(), 0))
    }

    fn restore_anchor(&mut self, anchor: Option<(K, u64)>) {
        if let Some((key, delta)) = anchor
            && let Some(index) = self.index_of(&key)
        {
            self.scroll_top = self.offsets.offset_of(index) + delta;
        }
    }

    /// Re-pin, re-apply the pending intent, clamp and recompute after the
    /// content or viewport changed.
    fn after_content_change(&mut self) {
        if self.stick == StickMode::Active {
            self.scroll_top = self.max_scroll();
        } else if let Some(intent) = self.intent {
            self.apply_intent(intent);
        }
        self.clamp_scroll();
        self.recompute();
    }

    fn recompute(&mut self) {
        let visible = window::visible_range(&self.offsets, self.scroll_top, self.client_height);
        if let Some(update) = self.window.recompute(visible, self.items.len()) {
            tracing::trace!(?update, "render window changed");
            self.events.emit(ListEvent::Update(update));
        }
    }
}
