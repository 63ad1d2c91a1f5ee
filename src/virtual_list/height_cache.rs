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

use std::collections::HashMap;
use std::hash::Hash;

/// Snapshot of what the cache knows about one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeightRecord<K> {
    pub key: K,
    pub height: u32,
    pub measured: bool,
}

/// Measured heights keyed by item key.
///
/// Only measured items take memory; everything else reports the configured
/// minimum estimate. Records survive unmounting and go away only through
/// [`HeightCache::evict`], when the item leaves the list.
#[derive(Debug, Clone)]
pub struct HeightCache<K> {
    measured: HashMap<K, u32>,
    min_item_height: u32,
}

impl<K: Eq + Hash + Clone> HeightCache<K> {
    #[must_use]
    pub fn new(min_item_height: u32) -> Self {
        Self { measured: HashMap::new(), min_item_height }
    }

    #[must_use]
    pub fn min_item_height(&self) -> u32 {
        self.min_item_height
    }

    /// Measured height, or the minimum estimate when unmeasured.
    #[must_use]
    pub fn get(&self, key: &K) -> u32 {
        self.measured.get(key).copied().unwrap_or(self.min_item_height)
    }

    #[must_use]
    pub fn is_measured(&self, key: &K) -> bool {
        self.measured.contains_key(key)
    }

    #[must_use]
    pub fn record(&self, key: &K) -> HeightRecord<K> {
        let measured = self.measured.get(key).copied();
        HeightRecord {
            key: key.clone(),
            height: measured.unwrap_or(self.min_item_height),
            measured: measured.is_some(),
        }
    }

    /// Record a measured height. Returns the previous effective height when
    /// the effective height changed.
    pub fn set(&mut self, key: K, height: u32) -> Option<u32> {
        let previous = self.measured.insert(key, height).unwrap_or(self.min_item_height);
        (previous != height).then_some(previous)
    }

    /// Forget an item that left the list.
    pub fn evict(&mut self, key: &K) -> Option<u32> {
        self.measured.remove(key)
    }

    /// Number of measured records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.measured.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.measured.is_empty()
    }

    pub fn clear(&mut self) {
        self.measured.clear();
    }
}
