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

//! Prefix sums over row heights.
//!
//! A Fenwick tree keeps `offset_of` and the offset-to-index search at
//! O(log n), so a height change deep inside a 100k row feed does not force a
//! rescan of everything above it.

/// Row heights indexed by list position, with cumulative offsets.
#[derive(Debug, Clone)]
pub struct OffsetIndex {
    /// 1-based Fenwick tree, `tree[0]` unused.
    tree: Vec<u64>,
    heights: Vec<u32>,
}

impl Default for OffsetIndex {
    fn default() -> Self {
        Self { tree: vec![0], heights: Vec::new() }
    }
}

const fn lowbit(i: usize) -> usize {
    i & i.wrapping_neg()
}

impl OffsetIndex {
    #[must_use]
    pub fn from_heights(heights: Vec<u32>) -> Self {
        let n = heights.len();
        let mut tree = vec![0u64; n + 1];
        for (i, h) in heights.iter().enumerate() {
            let node = i + 1;
            tree[node] += u64::from(*h);
            let parent = node + lowbit(node);
            if parent <= n {
                tree[parent] += tree[node];
            }
        }
        Self { tree, heights }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Height of the row at `index`, 0 past the end.
    #[must_use]
    pub fn height(&self, index: usize) -> u32 {
        self.heights.get(index).copied().unwrap_or(0)
    }

    /// Replace the height at `index`. Returns the previous height when it changed.
    pub fn set(&mut self, index: usize, height: u32) -> Option<u32> {
        let old = *self.heights.get(index)?;
        if old == height {
            return None;
        }
        self.heights[index] = height;
        let grow = height > old;
        let delta = u64::from(height.abs_diff(old));
        let mut node = index + 1;
        while node < self.tree.len() {
            if grow {
                self.tree[node] += delta;
            } else {
                self.tree[node] -= delta;
            }
            node += lowbit(node);
        }
        Some(old)
    }

    /// Append a row in O(log n).
    pub fn push(&mut self, height: u32) {
        let node = self.heights.len() + 1;
        // The new node covers (node - lowbit(node), node]; all but the last
        // entry of that span are already in the tree.
        let covered = self.prefix(node - 1) - self.prefix(node - lowbit(node));
        self.heights.push(height);
        self.tree.push(covered + u64::from(height));
    }

    /// Top edge of the row at `index`; `offset_of(len)` is the total height.
    #[must_use]
    pub fn offset_of(&self, index: usize) -> u64 {
        self.prefix(index.min(self.len()))
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.prefix(self.len())
    }

    /// Index of the row covering `offset`, or `len` when the offset lies past
    /// the end. Zero-height rows never cover an offset.
    #[must_use]
    pub fn index_at(&self, offset: u64) -> usize {
        let n = self.len();
        if n == 0 {
            return 0;
        }
        let mut pos = 0usize;
        let mut remaining = offset;
        let mut step = 1usize << (usize::BITS - 1 - n.leading_zeros());
        while step > 0 {
            let next = pos + step;
            if next <= n && self.tree[next] <= remaining {
                pos = next;
                remaining -= self.tree[next];
            }
            step >>= 1;
        }
        pos
    }

    fn prefix(&self, count: usize) -> u64 {
        let mut sum = 0;
        let mut node = count;
        while node > 0 {
            sum += self.tree[node];
            node -= lowbit(node);
        }
        sum
    }
}
