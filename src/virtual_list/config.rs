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

use crate::error::VirtualListError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_ITEM_HEIGHT: u32 = 3;
pub const DEFAULT_BUFFER: usize = 10;
pub const DEFAULT_UNLOAD_BUFFER: usize = 20;
pub const DEFAULT_BOTTOM_THRESHOLD: u32 = 1;

/// Renderer options. Field names deserialize in camelCase so settings files
/// can use `minItemHeight`, `unloadBuffer` and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VirtualListConfig {
    /// Height estimate for rows that have not been measured yet.
    pub min_item_height: u32,
    /// Rows mounted beyond each side of the visible range.
    pub buffer: usize,
    /// Distance from the visible range past which mounted rows unmount.
    pub unload_buffer: usize,
    /// Distance from the bottom that still counts as "at bottom" when the
    /// user scrolls with stick-to-bottom enabled.
    pub bottom_threshold: u32,
}

impl Default for VirtualListConfig {
    fn default() -> Self {
        Self {
            min_item_height: DEFAULT_MIN_ITEM_HEIGHT,
            buffer: DEFAULT_BUFFER,
            unload_buffer: DEFAULT_UNLOAD_BUFFER,
            bottom_threshold: DEFAULT_BOTTOM_THRESHOLD,
        }
    }
}

impl VirtualListConfig {
    #[must_use]
    pub fn with_min_item_height(mut self, min_item_height: u32) -> Self {
        self.min_item_height = min_item_height;
        self
    }

    /// Set `buffer`, raising `unload_buffer` when it would fall below it.
    #[must_use]
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self.unload_buffer = self.unload_buffer.max(buffer);
        self
    }

    #[must_use]
    pub fn with_unload_buffer(mut self, unload_buffer: usize) -> Self {
        self.unload_buffer = unload_buffer;
        self
    }

    #[must_use]
    pub fn with_bottom_threshold(mut self, bottom_threshold: u32) -> Self {
        self.bottom_threshold = bottom_threshold;
        self
    }

    pub fn validate(&self) -> Result<(), VirtualListError> {
        if self.min_item_height == 0 {
            return Err(VirtualListError::InvalidConfig(
                "minItemHeight must be greater than zero".to_owned(),
            ));
        }
        if self.unload_buffer < self.buffer {
            return Err(VirtualListError::InvalidConfig(format!(
                "unloadBuffer ({}) must be at least buffer ({})",
                self.unload_buffer, self.buffer
            )));
        }
        Ok(())
    }
}
