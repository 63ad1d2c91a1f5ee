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

use super::offsets::OffsetIndex;
use serde::Serialize;

/// Rows with non-zero on-screen area. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VisibleRange {
    pub start: usize,
    pub end: usize,
}

impl VisibleRange {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end).contains(&index)
    }
}

/// Mounted rows, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderWindow {
    pub start_index: usize,
    pub end_index: usize,
}

impl RenderWindow {
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        (self.start_index..=self.end_index).contains(&index)
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.end_index + 1 - self.start_index
    }

    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.start_index..=self.end_index
    }
}

/// Payload of the `update` notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowUpdate {
    pub start_index: usize,
    pub end_index: usize,
    pub visible_start_index: usize,
    pub visible_end_index: usize,
}

impl WindowUpdate {
    #[must_use]
    pub fn window(&self) -> RenderWindow {
        RenderWindow { start_index: self.start_index, end_index: self.end_index }
    }

    #[must_use]
    pub fn visible(&self) -> VisibleRange {
        VisibleRange { start: self.visible_start_index, end: self.visible_end_index }
    }
}

/// Rows intersecting `[scroll_top, scroll_top + client_height)`.
#[must_use]
pub fn visible_range(offsets: &OffsetIndex, scroll_top: u64, client_height: u32) -> VisibleRange {
    let len = offsets.len();
    let start = offsets.index_at(scroll_top).min(len);
    if client_height == 0 || start == len {
        return VisibleRange { start, end: start };
    }
    let last_pixel = scroll_top + u64::from(client_height) - 1;
    let end = (offsets.index_at(last_pixel) + 1).min(len);
    VisibleRange { start, end: end.max(start) }
}

/// Mount window for `visible`, keeping rows of `previous` that are still within
/// `unload_buffer` of the visible range. `None` for an empty list.
#[must_use]
pub fn mount_window(
    visible: VisibleRange,
    len: usize,
    buffer: usize,
    unload_buffer: usize,
    previous: Option<RenderWindow>,
) -> Option<RenderWindow> {
    if len == 0 {
        return None;
    }
    let last_index = len - 1;
    let first = visible.start.min(last_index);
    let last = if visible.is_empty() { first } else { (visible.end - 1).min(last_index) };

    let mut start_index = first.saturating_sub(buffer);
    let mut end_index = last.saturating_add(buffer).min(last_index);

    if let Some(prev) = previous {
        let touches = prev.start_index <= end_index.saturating_add(1)
            && prev.end_index.saturating_add(1) >= start_index;
        if touches {
            let keep_from = first.saturating_sub(unload_buffer);
            let keep_to = last.saturating_add(unload_buffer).min(last_index);
            start_index = start_index.min(prev.start_index.max(keep_from));
            end_index = end_index.max(prev.end_index.min(keep_to));
        }
    }

    Some(RenderWindow { start_index, end_index })
}

/// Tracks the current mount window and reports changes.
#[derive(Debug, Clone)]
pub struct WindowManager {
    buffer: usize,
    unload_buffer: usize,
    window: Option<RenderWindow>,
    visible: VisibleRange,
}

impl WindowManager {
    #[must_use]
    pub fn new(buffer: usize, unload_buffer: usize) -> Self {
        Self { buffer, unload_buffer, window: None, visible: VisibleRange::default() }
    }

    #[must_use]
    pub fn window(&self) -> Option<RenderWindow> {
        self.window
    }

    #[must_use]
    pub fn visible(&self) -> VisibleRange {
        self.visible
    }

    /// Forget the current window; the next recompute starts from scratch.
    pub fn reset(&mut self) {
        self.window = None;
        self.visible = VisibleRange::default();
    }

    /// Recompute for a new visible range. Returns the update to emit when the
    /// window or the visible range changed.
    pub fn recompute(&mut self, visible: VisibleRange, len: usize) -> Option<WindowUpdate> {
        let window = mount_window(visible, len, self.buffer, self.unload_buffer, self.window);
        let changed = window != self.window || visible != self.visible;
        self.window = window;
        self.visible = visible;
        let window = window?;
        changed.then_some(WindowUpdate {
            start_index: window.start_index,
            end_index: window.end_index,
            visible_start_index: visible.start,
            visible_end_index: visible.end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn range(start: usize, end: usize) -> VisibleRange {
        VisibleRange { start, end }
    }

    fn window(start_index: usize, end_index: usize) -> RenderWindow {
        RenderWindow { start_index, end_index }
    }

    #[test]
    fn visible_range_excludes_rows_touching_only_the_edge() {
        let offsets = OffsetIndex::from_heights(vec![10; 10]);
        // Rows 2 and 3 exactly fill [20, 40).
        assert_eq!(visible_range(&offsets, 20, 20), range(2, 4));
        // Half of row 1 and half of row 3.
        assert_eq!(visible_range(&offsets, 15, 20), range(1, 4));
    }

    #[test]
    fn visible_range_clamps_to_list_end() {
        let offsets = OffsetIndex::from_heights(vec![10; 3]);
        assert_eq!(visible_range(&offsets, 0, 100), range(0, 3));
        assert_eq!(visible_range(&offsets, 500, 100), range(3, 3));
    }

    #[test]
    fn zero_viewport_has_empty_visible_range() {
        let offsets = OffsetIndex::from_heights(vec![10; 3]);
        assert!(visible_range(&offsets, 10, 0).is_empty());
    }

    #[test]
    fn mount_window_expands_by_buffer_and_clamps() {
        assert_eq!(mount_window(range(10, 13), 100, 5, 8, None), Some(window(5, 17)));
        assert_eq!(mount_window(range(0, 3), 100, 5, 8, None), Some(window(0, 7)));
        assert_eq!(mount_window(range(97, 100), 100, 5, 8, None), Some(window(92, 99)));
    }

    #[test]
    fn empty_list_has_no_window() {
        assert_eq!(mount_window(range(0, 0), 0, 5, 8, None), None);
    }

    #[test]
    fn mounted_row_past_buffer_stays_within_unload_buffer() {
        let buffer = 2;
        let unload = 5;
        let first = mount_window(range(10, 12), 100, buffer, unload, None);
        assert_eq!(first, Some(window(8, 13)));

        // Row 8 is now buffer + 1 away from the visible range but was mounted.
        let second = mount_window(range(11, 13), 100, buffer, unload, first);
        assert_eq!(second, Some(window(8, 14)));

        // Row 8 is unload + 1 away: unmounted. Row 9 is exactly unload away: kept.
        let third = mount_window(range(14, 16), 100, buffer, unload, second);
        assert_eq!(third, Some(window(9, 17)));
    }

    #[test]
    fn unmounted_row_past_buffer_is_not_mounted() {
        // Without a previous window only the buffer applies.
        assert_eq!(mount_window(range(11, 13), 100, 2, 5, None), Some(window(9, 14)));
    }

    #[test]
    fn jump_scroll_drops_the_previous_window() {
        let previous = Some(window(0, 20));
        assert_eq!(mount_window(range(500, 510), 1000, 5, 50, previous), Some(window(495, 514)));
    }

    #[test]
    fn shrinking_list_clamps_kept_rows() {
        let previous = Some(window(40, 60));
        assert_eq!(mount_window(range(45, 50), 52, 2, 20, previous), Some(window(40, 51)));
    }

    #[test]
    fn manager_emits_only_on_change() {
        let mut mgr = WindowManager::new(2, 4);
        let update = mgr.recompute(range(0, 3), 10).expect("first recompute emits");
        assert_eq!(update.window(), window(0, 4));
        assert_eq!(update.visible(), range(0, 3));
        assert_eq!(mgr.recompute(range(0, 3), 10), None);
        assert!(mgr.recompute(range(1, 4), 10).is_some());
    }

    #[test]
    fn manager_never_emits_for_empty_list() {
        let mut mgr = WindowManager::new(2, 4);
        assert_eq!(mgr.recompute(range(0, 0), 0), None);
        assert_eq!(mgr.window(), None);
    }
}
