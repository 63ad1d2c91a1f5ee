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

//! Scroll controller: imperative scroll requests, stick-to-bottom and
//! keyboard focus on top of [`VirtualList`].
//!
//! `scroll_to_index` computes its target from estimates for unmeasured rows,
//! so the first jump can land short or long. The request is kept as a pending
//! intent and re-applied on each measurement batch until every visible row is
//! measured or the user scrolls. That converges in practice but is best
//! effort: callers that need an exact landing can issue the call again.

use super::VirtualList;
use super::window::{RenderWindow, VisibleRange};
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBehavior {
    #[default]
    Auto,
    Smooth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollState {
    pub scroll_top: u64,
    pub scroll_height: u64,
    pub client_height: u32,
}

impl ScrollState {
    #[must_use]
    pub fn max_scroll_top(&self) -> u64 {
        self.scroll_height.saturating_sub(u64::from(self.client_height))
    }

    #[must_use]
    pub fn distance_to_bottom(&self) -> u64 {
        self.max_scroll_top().saturating_sub(self.scroll_top)
    }
}

/// Stick-to-bottom mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StickMode {
    #[default]
    Off,
    /// Content growth re-pins the viewport to the bottom.
    Active,
    /// Enabled, but the user scrolled away; re-activates once the user comes
    /// back within the bottom threshold.
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ScrollTarget {
    Index { index: usize, align: Align },
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct ScrollIntent {
    pub target: ScrollTarget,
    pub behavior: ScrollBehavior,
}

impl<T, K: Eq + Hash + Clone> VirtualList<T, K> {
    #[must_use]
    pub fn scroll_state(&self) -> ScrollState {
        ScrollState {
            scroll_top: self.scroll_top,
            scroll_height: self.offsets.total(),
            client_height: self.client_height,
        }
    }

    #[must_use]
    pub fn visible_range(&self) -> VisibleRange {
        self.window.visible()
    }

    #[must_use]
    pub fn render_window(&self) -> Option<RenderWindow> {
        self.window.window()
    }

    #[must_use]
    pub fn is_at_bottom(&self, threshold: u32) -> bool {
        self.scroll_state().distance_to_bottom() <= u64::from(threshold)
    }

    #[must_use]
    pub fn stick_mode(&self) -> StickMode {
        self.stick
    }

    /// Whether a smooth scroll is still travelling toward its target.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.intent.is_some_and(|intent| {
            intent.behavior == ScrollBehavior::Smooth
                && self.scroll_top != self.intent_offset(intent.target)
        })
    }

    /// Viewport resize.
    pub fn set_viewport(&mut self, client_height: u32) {
        if client_height == self.client_height {
            return;
        }
        self.client_height = client_height;
        self.after_content_change();
    }

    pub fn scroll_to_index(&mut self, index: usize, align: Align) {
        if self.items.is_empty() {
            return;
        }
        let clamped = index.min(self.items.len() - 1);
        if clamped != index {
            tracing::debug!(index, len = self.items.len(), "scroll_to_index clamped to list end");
        }
        self.request(ScrollIntent {
            target: ScrollTarget::Index { index: clamped, align },
            behavior: ScrollBehavior::Auto,
        });
    }

    pub fn scroll_to_top(&mut self) {
        self.request(ScrollIntent { target: ScrollTarget::Top, behavior: ScrollBehavior::Auto });
    }

    pub fn scroll_to_bottom(&mut self, behavior: ScrollBehavior) {
        self.request(ScrollIntent { target: ScrollTarget::Bottom, behavior });
    }

    /// User scroll by a relative amount.
    pub fn scroll_by(&mut self, delta: i64) {
        let target = if delta < 0 {
            self.scroll_top.saturating_sub(delta.unsigned_abs())
        } else {
            self.scroll_top.saturating_add(delta.unsigned_abs())
        };
        self.set_scroll_top(target);
    }

    /// User scroll to an absolute offset. Cancels any pending imperative
    /// scroll and updates stick-to-bottom suspension.
    pub fn set_scroll_top(&mut self, scroll_top: u64) {
        self.intent = None;
        self.scroll_top = scroll_top.min(self.max_scroll());
        self.note_user_position();
        self.recompute();
    }

    pub fn enable_stick_to_bottom(&mut self) {
        self.stick = StickMode::Active;
    }

    pub fn disable_stick_to_bottom(&mut self) {
        self.stick = StickMode::Off;
    }

    /// Advance a smooth scroll by one frame. Returns whether the offset moved.
    pub fn tick(&mut self) -> bool {
        let Some(intent) = self.intent else {
            return false;
        };
        if intent.behavior != ScrollBehavior::Smooth {
            return false;
        }
        let target = self.intent_offset(intent.target);
        if self.scroll_top == target {
            self.resolve_intent();
            return false;
        }
        // Half the remaining distance per frame, snapping on the last unit.
        let step = target.abs_diff(self.scroll_top).div_ceil(2);
        if target > self.scroll_top {
            self.scroll_top += step;
        } else {
            self.scroll_top -= step;
        }
        self.recompute();
        true
    }

    #[must_use]
    pub fn focused(&self) -> Option<usize> {
        self.focused
    }

    /// Move keyboard focus to `index` and bring it into view with minimal
    /// movement.
    pub fn focus(&mut self, index: usize) {
        if self.items.is_empty() {
            self.focused = None;
            return;
        }
        let index = index.min(self.items.len() - 1);
        self.focused = Some(index);
        let top = self.offsets.offset_of(index);
        let bottom = self.offsets.offset_of(index + 1);
        let view_bottom = self.scroll_top + u64::from(self.client_height);
        if top < self.scroll_top {
            self.scroll_to_index(index, Align::Start);
        } else if bottom > view_bottom {
            let taller_than_viewport = bottom - top > u64::from(self.client_height);
            self.scroll_to_index(index, if taller_than_viewport { Align::Start } else { Align::End });
        }
        self.note_user_position();
    }

    /// Move focus by `delta` rows. Without focus, the first visible row is focused.
    pub fn move_focus(&mut self, delta: isize) {
        match self.focused {
            Some(current) => self.focus(current.saturating_add_signed(delta)),
            None => self.focus(self.window.visible().start),
        }
    }

    pub fn clear_focus(&mut self) {
        self.focused = None;
    }

    fn request(&mut self, intent: ScrollIntent) {
        self.intent = Some(intent);
        self.apply_intent(intent);
        self.clamp_scroll();
        self.recompute();
        self.resolve_intent();
    }

    pub(super) fn apply_intent(&mut self, intent: ScrollIntent) {
        if intent.behavior == ScrollBehavior::Auto {
            self.scroll_top = self.intent_offset(intent.target);
        }
    }

    /// Drop the pending intent once it landed on fully measured rows.
    pub(super) fn resolve_intent(&mut self) {
        if let Some(intent) = self.intent
            && self.scroll_top == self.intent_offset(intent.target)
            && (self.items.is_empty() || self.visible_rows_measured())
        {
            self.intent = None;
        }
    }

    fn intent_offset(&self, target: ScrollTarget) -> u64 {
        let client = u64::from(self.client_height);
        let offset = match target {
            ScrollTarget::Top => 0,
            ScrollTarget::Bottom => self.max_scroll(),
            ScrollTarget::Index { index, align } => {
                let top = self.offsets.offset_of(index);
                let height = u64::from(self.offsets.height(index));
                match align {
                    Align::Start => top,
                    Align::Center => (top + height / 2).saturating_sub(client / 2),
                    Align::End => (top + height).saturating_sub(client),
                }
            }
        };
        offset.min(self.max_scroll())
    }

    pub(super) fn max_scroll(&self) -> u64 {
        self.offsets.total().saturating_sub(u64::from(self.client_height))
    }

    pub(super) fn clamp_scroll(&mut self) {
        self.scroll_top = self.scroll_top.min(self.max_scroll());
    }

    fn note_user_position(&mut self) {
        let near_bottom = self.is_at_bottom(self.config.bottom_threshold);
        self.stick = match (self.stick, near_bottom) {
            (StickMode::Active, false) => StickMode::Suspended,
            (StickMode::Suspended, true) => StickMode::Active,
            (mode, _) => mode,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::super::{VirtualList, VirtualListConfig};
    use super::*;
    use pretty_assertions::assert_eq;

    fn list(len: u32, min_height: u32, viewport: u32) -> VirtualList<u32, u32> {
        let config = VirtualListConfig::default()
            .with_min_item_height(min_height)
            .with_buffer(2)
            .with_unload_buffer(4)
            .with_bottom_threshold(2);
        let mut list = VirtualList::new(config, |id: &u32| Some(*id)).expect("valid config");
        list.set_items((0..len).collect()).expect("unique keys");
        list.set_viewport(viewport);
        list
    }

    fn measure_visible(list: &mut VirtualList<u32, u32>, height: u32) {
        let visible = list.visible_range();
        let batch: Vec<(u32, u32)> =
            (visible.start..visible.end).filter_map(|i| list.key_of(i).map(|k| (*k, height))).collect();
        list.apply_measurements(batch);
    }

    #[test]
    fn scroll_to_index_aligns_start_center_end() {
        let mut list = list(100, 10, 30);
        list.scroll_to_index(50, Align::Start);
        assert_eq!(list.scroll_state().scroll_top, 500);
        list.scroll_to_index(50, Align::Center);
        assert_eq!(list.scroll_state().scroll_top, 490);
        list.scroll_to_index(50, Align::End);
        assert_eq!(list.scroll_state().scroll_top, 480);
    }

    #[test]
    fn scroll_to_index_clamps_to_scroll_range() {
        let mut list = list(10, 10, 30);
        list.scroll_to_index(9, Align::Start);
        assert_eq!(list.scroll_state().scroll_top, 70);
        list.scroll_to_index(500, Align::Start);
        assert_eq!(list.scroll_state().scroll_top, 70);
    }

    #[test]
    fn scroll_to_index_corrects_after_measurement_above_target() {
        let mut list = list(100, 10, 30);
        list.scroll_to_index(50, Align::End);
        // Rows above the target turn out taller than estimated.
        list.apply_measurements((0..10).map(|id| (id, 20)));
        assert_eq!(list.scroll_state().scroll_top, 580);
        assert_eq!(list.visible_range().end, 51);
    }

    #[test]
    fn scroll_to_bottom_reaches_bottom_once_visible_rows_are_measured() {
        let mut list = list(100, 10, 30);
        list.scroll_to_bottom(ScrollBehavior::Auto);
        assert!(list.is_at_bottom(0));
        measure_visible(&mut list, 14);
        measure_visible(&mut list, 14);
        assert!(list.is_at_bottom(0));
        let before = list.scroll_state();
        list.scroll_to_bottom(ScrollBehavior::Auto);
        assert_eq!(list.scroll_state(), before);
    }

    #[test]
    fn is_at_bottom_uses_threshold() {
        let mut list = list(10, 10, 30);
        list.set_scroll_top(67);
        assert!(!list.is_at_bottom(0));
        assert!(list.is_at_bottom(3));
    }

    #[test]
    fn short_content_is_always_at_bottom() {
        let list = list(2, 10, 30);
        assert!(list.is_at_bottom(0));
    }

    #[test]
    fn scroll_top_and_queries_are_pure() {
        let mut list = list(100, 10, 30);
        list.set_scroll_top(120);
        let state = list.scroll_state();
        let range = list.visible_range();
        assert_eq!(list.scroll_state(), state);
        assert_eq!(list.visible_range(), range);
        assert_eq!(range, VisibleRange { start: 12, end: 15 });
    }

    #[test]
    fn stick_to_bottom_converges_after_repeated_growth() {
        let mut list = list(20, 10, 30);
        list.enable_stick_to_bottom();
        list.scroll_to_bottom(ScrollBehavior::Auto);
        for step in 1..=8u32 {
            let last = list.len() as u32 - 1;
            list.set_height(last, 10 + step * 7);
            list.set_height(last - 1 - step % 3, 10 + step);
        }
        assert!(list.is_at_bottom(0));
    }

    #[test]
    fn stick_to_bottom_follows_appends() {
        let mut list = list(20, 10, 30);
        list.enable_stick_to_bottom();
        list.scroll_to_bottom(ScrollBehavior::Auto);
        list.extend(20..25).expect("unique keys");
        assert!(list.is_at_bottom(0));
        assert_eq!(list.visible_range().end, 25);
    }

    #[test]
    fn user_scroll_suspends_and_resumes_stick() {
        let mut list = list(20, 10, 30);
        list.enable_stick_to_bottom();
        list.scroll_to_bottom(ScrollBehavior::Auto);
        list.scroll_by(-50);
        assert_eq!(list.stick_mode(), StickMode::Suspended);
        list.set_height(19, 40);
        assert_eq!(list.scroll_state().scroll_top, 120);
        list.scroll_by(79);
        assert_eq!(list.stick_mode(), StickMode::Active);
        list.set_height(19, 50);
        assert!(list.is_at_bottom(0));
    }

    #[test]
    fn without_stick_growth_leaves_bottom() {
        let mut list = list(20, 10, 30);
        list.scroll_to_bottom(ScrollBehavior::Auto);
        list.set_scroll_top(170);
        list.set_height(19, 40);
        assert!(!list.is_at_bottom(0));
    }

    #[test]
    fn smooth_scroll_halves_distance_per_tick() {
        let mut list = list(100, 10, 30);
        list.scroll_to_bottom(ScrollBehavior::Smooth);
        assert_eq!(list.scroll_state().scroll_top, 0);
        assert!(list.is_animating());
        assert!(list.tick());
        assert_eq!(list.scroll_state().scroll_top, 485);
        while list.tick() {}
        assert_eq!(list.scroll_state().scroll_top, 970);
        assert!(!list.is_animating());
    }

    #[test]
    fn user_scroll_cancels_smooth_scroll() {
        let mut list = list(100, 10, 30);
        list.scroll_to_bottom(ScrollBehavior::Smooth);
        list.tick();
        list.scroll_by(-5);
        assert!(!list.tick());
        assert_eq!(list.scroll_state().scroll_top, 480);
    }

    #[test]
    fn focus_scrolls_minimally() {
        let mut list = list(100, 10, 30);
        list.move_focus(1);
        assert_eq!(list.focused(), Some(0));
        list.focus(2);
        assert_eq!(list.scroll_state().scroll_top, 0);
        list.move_focus(1);
        assert_eq!(list.focused(), Some(3));
        assert_eq!(list.scroll_state().scroll_top, 10);
        list.focus(0);
        assert_eq!(list.scroll_state().scroll_top, 0);
        list.move_focus(-5);
        assert_eq!(list.focused(), Some(0));
    }

    #[test]
    fn viewport_resize_keeps_stuck_list_pinned() {
        let mut list = list(20, 10, 30);
        list.enable_stick_to_bottom();
        list.scroll_to_bottom(ScrollBehavior::Auto);
        list.set_viewport(10);
        assert!(list.is_at_bottom(0));
    }
}
