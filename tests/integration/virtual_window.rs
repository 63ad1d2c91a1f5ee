// Render window, scroll and stick-to-bottom behavior driven through the
// public `VirtualList` surface.

use pretty_assertions::assert_eq;
use session_feed::virtual_list::{Align, ListEvent, RenderWindow, ScrollBehavior, StickMode, VisibleRange};

use crate::helpers::{drain, keyed_list, measure_visible};

/// Deterministic pseudo-random heights.
fn jitter(key: u32) -> u32 {
    5 + key.wrapping_mul(2_654_435_761) % 37
}

#[test]
fn ten_thousand_rows_jump_to_the_middle() {
    let mut list = keyed_list(10_000, 50, 20, 20, 50);
    list.scroll_to_index(5000, Align::Start);
    measure_visible(&mut list, |_| 50);

    assert!(list.visible_rows_measured());
    assert_eq!(list.visible_range(), VisibleRange { start: 5000, end: 5001 });
    assert_eq!(list.render_window(), Some(RenderWindow { start_index: 4980, end_index: 5020 }));
}

#[test]
fn window_always_contains_the_visible_range() {
    let mut list = keyed_list(500, 8, 5, 12, 40);
    let unload = 12;
    for step in 0..200u64 {
        list.set_scroll_top(step * 37 % 4000);
        measure_visible(&mut list, jitter);

        let visible = list.visible_range();
        let window = list.render_window().expect("non-empty list");
        assert!(!visible.is_empty());
        assert!(window.start_index <= visible.start, "step {step}: {window:?} vs {visible:?}");
        assert!(visible.end - 1 <= window.end_index, "step {step}: {window:?} vs {visible:?}");
        assert!(visible.start - window.start_index <= unload);
        assert!(window.end_index - (visible.end - 1) <= unload);
    }
}

#[test]
fn mounted_rows_unmount_only_past_the_unload_buffer() {
    let mut list = keyed_list(100, 10, 2, 5, 30);
    list.set_scroll_top(100);
    assert_eq!(list.render_window(), Some(RenderWindow { start_index: 8, end_index: 14 }));

    // Row 8 is now buffer + 1 away from the visible range and stays mounted.
    list.set_scroll_top(110);
    assert_eq!(list.visible_range(), VisibleRange { start: 11, end: 14 });
    assert!(list.render_window().expect("window").contains(8));

    // Six rows away, past the unload buffer.
    list.set_scroll_top(140);
    assert_eq!(list.visible_range(), VisibleRange { start: 14, end: 17 });
    assert!(!list.render_window().expect("window").contains(8));
}

#[test]
fn scroll_to_bottom_converges_and_is_idempotent() {
    let mut list = keyed_list(200, 10, 4, 8, 100);
    list.scroll_to_bottom(ScrollBehavior::Auto);
    for _ in 0..10 {
        if measure_visible(&mut list, jitter) == 0 && list.visible_rows_measured() {
            break;
        }
    }
    assert!(list.is_at_bottom(0));

    let before = list.scroll_state();
    list.scroll_to_bottom(ScrollBehavior::Auto);
    assert_eq!(list.scroll_state(), before);
}

#[test]
fn stick_to_bottom_survives_a_growing_reply() {
    let mut list = keyed_list(30, 4, 3, 6, 20);
    let mut events = list.subscribe();
    list.enable_stick_to_bottom();
    list.scroll_to_bottom(ScrollBehavior::Auto);

    // A streamed reply grows line by line, and earlier rows get measured.
    for height in 5..=40 {
        list.set_height(29, height);
        list.set_height(28, 4 + height % 3);
        assert!(list.is_at_bottom(0), "height {height}");
    }
    let resized = drain(&mut events).iter().filter(|e| matches!(e, ListEvent::ItemResized { .. })).count();
    assert!(resized >= 36);
    assert_eq!(list.stick_mode(), StickMode::Active);
}

#[test]
fn removing_a_row_above_keeps_the_viewport_on_the_same_content() {
    let mut list = keyed_list(100, 10, 2, 4, 30);
    list.set_scroll_top(505);
    let first = list.key_of(list.visible_range().start).copied();
    list.remove(&10);
    assert_eq!(list.key_of(list.visible_range().start).copied(), first);
    assert_eq!(list.scroll_state().scroll_top, 495);
}

#[test]
fn stuck_list_stays_at_bottom_when_a_row_is_removed() {
    let mut list = keyed_list(100, 10, 2, 4, 30);
    list.enable_stick_to_bottom();
    list.scroll_to_bottom(ScrollBehavior::Auto);
    list.remove(&50);
    assert!(list.is_at_bottom(0));
}

#[test]
fn empty_list_has_no_window_and_emits_nothing() {
    let mut list = keyed_list(0, 10, 2, 4, 30);
    let mut events = list.subscribe();
    list.set_scroll_top(40);
    list.scroll_to_bottom(ScrollBehavior::Auto);
    list.set_viewport(60);
    assert_eq!(list.render_window(), None);
    assert!(list.visible_range().is_empty());
    assert!(drain(&mut events).is_empty());
}

#[test]
fn scroll_to_index_end_lands_after_a_corrective_call() {
    let mut list = keyed_list(300, 10, 4, 8, 50);
    list.scroll_to_index(200, Align::End);
    // Rows above the target measure taller than estimated.
    let batch: Vec<(u32, u32)> = (150..200).map(|key| (key, 13)).collect();
    list.apply_measurements(batch);
    measure_visible(&mut list, |_| 10);

    list.scroll_to_index(200, Align::End);
    let visible = list.visible_range();
    assert_eq!(visible.end, 201);
    assert_eq!(list.offset_of(201), list.scroll_state().scroll_top + 50);
}
