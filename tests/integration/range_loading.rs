use async_trait::async_trait;
use pretty_assertions::assert_eq;
use session_feed::error::LoadError;
use session_feed::virtual_list::range_loader::load_and_settle;
use session_feed::virtual_list::{
    ContentSource, LoadBatch, RangeLoader, SettleCoordinator, SettleOutcome, VirtualList, WindowUpdate,
    line_nums_to_ranges,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::Instant;

use crate::helpers::{keyed_list, measure_visible};

/// Serves a fixed rendered height per row and records what was asked for.
struct HeightSource {
    height: u32,
    fail: bool,
    requests: RefCell<Vec<Vec<(usize, usize)>>>,
}

impl HeightSource {
    fn new(height: u32) -> Self {
        Self { height, fail: false, requests: RefCell::new(Vec::new()) }
    }

    fn failing() -> Self {
        Self { fail: true, ..Self::new(0) }
    }
}

#[async_trait(?Send)]
impl ContentSource for HeightSource {
    type Content = u32;

    async fn fetch(&self, ranges: &[(usize, usize)]) -> Result<Vec<(usize, u32)>, LoadError> {
        self.requests.borrow_mut().push(ranges.to_vec());
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail {
            return Err(LoadError::Source("backend unavailable".to_owned()));
        }
        Ok(ranges.iter().flat_map(|&(start, end)| start..=end).map(|i| (i, self.height)).collect())
    }
}

type List = Rc<RefCell<VirtualList<u32, u32>>>;

fn apply_height(list: &mut VirtualList<u32, u32>, index: usize, height: u32) {
    if let Ok(key) = u32::try_from(index) {
        list.set_height(key, height);
    }
}

fn current_update(list: &List) -> WindowUpdate {
    let list = list.borrow();
    let window = list.render_window().expect("non-empty list");
    let visible = list.visible_range();
    WindowUpdate {
        start_index: window.start_index,
        end_index: window.end_index,
        visible_start_index: visible.start,
        visible_end_index: visible.end,
    }
}

/// 100 rows estimated at 3, viewport 30, scrolled to the bottom with the
/// visible rows measured at their estimate.
fn bottom_anchored() -> (List, SettleCoordinator<u32, u32>) {
    let mut list = keyed_list(100, 3, 4, 8, 30);
    list.scroll_to_bottom(session_feed::virtual_list::ScrollBehavior::Auto);
    measure_visible(&mut list, |_| 3);
    assert!(list.is_at_bottom(0));
    let list = Rc::new(RefCell::new(list));
    let settle = SettleCoordinator::new(Rc::clone(&list), Duration::from_millis(100));
    (list, settle)
}

#[test]
fn line_numbers_merge_into_inclusive_ranges() {
    assert_eq!(line_nums_to_ranges(&[1, 2, 3, 5, 6, 10]), vec![(1, 3), (5, 6), (10, 10)]);
    assert_eq!(line_nums_to_ranges(&[4, 4, 3]), vec![(3, 4)]);
    assert!(line_nums_to_ranges(&[]).is_empty());
}

#[tokio::test(start_paused = true)]
async fn window_scan_includes_load_ahead_and_skips_loaded_rows() {
    let (list, _settle) = bottom_anchored();
    let mut loader = RangeLoader::new(5, Duration::from_millis(50));
    let update = current_update(&list);
    assert_eq!((update.start_index, update.end_index), (86, 99));

    loader.on_update(&update, 100, |i| i % 10 == 0);
    let started = Instant::now();
    let batch = loader.next_batch().await;
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(batch.ranges, vec![(81, 89), (91, 99)]);
}

#[tokio::test(start_paused = true)]
async fn loaded_rows_that_push_the_viewport_off_the_bottom_trigger_a_settle() {
    let (list, settle) = bottom_anchored();
    let source = HeightSource::new(6);
    let batch = LoadBatch { ranges: vec![(86, 99)] };

    let outcome = load_and_settle(&list, &source, &batch, &settle, apply_height).await.expect("load");

    assert_eq!(outcome, Some(SettleOutcome::Settled));
    assert!(list.borrow().is_at_bottom(0));
    assert_eq!(list.borrow().height_of(99), 6);
    assert_eq!(source.requests.borrow().as_slice(), &[vec![(86, 99)]]);
}

#[tokio::test(start_paused = true)]
async fn rows_that_keep_their_estimate_need_no_settle() {
    let (list, settle) = bottom_anchored();
    let source = HeightSource::new(3);
    let batch = LoadBatch { ranges: vec![(90, 99)] };

    let outcome = load_and_settle(&list, &source, &batch, &settle, apply_height).await.expect("load");

    assert_eq!(outcome, None);
    assert_eq!(settle.completed_cycles(), 0);
}

#[tokio::test(start_paused = true)]
async fn loads_away_from_the_bottom_never_settle() {
    let (list, settle) = bottom_anchored();
    list.borrow_mut().scroll_to_top();
    let source = HeightSource::new(9);
    let batch = LoadBatch { ranges: vec![(0, 13)] };

    let outcome = load_and_settle(&list, &source, &batch, &settle, apply_height).await.expect("load");

    assert_eq!(outcome, None);
    let list = list.borrow();
    assert_eq!(list.scroll_state().scroll_top, 0);
    assert_eq!(list.height_of(13), 9);
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_leaves_the_list_alone_until_retried() {
    let (list, settle) = bottom_anchored();
    let measured_before = list.borrow().measured_count();
    let mut loader = RangeLoader::new(0, Duration::from_millis(10));
    loader.on_update(&current_update(&list), 100, |_| false);
    let batch = loader.next_batch().await;

    let source = HeightSource::failing();
    let result = load_and_settle(&list, &source, &batch, &settle, apply_height).await;
    assert!(matches!(result, Err(LoadError::Source(_))));
    assert_eq!(list.borrow().measured_count(), measured_before);

    loader.fail(&batch);
    assert!(loader.has_failures());
    // Failed rows stay out of later scans.
    loader.on_update(&current_update(&list), 100, |_| false);
    assert!(loader.pending().is_empty());

    loader.retry();
    assert_eq!(loader.take_due(Instant::now()), Some(batch));
    assert!(!loader.has_failures());
}

/// Swap in a different session: reset the coordinator, then replace every row.
fn swap_list(list: &List, settle: &SettleCoordinator<u32, u32>) {
    settle.reset();
    list.borrow_mut().set_items((1000..1100).collect()).expect("unique keys");
}

#[tokio::test(start_paused = true)]
async fn rows_fetched_for_a_swapped_list_are_dropped() {
    let (list, settle) = bottom_anchored();
    let source = HeightSource::new(6);
    let batch = LoadBatch { ranges: vec![(86, 99)] };

    let swap = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        swap_list(&list, &settle);
    };
    let (result, ()) = tokio::join!(load_and_settle(&list, &source, &batch, &settle, apply_height), swap);

    assert_eq!(result.expect("load"), None);
    let list = list.borrow();
    assert_eq!(list.scroll_state().scroll_top, 0);
    assert_eq!(list.measured_count(), 0);
    assert_eq!(list.stick_mode(), session_feed::virtual_list::StickMode::Off);
    assert_eq!(settle.completed_cycles(), 0);
}

#[tokio::test(start_paused = true)]
async fn swap_during_the_quiet_wait_skips_the_settle() {
    let (list, settle) = bottom_anchored();
    let source = HeightSource::new(6);
    let batch = LoadBatch { ranges: vec![(86, 99)] };

    // The fetch takes 20ms and the quiet window 100ms; swap in between.
    let swap = async {
        tokio::time::sleep(Duration::from_millis(60)).await;
        swap_list(&list, &settle);
    };
    let (result, ()) = tokio::join!(load_and_settle(&list, &source, &batch, &settle, apply_height), swap);

    assert_eq!(result.expect("load"), None);
    assert_eq!(list.borrow().scroll_state().scroll_top, 0);
    assert_eq!(settle.completed_cycles(), 0);
}
