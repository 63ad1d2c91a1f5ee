use pretty_assertions::assert_eq;
use session_feed::virtual_list::{
    MeasureLoop, PollingProvider, SettleCoordinator, SettleOutcome, SettlePhase, StickMode, VirtualList,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;

use crate::helpers::keyed_list;

type List = Rc<RefCell<VirtualList<u32, u32>>>;

const FRAME: Duration = Duration::from_millis(16);

/// Stand-in for the draw loop: once per frame, observe the mounted rows,
/// measure them with `height` and feed the reports back.
async fn render_frames(list: List, frames: usize, height: impl Fn(u32, usize) -> u32) {
    let mut measure = MeasureLoop::new();
    let mut provider = PollingProvider::default();
    for frame in 0..frames {
        tokio::time::sleep(FRAME).await;
        let mut list = list.borrow_mut();
        measure.sync_observed(&list, &mut provider);
        provider.poll(|key| Some(height(*key, frame)));
        measure.pump(&mut list);
    }
}

fn shared_list() -> List {
    Rc::new(RefCell::new(keyed_list(200, 3, 4, 8, 40)))
}

#[tokio::test(start_paused = true)]
async fn settle_waits_for_mounted_rows_to_be_measured() {
    LocalSet::new()
        .run_until(async {
            let list = shared_list();
            let coordinator = SettleCoordinator::new(Rc::clone(&list), Duration::from_millis(100));
            tokio::task::spawn_local(render_frames(Rc::clone(&list), 60, |key, _| 5 + key % 4));

            assert_eq!(coordinator.settle().await, SettleOutcome::Settled);

            let list = list.borrow();
            assert!(list.is_at_bottom(0));
            assert!(list.visible_rows_measured());
            assert_eq!(list.stick_mode(), StickMode::Off);
            assert_eq!(coordinator.phase(), SettlePhase::Stable);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_share_one_cycle() {
    LocalSet::new()
        .run_until(async {
            let list = shared_list();
            let coordinator = Rc::new(SettleCoordinator::new(Rc::clone(&list), Duration::from_millis(100)));
            tokio::task::spawn_local(render_frames(Rc::clone(&list), 30, |key, _| 4 + key % 3));

            let handles: Vec<_> = (0..3)
                .map(|_| {
                    let coordinator = Rc::clone(&coordinator);
                    tokio::task::spawn_local(async move { coordinator.settle().await })
                })
                .collect();
            let mut outcomes = Vec::new();
            for handle in handles {
                outcomes.push(handle.await.expect("settle task"));
            }

            assert_eq!(outcomes, vec![SettleOutcome::Settled, SettleOutcome::Joined, SettleOutcome::Joined]);
            assert_eq!(coordinator.completed_cycles(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn reset_abandons_a_cycle_that_never_quiets() {
    LocalSet::new()
        .run_until(async {
            let list = shared_list();
            let coordinator = Rc::new(SettleCoordinator::new(Rc::clone(&list), Duration::from_millis(100)));
            let growing = Rc::new(Cell::new(true));

            // The last record keeps streaming while `growing` is set.
            let streamer = {
                let list = Rc::clone(&list);
                let growing = Rc::clone(&growing);
                tokio::task::spawn_local(async move {
                    let mut height = 3;
                    while growing.get() {
                        tokio::time::sleep(FRAME).await;
                        height += 1;
                        list.borrow_mut().set_height(199, height);
                    }
                })
            };

            let pending = {
                let coordinator = Rc::clone(&coordinator);
                tokio::task::spawn_local(async move { coordinator.settle().await })
            };
            tokio::time::sleep(Duration::from_secs(2)).await;
            assert_eq!(coordinator.phase(), SettlePhase::WaitingForQuiet);
            assert!(list.borrow().is_at_bottom(0));

            coordinator.reset();
            assert_eq!(pending.await.expect("settle task"), SettleOutcome::Abandoned);

            growing.set(false);
            streamer.await.expect("streamer task");
            assert_eq!(coordinator.settle().await, SettleOutcome::Settled);
            assert_eq!(coordinator.completed_cycles(), 1);
        })
        .await;
}
