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

//! Stability coordinator: scroll to the bottom and wait until layout stops
//! changing.
//!
//! A settle enables stick-to-bottom, jumps to the bottom, then waits for a
//! quiet window with no `ItemResized` notifications. Once quiet, stick is
//! released and a last jump corrects any remaining estimate drift.
//!
//! Under continuous resizing the quiet window never elapses and `settle`
//! never resolves. Stick-to-bottom keeps the view correct meanwhile, so
//! callers should not treat that as a failure.

use super::{ListEvent, ScrollBehavior, VirtualList};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::time::Instant;

pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettlePhase {
    #[default]
    Idle,
    Scrolling,
    WaitingForQuiet,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// This request ran a full cycle.
    Settled,
    /// An earlier cycle finished while this request waited and nothing moved
    /// since, so no second cycle ran.
    Joined,
    /// The coordinator was reset before this request finished.
    Abandoned,
}

/// Resolve once `quiet` elapses without an `ItemResized` event. Window updates
/// alone do not restart the timer.
pub async fn wait_for_quiet(events: &mut mpsc::UnboundedReceiver<ListEvent>, quiet: Duration) {
    let sleep = tokio::time::sleep(quiet);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            () = &mut sleep => return,
            event = events.recv() => match event {
                Some(ListEvent::ItemResized { .. }) => sleep.as_mut().reset(Instant::now() + quiet),
                Some(ListEvent::Update(_)) => {}
                None => return,
            },
        }
    }
}

/// Puts the phase back to `Idle` when a cycle ends without reaching
/// `Stable`, including when the `settle` future is dropped mid-cycle.
struct CycleGuard<'a> {
    phase: &'a Cell<SettlePhase>,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        if matches!(self.phase.get(), SettlePhase::Scrolling | SettlePhase::WaitingForQuiet) {
            self.phase.set(SettlePhase::Idle);
        }
    }
}

pub struct SettleCoordinator<T, K> {
    list: Rc<RefCell<VirtualList<T, K>>>,
    quiet_window: Duration,
    /// Held for the whole cycle; tokio's mutex queues waiters in FIFO order.
    gate: Mutex<()>,
    cancel: Notify,
    phase: Cell<SettlePhase>,
    generation: Cell<u64>,
    /// `(generation, layout_epoch)` at the end of the last full cycle.
    last_settled: Cell<Option<(u64, u64)>>,
    completed: Cell<u64>,
}

impl<T, K> fmt::Debug for SettleCoordinator<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettleCoordinator")
            .field("quiet_window", &self.quiet_window)
            .field("phase", &self.phase.get())
            .field("generation", &self.generation.get())
            .field("completed", &self.completed.get())
            .finish_non_exhaustive()
    }
}

impl<T, K: Eq + Hash + Clone> SettleCoordinator<T, K> {
    #[must_use]
    pub fn new(list: Rc<RefCell<VirtualList<T, K>>>, quiet_window: Duration) -> Self {
        Self {
            list,
            quiet_window,
            gate: Mutex::new(()),
            cancel: Notify::new(),
            phase: Cell::new(SettlePhase::Idle),
            generation: Cell::new(0),
            last_settled: Cell::new(None),
            completed: Cell::new(0),
        }
    }

    #[must_use]
    pub fn phase(&self) -> SettlePhase {
        self.phase.get()
    }

    #[must_use]
    pub fn quiet_window(&self) -> Duration {
        self.quiet_window
    }

    /// Bumped by every [`SettleCoordinator::reset`]. Work started for one
    /// generation must not touch the list once it changed.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Number of cycles that reached `Stable`.
    #[must_use]
    pub fn completed_cycles(&self) -> u64 {
        self.completed.get()
    }

    /// Abandon the in-flight cycle and any queued requests, e.g. on list swap.
    pub fn reset(&self) {
        self.generation.set(self.generation.get() + 1);
        self.phase.set(SettlePhase::Idle);
        self.last_settled.set(None);
        self.cancel.notify_waiters();
        tracing::debug!(generation = self.generation.get(), "settle coordinator reset");
    }

    /// Scroll to the bottom and resolve once layout has been quiet for the
    /// configured window. Requests are serialized.
    pub async fn settle(&self) -> SettleOutcome {
        let generation = self.generation.get();
        let _gate = self.gate.lock().await;
        if self.generation.get() != generation {
            return SettleOutcome::Abandoned;
        }
        {
            let list = self.list.borrow();
            if self.last_settled.get() == Some((generation, list.layout_epoch())) && list.is_at_bottom(0) {
                tracing::trace!("settle request joined the previous cycle");
                return SettleOutcome::Joined;
            }
        }

        let _cycle = CycleGuard { phase: &self.phase };
        self.phase.set(SettlePhase::Scrolling);
        let mut events = {
            let mut list = self.list.borrow_mut();
            let events = list.subscribe();
            list.enable_stick_to_bottom();
            list.scroll_to_bottom(ScrollBehavior::Auto);
            events
        };
        self.phase.set(SettlePhase::WaitingForQuiet);

        tokio::select! {
            () = wait_for_quiet(&mut events, self.quiet_window) => {}
            () = self.cancel.notified() => {
                tracing::debug!("settle abandoned");
                return SettleOutcome::Abandoned;
            }
        }
        if self.generation.get() != generation {
            return SettleOutcome::Abandoned;
        }

        let epoch = {
            let mut list = self.list.borrow_mut();
            list.disable_stick_to_bottom();
            list.scroll_to_bottom(ScrollBehavior::Auto);
            list.layout_epoch()
        };
        self.last_settled.set(Some((generation, epoch)));
        self.phase.set(SettlePhase::Stable);
        self.completed.set(self.completed.get() + 1);
        tracing::debug!(cycles = self.completed.get(), "layout settled");
        SettleOutcome::Settled
    }
}
