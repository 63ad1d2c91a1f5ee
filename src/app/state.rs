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
use crate::session::{FeedItem, FileContentSource, SessionEntry, SessionIndex, TailScan, feed_key, placeholders};
use crate::virtual_list::{
    ListEvent, LoadBatch, MeasureLoop, PollingProvider, RangeLoader, SettleCoordinator, SettleOutcome,
    StickMode, VirtualList, VirtualListConfig,
};
use ratatui::layout::Rect;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::mpsc;

pub type FeedList = VirtualList<FeedItem, usize>;

/// Runtime knobs, filled from the command line.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub list: VirtualListConfig,
    pub settle_quiet: Duration,
    pub load_debounce: Duration,
    pub load_ahead: usize,
    pub follow: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            list: VirtualListConfig::default(),
            settle_quiet: crate::virtual_list::settle::DEFAULT_QUIET_WINDOW,
            load_debounce: crate::virtual_list::range_loader::DEFAULT_LOAD_DEBOUNCE,
            load_ahead: crate::virtual_list::range_loader::DEFAULT_LOAD_AHEAD,
            follow: false,
        }
    }
}

/// Results of background tasks, delivered back to the event loop.
#[derive(Debug)]
pub enum AppEvent {
    Loaded { generation: u64, batch: LoadBatch, result: Result<Option<SettleOutcome>, String> },
    Settled { generation: u64, outcome: SettleOutcome },
    Tail { generation: u64, result: Result<TailScan, String> },
    Reloaded(Result<SessionIndex, String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Failed(String),
}

pub struct App {
    pub list: Rc<RefCell<FeedList>>,
    pub settle: Rc<SettleCoordinator<FeedItem, usize>>,
    pub loader: RangeLoader,
    pub measure: MeasureLoop<usize>,
    pub measurer: PollingProvider<usize>,
    pub index: Rc<RefCell<SessionIndex>>,
    pub source: Rc<FileContentSource>,
    /// Window updates for the range loader.
    pub list_events: mpsc::UnboundedReceiver<ListEvent>,
    pub event_tx: mpsc::UnboundedSender<AppEvent>,
    pub event_rx: mpsc::UnboundedReceiver<AppEvent>,
    /// Bumped on every list swap so results of older tasks are dropped.
    pub generation: Rc<Cell<u64>>,
    pub follow: bool,
    pub load_status: LoadStatus,
    pub loads_in_flight: usize,
    pub settling: bool,
    pub tail_in_flight: bool,
    pub should_quit: bool,
    /// Force a full terminal clear on next render frame.
    pub force_redraw: bool,
    /// Width the current measurements were taken at.
    pub feed_width: u16,
    /// Area where the feed was rendered last frame.
    pub rendered_feed_area: Rect,
}

impl App {
    pub fn new(options: &AppOptions, index: SessionIndex) -> Result<Self, VirtualListError> {
        let len = index.len();
        let mut list = VirtualList::new(options.list, feed_key)?;
        let list_events = list.subscribe();
        list.set_items(placeholders(0..len))?;
        let list = Rc::new(RefCell::new(list));
        let index = Rc::new(RefCell::new(index));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Ok(Self {
            settle: Rc::new(SettleCoordinator::new(Rc::clone(&list), options.settle_quiet)),
            source: Rc::new(FileContentSource::new(Rc::clone(&index))),
            list,
            loader: RangeLoader::new(options.load_ahead, options.load_debounce),
            measure: MeasureLoop::new(),
            measurer: PollingProvider::default(),
            index,
            list_events,
            event_tx,
            event_rx,
            generation: Rc::new(Cell::new(0)),
            follow: options.follow,
            load_status: LoadStatus::Idle,
            loads_in_flight: 0,
            settling: false,
            tail_in_flight: false,
            should_quit: false,
            force_redraw: false,
            feed_width: 0,
            rendered_feed_area: Rect::default(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.list.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Viewport height in rows.
    #[must_use]
    pub fn viewport_rows(&self) -> u32 {
        self.list.borrow().scroll_state().client_height
    }

    /// Per-frame bookkeeping before drawing: viewport size, smooth scroll
    /// step, row measurement, and load scheduling for window changes.
    pub fn prepare_frame(&mut self, feed: Rect, measure_row: impl Fn(&SessionEntry, u16) -> u32) {
        self.rendered_feed_area = feed;
        if feed.width != self.feed_width {
            self.feed_width = feed.width;
            self.measurer.invalidate();
        }
        let width = self.feed_width;
        {
            let mut list = self.list.borrow_mut();
            list.set_viewport(u32::from(feed.height));
            list.tick();
            self.measure.sync_observed(&list, &mut self.measurer);
            self.measurer.poll(|key| {
                let index = list.index_of(key)?;
                let entry = list.get(index)?.entry.as_ref()?;
                Some(measure_row(entry, width))
            });
            self.measure.pump(&mut list);
        }
        self.schedule_loads();
    }

    /// Feed window updates to the range loader.
    pub fn schedule_loads(&mut self) {
        let list = self.list.borrow();
        while let Ok(event) = self.list_events.try_recv() {
            if let ListEvent::Update(update) = event {
                self.loader.on_update(&update, list.len(), |i| list.get(i).is_some_and(FeedItem::is_loaded));
            }
        }
    }

    /// Swap in a freshly opened index. Every piece of per-list state starts
    /// over and results of tasks started for the old list are ignored.
    pub fn replace_index(&mut self, index: SessionIndex) -> Result<(), VirtualListError> {
        self.generation.set(self.generation.get() + 1);
        self.settle.reset();
        self.loader.reset();
        self.measure.reset(&mut self.measurer);
        self.loads_in_flight = 0;
        self.settling = false;
        self.tail_in_flight = false;
        self.load_status = LoadStatus::Idle;
        let len = index.len();
        *self.index.borrow_mut() = index;
        self.list.borrow_mut().set_items(placeholders(0..len))?;
        tracing::info!(records = len, "session reloaded");
        Ok(())
    }

    /// Add rows for records appended to the file.
    pub fn append_tail(&mut self, scan: TailScan) -> Result<usize, VirtualListError> {
        let new = self.index.borrow_mut().append(scan);
        let added = new.len();
        if added > 0 {
            self.list.borrow_mut().extend(placeholders(new))?;
            tracing::debug!(added, "appended live records");
        }
        Ok(added)
    }

    /// Stick to the bottom while following, unless a settle is driving it.
    pub fn sync_follow_stick(&mut self) {
        let mut list = self.list.borrow_mut();
        match (self.follow, list.stick_mode()) {
            (true, StickMode::Off) if !self.settling => list.enable_stick_to_bottom(),
            (false, StickMode::Active | StickMode::Suspended) if !self.settling => {
                list.disable_stick_to_bottom();
            }
            _ => {}
        }
    }
}
