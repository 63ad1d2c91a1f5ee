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

use super::{App, AppEvent};
use crate::session::{FeedItem, SessionIndex, scan_lines};
use crate::virtual_list::LoadBatch;
use crate::virtual_list::range_loader::load_and_settle;
use std::rc::Rc;

// Background work runs as local tasks on the UI thread. Each task reports
// back through `event_tx` tagged with the list generation it started for.

pub(super) fn spawn_load(app: &mut App, batch: LoadBatch) {
    let list = Rc::clone(&app.list);
    let source = Rc::clone(&app.source);
    let settle = Rc::clone(&app.settle);
    let current = Rc::clone(&app.generation);
    let generation = current.get();
    let tx = app.event_tx.clone();
    app.loads_in_flight += 1;
    app.load_status = super::LoadStatus::Loading;

    tokio::task::spawn_local(async move {
        let result = load_and_settle(&list, source.as_ref(), &batch, &settle, |list, index, entry| {
            if current.get() != generation {
                return;
            }
            list.with_item_mut(index, |item: &mut FeedItem| item.entry = Some(entry));
        })
        .await
        .map_err(|err| err.to_string());
        let _ = tx.send(AppEvent::Loaded { generation, batch, result });
    });
}

/// Jump to the bottom and wait for layout to settle.
pub(super) fn spawn_settle(app: &mut App) {
    let settle = Rc::clone(&app.settle);
    let generation = app.generation.get();
    let tx = app.event_tx.clone();
    app.settling = true;

    tokio::task::spawn_local(async move {
        let outcome = settle.settle().await;
        let _ = tx.send(AppEvent::Settled { generation, outcome });
    });
}

pub(super) fn spawn_tail(app: &mut App) {
    if app.tail_in_flight {
        return;
    }
    let (path, from) = {
        let index = app.index.borrow();
        (index.path().to_path_buf(), index.scanned())
    };
    let generation = app.generation.get();
    let tx = app.event_tx.clone();
    app.tail_in_flight = true;

    tokio::task::spawn_local(async move {
        let result = scan_lines(&path, from).await.map_err(|err| err.to_string());
        let _ = tx.send(AppEvent::Tail { generation, result });
    });
}

pub(super) fn spawn_reload(app: &App) {
    let path = app.index.borrow().path().to_path_buf();
    let tx = app.event_tx.clone();

    tokio::task::spawn_local(async move {
        let result = SessionIndex::open(path).await.map_err(|err| err.to_string());
        let _ = tx.send(AppEvent::Reloaded(result));
    });
}
