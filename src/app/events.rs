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

use super::tasks::{spawn_reload, spawn_settle};
use super::{App, AppEvent, LoadStatus};
use crate::virtual_list::{Align, ScrollBehavior, SettleOutcome};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};

const MOUSE_SCROLL_LINES: i64 = 3;

pub fn handle_terminal_event(app: &mut App, event: Event) {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
        Event::Mouse(mouse) => handle_mouse_event(app, mouse),
        // Resize is picked up by the next frame's viewport sync
        _ => {}
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match (key.code, ctrl) {
        (KeyCode::Char('c'), true) | (KeyCode::Char('q'), false) => app.should_quit = true,
        (KeyCode::Char('l'), true) => app.force_redraw = true,
        (KeyCode::Char('r'), true) => spawn_reload(app),
        (KeyCode::Up, true) => app.list.borrow_mut().scroll_by(-1),
        (KeyCode::Down, true) => app.list.borrow_mut().scroll_by(1),
        (KeyCode::Up | KeyCode::Char('k'), false) => app.list.borrow_mut().move_focus(-1),
        (KeyCode::Down | KeyCode::Char('j'), false) => app.list.borrow_mut().move_focus(1),
        (KeyCode::PageUp, _) => {
            let page = i64::from(app.viewport_rows().max(1));
            app.list.borrow_mut().scroll_by(-page);
        }
        (KeyCode::PageDown, _) => {
            let page = i64::from(app.viewport_rows().max(1));
            app.list.borrow_mut().scroll_by(page);
        }
        (KeyCode::Home | KeyCode::Char('g'), _) => app.list.borrow_mut().scroll_to_top(),
        (KeyCode::End | KeyCode::Char('G'), _) => {
            if !app.settling {
                spawn_settle(app);
            }
        }
        (KeyCode::Enter, _) => {
            let mut list = app.list.borrow_mut();
            if let Some(index) = list.focused() {
                list.scroll_to_index(index, Align::Center);
            }
        }
        (KeyCode::Esc, _) => app.list.borrow_mut().clear_focus(),
        (KeyCode::Char('f'), false) => toggle_follow(app),
        (KeyCode::Char('r'), false) => {
            if matches!(app.load_status, LoadStatus::Failed(_)) {
                app.load_status = LoadStatus::Idle;
            }
            app.loader.retry();
        }
        _ => {}
    }
}

fn toggle_follow(app: &mut App) {
    app.follow = !app.follow;
    app.sync_follow_stick();
    if app.follow {
        app.list.borrow_mut().scroll_to_bottom(ScrollBehavior::Smooth);
    }
    tracing::debug!(follow = app.follow, "follow toggled");
}

fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    let area = app.rendered_feed_area;
    let over_feed = mouse.column >= area.x
        && mouse.column < area.right()
        && mouse.row >= area.y
        && mouse.row < area.bottom();
    if !over_feed {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollUp => app.list.borrow_mut().scroll_by(-MOUSE_SCROLL_LINES),
        MouseEventKind::ScrollDown => app.list.borrow_mut().scroll_by(MOUSE_SCROLL_LINES),
        _ => {}
    }
}

pub fn handle_app_event(app: &mut App, event: AppEvent) {
    let current = app.generation.get();
    match event {
        AppEvent::Loaded { generation, batch, result } => {
            if generation != current {
                return;
            }
            app.loads_in_flight = app.loads_in_flight.saturating_sub(1);
            match result {
                Ok(settled) => {
                    app.loader.complete(&batch);
                    if app.loads_in_flight == 0 && app.load_status == LoadStatus::Loading {
                        app.load_status = LoadStatus::Idle;
                    }
                    if let Some(outcome) = settled {
                        tracing::debug!(?outcome, "post-load settle finished");
                        app.sync_follow_stick();
                    }
                }
                Err(message) => {
                    tracing::warn!(ranges = ?batch.ranges, error = %message, "failed to load session records");
                    app.loader.fail(&batch);
                    app.load_status = LoadStatus::Failed(message);
                }
            }
        }
        AppEvent::Settled { generation, outcome } => {
            if generation != current {
                return;
            }
            app.settling = false;
            if outcome != SettleOutcome::Abandoned {
                app.sync_follow_stick();
            }
        }
        AppEvent::Tail { generation, result } => {
            if generation != current {
                return;
            }
            app.tail_in_flight = false;
            match result {
                Ok(scan) => {
                    if let Err(err) = app.append_tail(scan) {
                        tracing::error!(error = %err, "failed to append live records");
                    }
                }
                Err(message) => tracing::warn!(error = %message, "failed to read appended records"),
            }
        }
        AppEvent::Reloaded(result) => match result {
            Ok(index) => {
                if let Err(err) = app.replace_index(index) {
                    tracing::error!(error = %err, "failed to rebuild the feed");
                } else if app.follow {
                    spawn_settle(app);
                }
            }
            Err(message) => {
                tracing::warn!(error = %message, "failed to reload session");
                app.load_status = LoadStatus::Failed(message);
            }
        },
    }
}
