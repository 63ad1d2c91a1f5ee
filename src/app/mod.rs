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

mod events;
mod state;
mod tasks;
mod terminal;

pub use events::{handle_app_event, handle_terminal_event};
pub use state::{App, AppEvent, AppOptions, FeedList, LoadStatus};

use crate::error::AppError;
use crate::session::SessionIndex;
use crossterm::event::EventStream;
use futures::{FutureExt as _, StreamExt};
use std::time::{Duration, Instant};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const FOLLOW_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Open the session file and build the app around it.
pub async fn create_app(options: &AppOptions, path: &std::path::Path) -> anyhow::Result<App> {
    let index = SessionIndex::open(path).await.map_err(|err| {
        tracing::error!(path = %path.display(), error = %err, "failed to open session");
        let app_error = match &err {
            crate::error::LoadError::Io { source, .. }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                AppError::SessionNotFound
            }
            _ => AppError::InvalidSession,
        };
        anyhow::Error::new(app_error).context(err.to_string())
    })?;
    let app = App::new(options, index)?;
    Ok(app)
}

// ---------------------------------------------------------------------------
// TUI event loop
// ---------------------------------------------------------------------------

pub async fn run_tui(app: &mut App) -> anyhow::Result<()> {
    let mut terminal = terminal::setup()?;
    let result = event_loop(app, &mut terminal).await;
    terminal::restore();
    result
}

async fn event_loop(app: &mut App, terminal: &mut ratatui::DefaultTerminal) -> anyhow::Result<()> {
    let mut events = EventStream::new();
    let mut follow_poll = tokio::time::interval(FOLLOW_POLL_INTERVAL);
    let mut last_render = Instant::now();

    if app.follow {
        tasks::spawn_settle(app);
    }

    loop {
        // Phase 1: wait for at least one event, a due load batch or the next frame tick
        let time_to_next = FRAME_INTERVAL.saturating_sub(last_render.elapsed());
        let load_deadline = app.loader.deadline();
        tokio::select! {
            Some(Ok(event)) = events.next() => {
                handle_terminal_event(app, event);
            }
            Some(event) = app.event_rx.recv() => {
                handle_app_event(app, event);
            }
            () = sleep_until_deadline(load_deadline) => {
                dispatch_due_loads(app);
            }
            _ = follow_poll.tick(), if app.follow => {
                tasks::spawn_tail(app);
            }
            () = tokio::time::sleep(time_to_next) => {}
        }

        // Phase 2: drain all remaining queued events (non-blocking)
        loop {
            if let Some(Some(Ok(event))) = events.next().now_or_never() {
                handle_terminal_event(app, event);
                continue;
            }
            match app.event_rx.try_recv() {
                Ok(event) => handle_app_event(app, event),
                Err(_) => break,
            }
        }

        if app.should_quit {
            break;
        }

        // Phase 3: render once
        if app.force_redraw {
            terminal.clear()?;
            app.force_redraw = false;
        }
        terminal.draw(|f| crate::ui::render(f, app))?;
        last_render = Instant::now();
    }

    Ok(())
}

async fn sleep_until_deadline(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn dispatch_due_loads(app: &mut App) {
    if let Some(batch) = app.loader.take_due(tokio::time::Instant::now()) {
        tasks::spawn_load(app, batch);
    }
}
