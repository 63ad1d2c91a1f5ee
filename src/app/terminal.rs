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

use crate::error::AppError;
use ratatui::DefaultTerminal;

/// Enter the alternate screen with mouse capture for wheel scrolling.
pub(super) fn setup() -> anyhow::Result<DefaultTerminal> {
    let terminal = ratatui::try_init().map_err(|err| {
        tracing::error!(error = %err, "terminal initialization failed");
        anyhow::Error::new(AppError::TerminalFailed).context(err)
    })?;
    // Mouse capture is optional; some terminals reject it.
    if let Err(err) = crossterm::execute!(std::io::stdout(), crossterm::event::EnableMouseCapture) {
        tracing::warn!(error = %err, "mouse capture unavailable");
    }
    Ok(terminal)
}

pub(super) fn restore() {
    let _ = crossterm::execute!(std::io::stdout(), crossterm::event::DisableMouseCapture);
    ratatui::restore();
}
