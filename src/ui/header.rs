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

use crate::app::App;
use crate::ui::theme;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const HEADER_PAD: u16 = 2;
const SEP: &str = "  \u{2502}  ";

pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let padded = Rect {
        x: area.x + HEADER_PAD,
        y: area.y,
        width: area.width.saturating_sub(HEADER_PAD * 2),
        height: area.height,
    };

    let sep = || Span::styled(SEP, Style::default().fg(theme::DIM));
    let index = app.index.borrow();
    let file_name = index
        .path()
        .file_name()
        .map_or_else(|| index.path().display().to_string(), |name| name.to_string_lossy().into_owned());
    let records = format!("{} records", index.len());

    let mut fixed = UnicodeWidthStr::width("session-feed")
        + UnicodeWidthStr::width("Session: ")
        + UnicodeWidthStr::width(records.as_str())
        + 2 * UnicodeWidthStr::width(SEP);
    if app.follow {
        fixed += UnicodeWidthStr::width(SEP) + UnicodeWidthStr::width("following");
    }
    let name_width = usize::from(padded.width).saturating_sub(fixed).max(8);

    let mut spans = vec![
        Span::styled("session-feed", Style::default().fg(theme::RUST_ORANGE).add_modifier(Modifier::BOLD)),
        sep(),
        Span::styled("Session: ", Style::default().fg(theme::DIM)),
        Span::styled(fit_name(&file_name, name_width), Style::default().fg(Color::White)),
        sep(),
        Span::styled(records, Style::default().fg(Color::White)),
    ];
    if app.follow {
        spans.push(sep());
        spans.push(Span::styled("following", Style::default().fg(theme::STATUS_FOLLOW)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), padded);
}

/// Cut `name` to `max_width` display columns, marking the cut with `...`.
fn fit_name(name: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(name) <= max_width {
        return name.to_owned();
    }
    if max_width <= 3 {
        return ".".repeat(max_width);
    }

    let mut fitted = String::new();
    let mut width: usize = 0;
    for ch in name.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width + 3 > max_width {
            break;
        }
        fitted.push(ch);
        width += ch_width;
    }
    fitted.push_str("...");
    fitted
}
