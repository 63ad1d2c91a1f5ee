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

mod feed;
mod header;
mod layout;
pub mod theme;

pub use feed::{entry_height, entry_lines};

use crate::app::{App, LoadStatus};
use crate::virtual_list::StickMode;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

pub fn render(frame: &mut Frame, app: &mut App) {
    let areas = layout::compute(frame.area());

    // Viewport, measurement and load scheduling must see this frame's sizes
    app.prepare_frame(areas.feed, feed::entry_height);

    if areas.header.height > 0 {
        header::render(frame, areas.header, app);
        render_separator(frame, areas.header_sep);
    }
    feed::render(frame, areas.feed, app);
    render_separator(frame, areas.footer_sep);
    render_footer(frame, areas.footer, app);
}

const FOOTER_PAD: u16 = 2;

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let padded = Rect {
        x: area.x + FOOTER_PAD,
        y: area.y,
        width: area.width.saturating_sub(FOOTER_PAD * 2),
        height: area.height,
    };
    frame.render_widget(Paragraph::new(footer_line(app)), padded);
}

pub fn footer_line(app: &App) -> Line<'static> {
    let list = app.list.borrow();
    let sep = || Span::styled("  \u{2502}  ", Style::default().fg(theme::DIM));
    let dim = |text: String| Span::styled(text, Style::default().fg(theme::DIM));

    let visible = list.visible_range();
    let mut spans = if visible.is_empty() {
        vec![dim("no rows".to_owned())]
    } else {
        vec![
            Span::styled(
                format!("{}-{} of {}", visible.start + 1, visible.end, list.len()),
                Style::default().fg(Color::White),
            ),
            sep(),
            dim(list.render_window().map_or_else(String::new, |w| {
                format!("mounted {}-{}", w.start_index + 1, w.end_index + 1)
            })),
        ]
    };

    match list.stick_mode() {
        StickMode::Active => {
            spans.push(sep());
            spans.push(Span::styled("stick", Style::default().fg(theme::STATUS_FOLLOW)));
        }
        StickMode::Suspended => {
            spans.push(sep());
            spans.push(dim("stick paused".to_owned()));
        }
        StickMode::Off => {}
    }

    match &app.load_status {
        LoadStatus::Loading => {
            spans.push(sep());
            spans.push(Span::styled("loading\u{2026}", Style::default().fg(theme::STATUS_RUNNING)));
        }
        LoadStatus::Failed(message) => {
            spans.push(sep());
            spans.push(Span::styled(
                format!("load failed: {message} (r to retry)"),
                Style::default().fg(theme::STATUS_ERROR),
            ));
        }
        LoadStatus::Idle => {}
    }

    if app.settling {
        spans.push(sep());
        spans.push(Span::styled("settling", Style::default().fg(theme::STATUS_RUNNING)));
    }

    Line::from(spans)
}

fn render_separator(frame: &mut Frame, area: Rect) {
    if area.height == 0 {
        return;
    }
    let sep_str = theme::SEPARATOR_CHAR.repeat(area.width as usize);
    let line = Line::from(Span::styled(sep_str, Style::default().fg(theme::DIM)));
    frame.render_widget(Paragraph::new(line), area);
}
