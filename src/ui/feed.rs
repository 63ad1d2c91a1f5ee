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
use crate::session::{FeedItem, Role, SessionEntry};
use crate::ui::theme;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Paragraph, Wrap};

/// Rendered lines of one loaded record: a role header, the text, and a blank
/// spacer line.
pub fn entry_lines(entry: &SessionEntry, focused: bool) -> Vec<Line<'static>> {
    let marker = if focused {
        Span::styled(theme::FOCUS_MARKER, Style::default().fg(theme::RUST_ORANGE))
    } else {
        Span::raw(" ")
    };
    let color = theme::role_color(entry.role);
    let mut header = vec![
        marker,
        Span::styled(entry.role.label(), Style::default().fg(color).add_modifier(Modifier::BOLD)),
    ];
    if let Some(timestamp) = &entry.timestamp {
        header.push(Span::styled(format!("  {timestamp}"), Style::default().fg(theme::DIM)));
    }

    let body_style =
        if entry.role == Role::Raw { Style::default().fg(theme::DIM) } else { Style::default() };
    let mut lines = vec![Line::from(header)];
    lines.extend(entry.text.lines().map(|text| Line::from(Span::styled(format!(" {text}"), body_style))));
    lines.push(Line::default());
    lines
}

fn placeholder_lines(line: usize, focused: bool) -> Vec<Line<'static>> {
    let marker = if focused { theme::FOCUS_MARKER } else { " " };
    vec![Line::from(Span::styled(
        format!("{marker}\u{2026} record {} loading", line + 1),
        Style::default().fg(theme::DIM).add_modifier(Modifier::ITALIC),
    ))]
}

fn row_paragraph(item: &FeedItem, focused: bool) -> Paragraph<'static> {
    let lines = match &item.entry {
        Some(entry) => entry_lines(entry, focused),
        None => placeholder_lines(item.line, focused),
    };
    let mut paragraph = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    if focused {
        paragraph = paragraph.style(Style::default().bg(theme::FOCUS_BG));
    }
    paragraph
}

/// Wrapped height of a loaded record at `width` columns.
pub fn entry_height(entry: &SessionEntry, width: u16) -> u32 {
    let paragraph = Paragraph::new(Text::from(entry_lines(entry, false))).wrap(Wrap { trim: false });
    u32::try_from(paragraph.line_count(width)).unwrap_or(u32::MAX).max(1)
}

/// Draw the mounted rows that intersect the viewport. Rows cut by the top
/// edge are scrolled so their visible tail lines up with the viewport.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let list = app.list.borrow();
    if list.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "  This session has no records yet.",
            Style::default().fg(theme::DIM),
        )));
        frame.render_widget(empty, area);
        return;
    }

    let scroll_top = list.scroll_state().scroll_top;
    let view_bottom = scroll_top + u64::from(area.height);
    let focused = list.focused();
    for (index, item) in list.mounted() {
        let top = list.offset_of(index);
        let bottom = top + u64::from(list.height_of(index));
        if bottom <= scroll_top || top >= view_bottom {
            continue;
        }
        let y = top.saturating_sub(scroll_top);
        let rows = bottom.min(view_bottom) - top.max(scroll_top);
        let skip = scroll_top.saturating_sub(top);
        let rect = Rect {
            x: area.x,
            y: area.y + u16::try_from(y).unwrap_or(u16::MAX),
            width: area.width,
            height: u16::try_from(rows).unwrap_or(u16::MAX),
        }
        .intersection(area);
        let paragraph = row_paragraph(item, focused == Some(index))
            .scroll((u16::try_from(skip).unwrap_or(u16::MAX), 0));
        frame.render_widget(paragraph, rect);
    }
}
