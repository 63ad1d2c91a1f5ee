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

use crate::session::Role;
use ratatui::style::Color;

// Accent
pub const RUST_ORANGE: Color = Color::Rgb(244, 118, 0);

// UI chrome
pub const DIM: Color = Color::DarkGray;
pub const SEPARATOR_CHAR: &str = "─";
pub const FOCUS_MARKER: &str = "▌";

// Role header colors
pub const ROLE_USER: Color = Color::White;
pub const ROLE_ASSISTANT: Color = RUST_ORANGE;
pub const ROLE_SYSTEM: Color = Color::Yellow;
pub const ROLE_TOOL: Color = Color::Cyan;

// Focused row background
pub const FOCUS_BG: Color = Color::Rgb(40, 44, 52);

// Status colors
pub const STATUS_RUNNING: Color = Color::Cyan;
pub const STATUS_ERROR: Color = Color::Red;
pub const STATUS_FOLLOW: Color = Color::Green;

pub fn role_color(role: Role) -> Color {
    match role {
        Role::User => ROLE_USER,
        Role::Assistant => ROLE_ASSISTANT,
        Role::System => ROLE_SYSTEM,
        Role::Tool => ROLE_TOOL,
        Role::Raw => DIM,
    }
}
