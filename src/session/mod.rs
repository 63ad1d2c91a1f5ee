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

//! Recorded session files: one JSON record per line, indexed up front and
//! decoded on demand for the rows the feed mounts.

mod entry;
mod index;
mod source;

pub use entry::{Role, SessionEntry};
pub use index::{LineSpan, SessionIndex, TailScan, scan_lines};
pub use source::FileContentSource;

use std::ops::Range;

/// One row of the session feed. `entry` stays `None` until the record has
/// been loaded, and the row renders as a placeholder meanwhile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub line: usize,
    pub entry: Option<SessionEntry>,
}

impl FeedItem {
    #[must_use]
    pub fn placeholder(line: usize) -> Self {
        Self { line, entry: None }
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.entry.is_some()
    }
}

/// Row identity: the record number never changes for a given record.
#[allow(clippy::unnecessary_wraps)]
pub fn feed_key(item: &FeedItem) -> Option<usize> {
    Some(item.line)
}

#[must_use]
pub fn placeholders(lines: Range<usize>) -> Vec<FeedItem> {
    lines.map(FeedItem::placeholder).collect()
}
