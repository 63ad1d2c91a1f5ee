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

use super::entry::SessionEntry;
use super::index::{LineSpan, SessionIndex};
use crate::error::LoadError;
use crate::virtual_list::ContentSource;
use async_trait::async_trait;
use std::cell::RefCell;
use std::io::SeekFrom;
use std::rc::Rc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Loads and decodes session records straight from the file, using the
/// shared index for byte offsets.
#[derive(Debug, Clone)]
pub struct FileContentSource {
    index: Rc<RefCell<SessionIndex>>,
}

impl FileContentSource {
    #[must_use]
    pub fn new(index: Rc<RefCell<SessionIndex>>) -> Self {
        Self { index }
    }

    fn spans(&self, ranges: &[(usize, usize)]) -> Result<Vec<(usize, LineSpan)>, LoadError> {
        let index = self.index.borrow();
        let mut spans = Vec::new();
        for &(start, end) in ranges {
            for line in start..=end {
                let span = index
                    .span(line)
                    .ok_or_else(|| LoadError::OutOfRange { line, len: index.len() })?;
                spans.push((line, span));
            }
        }
        Ok(spans)
    }
}

#[async_trait(?Send)]
impl ContentSource for FileContentSource {
    type Content = SessionEntry;

    async fn fetch(&self, ranges: &[(usize, usize)]) -> Result<Vec<(usize, SessionEntry)>, LoadError> {
        let spans = self.spans(ranges)?;
        let path = self.index.borrow().path().to_path_buf();
        let io_err = |source: std::io::Error| LoadError::Io { path: path.clone(), source };

        let mut file = tokio::fs::File::open(&path).await.map_err(io_err)?;
        let mut loaded = Vec::with_capacity(spans.len());
        let mut buf = Vec::new();
        for (line, span) in spans {
            buf.resize(span.len, 0);
            file.seek(SeekFrom::Start(span.offset)).await.map_err(io_err)?;
            file.read_exact(&mut buf).await.map_err(io_err)?;
            loaded.push((line, SessionEntry::decode(&String::from_utf8_lossy(&buf))));
        }
        tracing::debug!(records = loaded.len(), "loaded session records");
        Ok(loaded)
    }
}
