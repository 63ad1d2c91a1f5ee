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

use crate::error::LoadError;
use serde::de::IgnoredAny;
use std::io::SeekFrom;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

/// Byte span of one record in the session file, without its line terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub offset: u64,
    pub len: usize,
}

/// Records found by one pass over the file, starting at some byte offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TailScan {
    pub spans: Vec<LineSpan>,
    /// Offset just past the last consumed record.
    pub scanned: u64,
}

/// Locate records from byte `from` to the end of the file.
///
/// Blank lines are skipped. An unterminated last line is only taken when it
/// already holds a complete JSON value; otherwise it is assumed to be a write
/// in progress and left for the next scan.
pub async fn scan_lines(path: &Path, from: u64) -> Result<TailScan, LoadError> {
    let io_err = |source: std::io::Error| LoadError::Io { path: path.to_path_buf(), source };
    let mut file = tokio::fs::File::open(path).await.map_err(io_err)?;
    let file_len = file.metadata().await.map_err(io_err)?.len();
    if file_len < from {
        return Err(LoadError::Source(format!(
            "{} shrank to {file_len} bytes, {from} bytes were already indexed",
            path.display()
        )));
    }
    file.seek(SeekFrom::Start(from)).await.map_err(io_err)?;

    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut scan = TailScan { spans: Vec::new(), scanned: from };
    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).await.map_err(io_err)?;
        if read == 0 {
            break;
        }
        let terminated = buf.last() == Some(&b'\n');
        let body = trim_line_end(&buf);
        if !terminated && serde_json::from_slice::<IgnoredAny>(body).is_err() {
            break;
        }
        if !body.iter().all(u8::is_ascii_whitespace) {
            scan.spans.push(LineSpan { offset: scan.scanned, len: body.len() });
        }
        scan.scanned += read as u64;
    }
    Ok(scan)
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Record offsets of a JSON-lines session file. Records are only located,
/// never parsed, so opening a large session is a single sequential read.
#[derive(Debug, Clone)]
pub struct SessionIndex {
    path: PathBuf,
    spans: Vec<LineSpan>,
    scanned: u64,
}

impl SessionIndex {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let path = path.into();
        let scan = scan_lines(&path, 0).await?;
        let mut index = Self { path, spans: Vec::new(), scanned: 0 };
        index.append(scan);
        tracing::info!(path = %index.path.display(), records = index.len(), "session indexed");
        Ok(index)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    #[must_use]
    pub fn span(&self, line: usize) -> Option<LineSpan> {
        self.spans.get(line).copied()
    }

    #[must_use]
    pub fn scanned(&self) -> u64 {
        self.scanned
    }

    /// Add records from a tail scan. Returns the range of new record numbers.
    pub fn append(&mut self, scan: TailScan) -> Range<usize> {
        let start = self.spans.len();
        if scan.scanned < self.scanned {
            tracing::warn!(scanned = scan.scanned, indexed = self.scanned, "ignoring stale tail scan");
            return start..start;
        }
        self.spans.extend(scan.spans);
        self.scanned = scan.scanned;
        start..self.spans.len()
    }

    /// Scan for records appended since the last scan.
    pub async fn refresh(&mut self) -> Result<Range<usize>, LoadError> {
        let scan = scan_lines(&self.path, self.scanned).await?;
        Ok(self.append(scan))
    }
}
