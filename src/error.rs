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

use std::path::PathBuf;

/// Failures that end the `session-feed` binary with a dedicated exit code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("Session file not found")]
    SessionNotFound,
    #[error("Session file could not be read")]
    InvalidSession,
    #[error("Terminal setup failed")]
    TerminalFailed,
}

impl AppError {
    pub const SESSION_NOT_FOUND_EXIT_CODE: i32 = 23;
    pub const INVALID_SESSION_EXIT_CODE: i32 = 25;
    pub const TERMINAL_FAILED_EXIT_CODE: i32 = 26;

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::SessionNotFound => Self::SESSION_NOT_FOUND_EXIT_CODE,
            Self::InvalidSession => Self::INVALID_SESSION_EXIT_CODE,
            Self::TerminalFailed => Self::TERMINAL_FAILED_EXIT_CODE,
        }
    }

    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "The requested session file was not found.",
            Self::InvalidSession => {
                "The session file could not be read. Expected one JSON record per line."
            }
            Self::TerminalFailed => "Failed to initialize or drive the terminal.",
        }
    }
}

/// Inconsistent list input. These break row identity tracking, so list
/// operations reject the whole update and leave the list untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VirtualListError {
    #[error("duplicate item key at index {index} (first seen at index {first})")]
    DuplicateKey { index: usize, first: usize },
    #[error("item at index {index} has no key")]
    MissingKey { index: usize },
    #[error("replacement for index {index} carries a different key")]
    KeyChanged { index: usize },
    #[error("index {index} is out of bounds for a list of {len} items")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("invalid list configuration: {0}")]
    InvalidConfig(String),
}

/// Content source failures. Surfaced to the caller; the renderer keeps
/// showing placeholders for the affected rows.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line} is out of range (source has {len} lines)")]
    OutOfRange { line: usize, len: usize },
    #[error("content source failed: {0}")]
    Source(String),
}
