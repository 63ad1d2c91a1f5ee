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

pub mod app;
pub mod error;
pub mod session;
pub mod ui;
pub mod virtual_list;

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "session-feed", about = "Browse recorded AI-assistant sessions in the terminal")]
pub struct Cli {
    /// Session file (one JSON record per line)
    pub path: PathBuf,

    /// Keep reading records appended to the file and stay at the bottom
    #[arg(long, short)]
    pub follow: bool,

    /// Height estimate in rows for records that have not been measured yet
    #[arg(long, default_value_t = virtual_list::DEFAULT_MIN_ITEM_HEIGHT)]
    pub min_item_height: u32,

    /// Rows mounted beyond each side of the viewport
    #[arg(long, default_value_t = virtual_list::DEFAULT_BUFFER)]
    pub buffer: usize,

    /// Distance in rows past which mounted rows are dropped (at least --buffer)
    #[arg(long, default_value_t = virtual_list::DEFAULT_UNLOAD_BUFFER)]
    pub unload_buffer: usize,

    /// Quiet period in milliseconds before a jump to the bottom is considered settled
    #[arg(long, default_value_t = 100)]
    pub settle_quiet_ms: u64,

    /// Delay in milliseconds before loading records for a new scroll position
    #[arg(long, default_value_t = 150)]
    pub load_debounce_ms: u64,

    /// Extra records loaded beyond each side of the mounted rows
    #[arg(long, default_value_t = virtual_list::range_loader::DEFAULT_LOAD_AHEAD)]
    pub load_ahead: usize,

    /// Write tracing diagnostics to a file (disabled unless explicitly set)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Tracing filter directives (example: `info,session_feed::virtual_list=debug`)
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,

    /// Append to `--log-file` instead of truncating on startup
    #[arg(long)]
    pub log_append: bool,
}

impl Cli {
    #[must_use]
    pub fn app_options(&self) -> app::AppOptions {
        app::AppOptions {
            list: virtual_list::VirtualListConfig::default()
                .with_min_item_height(self.min_item_height)
                .with_buffer(self.buffer)
                .with_unload_buffer(self.unload_buffer),
            settle_quiet: Duration::from_millis(self.settle_quiet_ms),
            load_debounce: Duration::from_millis(self.load_debounce_ms),
            load_ahead: self.load_ahead,
            follow: self.follow,
        }
    }
}
