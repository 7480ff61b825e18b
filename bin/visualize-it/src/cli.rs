// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "visualize-it",
    about = "Chart suggestions for tabular data and free text",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// Overrides `log_level` from settings.
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Overrides `http_addr` from settings.
    #[arg(long, global = true)]
    pub addr: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP service (default).
    Serve,
    /// Load and validate settings, then print them.
    CheckConfig,
    /// Run heuristic chart selection on a local file and print the result.
    Select {
        file: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
