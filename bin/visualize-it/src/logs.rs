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

//! Server and client log files exposed over HTTP.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const DEFAULT_MAX_LINES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Server,
    Client,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub source: String,
    pub level: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientLogEntry {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub message: String,
    pub timestamp: Option<String>,
    pub source: Option<String>,
}

fn default_level() -> String {
    "info".to_string()
}

fn now_iso() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Parses `timestamp - source - LEVEL - message`. Anything else becomes an
/// `info` entry from `unknown`.
pub fn parse_line(line: &str) -> LogEntry {
    let parts: Vec<&str> = line.splitn(4, " - ").collect();
    match parts.as_slice() {
        [timestamp, source, level, message] => LogEntry {
            timestamp: timestamp.to_string(),
            source: source.to_string(),
            level: level.to_lowercase(),
            message: message.to_string(),
        },
        _ => LogEntry {
            timestamp: now_iso(),
            source: "unknown".to_string(),
            level: "info".to_string(),
            message: line.to_string(),
        },
    }
}

pub struct LogStore {
    server_log: PathBuf,
    client_log: PathBuf,
    lock: Mutex<()>,
}

impl LogStore {
    pub fn new(server_log: impl Into<PathBuf>, client_log: impl Into<PathBuf>) -> Self {
        Self {
            server_log: server_log.into(),
            client_log: client_log.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self, kind: LogKind) -> &Path {
        match kind {
            LogKind::Server => &self.server_log,
            LogKind::Client => &self.client_log,
        }
    }

    /// Creates missing log files with a header line.
    pub async fn ensure_files(&self) -> io::Result<()> {
        let _guard = self.lock.lock().await;
        for path in [&self.server_log, &self.client_log] {
            if fs::try_exists(path).await? {
                continue;
            }
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).await?;
            }
            fs::write(path, format!("# Log file created at {}\n", now_iso())).await?;
            debug!(path = %path.display(), "created log file");
        }
        Ok(())
    }

    /// The last `max_lines` lines of a log, without blanks and `#` comments.
    pub async fn read(&self, kind: LogKind, max_lines: usize) -> io::Result<Vec<LogEntry>> {
        let _guard = self.lock.lock().await;
        let contents = match fs::read_to_string(self.path(kind)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let lines: Vec<&str> = contents.lines().collect();
        let start = lines.len().saturating_sub(max_lines);
        Ok(lines[start..]
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(parse_line)
            .collect())
    }

    pub async fn clear(&self, kind: LogKind) -> io::Result<()> {
        let _guard = self.lock.lock().await;
        fs::write(
            self.path(kind),
            format!("# Log file cleared at {}\n", now_iso()),
        )
        .await?;
        info!(?kind, "cleared log file");
        Ok(())
    }

    pub async fn append_client(&self, entry: ClientLogEntry) -> io::Result<()> {
        let line = format!(
            "{} - {} - {} - {}\n",
            entry.timestamp.unwrap_or_else(now_iso),
            entry.source.as_deref().unwrap_or("client"),
            entry.level.to_uppercase(),
            entry.message
        );
        let _guard = self.lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.client_log)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let entry = parse_line("2024-01-01T10:00:00 - ui - WARNING - slow - render");
        assert_eq!(entry.source, "ui");
        assert_eq!(entry.level, "warning");
        assert_eq!(entry.message, "slow - render");

        let raw = parse_line("plain text");
        assert_eq!(raw.source, "unknown");
        assert_eq!(raw.level, "info");
        assert_eq!(raw.message, "plain text");
    }
}
