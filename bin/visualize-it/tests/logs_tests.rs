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

use visualize_it::logs::{ClientLogEntry, LogKind, LogStore};

fn store(dir: &tempfile::TempDir) -> LogStore {
    LogStore::new(dir.path().join("logs/backend.log"), dir.path().join("client.log"))
}

fn entry(level: &str, message: &str) -> ClientLogEntry {
    ClientLogEntry {
        level: level.to_string(),
        message: message.to_string(),
        timestamp: None,
        source: None,
    }
}

#[tokio::test]
async fn test_files_created_with_header() {
    let dir = tempfile::tempdir().unwrap();
    let logs = store(&dir);
    logs.ensure_files().await.unwrap();

    let server = std::fs::read_to_string(dir.path().join("logs/backend.log")).unwrap();
    assert!(server.starts_with("# Log file created at "));
    assert!(logs.read(LogKind::Client, 100).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_existing_file_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("client.log");
    std::fs::write(&path, "2024-01-01T00:00:00 - client - INFO - kept\n").unwrap();

    let logs = store(&dir);
    logs.ensure_files().await.unwrap();

    let entries = logs.read(LogKind::Client, 100).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "kept");
}

#[tokio::test]
async fn test_append_defaults_and_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let logs = store(&dir);
    logs.ensure_files().await.unwrap();

    logs.append_client(entry("error", "upload failed")).await.unwrap();
    logs.append_client(ClientLogEntry {
        level: "debug".to_string(),
        message: "rendered 3 charts".to_string(),
        timestamp: Some("2024-06-01T12:00:00".to_string()),
        source: Some("chart-panel".to_string()),
    })
    .await
    .unwrap();

    let raw = std::fs::read_to_string(dir.path().join("client.log")).unwrap();
    assert!(raw.contains(" - client - ERROR - upload failed\n"));
    assert!(raw.contains("2024-06-01T12:00:00 - chart-panel - DEBUG - rendered 3 charts\n"));

    let entries = logs.read(LogKind::Client, 1000).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].level, "error");
    assert_eq!(entries[0].source, "client");
    assert_eq!(entries[1].timestamp, "2024-06-01T12:00:00");
    assert_eq!(entries[1].level, "debug");
}

#[tokio::test]
async fn test_read_keeps_last_lines() {
    let dir = tempfile::tempdir().unwrap();
    let logs = store(&dir);
    logs.ensure_files().await.unwrap();
    for i in 0..5 {
        logs.append_client(entry("info", &format!("message {i}")))
            .await
            .unwrap();
    }

    let entries = logs.read(LogKind::Client, 2).await.unwrap();
    let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["message 3", "message 4"]);
}

#[tokio::test]
async fn test_unparsable_lines_become_info() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("logs")).unwrap();
    std::fs::write(
        dir.path().join("logs/backend.log"),
        "# header\n\nstack trace line\n2024-01-01T00:00:00 - visualize_it::service - WARN - model attempt failed\n",
    )
    .unwrap();
    let logs = store(&dir);

    let entries = logs.read(LogKind::Server, 1000).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].source, "unknown");
    assert_eq!(entries[0].level, "info");
    assert_eq!(entries[0].message, "stack trace line");
    assert_eq!(entries[1].source, "visualize_it::service");
    assert_eq!(entries[1].level, "warn");
}

#[tokio::test]
async fn test_clear_leaves_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let logs = store(&dir);
    logs.ensure_files().await.unwrap();
    logs.append_client(entry("info", "to be cleared")).await.unwrap();

    logs.clear(LogKind::Client).await.unwrap();

    let raw = std::fs::read_to_string(dir.path().join("client.log")).unwrap();
    assert!(raw.starts_with("# Log file cleared at "));
    assert_eq!(raw.lines().count(), 1);
    assert!(logs.read(LogKind::Client, 1000).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_file_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let logs = store(&dir);
    assert!(logs.read(LogKind::Server, 10).await.unwrap().is_empty());
}
