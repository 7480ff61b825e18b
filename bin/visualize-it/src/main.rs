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

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use visualize_it::{
    cli::{Cli, Command},
    config::Settings,
    http::build_router,
    llm::OllamaClient,
    logging::setup_logging,
    AppState,
};
use vista::{loader, ChartSelector, Source, VisualizationResponse};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut settings = Settings::load().context("loading settings")?;
    if let Some(level) = cli.log_level {
        settings.log_level = level.as_str().to_string();
    }
    if let Some(addr) = cli.addr.clone() {
        settings.http_addr = addr;
    }
    settings.validate()?;

    match cli.cmd.unwrap_or(Command::Serve) {
        Command::Serve => run_server(settings).await,
        Command::CheckConfig => check_config(&settings),
        Command::Select { file, pretty } => select_file(&settings, &file, pretty),
    }
}

fn init_stderr_logging(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn check_config(settings: &Settings) -> Result<()> {
    init_stderr_logging(&settings.log_level);
    info!(ollama_host = %settings.ollama_host(), "settings are valid");
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}

fn select_file(settings: &Settings, file: &Path, pretty: bool) -> Result<()> {
    init_stderr_logging(&settings.log_level);
    let dataset = loader::load_path(file).with_context(|| format!("loading {}", file.display()))?;
    let descriptors = ChartSelector::with_max_charts(settings.max_visualizations).select(&dataset);
    if descriptors.is_empty() {
        warn!(file = %file.display(), "no charts selected");
    }
    let response = VisualizationResponse::from_descriptors(&descriptors, Source::Heuristic, None);
    let out = if pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{out}");
    Ok(())
}

async fn run_server(settings: Settings) -> Result<()> {
    let llm = Arc::new(OllamaClient::from_settings(&settings)?);
    let addr = settings.socket_addr()?;
    let state = AppState::new(settings, llm);
    state
        .logs
        .ensure_files()
        .await
        .context("creating log files")?;
    let _guard = setup_logging(&state.settings.log_level, &state.settings.server_log_file)?;

    info!(
        model = %state.settings.default_model,
        ollama = %state.settings.ollama_host(),
        max_visualizations = state.settings.max_visualizations,
        "visualize-it starting"
    );

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    let local = listener.local_addr()?;
    info!(%local, "visualize-it listening");

    tokio::select! { _ = axum::serve(listener, app) => {} _ = tokio::signal::ctrl_c() => {} }
    info!("visualize-it shutting down");
    Ok(())
}
