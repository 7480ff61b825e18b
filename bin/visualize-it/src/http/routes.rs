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

use super::error::ApiError;
use crate::logs::{ClientLogEntry, LogKind, DEFAULT_MAX_LINES};
use crate::AppState;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use vista::{loader, VisualizationResponse};

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct TextForm {
    pub text: String,
    pub model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelQuery {
    pub model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub max_lines: Option<usize>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/models", get(models))
        .route("/api/visualize/text", post(visualize_text))
        .route("/api/retry-visualization", post(retry_visualization))
        .route("/api/visualize/file", post(visualize_file))
        .route("/api/visualize/json", post(visualize_json))
        .route("/api/visualize/fallback", post(visualize_fallback))
        .route("/logs/server", get(server_logs))
        .route("/logs/server/clear", post(clear_server_logs))
        .route("/logs/client", get(client_logs).post(log_client_message))
        .route("/logs/client/clear", post(clear_client_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Welcome to the Visualize-It API" }))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let ollama = match state.llm.health_check().await {
        Ok(()) => "ok",
        Err(e) => {
            error!(error = %e, "model server status check failed");
            "error"
        }
    };
    Json(json!({
        "server": "ok",
        "ollama": ollama,
        "timestamp": Local::now().to_rfc3339(),
    }))
}

async fn models(State(state): State<AppState>) -> impl IntoResponse {
    match state.llm.list_models().await {
        Ok(models) => Json(json!({ "models": models })),
        Err(e) => {
            error!(error = %e, "failed to list models");
            Json(json!({ "error": e.to_string(), "models": [] }))
        }
    }
}

fn respond(result: VisualizationResponse) -> Json<VisualizationResponse> {
    match &result.error {
        Some(e) => error!(
            error = %e,
            count = result.visualizations.len(),
            source = ?result.source,
            "visualization request degraded"
        ),
        None => info!(
            count = result.visualizations.len(),
            source = ?result.source,
            "visualization request served"
        ),
    }
    Json(result)
}

async fn visualize_text(
    State(state): State<AppState>,
    Form(form): Form<TextForm>,
) -> Json<VisualizationResponse> {
    info!(chars = form.text.len(), "text visualization request");
    let attempts = state.settings.ollama_max_retries;
    respond(
        state
            .service
            .from_text(&form.text, form.model.as_deref(), attempts)
            .await,
    )
}

async fn retry_visualization(
    State(state): State<AppState>,
    Form(form): Form<TextForm>,
) -> Json<VisualizationResponse> {
    info!(chars = form.text.len(), "retry visualization request");
    respond(
        state
            .service
            .from_text(&form.text, form.model.as_deref(), 1)
            .await,
    )
}

async fn visualize_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<VisualizationResponse>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut model: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload.csv").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read upload: {e}")))?;
                upload = Some((filename, bytes.to_vec()));
            }
            Some("model") => {
                model = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("invalid model field: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::bad_request("multipart field 'file' is required"))?;
    info!(%filename, bytes = bytes.len(), "file visualization request");
    Ok(respond(
        state
            .service
            .from_file(&bytes, &filename, model.as_deref())
            .await,
    ))
}

async fn visualize_json(
    State(state): State<AppState>,
    Query(query): Query<ModelQuery>,
    Json(body): Json<JsonValue>,
) -> Json<VisualizationResponse> {
    info!("JSON visualization request");
    let result = match loader::from_json(&body) {
        Ok(dataset) => {
            state
                .service
                .from_dataset(&dataset, query.model.as_deref())
                .await
        }
        Err(e) => VisualizationResponse::failed(e.to_string()),
    };
    respond(result)
}

async fn visualize_fallback(
    State(state): State<AppState>,
    Json(body): Json<JsonValue>,
) -> Json<VisualizationResponse> {
    info!("fallback visualization request");
    let result = match loader::from_json(&body) {
        Ok(dataset) => state.service.fallback(&dataset),
        Err(e) => VisualizationResponse::failed(e.to_string()),
    };
    respond(result)
}

async fn read_logs(
    state: &AppState,
    kind: LogKind,
    query: LogQuery,
) -> Result<Json<JsonValue>, ApiError> {
    let max_lines = query.max_lines.unwrap_or(DEFAULT_MAX_LINES);
    info!(?kind, max_lines, "retrieving logs");
    let logs = state
        .logs
        .read(kind, max_lines)
        .await
        .map_err(|e| ApiError::log_io("read log file", e))?;
    Ok(Json(json!({ "logs": logs })))
}

async fn clear_logs(state: &AppState, kind: LogKind) -> Result<Json<JsonValue>, ApiError> {
    state
        .logs
        .clear(kind)
        .await
        .map_err(|e| ApiError::log_io("clear log file", e))?;
    Ok(Json(json!({ "status": "success" })))
}

async fn server_logs(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Result<Json<JsonValue>, ApiError> {
    read_logs(&state, LogKind::Server, query).await
}

async fn client_logs(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Result<Json<JsonValue>, ApiError> {
    read_logs(&state, LogKind::Client, query).await
}

async fn clear_server_logs(State(state): State<AppState>) -> Result<Json<JsonValue>, ApiError> {
    clear_logs(&state, LogKind::Server).await
}

async fn clear_client_logs(State(state): State<AppState>) -> Result<Json<JsonValue>, ApiError> {
    clear_logs(&state, LogKind::Client).await
}

async fn log_client_message(
    State(state): State<AppState>,
    Json(entry): Json<ClientLogEntry>,
) -> Result<Json<JsonValue>, ApiError> {
    state
        .logs
        .append_client(entry)
        .await
        .map_err(|e| ApiError::log_io("log client message", e))?;
    Ok(Json(json!({ "status": "success" })))
}
