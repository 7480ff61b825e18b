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

use crate::config::Settings;
use async_trait::async_trait;
use chrono::Utc;
use llm_contracts::{
    ApiClient, LLMError, LLMResult, ModelInfo, ProviderRequest, ProviderResponse, Usage,
};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timeout for the availability probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, max_retries: u32) -> LLMResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LLMError::Configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            max_retries,
        })
    }

    /// Client for the service path: one timed call per chat, since
    /// `ollama_max_retries` already bounds the attempts made by the service.
    pub fn from_settings(settings: &Settings) -> LLMResult<Self> {
        Self::new(settings.ollama_base_url(), settings.timeout(), 0)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_payload(&self, request: &ProviderRequest) -> Value {
        json!({
            "model": request.model,
            "messages": request.messages,
            "format": "json",
            "stream": false,
            "options": request.options,
        })
    }

    fn parse_response(&self, request: &ProviderRequest, data: Value) -> LLMResult<ProviderResponse> {
        let content = data["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                LLMError::Provider("failed to extract content from Ollama response".to_string())
            })?
            .to_string();

        let usage = Usage::new(
            data["prompt_eval_count"].as_u64().unwrap_or(0) as u32,
            data["eval_count"].as_u64().unwrap_or(0) as u32,
        );
        let finish_reason = data["done_reason"]
            .as_str()
            .map(String::from)
            .or_else(|| data["done"].as_bool().unwrap_or(false).then(|| "stop".to_string()));

        Ok(ProviderResponse {
            request_id: request.id,
            content,
            model: data["model"].as_str().unwrap_or(&request.model).to_string(),
            usage,
            finish_reason,
            raw_response: data,
            created_at: Utc::now(),
        })
    }

    async fn execute_request_with_retry(&self, payload: Value, endpoint: &str) -> LLMResult<Value> {
        let mut last_error = None;
        let url = format!("{}{}", self.base_url, endpoint);

        for attempt in 0..=self.max_retries {
            debug!(
                attempt = attempt + 1,
                max_attempts = self.max_retries + 1,
                "sending request to Ollama API"
            );

            let response = tokio::time::timeout(
                self.timeout,
                self.client
                    .post(&url)
                    .header("content-type", "application/json")
                    .json(&payload)
                    .send(),
            )
            .await;

            match response {
                Ok(Ok(resp)) => {
                    let status = resp.status();
                    info!(%status, "received response from Ollama API");

                    if status.is_success() {
                        match resp.json::<Value>().await {
                            Ok(data) => return Ok(data),
                            Err(e) => {
                                last_error = Some(LLMError::Serialisation(format!(
                                    "failed to parse JSON response: {e}"
                                )));
                            }
                        }
                    } else if status.as_u16() == 429 {
                        let wait_time = Duration::from_secs(2_u64.pow(attempt.min(5)));
                        warn!(?wait_time, "rate limited by Ollama API");
                        last_error = Some(LLMError::RateLimit);
                        if attempt < self.max_retries {
                            tokio::time::sleep(wait_time).await;
                        }
                    } else {
                        let error_body = resp.text().await.unwrap_or_default();
                        if status.as_u16() == 404 {
                            return Err(LLMError::ModelNotFound(error_body));
                        }
                        last_error = Some(LLMError::Provider(format!(
                            "Ollama API error {status}: {error_body}"
                        )));
                        if status.is_client_error() {
                            break;
                        }
                    }
                }
                Ok(Err(e)) => {
                    last_error = Some(LLMError::Network(format!("request failed: {e}")));
                    if attempt < self.max_retries {
                        let wait_time = Duration::from_secs(2_u64.pow(attempt.min(3)));
                        tokio::time::sleep(wait_time).await;
                    }
                }
                Err(_) => {
                    warn!(timeout = ?self.timeout, "request to Ollama API timed out");
                    last_error = Some(LLMError::Timeout);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LLMError::Internal("unknown error".to_string())))
    }

    async fn get_tags(&self, timeout: Duration) -> LLMResult<Value> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else {
                    LLMError::Network(format!("Ollama API connection error: {e}"))
                }
            })?;
        if !resp.status().is_success() {
            return Err(LLMError::Provider(format!(
                "Ollama API is not available: {}",
                resp.status()
            )));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| LLMError::Serialisation(format!("invalid tags response: {e}")))
    }
}

#[async_trait]
impl ApiClient for OllamaClient {
    async fn chat(&self, request: ProviderRequest) -> LLMResult<ProviderResponse> {
        let payload = self.build_payload(&request);
        let data = self.execute_request_with_retry(payload, "/api/chat").await?;
        self.parse_response(&request, data)
    }

    async fn list_models(&self) -> LLMResult<Vec<ModelInfo>> {
        let data = self.get_tags(self.timeout).await?;
        let models = data
            .get("models")
            .cloned()
            .ok_or_else(|| LLMError::Provider("tags response has no models list".to_string()))?;
        let models: Vec<ModelInfo> = serde_json::from_value(models)?;
        info!(count = models.len(), "listed Ollama models");
        Ok(models)
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }

    async fn health_check(&self) -> LLMResult<()> {
        self.get_tags(PROBE_TIMEOUT).await.map(|_| ())
    }
}
