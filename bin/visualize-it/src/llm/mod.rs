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

pub mod extract;
pub mod ollama;
pub mod prompts;

pub use extract::extract_json_from_text;
pub use ollama::OllamaClient;

use llm_contracts::{ApiClient, LLMError, LLMResult, Message, ProviderRequest};
use tracing::debug;
use vista::{parse_visualizations, Visualization};

const SYSTEM_PROMPT: &str = "You are a data visualization expert. You analyse data and \
     respond only with valid JSON describing Plotly.js visualizations.";

/// Sends `prompt` to `model` and returns the validated visualizations in the reply.
pub async fn generate_visualizations(
    client: &dyn ApiClient,
    model: &str,
    prompt: String,
    max_visualizations: usize,
) -> LLMResult<Vec<Visualization>> {
    let request = ProviderRequest::json(
        model,
        vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)],
    );
    let response = client.chat(request).await?;
    debug!(
        model = %response.model,
        prompt_tokens = response.usage.prompt_tokens,
        completion_tokens = response.usage.completion_tokens,
        "model replied"
    );
    let reply = extract_json_from_text(&response.content)?;
    parse_visualizations(&reply, max_visualizations)
        .map_err(|e| LLMError::Validation(e.to_string()))
}
