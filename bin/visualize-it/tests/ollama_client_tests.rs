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

use llm_contracts::{ApiClient, LLMError, Message, ProviderRequest};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use vista::Source;
use visualize_it::config::Settings;
use visualize_it::llm::{generate_visualizations, OllamaClient};
use visualize_it::service::VisualizationService;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, max_retries: u32) -> OllamaClient {
    OllamaClient::new(server.uri(), Duration::from_secs(5), max_retries).unwrap()
}

fn request() -> ProviderRequest {
    ProviderRequest::json("llama3", vec![Message::user("chart this")])
}

fn chat_body(content: &str) -> serde_json::Value {
    json!({
        "model": "llama3",
        "created_at": "2024-05-01T10:00:00Z",
        "message": {"role": "assistant", "content": content},
        "done": true,
        "prompt_eval_count": 12,
        "eval_count": 30
    })
}

#[tokio::test]
async fn test_chat_sends_json_format_and_parses_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "llama3",
            "format": "json",
            "stream": false,
            "options": {"num_predict": 2048, "top_k": 50}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("{\"ok\": true}")))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server, 2).chat(request()).await.unwrap();

    assert_eq!(response.content, "{\"ok\": true}");
    assert_eq!(response.usage.total_tokens, 42);
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    assert_eq!(response.model, "llama3");
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 3).chat(request()).await.unwrap_err();
    assert!(matches!(err, LLMError::Provider(msg) if msg.contains("bad request")));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let err = client(&server, 1).chat(request()).await.unwrap_err();
    assert!(matches!(err, LLMError::Provider(_)));
}

#[tokio::test]
async fn test_missing_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string("model 'nope' not found"),
        )
        .mount(&server)
        .await;

    let err = client(&server, 2).chat(request()).await.unwrap_err();
    assert!(matches!(err, LLMError::ModelNotFound(_)));
}

#[tokio::test]
async fn test_slow_reply_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_body("{}"))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri(), Duration::from_millis(100), 0).unwrap();
    let err = client.chat(request()).await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_list_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "llama3:latest", "size": 4661224676_u64, "modified_at": "2024-05-01T10:00:00Z", "digest": "abc"},
                {"name": "deepseek-coder-v2", "size": 8_900_000_000_u64}
            ]
        })))
        .mount(&server)
        .await;

    let models = client(&server, 0).list_models().await.unwrap();

    assert_eq!(models.len(), 2);
    assert_eq!(models[0].name, "llama3:latest");
    assert!(models[0].modified_at.is_some());
    assert!(models[1].modified_at.is_none());
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;
    let ollama = client(&server, 0);
    assert!(ollama.health_check().await.is_err());

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
        .mount(&server)
        .await;
    assert!(ollama.health_check().await.is_ok());
}

#[tokio::test]
async fn test_generate_visualizations_from_fenced_reply() {
    let server = MockServer::start().await;
    let reply = "Here are your charts:\n```json\n{\"visualizations\": [\
        {\"title\": \"A\", \"type\": \"plotly\", \"plotlyData\": [{\"type\": \"bar\", \"x\": [1], \"y\": [2]}]},\
        {\"title\": \"B\", \"type\": \"plotly\", \"plotlyData\": []}\
        ]}\n```";
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(reply)))
        .mount(&server)
        .await;

    let ollama = client(&server, 0);
    let visualizations = generate_visualizations(&ollama, "llama3", "prompt".to_string(), 8)
        .await
        .unwrap();

    assert_eq!(visualizations.len(), 1);
    assert_eq!(visualizations[0].title, "A");
}

#[tokio::test]
async fn test_generate_visualizations_rejects_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_body("{\"visualizations\": []}")),
        )
        .mount(&server)
        .await;

    let ollama = client(&server, 0);
    let err = generate_visualizations(&ollama, "llama3", "prompt".to_string(), 8)
        .await
        .unwrap_err();
    assert!(matches!(err, LLMError::Validation(_)));
}

#[tokio::test]
async fn test_service_makes_one_call_per_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let settings = Settings {
        ollama_api_url: server.uri(),
        ..Settings::default()
    };
    let ollama = OllamaClient::from_settings(&settings).unwrap();
    let service = VisualizationService::new(Arc::new(ollama), settings);

    let result = service.from_text("Tell me a story about charts.", None, 3).await;

    assert_eq!(result.source, Source::Sample);
    assert!(result.error.is_some());
    let chats = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/api/chat")
        .count();
    assert_eq!(chats, 3);
}
