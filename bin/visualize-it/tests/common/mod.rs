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

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use llm_contracts::{
    ApiClient, LLMError, LLMResult, ModelInfo, ProviderRequest, ProviderResponse, Usage,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Scripted model client: replies are consumed in order, the last one repeats.
/// `None` stands for a timed-out call.
pub struct StubClient {
    healthy: bool,
    replies: Mutex<VecDeque<Option<String>>>,
    pub chat_calls: AtomicUsize,
    pub probe_calls: AtomicUsize,
}

impl StubClient {
    pub fn healthy(replies: Vec<Option<String>>) -> Self {
        Self {
            healthy: true,
            replies: Mutex::new(replies.into()),
            chat_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
        }
    }

    pub fn offline() -> Self {
        Self {
            healthy: false,
            replies: Mutex::new(VecDeque::new()),
            chat_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
        }
    }

    pub fn chats(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApiClient for StubClient {
    async fn chat(&self, request: ProviderRequest) -> LLMResult<ProviderResponse> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        let reply = {
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                replies.pop_front().flatten()
            } else {
                replies.front().cloned().flatten()
            }
        };
        let content = reply.ok_or(LLMError::Timeout)?;
        Ok(ProviderResponse {
            request_id: request.id,
            content,
            model: request.model,
            usage: Usage::new(10, 20),
            finish_reason: Some("stop".to_string()),
            raw_response: json!({}),
            created_at: Utc::now(),
        })
    }

    async fn list_models(&self) -> LLMResult<Vec<ModelInfo>> {
        if !self.healthy {
            return Err(LLMError::Network("connection refused".to_string()));
        }
        Ok(vec![ModelInfo {
            name: "llama3".to_string(),
            size: 4_661_224_676,
            modified_at: None,
        }])
    }

    fn provider_name(&self) -> &'static str {
        "stub"
    }

    async fn health_check(&self) -> LLMResult<()> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.healthy {
            Ok(())
        } else {
            Err(LLMError::Network("connection refused".to_string()))
        }
    }
}

pub fn valid_reply() -> String {
    json!({
        "visualizations": [{
            "title": "Sales by region",
            "description": "Totals per region",
            "type": "plotly",
            "plotlyData": [{"type": "bar", "x": ["North", "South"], "y": [10, 20]}],
            "plotlyLayout": {"title": "Sales by region"}
        }]
    })
    .to_string()
}

pub const SALES_CSV: &str = "region,sales,units\n\
North,100,10\n\
South,150,12\n\
East,90,8\n\
West,120,11\n\
North,80,7\n\
South,60,5\n\
East,110,9\n";
