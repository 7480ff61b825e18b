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

use crate::requests::ProviderRequest;
use crate::responses::{ModelInfo, ProviderResponse};
use crate::types::LLMResult;
use async_trait::async_trait;

#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn chat(&self, request: ProviderRequest) -> LLMResult<ProviderResponse>;

    async fn list_models(&self) -> LLMResult<Vec<ModelInfo>>;

    fn provider_name(&self) -> &'static str;

    async fn health_check(&self) -> LLMResult<()>;
}
