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

pub mod cli;
pub mod config;
pub mod http;
pub mod llm;
pub mod logging;
pub mod logs;
pub mod service;

use config::Settings;
use llm_contracts::ApiClient;
use logs::LogStore;
use service::VisualizationService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub service: Arc<VisualizationService>,
    pub llm: Arc<dyn ApiClient>,
    pub logs: Arc<LogStore>,
}

impl AppState {
    pub fn new(settings: Settings, llm: Arc<dyn ApiClient>) -> Self {
        let logs = Arc::new(LogStore::new(
            settings.server_log_file.clone(),
            settings.client_log_file.clone(),
        ));
        let service = Arc::new(VisualizationService::new(llm.clone(), settings.clone()));
        Self {
            settings: Arc::new(settings),
            service,
            llm,
            logs,
        }
    }
}
