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

//! Request orchestration: the model first, then the heuristic selector, then
//! the configured fallback policy.

use crate::config::Settings;
use crate::llm::{self, prompts};
use llm_contracts::{ApiClient, LLMError};
use std::sync::Arc;
use tracing::{error, info, warn};
use vista::{loader, ChartSelector, Dataset, FallbackPolicy, Source, VisualizationResponse};

pub struct VisualizationService {
    llm: Arc<dyn ApiClient>,
    settings: Settings,
    selector: ChartSelector,
}

impl VisualizationService {
    pub fn new(llm: Arc<dyn ApiClient>, settings: Settings) -> Self {
        let selector = ChartSelector::with_max_charts(settings.max_visualizations);
        Self {
            llm,
            settings,
            selector,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn model_or_default<'a>(&'a self, model: Option<&'a str>) -> &'a str {
        model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.settings.default_model)
    }

    /// Up to `max_attempts` model calls on free text. An unreachable model
    /// server ends the attempts early.
    pub async fn from_text(
        &self,
        text: &str,
        model: Option<&str>,
        max_attempts: u32,
    ) -> VisualizationResponse {
        let model = self.model_or_default(model);
        let max_attempts = max_attempts.max(1);
        info!(chars = text.len(), %model, max_attempts, "generating visualizations from text");

        let mut last_error: Option<LLMError> = None;
        for attempt in 1..=max_attempts {
            info!(attempt, max_attempts, "text visualization attempt");
            if let Err(e) = self.llm.health_check().await {
                error!(error = %e, "model server unavailable");
                last_error = Some(e);
                break;
            }

            let prompt = prompts::text_prompt(text, self.settings.max_visualizations);
            match llm::generate_visualizations(
                self.llm.as_ref(),
                model,
                prompt,
                self.settings.max_visualizations,
            )
            .await
            {
                Ok(visualizations) => {
                    info!(count = visualizations.len(), attempt, "model produced visualizations");
                    return VisualizationResponse::from_llm(visualizations, attempt);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "model attempt failed");
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no visualizations generated".to_string());
        self.text_fallback(text, reason)
    }

    fn text_fallback(&self, text: &str, reason: String) -> VisualizationResponse {
        match loader::parse_text(text) {
            Ok(dataset) => {
                let descriptors = self.selector.select(&dataset);
                if !descriptors.is_empty() {
                    info!(
                        rows = dataset.row_count(),
                        columns = dataset.column_count(),
                        count = descriptors.len(),
                        "heuristic visualizations from extracted table"
                    );
                    return VisualizationResponse::from_descriptors(
                        &descriptors,
                        Source::Heuristic,
                        Some(reason),
                    );
                }
            }
            Err(e) => warn!(error = %e, "no table found in text"),
        }

        let policy = self.settings.fallback_policy;
        info!(?policy, "applying fallback policy");
        let source = match policy {
            FallbackPolicy::Sample => Source::Sample,
            FallbackPolicy::Empty => Source::Heuristic,
        };
        VisualizationResponse::from_descriptors(&policy.resolve(), source, Some(reason))
    }

    /// One model call on a loaded table, then the selector.
    pub async fn from_dataset(&self, dataset: &Dataset, model: Option<&str>) -> VisualizationResponse {
        let model = self.model_or_default(model);
        info!(
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            %model,
            "generating visualizations from dataset"
        );
        if dataset.is_empty() {
            return VisualizationResponse::failed("dataset is empty");
        }

        let prompt = prompts::dataset_prompt(dataset, self.settings.max_visualizations);
        match llm::generate_visualizations(
            self.llm.as_ref(),
            model,
            prompt,
            self.settings.max_visualizations,
        )
        .await
        {
            Ok(visualizations) => VisualizationResponse::from_llm(visualizations, 1),
            Err(e) => {
                warn!(error = %e, "model failed on dataset, using heuristic selection");
                let descriptors = self.selector.select(dataset);
                let error = descriptors
                    .is_empty()
                    .then(|| format!("no visualizations generated: {e}"));
                VisualizationResponse::from_descriptors(&descriptors, Source::Heuristic, error)
            }
        }
    }

    pub async fn from_file(
        &self,
        bytes: &[u8],
        filename: &str,
        model: Option<&str>,
    ) -> VisualizationResponse {
        match loader::load_bytes(bytes, filename) {
            Ok(dataset) => self.from_dataset(&dataset, model).await,
            Err(e) => {
                error!(%filename, error = %e, "failed to load uploaded file");
                VisualizationResponse::failed(e.to_string())
            }
        }
    }

    /// Heuristic selection only.
    pub fn fallback(&self, dataset: &Dataset) -> VisualizationResponse {
        let descriptors = self.selector.select(dataset);
        let error = descriptors
            .is_empty()
            .then(|| "no visualizations could be generated for this dataset".to_string());
        VisualizationResponse::from_descriptors(&descriptors, Source::Heuristic, error)
    }
}
