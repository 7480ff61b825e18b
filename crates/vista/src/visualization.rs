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

//! Wire-level visualizations, as returned by the LLM or derived from descriptors.

use crate::descriptor::{ChartDescriptor, RENDERING_ENGINE};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::warn;

fn default_engine() -> String {
    RENDERING_ENGINE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visualization {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default = "default_engine")]
    pub engine: String,
    #[serde(rename = "plotlyData", default, skip_serializing_if = "Vec::is_empty")]
    pub plotly_data: Vec<JsonValue>,
    #[serde(rename = "plotlyLayout", default, skip_serializing_if = "Option::is_none")]
    pub plotly_layout: Option<JsonValue>,
    /// Fields the renderer may understand but this service does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Visualization {
    /// Validates a raw JSON object and converts it.
    pub fn from_json(value: &JsonValue) -> Result<Self, ValidationError> {
        validate_visualization(value)?;
        serde_json::from_value(value.clone()).map_err(|_| ValidationError::MissingField {
            field: "title".to_string(),
        })
    }
}

impl From<&ChartDescriptor> for Visualization {
    fn from(descriptor: &ChartDescriptor) -> Self {
        let data = descriptor.to_json().unwrap_or_else(|e| {
            warn!(title = %descriptor.title, error = %e, "descriptor failed to serialize");
            JsonValue::Null
        });
        Self {
            title: descriptor.title.clone(),
            description: Some(descriptor.description.clone()),
            engine: RENDERING_ENGINE.to_string(),
            plotly_data: data["plotlyData"].as_array().cloned().unwrap_or_default(),
            plotly_layout: data.get("plotlyLayout").cloned(),
            extra: Map::new(),
        }
    }
}

/// A visualization needs a `title` and a `type`; plotly ones need a non-empty
/// `plotlyData` array of typed traces.
pub fn validate_visualization(value: &JsonValue) -> Result<(), ValidationError> {
    for field in ["title", "type"] {
        if !value.get(field).is_some_and(JsonValue::is_string) {
            return Err(ValidationError::MissingField {
                field: field.to_string(),
            });
        }
    }
    if value["type"] != RENDERING_ENGINE {
        return Ok(());
    }
    let traces = value
        .get("plotlyData")
        .and_then(JsonValue::as_array)
        .ok_or(ValidationError::MissingPlotlyData)?;
    if traces.is_empty() {
        return Err(ValidationError::EmptyPlotlyData);
    }
    if let Some(index) = traces.iter().position(|t| t.get("type").is_none()) {
        return Err(ValidationError::UntypedTrace { index });
    }
    Ok(())
}

/// Pulls the visualization list out of a parsed LLM reply, keeping at most
/// `max` entries and dropping invalid ones.
pub fn parse_visualizations(
    reply: &JsonValue,
    max: usize,
) -> Result<Vec<Visualization>, ValidationError> {
    let items = match reply {
        JsonValue::Array(items) => items,
        JsonValue::Object(_) => reply
            .get("visualizations")
            .and_then(JsonValue::as_array)
            .ok_or(ValidationError::MissingField {
                field: "visualizations".to_string(),
            })?,
        _ => return Err(ValidationError::NoVisualizations),
    };

    let valid: Vec<Visualization> = items
        .iter()
        .take(max)
        .enumerate()
        .filter_map(|(index, item)| match Visualization::from_json(item) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(index, error = %e, "dropping invalid visualization");
                None
            }
        })
        .collect();

    if valid.is_empty() {
        return Err(ValidationError::NoVisualizations);
    }
    Ok(valid)
}

/// Where a set of visualizations came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Llm,
    Heuristic,
    Sample,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationResponse {
    pub visualizations: Vec<Visualization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    pub source: Source,
}

impl VisualizationResponse {
    pub fn from_llm(visualizations: Vec<Visualization>, attempts: u32) -> Self {
        Self {
            visualizations,
            error: None,
            attempts: Some(attempts),
            source: Source::Llm,
        }
    }

    pub fn from_descriptors(
        descriptors: &[ChartDescriptor],
        source: Source,
        error: Option<String>,
    ) -> Self {
        Self {
            visualizations: descriptors.iter().map(Visualization::from).collect(),
            error,
            attempts: None,
            source,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            visualizations: Vec::new(),
            error: Some(error.into()),
            attempts: None,
            source: Source::Heuristic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plotly(title: &str) -> JsonValue {
        json!({
            "title": title,
            "type": "plotly",
            "plotlyData": [{"type": "bar", "x": [1], "y": [2]}],
            "plotlyLayout": {"title": title}
        })
    }

    #[test]
    fn test_validate_rules() {
        assert!(validate_visualization(&plotly("ok")).is_ok());
        assert_eq!(
            validate_visualization(&json!({"type": "plotly"})),
            Err(ValidationError::MissingField { field: "title".into() })
        );
        assert_eq!(
            validate_visualization(&json!({"title": "t", "type": "plotly", "plotlyData": []})),
            Err(ValidationError::EmptyPlotlyData)
        );
        assert_eq!(
            validate_visualization(&json!({"title": "t", "type": "plotly", "plotlyData": [{}]})),
            Err(ValidationError::UntypedTrace { index: 0 })
        );
        assert!(validate_visualization(&json!({"title": "t", "type": "vega"})).is_ok());
    }

    #[test]
    fn test_parse_drops_invalid_and_caps() {
        let reply = json!({
            "visualizations": [plotly("a"), {"title": "broken"}, plotly("b"), plotly("c")]
        });
        let parsed = parse_visualizations(&reply, 3).unwrap();
        let titles: Vec<_> = parsed.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);
    }

    #[test]
    fn test_parse_all_invalid_fails() {
        let reply = json!({"visualizations": [{"title": "x"}]});
        assert_eq!(
            parse_visualizations(&reply, 8),
            Err(ValidationError::NoVisualizations)
        );
    }

    #[test]
    fn test_extra_fields_round_trip() {
        let mut raw = plotly("a");
        raw["insight"] = json!("sales peak in Q4");
        let v = Visualization::from_json(&raw).unwrap();
        assert_eq!(serde_json::to_value(&v).unwrap()["insight"], "sales peak in Q4");
    }
}
