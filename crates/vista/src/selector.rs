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

//! Heuristic chart selection.

use crate::characteristics::{limits, DataCharacteristics};
use crate::charts::{self, ChartContext};
use crate::dataset::Dataset;
use crate::descriptor::{ChartDescriptor, ChartKind};
use crate::sample::sample_visualizations;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// What to return when no dataset-driven chart can be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    #[default]
    Sample,
    Empty,
}

impl FallbackPolicy {
    pub fn resolve(&self) -> Vec<ChartDescriptor> {
        match self {
            FallbackPolicy::Sample => sample_visualizations(),
            FallbackPolicy::Empty => Vec::new(),
        }
    }
}

impl FromStr for FallbackPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sample" => Ok(FallbackPolicy::Sample),
            "empty" => Ok(FallbackPolicy::Empty),
            other => Err(format!("unknown fallback policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub max_charts: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_charts: limits::MAX_VISUALIZATIONS,
        }
    }
}

impl SelectorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_charts == 0 {
            return Err("max_charts must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChartSelector {
    config: SelectorConfig,
}

impl ChartSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn with_max_charts(max_charts: usize) -> Self {
        Self::new(SelectorConfig { max_charts })
    }

    pub fn max_charts(&self) -> usize {
        self.config.max_charts
    }

    /// Picks and builds charts for `dataset`. Never fails: a kind whose
    /// construction errors is logged and left out.
    pub fn select(&self, dataset: &Dataset) -> Vec<ChartDescriptor> {
        if dataset.is_empty() {
            debug!(
                rows = dataset.row_count(),
                columns = dataset.column_count(),
                "empty dataset, no charts selected"
            );
            return Vec::new();
        }

        let characteristics = DataCharacteristics::from_dataset(dataset);
        debug!(
            rows = characteristics.row_count,
            numeric = characteristics.numeric_columns.len(),
            categorical = characteristics.categorical_columns.len(),
            dates = characteristics.date_columns.len(),
            high_cardinality = characteristics.high_cardinality,
            "dataset characteristics"
        );

        let ctx = ChartContext::new(dataset, &characteristics);
        let mut generated: HashSet<ChartKind> = HashSet::new();
        let mut charts = Vec::new();

        for kind in characteristics.eligible_kinds() {
            if charts.len() >= self.config.max_charts {
                debug!(kind = %kind, limit = self.config.max_charts, "chart limit reached");
                break;
            }
            if !generated.insert(kind) {
                continue;
            }
            match charts::build(kind, &ctx) {
                Ok(Some(descriptor)) => match descriptor.check_against(dataset) {
                    Ok(()) => charts.push(descriptor),
                    Err(e) => warn!(kind = %kind, error = %e, "dropping invalid chart"),
                },
                Ok(None) => debug!(kind = %kind, "chart kind not applicable"),
                Err(e) => warn!(kind = %kind, error = %e, "failed to build chart"),
            }
        }

        info!(
            count = charts.len(),
            kinds = %charts.iter().map(|c| c.kind().as_str()).collect::<Vec<_>>().join(","),
            "selected heuristic visualizations"
        );
        charts
    }
}

/// Selects charts with the default limits.
pub fn select(dataset: &Dataset) -> Vec<ChartDescriptor> {
    ChartSelector::default().select(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    #[test]
    fn test_config_validation() {
        assert!(SelectorConfig::default().validate().is_ok());
        assert!(SelectorConfig { max_charts: 0 }.validate().is_err());
    }

    #[test]
    fn test_fallback_policy_parsing() {
        assert_eq!("Sample".parse::<FallbackPolicy>(), Ok(FallbackPolicy::Sample));
        assert_eq!("empty".parse::<FallbackPolicy>(), Ok(FallbackPolicy::Empty));
        assert!("other".parse::<FallbackPolicy>().is_err());
        assert_eq!(FallbackPolicy::Sample.resolve().len(), 3);
        assert!(FallbackPolicy::Empty.resolve().is_empty());
    }

    #[test]
    fn test_custom_limit_truncates_in_order() {
        let dataset = Dataset::new(vec![
            Column::text("cat", ["A", "A", "B"]),
            Column::numeric("val", [1.0, 2.0, 3.0]),
        ])
        .unwrap();
        let kinds: Vec<ChartKind> = ChartSelector::with_max_charts(2)
            .select(&dataset)
            .iter()
            .map(ChartDescriptor::kind)
            .collect();
        assert_eq!(kinds, vec![ChartKind::Table, ChartKind::Bar]);
    }
}
