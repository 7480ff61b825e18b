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

//! Dataset overview sent alongside tabular prompts and exposed by the CLI.

use crate::dataset::{Column, ColumnKind, Dataset};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;

const TOP_VALUE_COUNT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericStats {
    fn from_column(column: &Column) -> Self {
        let values: Vec<f64> = column.numbers().into_iter().flatten().collect();
        let count = values.len();
        if count == 0 {
            return Self {
                count,
                mean: None,
                std: None,
                min: None,
                max: None,
            };
        }
        let n = count as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = (count > 1).then(|| {
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            var.sqrt()
        });
        Self {
            count,
            mean: Some(mean),
            std,
            min: values.iter().copied().min_by(f64::total_cmp),
            max: values.iter().copied().max_by(f64::total_cmp),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub shape: (usize, usize),
    pub columns: Vec<String>,
    pub kinds: IndexMap<String, ColumnKind>,
    pub has_nulls: bool,
    pub numeric_stats: IndexMap<String, NumericStats>,
    /// Most frequent values per non-numeric column, highest count first.
    pub value_counts: IndexMap<String, Vec<(String, usize)>>,
}

impl Dataset {
    pub fn summary(&self) -> DatasetSummary {
        let mut kinds = IndexMap::new();
        let mut numeric_stats = IndexMap::new();
        let mut value_counts = IndexMap::new();

        for column in self.columns() {
            kinds.insert(column.name().to_string(), column.kind());
            if column.kind().is_numeric() {
                numeric_stats.insert(column.name().to_string(), NumericStats::from_column(column));
            } else {
                let top = column
                    .values()
                    .iter()
                    .filter_map(|v| v.label())
                    .counts()
                    .into_iter()
                    .sorted_by(|(la, a), (lb, b)| b.cmp(a).then_with(|| la.cmp(lb)))
                    .take(TOP_VALUE_COUNT)
                    .collect();
                value_counts.insert(column.name().to_string(), top);
            }
        }

        DatasetSummary {
            shape: (self.row_count(), self.column_count()),
            columns: self.column_names().into_iter().map(String::from).collect(),
            kinds,
            has_nulls: self.columns().iter().any(|c| c.null_count() > 0),
            numeric_stats,
            value_counts,
        }
    }
}
