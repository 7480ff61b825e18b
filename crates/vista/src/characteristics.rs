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

//! Read-only snapshot of the column mix that drives chart eligibility.

use crate::dataset::{ColumnKind, Dataset};
use crate::descriptor::ChartKind;
use serde::Serialize;

/// Named thresholds used by selection and construction.
pub mod limits {
    /// A categorical column with more distinct values than this is high-cardinality.
    pub const HIGH_CARDINALITY_THRESHOLD: usize = 10;
    /// Scatter, line and bubble charts keep at most this many points.
    pub const SERIES_POINT_LIMIT: usize = 50;
    pub const PIE_MAX_CATEGORIES: usize = 8;
    pub const BOX_MAX_CATEGORIES: usize = 8;
    pub const TABLE_PREVIEW_ROWS: usize = 10;
    /// Scatter needs strictly more rows than this.
    pub const SCATTER_MIN_ROWS: usize = 5;
    pub const HISTOGRAM_MIN_ROWS: usize = 5;
    pub const BOX_MIN_ROWS: usize = 10;
    pub const MAX_VISUALIZATIONS: usize = 8;
    /// Bubble marker area scaling: largest bubble spans this many pixels.
    pub const BUBBLE_MAX_DIAMETER: f64 = 40.0;
    pub const BUBBLE_MIN_SIZE: f64 = 4.0;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataCharacteristics {
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub date_columns: Vec<String>,
    pub row_count: usize,
    pub high_cardinality: bool,
}

impl DataCharacteristics {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut numeric_columns = Vec::new();
        let mut categorical_columns = Vec::new();
        let mut date_columns = Vec::new();
        let mut high_cardinality = false;

        for column in dataset.columns() {
            let name = column.name().to_string();
            let date_like = column.is_date_like();
            if date_like {
                date_columns.push(name.clone());
            }
            if column.kind() == ColumnKind::Numeric {
                numeric_columns.push(name);
            } else if !date_like {
                if column.distinct_count() > limits::HIGH_CARDINALITY_THRESHOLD {
                    high_cardinality = true;
                }
                categorical_columns.push(name);
            }
        }

        Self {
            numeric_columns,
            categorical_columns,
            date_columns,
            row_count: dataset.row_count(),
            high_cardinality,
        }
    }

    pub fn numeric_count(&self) -> usize {
        self.numeric_columns.len()
    }

    fn has_categorical(&self) -> bool {
        !self.categorical_columns.is_empty()
    }

    fn has_numeric(&self) -> bool {
        !self.numeric_columns.is_empty()
    }

    pub fn is_eligible(&self, kind: ChartKind) -> bool {
        match kind {
            ChartKind::Table => true,
            ChartKind::Bar => self.has_categorical() && self.has_numeric(),
            ChartKind::Scatter => {
                self.numeric_count() >= 2 && self.row_count > limits::SCATTER_MIN_ROWS
            }
            ChartKind::Pie => self.has_categorical() && self.has_numeric() && !self.high_cardinality,
            ChartKind::Line => {
                (!self.date_columns.is_empty() && self.has_numeric()) || self.numeric_count() >= 2
            }
            ChartKind::Histogram => self.has_numeric() && self.row_count > limits::HISTOGRAM_MIN_ROWS,
            ChartKind::Box => {
                self.has_categorical() && self.has_numeric() && self.row_count > limits::BOX_MIN_ROWS
            }
            ChartKind::Heatmap | ChartKind::Bubble => self.numeric_count() >= 3,
        }
    }

    /// Eligible kinds in attempt order.
    pub fn eligible_kinds(&self) -> Vec<ChartKind> {
        ChartKind::ALL
            .into_iter()
            .filter(|kind| self.is_eligible(*kind))
            .collect()
    }
}
