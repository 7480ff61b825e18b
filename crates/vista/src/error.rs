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

use crate::descriptor::ChartKind;
use thiserror::Error;
#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Parsing error: {0}")]
    Parsing(String),
    #[error("Workbook error: {0}")]
    Workbook(String),
    #[error("Empty dataset provided")]
    EmptyDataset,
    #[error("Duplicate column name: '{column}'")]
    DuplicateColumn { column: String },
    #[error("Column '{column}' has {found} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("Unsupported data format: {format}")]
    UnsupportedFormat { format: String },
    #[error("No table could be extracted from the input text")]
    NoTableFound,
}
#[derive(Error, Debug)]
pub enum ChartError {
    #[error("{kind} chart references missing column '{column}'")]
    MissingColumn { kind: ChartKind, column: String },
    #[error("{kind} chart expected a numeric column, '{column}' is {found}")]
    TypeMismatch {
        kind: ChartKind,
        column: String,
        found: String,
    },
    #[error("{kind} chart has no data after aggregation")]
    EmptyAggregation { kind: ChartKind },
    #[error("{kind} chart produced an empty series")]
    EmptySeries { kind: ChartKind },
    #[error("{kind} chart needs {required} numeric columns, have {available}")]
    InsufficientColumns {
        kind: ChartKind,
        required: usize,
        available: usize,
    },
    #[error("{kind} chart cannot be sized: {reason}")]
    InvalidScale { kind: ChartKind, reason: String },
}
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Visualization is missing required field '{field}'")]
    MissingField { field: String },
    #[error("Plotly visualization has no plotlyData array")]
    MissingPlotlyData,
    #[error("Plotly visualization has an empty plotlyData array")]
    EmptyPlotlyData,
    #[error("Plotly trace {index} is missing its type")]
    UntypedTrace { index: usize },
    #[error("Response contains no visualizations")]
    NoVisualizations,
}
pub type DataResult<T> = std::result::Result<T, DataError>;
pub type ChartResult<T> = std::result::Result<T, ChartError>;
