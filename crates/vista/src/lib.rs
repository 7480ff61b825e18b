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

pub mod characteristics;
mod charts;
pub mod dataset;
pub mod descriptor;
pub mod error;
pub mod loader;
pub mod profile;
pub mod sample;
pub mod selector;
pub mod visualization;

pub use characteristics::{limits, DataCharacteristics};
pub use dataset::{Column, ColumnKind, Dataset, Value};
pub use descriptor::{ChartDescriptor, ChartKind, ChartSeries, Layout};
pub use error::{ChartError, DataError, ValidationError};
pub use profile::{DatasetSummary, NumericStats};
pub use sample::sample_visualizations;
pub use selector::{select, ChartSelector, FallbackPolicy, SelectorConfig};
pub use visualization::{
    parse_visualizations, validate_visualization, Source, Visualization, VisualizationResponse,
};
