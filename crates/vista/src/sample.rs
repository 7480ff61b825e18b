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

use crate::dataset::Value;
use crate::descriptor::{BarSeries, ChartDescriptor, ChartSeries, Layout, LineSeries, PieSeries};

/// Static placeholder charts returned when nothing better is available.
pub fn sample_visualizations() -> Vec<ChartDescriptor> {
    vec![
        ChartDescriptor::new(
            "Sample Bar Chart",
            "A sample bar chart showing placeholder data",
            ChartSeries::Bar(BarSeries {
                x: ["A", "B", "C", "D"].map(String::from).to_vec(),
                y: vec![10.0, 15.0, 7.0, 12.0],
                name: "Sample Data".to_string(),
            }),
            Layout::titled("Sample Bar Chart").with_axes("Categories", "Values"),
        ),
        ChartDescriptor::new(
            "Sample Pie Chart",
            "A sample pie chart showing placeholder data",
            ChartSeries::Pie(PieSeries {
                labels: vec!["Group 1".to_string(), "Group 2".to_string()],
                values: vec![30.0, 70.0],
                name: "Sample Data".to_string(),
            }),
            Layout::titled("Sample Pie Chart"),
        ),
        ChartDescriptor::new(
            "Sample Line Chart",
            "A sample line chart showing placeholder data",
            ChartSeries::Line(LineSeries {
                x: (1..=5_i64).map(Value::from).collect(),
                y: [10_i64, 15, 13, 17, 20].into_iter().map(Value::from).collect(),
                name: "Sample Series".to_string(),
            }),
            Layout::titled("Sample Line Chart").with_axes("X Axis", "Y Axis"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ChartKind;

    #[test]
    fn test_sample_set_shape() {
        let samples = sample_visualizations();
        let kinds: Vec<_> = samples.iter().map(ChartDescriptor::kind).collect();
        assert_eq!(kinds, vec![ChartKind::Bar, ChartKind::Pie, ChartKind::Line]);
        let line = samples[2].to_json().unwrap();
        assert_eq!(line["plotlyData"][0]["mode"], "lines+markers");
        assert_eq!(line["plotlyData"][0]["x"][0], 1);
    }
}
