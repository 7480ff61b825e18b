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

use vista::Dataset;

/// Rows of a table rendered into a prompt.
pub const PROMPT_TABLE_ROWS: usize = 100;

const INSTRUCTIONS: &str = "IMPORTANT INSTRUCTIONS:
1. First, analyze the data to determine what types of visualizations would be most meaningful and informative.
2. Only generate visualizations that provide genuine insights - don't create charts just to have more visualizations.
3. Choose appropriate chart types based on the data characteristics (e.g., categorical vs numerical, time series, etc.)
4. You may create up to {max} visualizations, but only include as many as are truly meaningful for this specific dataset.
5. Prioritize quality and relevance over quantity.";

const TEXT_RESPONSE_FORMAT: &str = r#"Response format:
{
  "visualizations": [
    {
      "title": "Title",
      "description": "Description",
      "type": "plotly",
      "plotlyData": [{
          "type": "bar/pie/scatter/line/heatmap/etc",
          "x": [...],
          "y": [...],
          "labels": [...],
          "values": [...]
      }],
      "plotlyLayout": {
        "title": "Chart Title"
      }
    }
  ]
}"#;

const TABLE_EXAMPLE: &str = r#"{
  "visualizations": [
    {
      "title": "Monthly Sales Trend",
      "description": "Shows the sales trend over time with a clear upward trajectory",
      "type": "plotly",
      "plotlyData": [{
        "type": "line",
        "x": ["Jan", "Feb", "Mar"],
        "y": [10, 15, 13],
        "name": "Sales"
      }],
      "plotlyLayout": {
        "title": "Monthly Sales",
        "xaxis": {"title": "Month"},
        "yaxis": {"title": "Amount ($)"}
      }
    }
  ]
}"#;

fn instructions(max_visualizations: usize) -> String {
    INSTRUCTIONS.replace("{max}", &max_visualizations.to_string())
}

pub fn text_prompt(text: &str, max_visualizations: usize) -> String {
    format!(
        "Analyze this data and create Plotly.js visualizations. Return ONLY valid JSON:\n\nDATA:\n{text}\n\n{}\n\n{TEXT_RESPONSE_FORMAT}",
        instructions(max_visualizations)
    )
}

pub fn dataset_prompt(dataset: &Dataset, max_visualizations: usize) -> String {
    let summary = dataset.summary();
    let kinds = summary
        .kinds
        .iter()
        .map(|(name, kind)| format!("{name} ({kind})"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Analyze this tabular data and create Plotly.js visualizations. Return ONLY valid JSON:\n\n\
         DATA ({rows} rows, {cols} columns: {kinds}):\n{table}\n\n{instructions}\n\n\
         For each visualization, include a title, description explaining the insight, and appropriate Plotly configuration.\n\n\
         Your response MUST be valid JSON and nothing else. Format your response like this example:\n{TABLE_EXAMPLE}",
        rows = summary.shape.0,
        cols = summary.shape.1,
        table = dataset.to_table_string(PROMPT_TABLE_ROWS),
        instructions = instructions(max_visualizations),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use vista::Column;

    #[test]
    fn test_text_prompt_embeds_data_and_limit() {
        let prompt = text_prompt("a,b\n1,2", 5);
        assert!(prompt.contains("DATA:\na,b\n1,2"));
        assert!(prompt.contains("up to 5 visualizations"));
        assert!(prompt.contains("\"plotlyData\""));
    }

    #[test]
    fn test_dataset_prompt_truncates_rows() {
        let dataset = vista::Dataset::new(vec![Column::numeric(
            "value",
            (0..150).map(f64::from),
        )])
        .unwrap();
        let prompt = dataset_prompt(&dataset, 8);
        assert!(prompt.contains("150 rows, 1 columns: value (numeric)"));
        assert!(prompt.contains(" 99\n"));
        assert!(!prompt.contains("100\n"));
        assert!(prompt.contains("Monthly Sales Trend"));
    }
}
