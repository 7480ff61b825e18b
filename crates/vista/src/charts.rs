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

//! Per-kind chart construction.
//!
//! Each builder binds the first qualifying columns in dataset order and returns
//! `Ok(None)` when the kind does not apply to the dataset.

use crate::characteristics::{limits, DataCharacteristics};
use crate::dataset::{Column, ColumnKind, Dataset, Value};
use crate::descriptor::{
    BarSeries, BoxGroup, BoxSeries, BubbleMarker, BubbleSeries, ChartDescriptor, ChartKind,
    ChartSeries, HeatmapSeries, HistogramSeries, Layout, LineSeries, PieSeries, ScatterSeries,
    TableSeries,
};
use crate::error::{ChartError, ChartResult};
use indexmap::IndexMap;
use itertools::Itertools;
use std::cmp::Ordering;

pub(crate) struct ChartContext<'a> {
    dataset: &'a Dataset,
    characteristics: &'a DataCharacteristics,
}

impl<'a> ChartContext<'a> {
    pub(crate) fn new(dataset: &'a Dataset, characteristics: &'a DataCharacteristics) -> Self {
        Self {
            dataset,
            characteristics,
        }
    }

    fn column(&self, kind: ChartKind, name: &str) -> ChartResult<&'a Column> {
        self.dataset
            .column(name)
            .ok_or_else(|| ChartError::MissingColumn {
                kind,
                column: name.to_string(),
            })
    }

    fn numeric_column(&self, kind: ChartKind, index: usize) -> ChartResult<&'a Column> {
        let name = self
            .characteristics
            .numeric_columns
            .get(index)
            .ok_or(ChartError::InsufficientColumns {
                kind,
                required: index + 1,
                available: self.characteristics.numeric_count(),
            })?;
        let column = self.column(kind, name)?;
        if column.kind() != ColumnKind::Numeric {
            return Err(ChartError::TypeMismatch {
                kind,
                column: name.clone(),
                found: column.kind().to_string(),
            });
        }
        Ok(column)
    }

    fn first_categorical(&self, kind: ChartKind) -> ChartResult<Option<&'a Column>> {
        match self.characteristics.categorical_columns.first() {
            Some(name) => self.column(kind, name).map(Some),
            None => Ok(None),
        }
    }
}

pub(crate) fn build(kind: ChartKind, ctx: &ChartContext<'_>) -> ChartResult<Option<ChartDescriptor>> {
    match kind {
        ChartKind::Table => build_table(ctx),
        ChartKind::Bar => build_bar(ctx),
        ChartKind::Scatter => build_scatter(ctx),
        ChartKind::Pie => build_pie(ctx),
        ChartKind::Line => build_line(ctx),
        ChartKind::Histogram => build_histogram(ctx),
        ChartKind::Box => build_box(ctx),
        ChartKind::Heatmap => build_heatmap(ctx),
        ChartKind::Bubble => build_bubble(ctx),
    }
}

fn build_table(ctx: &ChartContext<'_>) -> ChartResult<Option<ChartDescriptor>> {
    let columns = ctx.dataset.columns();
    if columns.is_empty() {
        return Ok(None);
    }
    let rows = ctx.dataset.row_count().min(limits::TABLE_PREVIEW_ROWS);
    let series = TableSeries {
        headers: columns.iter().map(|c| c.name().to_string()).collect(),
        cells: columns.iter().map(|c| c.values()[..rows].to_vec()).collect(),
    };
    Ok(Some(
        ChartDescriptor::new(
            "Data Table",
            "Table showing a sample of the data",
            ChartSeries::Table(series),
            Layout::titled("Data Table"),
        )
        .bound_to(ctx.dataset.column_names()),
    ))
}

/// Sums `values` per non-null category label, ordered by label.
fn group_sums(categories: &Column, values: &Column) -> Vec<(String, f64)> {
    let mut sums: IndexMap<String, f64> = IndexMap::new();
    for (category, value) in categories.values().iter().zip(values.values()) {
        let Some(label) = category.label() else {
            continue;
        };
        let entry = sums.entry(label).or_insert(0.0);
        if let Some(n) = value.as_f64() {
            *entry += n;
        }
    }
    sums.sort_keys();
    sums.into_iter().collect()
}

fn build_bar(ctx: &ChartContext<'_>) -> ChartResult<Option<ChartDescriptor>> {
    let kind = ChartKind::Bar;
    let Some(category) = ctx.first_categorical(kind)? else {
        return Ok(None);
    };
    let numeric = ctx.numeric_column(kind, 0)?;
    let groups = group_sums(category, numeric);
    if groups.is_empty() {
        return Err(ChartError::EmptyAggregation { kind });
    }
    let (cat, num) = (category.name(), numeric.name());
    let (x, y) = groups.into_iter().unzip();
    let title = format!("Sum of {num} by {cat}");
    Ok(Some(
        ChartDescriptor::new(
            title.clone(),
            format!("Bar chart showing the sum of {num} for each {cat}"),
            ChartSeries::Bar(BarSeries {
                x,
                y,
                name: format!("Sum of {num}"),
            }),
            Layout::titled(title).with_axes(cat, format!("Sum of {num}")),
        )
        .bound_to([cat, num]),
    ))
}

fn head(values: &[Value]) -> Vec<Value> {
    values.iter().take(limits::SERIES_POINT_LIMIT).cloned().collect()
}

fn build_scatter(ctx: &ChartContext<'_>) -> ChartResult<Option<ChartDescriptor>> {
    let kind = ChartKind::Scatter;
    let a = ctx.numeric_column(kind, 0)?;
    let b = ctx.numeric_column(kind, 1)?;
    let (an, bn) = (a.name(), b.name());
    Ok(Some(
        ChartDescriptor::new(
            format!("Relationship between {an} and {bn}"),
            format!("Scatter plot showing the relationship between {an} and {bn}"),
            ChartSeries::Scatter(ScatterSeries {
                x: head(a.values()),
                y: head(b.values()),
                name: format!("{an} vs {bn}"),
            }),
            Layout::titled(format!("{an} vs {bn}")).with_axes(an, bn),
        )
        .bound_to([an, bn]),
    ))
}

/// Descending by sum, ties by label.
fn rank_by_sum(a: &(String, f64), b: &(String, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

fn build_pie(ctx: &ChartContext<'_>) -> ChartResult<Option<ChartDescriptor>> {
    let kind = ChartKind::Pie;
    let Some(category) = ctx.first_categorical(kind)? else {
        return Ok(None);
    };
    let numeric = ctx.numeric_column(kind, 0)?;
    let mut groups = group_sums(category, numeric);
    if groups.is_empty() {
        return Err(ChartError::EmptyAggregation { kind });
    }
    if groups.len() > limits::PIE_MAX_CATEGORIES {
        groups = groups
            .into_iter()
            .sorted_by(rank_by_sum)
            .take(limits::PIE_MAX_CATEGORIES)
            .collect();
    }
    let (cat, num) = (category.name(), numeric.name());
    let (labels, values) = groups.into_iter().unzip();
    let title = format!("Distribution of {num} by {cat}");
    Ok(Some(
        ChartDescriptor::new(
            title.clone(),
            format!("Pie chart showing the distribution of {num} across {cat} categories"),
            ChartSeries::Pie(PieSeries {
                labels,
                values,
                name: format!("Distribution of {num}"),
            }),
            Layout::titled(title),
        )
        .bound_to([cat, num]),
    ))
}

fn build_line(ctx: &ChartContext<'_>) -> ChartResult<Option<ChartDescriptor>> {
    let kind = ChartKind::Line;
    let numeric = &ctx.characteristics.numeric_columns;
    let (x, y, dated) = if let Some(date_name) = ctx.characteristics.date_columns.first() {
        let x = ctx.column(kind, date_name)?;
        let y_name = numeric
            .iter()
            .find(|n| *n != date_name)
            .or_else(|| numeric.first())
            .ok_or(ChartError::InsufficientColumns {
                kind,
                required: 1,
                available: 0,
            })?;
        (x, ctx.column(kind, y_name)?, true)
    } else if numeric.len() >= 2 {
        (ctx.numeric_column(kind, 0)?, ctx.numeric_column(kind, 1)?, false)
    } else {
        return Ok(None);
    };

    let order: Vec<usize> = (0..x.len())
        .sorted_by_cached_key(|&i| x.values()[i].sort_key())
        .take(limits::SERIES_POINT_LIMIT)
        .collect();
    let xs = order.iter().map(|&i| x.values()[i].clone()).collect();
    let ys = order.iter().map(|&i| y.values()[i].clone()).collect();

    let (xn, yn) = (x.name(), y.name());
    let title = if dated {
        format!("Trend of {yn} over {xn}")
    } else {
        format!("Line trend of {yn} vs {xn}")
    };
    Ok(Some(
        ChartDescriptor::new(
            title.clone(),
            format!("Line chart showing the trend of {yn} over {xn}"),
            ChartSeries::Line(LineSeries {
                x: xs,
                y: ys,
                name: yn.to_string(),
            }),
            Layout::titled(title).with_axes(xn, yn),
        )
        .bound_to([xn, yn]),
    ))
}

fn build_histogram(ctx: &ChartContext<'_>) -> ChartResult<Option<ChartDescriptor>> {
    let kind = ChartKind::Histogram;
    let column = ctx.numeric_column(kind, 0)?;
    let name = column.name();
    let title = format!("Distribution of {name}");
    Ok(Some(
        ChartDescriptor::new(
            title.clone(),
            format!("Histogram showing the distribution of {name} values"),
            ChartSeries::Histogram(HistogramSeries {
                x: column.values().to_vec(),
                name: name.to_string(),
            }),
            Layout::titled(title).with_axes(name, "Count"),
        )
        .bound_to([name]),
    ))
}

fn build_box(ctx: &ChartContext<'_>) -> ChartResult<Option<ChartDescriptor>> {
    let kind = ChartKind::Box;
    let Some(category) = ctx.first_categorical(kind)? else {
        return Ok(None);
    };
    let numeric = ctx.numeric_column(kind, 0)?;
    let groups: Vec<BoxGroup> = category
        .values()
        .iter()
        .filter_map(Value::label)
        .unique()
        .map(|label| {
            let y = category
                .values()
                .iter()
                .zip(numeric.values())
                .filter(|(c, _)| c.label().as_deref() == Some(label.as_str()))
                .filter_map(|(_, v)| v.as_f64())
                .collect();
            BoxGroup { name: label, y }
        })
        .filter(|group| !group.y.is_empty())
        .take(limits::BOX_MAX_CATEGORIES)
        .collect();
    if groups.is_empty() {
        return Err(ChartError::EmptyAggregation { kind });
    }
    let (cat, num) = (category.name(), numeric.name());
    let title = format!("Box plot of {num} by {cat}");
    Ok(Some(
        ChartDescriptor::new(
            title.clone(),
            format!("Box plot showing the distribution of {num} across {cat} categories"),
            ChartSeries::Box(BoxSeries { groups }),
            Layout::titled(title).with_axes(cat, num),
        )
        .bound_to([cat, num]),
    ))
}

/// Pearson correlation over rows where both sides are present.
fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    let r = (cov / (var_a * var_b).sqrt()).clamp(-1.0, 1.0);
    Some((r * 100.0).round() / 100.0)
}

fn build_heatmap(ctx: &ChartContext<'_>) -> ChartResult<Option<ChartDescriptor>> {
    let kind = ChartKind::Heatmap;
    let columns = (0..ctx.characteristics.numeric_count())
        .map(|i| ctx.numeric_column(kind, i))
        .collect::<ChartResult<Vec<_>>>()?;
    let numbers: Vec<Vec<Option<f64>>> = columns.iter().map(|c| c.numbers()).collect();
    let n = numbers.len();
    let mut z = vec![vec![None; n]; n];
    for i in 0..n {
        z[i][i] = Some(1.0);
        for j in (i + 1)..n {
            let r = pearson(&numbers[i], &numbers[j]);
            z[i][j] = r;
            z[j][i] = r;
        }
    }
    let labels: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
    Ok(Some(
        ChartDescriptor::new(
            "Correlation Heatmap",
            "Heatmap showing correlations between numeric variables",
            ChartSeries::Heatmap(HeatmapSeries {
                z,
                labels: labels.clone(),
            }),
            Layout::titled("Correlation Heatmap"),
        )
        .bound_to(labels),
    ))
}

fn build_bubble(ctx: &ChartContext<'_>) -> ChartResult<Option<ChartDescriptor>> {
    let kind = ChartKind::Bubble;
    let a = ctx.numeric_column(kind, 0)?;
    let b = ctx.numeric_column(kind, 1)?;
    let c = ctx.numeric_column(kind, 2)?;
    let size = head(c.values());
    let max = size
        .iter()
        .filter_map(Value::as_f64)
        .max_by(f64::total_cmp)
        .filter(|m| *m > 0.0)
        .ok_or_else(|| ChartError::InvalidScale {
            kind,
            reason: format!("column '{}' has no positive values", c.name()),
        })?;
    let (an, bn, cn) = (a.name(), b.name(), c.name());
    Ok(Some(
        ChartDescriptor::new(
            format!("Bubble Chart: {an} vs {bn} (size: {cn})"),
            format!("Bubble chart showing relationship between {an}, {bn}, and {cn}"),
            ChartSeries::Bubble(BubbleSeries {
                x: head(a.values()),
                y: head(b.values()),
                marker: BubbleMarker {
                    size,
                    sizemode: "area",
                    sizeref: 2.0 * max / limits::BUBBLE_MAX_DIAMETER.powi(2),
                    sizemin: limits::BUBBLE_MIN_SIZE,
                },
                name: format!("{an} vs {bn}"),
            }),
            Layout::titled(format!("Bubble Chart: {an} vs {bn}")).with_axes(an, bn),
        )
        .bound_to([an, bn, cn]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pearson_perfect_and_undefined() {
        let a = [Some(1.0), Some(2.0), Some(3.0)];
        let b = [Some(2.0), Some(4.0), Some(6.0)];
        let c = [Some(5.0), Some(5.0), Some(5.0)];
        assert_eq!(pearson(&a, &b), Some(1.0));
        assert_eq!(pearson(&a, &c), None);
    }

    #[test]
    fn test_pearson_pairwise_complete() {
        let a = [Some(1.0), None, Some(3.0), Some(4.0)];
        let b = [Some(1.0), Some(100.0), Some(3.0), Some(4.0)];
        assert_eq!(pearson(&a, &b), Some(1.0));
    }

    fn dataset(columns: Vec<Column>) -> (Dataset, DataCharacteristics) {
        let dataset = Dataset::new(columns).unwrap();
        let characteristics = DataCharacteristics::from_dataset(&dataset);
        (dataset, characteristics)
    }

    #[test]
    fn test_box_skips_categories_without_numbers() {
        let (data, chars) = dataset(vec![
            Column::text("cat", ["A", "B", "A", "C"]),
            Column::with_kind(
                "val",
                ColumnKind::Numeric,
                vec![Value::Number(1.0), Value::Null, Value::Number(3.0), Value::Null],
            ),
        ]);
        let chart = build_box(&ChartContext::new(&data, &chars)).unwrap().unwrap();
        let ChartSeries::Box(series) = chart.series else {
            panic!("box series expected");
        };
        assert_eq!(series.groups.len(), 1);
        assert_eq!(series.groups[0].name, "A");
    }

    #[test]
    fn test_box_all_null_is_an_error() {
        let (data, chars) = dataset(vec![
            Column::text("cat", ["A", "B"]),
            Column::with_kind("val", ColumnKind::Numeric, vec![Value::Null, Value::Null]),
        ]);
        let result = build_box(&ChartContext::new(&data, &chars));
        assert!(matches!(result, Err(ChartError::EmptyAggregation { kind: ChartKind::Box })));
    }

    #[test]
    fn test_line_sort_mixed_date_text() {
        let dates = ["03/01/2023", "1x", "2022-12-01", "01/02/2023", "3x41", "2023-02-15"];
        let (data, chars) = dataset(vec![
            Column::text("order_date", dates),
            Column::numeric("val", [0.0, 1.0, 2.0, 3.0, 4.0, 5.0]),
        ]);
        let chart = build_line(&ChartContext::new(&data, &chars)).unwrap().unwrap();
        let ChartSeries::Line(line) = chart.series else {
            panic!("line series expected");
        };
        let xs: Vec<String> = line.x.iter().filter_map(Value::label).collect();
        assert_eq!(
            xs,
            vec!["2022-12-01", "01/02/2023", "2023-02-15", "03/01/2023", "1x", "3x41"]
        );
    }

    #[test]
    fn test_group_sums_skip_nulls() {
        let cat = Column::new(
            "cat",
            vec![Value::from("B"), Value::Null, Value::from("A"), Value::from("B")],
        );
        let val = Column::new(
            "val",
            vec![Value::Number(1.0), Value::Number(5.0), Value::Null, Value::Number(2.0)],
        );
        assert_eq!(
            group_sums(&cat, &val),
            vec![("A".to_string(), 0.0), ("B".to_string(), 3.0)]
        );
    }
}
