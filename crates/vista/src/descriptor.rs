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

//! Chart descriptors and their plotly wire form.

use crate::dataset::{Dataset, Value};
use crate::error::{ChartError, ChartResult};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Rendering engine tag written on every descriptor.
pub const RENDERING_ENGINE: &str = "plotly";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Table,
    Bar,
    Scatter,
    Pie,
    Line,
    Histogram,
    Box,
    Heatmap,
    Bubble,
}

impl ChartKind {
    /// Attempt order; also the order descriptors are emitted in.
    pub const ALL: [ChartKind; 9] = [
        ChartKind::Table,
        ChartKind::Bar,
        ChartKind::Scatter,
        ChartKind::Pie,
        ChartKind::Line,
        ChartKind::Histogram,
        ChartKind::Box,
        ChartKind::Heatmap,
        ChartKind::Bubble,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Table => "table",
            ChartKind::Bar => "bar",
            ChartKind::Scatter => "scatter",
            ChartKind::Pie => "pie",
            ChartKind::Line => "line",
            ChartKind::Histogram => "histogram",
            ChartKind::Box => "box",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Bubble => "bubble",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSeries {
    pub headers: Vec<String>,
    /// Column-major cell values.
    pub cells: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub x: Vec<String>,
    pub y: Vec<f64>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterSeries {
    pub x: Vec<Value>,
    pub y: Vec<Value>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub x: Vec<Value>,
    pub y: Vec<Value>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSeries {
    pub x: Vec<Value>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxGroup {
    pub name: String,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxSeries {
    pub groups: Vec<BoxGroup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapSeries {
    pub z: Vec<Vec<Option<f64>>>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BubbleMarker {
    pub size: Vec<Value>,
    pub sizemode: &'static str,
    pub sizeref: f64,
    pub sizemin: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BubbleSeries {
    pub x: Vec<Value>,
    pub y: Vec<Value>,
    pub marker: BubbleMarker,
    pub name: String,
}

/// Typed data payload, one record per chart kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartSeries {
    Table(TableSeries),
    Bar(BarSeries),
    Scatter(ScatterSeries),
    Pie(PieSeries),
    Line(LineSeries),
    Histogram(HistogramSeries),
    Box(BoxSeries),
    Heatmap(HeatmapSeries),
    Bubble(BubbleSeries),
}

impl ChartSeries {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartSeries::Table(_) => ChartKind::Table,
            ChartSeries::Bar(_) => ChartKind::Bar,
            ChartSeries::Scatter(_) => ChartKind::Scatter,
            ChartSeries::Pie(_) => ChartKind::Pie,
            ChartSeries::Line(_) => ChartKind::Line,
            ChartSeries::Histogram(_) => ChartKind::Histogram,
            ChartSeries::Box(_) => ChartKind::Box,
            ChartSeries::Heatmap(_) => ChartKind::Heatmap,
            ChartSeries::Bubble(_) => ChartKind::Bubble,
        }
    }

    /// Number of plotted points (rows for a table, cells for a heatmap). Points
    /// with a null coordinate are not plotted and not counted.
    pub fn point_count(&self) -> usize {
        match self {
            ChartSeries::Table(t) => t.cells.first().map_or(0, Vec::len),
            ChartSeries::Bar(b) => b.x.len(),
            ChartSeries::Scatter(s) => plotted_pairs(&s.x, &s.y),
            ChartSeries::Pie(p) => p.labels.len(),
            ChartSeries::Line(l) => plotted_pairs(&l.x, &l.y),
            ChartSeries::Histogram(h) => h.x.iter().filter(|v| !v.is_null()).count(),
            ChartSeries::Box(b) => b.groups.iter().map(|g| g.y.len()).sum(),
            ChartSeries::Heatmap(h) => h.z.iter().map(Vec::len).sum(),
            ChartSeries::Bubble(b) => plotted_pairs(&b.x, &b.y),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ChartSeries::Table(t) => t.headers.is_empty() || self.point_count() == 0,
            _ => self.point_count() == 0,
        }
    }

    pub fn traces(&self) -> Vec<PlotlyTrace<'_>> {
        match self {
            ChartSeries::Table(t) => vec![PlotlyTrace::Table {
                header: TableBlock {
                    values: TableValues::Headers(&t.headers),
                    align: "center",
                    line: Stroke::BLACK,
                    fill: Some(Fill { color: "grey" }),
                    font: Font {
                        family: "Arial",
                        size: 12,
                        color: "white",
                    },
                },
                cells: TableBlock {
                    values: TableValues::Cells(&t.cells),
                    align: "center",
                    line: Stroke::BLACK,
                    fill: None,
                    font: Font {
                        family: "Arial",
                        size: 11,
                        color: "black",
                    },
                },
            }],
            ChartSeries::Bar(b) => vec![PlotlyTrace::Bar {
                x: &b.x,
                y: &b.y,
                name: &b.name,
            }],
            ChartSeries::Scatter(s) => vec![PlotlyTrace::Scatter {
                x: &s.x,
                y: &s.y,
                mode: "markers",
                name: &s.name,
                marker: None,
            }],
            ChartSeries::Pie(p) => vec![PlotlyTrace::Pie {
                labels: &p.labels,
                values: &p.values,
                name: &p.name,
            }],
            ChartSeries::Line(l) => vec![PlotlyTrace::Scatter {
                x: &l.x,
                y: &l.y,
                mode: "lines+markers",
                name: &l.name,
                marker: None,
            }],
            ChartSeries::Histogram(h) => vec![PlotlyTrace::Histogram {
                x: &h.x,
                name: &h.name,
            }],
            ChartSeries::Box(b) => b
                .groups
                .iter()
                .map(|g| PlotlyTrace::Box {
                    y: &g.y,
                    name: &g.name,
                    boxpoints: "outliers",
                })
                .collect(),
            ChartSeries::Heatmap(h) => vec![PlotlyTrace::Heatmap {
                z: &h.z,
                x: &h.labels,
                y: &h.labels,
                colorscale: "Viridis",
            }],
            ChartSeries::Bubble(b) => vec![PlotlyTrace::Scatter {
                x: &b.x,
                y: &b.y,
                mode: "markers",
                name: &b.name,
                marker: Some(&b.marker),
            }],
        }
    }
}

fn plotted_pairs(x: &[Value], y: &[Value]) -> usize {
    x.iter()
        .zip(y)
        .filter(|(a, b)| !a.is_null() && !b.is_null())
        .count()
}

/// One plotly trace as written to `plotlyData`.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlotlyTrace<'a> {
    Table {
        header: TableBlock<'a>,
        cells: TableBlock<'a>,
    },
    Bar {
        x: &'a [String],
        y: &'a [f64],
        name: &'a str,
    },
    Scatter {
        x: &'a [Value],
        y: &'a [Value],
        mode: &'static str,
        name: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        marker: Option<&'a BubbleMarker>,
    },
    Pie {
        labels: &'a [String],
        values: &'a [f64],
        name: &'a str,
    },
    Histogram {
        x: &'a [Value],
        name: &'a str,
    },
    Box {
        y: &'a [f64],
        name: &'a str,
        boxpoints: &'static str,
    },
    Heatmap {
        z: &'a [Vec<Option<f64>>],
        x: &'a [String],
        y: &'a [String],
        colorscale: &'static str,
    },
}

#[derive(Debug, Serialize)]
pub struct TableBlock<'a> {
    values: TableValues<'a>,
    align: &'static str,
    line: Stroke,
    #[serde(skip_serializing_if = "Option::is_none")]
    fill: Option<Fill>,
    font: Font,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum TableValues<'a> {
    Headers(&'a [String]),
    Cells(&'a [Vec<Value>]),
}

#[derive(Debug, Clone, Copy, Serialize)]
struct Stroke {
    width: u8,
    color: &'static str,
}

impl Stroke {
    const BLACK: Stroke = Stroke {
        width: 1,
        color: "black",
    };
}

#[derive(Debug, Clone, Copy, Serialize)]
struct Fill {
    color: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct Font {
    family: &'static str,
    size: u8,
    color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Axis {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Layout {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
}

impl Layout {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_axes(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.xaxis = Some(Axis { title: x.into() });
        self.yaxis = Some(Axis { title: y.into() });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartDescriptor {
    pub title: String,
    pub description: String,
    pub series: ChartSeries,
    pub layout: Layout,
    /// Dataset columns the series was built from.
    pub columns: Vec<String>,
}

impl ChartDescriptor {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        series: ChartSeries,
        layout: Layout,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            series,
            layout,
            columns: Vec::new(),
        }
    }

    pub fn bound_to<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn kind(&self) -> ChartKind {
        self.series.kind()
    }

    /// Rejects descriptors that reference absent columns or carry no data.
    pub fn check_against(&self, dataset: &Dataset) -> ChartResult<()> {
        let kind = self.kind();
        if let Some(missing) = self.columns.iter().find(|c| dataset.column(c).is_none()) {
            return Err(ChartError::MissingColumn {
                kind,
                column: missing.clone(),
            });
        }
        if self.series.is_empty() {
            return Err(ChartError::EmptySeries { kind });
        }
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

impl Serialize for ChartDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ChartDescriptor", 5)?;
        state.serialize_field("type", RENDERING_ENGINE)?;
        state.serialize_field("title", &self.title)?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("plotlyData", &self.series.traces())?;
        state.serialize_field("plotlyLayout", &self.layout)?;
        state.end()
    }
}
