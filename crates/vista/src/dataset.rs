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

//! In-memory tabular data handed to the chart selector.
//!
//! A [`Dataset`] is an ordered list of named [`Column`]s of equal length. Each
//! column carries a [`ColumnKind`] inferred from its cells when it is built.

use crate::error::{DataError, DataResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

/// Date and date-time layouts recognised when inferring temporal columns.
pub const TEMPORAL_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
];

const NULL_MARKERS: &[&str] = &["", "na", "n/a", "nan", "null", "none", "-"];

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
}

impl Value {
    /// Parses a raw text cell: null markers become [`Value::Null`], anything that
    /// reads as a finite float becomes a number.
    pub fn parse_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if NULL_MARKERS.contains(&trimmed.to_ascii_lowercase().as_str()) {
            return Value::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Text(trimmed.to_string()),
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Bool(b) => Value::Text(b.to_string()),
            other => Value::Text(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Label used when the cell acts as a category.
    pub fn label(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Number(n) => Some(format_number(*n)),
            Value::Text(s) => Some(s.clone()),
        }
    }

    pub fn as_temporal(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Text(s) => parse_temporal(s),
            _ => None,
        }
    }

    /// Key used for sorting rows. Dates are parsed once here, never inside a
    /// comparator.
    pub fn sort_key(&self) -> SortKey {
        match self {
            Value::Null => SortKey::Null,
            Value::Number(n) => SortKey::Number(*n),
            Value::Text(s) => {
                parse_temporal(s).map_or_else(|| SortKey::Text(s.clone()), SortKey::Date)
            }
        }
    }
}

/// Row ordering: numbers, then dates, then other text, then nulls.
#[derive(Debug, Clone)]
pub enum SortKey {
    Number(f64),
    Date(NaiveDateTime),
    Text(String),
    Null,
}

impl SortKey {
    fn rank(&self) -> u8 {
        match self {
            SortKey::Number(_) => 0,
            SortKey::Date(_) => 1,
            SortKey::Text(_) => 2,
            SortKey::Null => 3,
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Date(a), SortKey::Date(b)) => a.cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NaN"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Option<f64>> for Value {
    fn from(n: Option<f64>) -> Self {
        n.map_or(Value::Null, Value::Number)
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

pub fn parse_temporal(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in TEMPORAL_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
        if let Ok(d) = NaiveDate::parse_from_str(raw, format) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Temporal,
}

impl ColumnKind {
    /// Numeric when every non-null cell is a number, temporal when every non-null
    /// cell parses as a date, categorical otherwise (including all-null columns).
    pub fn infer(values: &[Value]) -> Self {
        let mut non_null = values.iter().filter(|v| !v.is_null()).peekable();
        if non_null.peek().is_none() {
            return ColumnKind::Categorical;
        }
        let non_null: Vec<&Value> = non_null.collect();
        if non_null.iter().all(|v| matches!(v, Value::Number(_))) {
            return ColumnKind::Numeric;
        }
        if non_null.iter().all(|v| v.as_temporal().is_some()) {
            return ColumnKind::Temporal;
        }
        ColumnKind::Categorical
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Numeric)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Temporal => "temporal",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        let kind = ColumnKind::infer(&values);
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn with_kind(name: impl Into<String>, kind: ColumnKind, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn numeric(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::with_kind(
            name,
            ColumnKind::Numeric,
            values.into_iter().map(Value::Number).collect(),
        )
    }

    pub fn text<S: AsRef<str>>(name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        Self::new(
            name,
            values
                .into_iter()
                .map(|s| Value::Text(s.as_ref().to_string()))
                .collect(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cells as floats; non-numeric cells map to `None`.
    pub fn numbers(&self) -> Vec<Option<f64>> {
        self.values.iter().map(Value::as_f64).collect()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    pub fn distinct_count(&self) -> usize {
        self.values
            .iter()
            .filter_map(Value::label)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Name-based check: the column name mentions "date" or "time".
    pub fn is_date_like(&self) -> bool {
        let lowered = self.name.to_lowercase();
        lowered.contains("date") || lowered.contains("time")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> DataResult<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(DataError::DuplicateColumn {
                    column: column.name().to_string(),
                });
            }
        }
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(ragged) = columns.iter().find(|c| c.len() != expected) {
                return Err(DataError::RaggedColumn {
                    column: ragged.name().to_string(),
                    expected,
                    found: ragged.len(),
                });
            }
        }
        Ok(Self { columns })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a dataset from row-major text cells, inferring each column's kind.
    pub fn from_rows(headers: Vec<String>, rows: &[Vec<String>]) -> DataResult<Self> {
        let width = headers.len();
        let mut columns: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); width];
        for row in rows {
            for (idx, column) in columns.iter_mut().enumerate() {
                let cell = row.get(idx).map_or(Value::Null, |raw| Value::parse_cell(raw));
                column.push(cell);
            }
        }
        let columns = headers
            .into_iter()
            .zip(columns)
            .map(|(name, values)| Column::new(name, values))
            .collect();
        Self::new(columns)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True when there is nothing to chart: no columns or no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0 || self.column_count() == 0
    }

    /// Plain-text rendering of the first `limit` rows, used in LLM prompts.
    pub fn to_table_string(&self, limit: usize) -> String {
        let shown = self.row_count().min(limit);
        let widths: Vec<usize> = self
            .columns
            .iter()
            .map(|c| {
                c.values()[..shown]
                    .iter()
                    .map(|v| v.to_string().len())
                    .chain(std::iter::once(c.name().len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        let mut lines = Vec::with_capacity(shown + 1);
        lines.push(
            self.columns
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:>w$}", c.name(), w = *w))
                .collect::<Vec<_>>()
                .join(" "),
        );
        for row in 0..shown {
            lines.push(
                self.columns
                    .iter()
                    .zip(&widths)
                    .map(|(c, w)| format!("{:>w$}", c.values()[row].to_string(), w = *w))
                    .collect::<Vec<_>>()
                    .join(" "),
            );
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell() {
        assert_eq!(Value::parse_cell(" 4.5 "), Value::Number(4.5));
        assert_eq!(Value::parse_cell("NA"), Value::Null);
        assert_eq!(Value::parse_cell(""), Value::Null);
        assert_eq!(Value::parse_cell("inf"), Value::Text("inf".into()));
        assert_eq!(Value::parse_cell("North"), Value::Text("North".into()));
    }

    #[test]
    fn test_kind_inference() {
        let numeric = vec![Value::Number(1.0), Value::Null, Value::Number(2.0)];
        assert_eq!(ColumnKind::infer(&numeric), ColumnKind::Numeric);

        let dates = vec![Value::from("2024-01-01"), Value::from("2024-02-01")];
        assert_eq!(ColumnKind::infer(&dates), ColumnKind::Temporal);

        let mixed = vec![Value::Number(1.0), Value::from("x")];
        assert_eq!(ColumnKind::infer(&mixed), ColumnKind::Categorical);

        assert_eq!(ColumnKind::infer(&[Value::Null]), ColumnKind::Categorical);
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let result = Dataset::new(vec![
            Column::numeric("a", [1.0, 2.0]),
            Column::numeric("b", [1.0]),
        ]);
        assert!(matches!(
            result,
            Err(DataError::RaggedColumn { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let result = Dataset::new(vec![
            Column::numeric("a", [1.0]),
            Column::numeric("a", [2.0]),
        ]);
        assert!(matches!(result, Err(DataError::DuplicateColumn { .. })));
    }

    #[test]
    fn test_sort_key_dates_and_nulls() {
        let early = Value::from("01/02/2023").sort_key();
        let late = Value::from("2023-06-01").sort_key();
        assert!(early < late);
        assert!(Value::Null.sort_key() > Value::Number(0.0).sort_key());
        assert!(Value::Number(2.0).sort_key() < Value::Number(10.0).sort_key());
    }

    #[test]
    fn test_sort_key_is_transitive_over_mixed_text() {
        let a = Value::from("01/02/2023").sort_key();
        let b = Value::from("1x").sort_key();
        let c = Value::from("2022-12-01").sort_key();
        assert!(c < a);
        assert!(a < b);
        assert!(c < b);
    }

    #[test]
    fn test_date_like_is_name_based() {
        assert!(Column::numeric("OrderDate", [1.0]).is_date_like());
        assert!(Column::numeric("timestamp", [1.0]).is_date_like());
        assert!(!Column::text("day", ["2024-01-01"]).is_date_like());
    }

    #[test]
    fn test_table_string() {
        let ds = Dataset::new(vec![
            Column::text("cat", ["A", "B"]),
            Column::numeric("val", [1.0, 2.5]),
        ])
        .unwrap();
        let rendered = ds.to_table_string(1);
        assert_eq!(rendered, "cat val\n  A   1");
    }
}
