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

//! Building [`Dataset`]s from uploaded files and free text.

use crate::dataset::{Column, Dataset, Value};
use crate::error::{DataError, DataResult};
use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use chrono::NaiveTime;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

const SNIFF_DELIMITERS: [u8; 4] = [b',', b'\t', b'|', b';'];
const SNIFF_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Json,
    Text,
    Excel,
}

impl SourceFormat {
    pub fn from_filename(filename: &str) -> DataResult<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "json" => Ok(SourceFormat::Json),
            "txt" | "tsv" => Ok(SourceFormat::Text),
            "xlsx" | "xls" | "xlsm" | "xlsb" => Ok(SourceFormat::Excel),
            _ => Err(DataError::UnsupportedFormat {
                format: if extension.is_empty() {
                    filename.to_string()
                } else {
                    extension
                },
            }),
        }
    }
}

/// Loads an uploaded file, choosing the parser from the file extension.
pub fn load_bytes(bytes: &[u8], filename: &str) -> DataResult<Dataset> {
    let format = SourceFormat::from_filename(filename)?;
    let dataset = match format {
        SourceFormat::Csv => read_delimited(bytes, b',')?,
        SourceFormat::Json => from_json(&serde_json::from_slice(bytes)?)?,
        SourceFormat::Text => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| DataError::Parsing(format!("{filename} is not valid UTF-8: {e}")))?;
            parse_text(text)?
        }
        SourceFormat::Excel => read_workbook(bytes)?,
    };
    if dataset.is_empty() {
        return Err(DataError::EmptyDataset);
    }
    info!(
        file = filename,
        rows = dataset.row_count(),
        columns = dataset.column_count(),
        "loaded dataset"
    );
    Ok(dataset)
}

pub fn load_path(path: &Path) -> DataResult<Dataset> {
    let bytes = std::fs::read(path)?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    load_bytes(&bytes, filename)
}

/// Reads delimited text with a header row. Short rows are padded with nulls.
pub fn read_delimited(bytes: &[u8], delimiter: u8) -> DataResult<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let headers = normalize_headers(reader.headers()?.iter().map(String::from).collect());
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(String::from).collect::<Vec<_>>());
    }
    if headers.is_empty() {
        return Err(DataError::EmptyDataset);
    }
    Dataset::from_rows(headers, &rows)
}

/// Reads the first worksheet of an xls/xlsx/xlsm/xlsb workbook. Its first row
/// is the header.
pub fn read_workbook(bytes: &[u8]) -> DataResult<Dataset> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| DataError::Workbook(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DataError::Workbook("workbook has no worksheets".to_string()))?
        .map_err(|e| DataError::Workbook(e.to_string()))?;
    debug!(rows = range.height(), columns = range.width(), "read first worksheet");

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let Some(header) = rows.next() else {
        return Err(DataError::EmptyDataset);
    };
    let headers = normalize_headers(header);
    let body: Vec<Vec<String>> = rows
        .filter(|row| !row.iter().all(String::is_empty))
        .collect();
    Dataset::from_rows(headers, &body)
}

/// Spreadsheet dates are written in a layout the temporal parser accepts.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell.as_datetime().map_or_else(
            || cell.to_string(),
            |dt| {
                if dt.time() == NaiveTime::MIN {
                    dt.format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            },
        ),
        other => other.to_string(),
    }
}

/// Blank headers get positional names and repeated ones a numeric suffix.
fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let base = if name.is_empty() {
                format!("Column{}", idx + 1)
            } else {
                name
            };
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{base}.{}", *count - 1)
            }
        })
        .collect()
}

/// Accepts an array of records or an object mapping column names to arrays.
pub fn from_json(value: &JsonValue) -> DataResult<Dataset> {
    match value {
        JsonValue::Array(records) => {
            let mut columns: IndexMap<String, Vec<Value>> = IndexMap::new();
            for (row, record) in records.iter().enumerate() {
                let object = record.as_object().ok_or_else(|| {
                    DataError::Parsing(format!("record {row} is not a JSON object"))
                })?;
                for key in object.keys() {
                    columns
                        .entry(key.clone())
                        .or_insert_with(|| vec![Value::Null; row]);
                }
                for (name, cells) in columns.iter_mut() {
                    cells.push(object.get(name).map_or(Value::Null, Value::from_json));
                }
            }
            Dataset::new(
                columns
                    .into_iter()
                    .map(|(name, values)| Column::new(name, values))
                    .collect(),
            )
        }
        JsonValue::Object(map) => {
            let columns = map
                .iter()
                .map(|(name, cells)| {
                    let cells = cells.as_array().ok_or_else(|| {
                        DataError::Parsing(format!("column '{name}' is not a JSON array"))
                    })?;
                    Ok(Column::new(
                        name.clone(),
                        cells.iter().map(Value::from_json).collect(),
                    ))
                })
                .collect::<DataResult<Vec<_>>>()?;
            Dataset::new(columns)
        }
        _ => Err(DataError::UnsupportedFormat {
            format: "JSON scalar".to_string(),
        }),
    }
}

/// Finds a delimiter that splits every sampled line into the same number of
/// fields, preferring the one producing the most fields.
pub fn sniff_delimiter(text: &str) -> Option<u8> {
    let lines: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();
    if lines.len() < 2 {
        return None;
    }
    SNIFF_DELIMITERS
        .iter()
        .filter_map(|&d| {
            let count = lines[0].bytes().filter(|b| *b == d).count();
            let consistent = count > 0
                && lines
                    .iter()
                    .all(|l| l.bytes().filter(|b| *b == d).count() == count);
            consistent.then_some((d, count))
        })
        .max_by_key(|(_, count)| *count)
        .map(|(d, _)| d)
}

/// Parses free text: a consistently delimited block first, then loose
/// table extraction.
pub fn parse_text(text: &str) -> DataResult<Dataset> {
    if let Some(delimiter) = sniff_delimiter(text) {
        debug!(delimiter = %char::from(delimiter).escape_default(), "sniffed delimiter");
        match read_delimited(text.trim().as_bytes(), delimiter) {
            Ok(dataset) if !dataset.is_empty() && dataset.column_count() > 1 => {
                return Ok(dataset)
            }
            Ok(_) => debug!("delimited parse produced no usable table"),
            Err(e) => debug!(error = %e, "delimited parse failed"),
        }
    }
    extract_table(text)
}

fn looks_numeric(cell: &str) -> bool {
    cell.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Loose extraction: keeps lines containing digits or delimiters, splits on the
/// most frequent delimiter (or whitespace), and pads short rows.
pub fn extract_table(text: &str) -> DataResult<Dataset> {
    let data_lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| l.chars().any(|c| c.is_ascii_digit() || matches!(c, ',' | '\t' | '|')))
        .collect();
    if data_lines.len() < 2 {
        return Err(DataError::NoTableFound);
    }

    let delimiter = [',', '\t', '|']
        .into_iter()
        .map(|d| (d, data_lines.iter().map(|l| l.matches(d).count()).sum::<usize>()))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(d, _)| d);

    let mut rows: Vec<Vec<String>> = data_lines
        .iter()
        .map(|line| match delimiter {
            Some(d) => line.split(d).map(|c| c.trim().to_string()).collect(),
            None => line.split_whitespace().map(String::from).collect(),
        })
        .collect();
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width < 2 {
        return Err(DataError::NoTableFound);
    }
    for row in &mut rows {
        row.resize(width, String::new());
    }

    let header_is_data = rows[0]
        .iter()
        .filter(|c| !c.is_empty())
        .all(|c| looks_numeric(c));
    let headers = if header_is_data {
        (1..=width).map(|i| format!("Column{i}")).collect()
    } else {
        normalize_headers(rows.remove(0))
    };
    let dataset = Dataset::from_rows(headers, &rows)?;
    if dataset.is_empty() {
        return Err(DataError::NoTableFound);
    }
    Ok(dataset)
}
