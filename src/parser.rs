//! CSV parser for public transit datasets.
//!
//! Column kinds are discovered from the data: the configured date column is
//! parsed into a first-of-month [`NaiveDate`], columns whose non-empty cells
//! all parse as numbers become numeric, and everything else is categorical.

use chrono::{Datelike, NaiveDate};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::dataset::{Column, ColumnKind, Dataset, Schema, Value};
use crate::error::ParseError;

/// Per-dataset overrides for column kind discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaHints {
    pub date_column: String,
    /// Columns kept categorical even when every value looks numeric
    /// (e.g. `day_type`, which is coded `1`/`2`).
    pub categorical: Vec<String>,
}

impl Default for SchemaHints {
    fn default() -> Self {
        Self {
            date_column: "month".to_string(),
            categorical: Vec::new(),
        }
    }
}

impl SchemaHints {
    pub fn with_categorical(mut self, columns: &[&str]) -> Self {
        self.categorical = columns.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// Decodes a CSV document with a header row into a [`Dataset`].
///
/// # Errors
///
/// Fails on malformed CSV, a missing date column, or any row whose date
/// cannot be read as a month.
pub fn parse_dataset(bytes: &[u8], hints: &SchemaHints) -> Result<Dataset, ParseError> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(bytes);

    let header: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();
    let date_index = header
        .iter()
        .position(|h| *h == hints.date_column)
        .ok_or_else(|| ParseError::MissingDateColumn(hints.date_column.clone()))?;

    let raw: Vec<StringRecord> = reader.records().collect::<Result<_, _>>()?;

    let columns: Vec<Column> = header
        .iter()
        .enumerate()
        .map(|(i, name)| Column {
            name: name.clone(),
            kind: discover_kind(i, name, date_index, hints, &raw),
        })
        .collect();

    let schema = Schema::new(columns.clone())
        .ok_or_else(|| ParseError::MissingDateColumn(hints.date_column.clone()))?;
    let mut dataset = Dataset::new(schema);

    for (row, record) in raw.iter().enumerate() {
        let cell = record.get(date_index).unwrap_or_default();
        let month = parse_month(cell).ok_or_else(|| ParseError::InvalidMonth {
            row: row + 1,
            value: cell.to_string(),
        })?;

        let values = columns
            .iter()
            .enumerate()
            .map(|(i, column)| typed_cell(record.get(i).unwrap_or_default(), column.kind))
            .collect();

        dataset.push(month, values);
    }

    debug!(
        rows = dataset.len(),
        columns = dataset.schema().len(),
        numeric = dataset.schema().numeric_columns().count(),
        "Dataset parsed"
    );

    Ok(dataset)
}

/// Lower-cases a header and joins words with underscores, so both
/// `Trip Type` and `trip_type` address the same column.
pub fn normalize_header(name: &str) -> String {
    name.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Reads `YYYY-MM`, `YYYY-MM-DD` or a timestamp starting with a date, and
/// returns the first day of that month.
pub fn parse_month(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let date = if s.len() >= 10 {
        NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()
    } else {
        let padded = format!("{s}-01");
        NaiveDate::parse_from_str(&padded, "%Y-%m-%d").ok()
    }?;
    date.with_day(1)
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn is_blank(s: &str) -> bool {
    s.is_empty() || s.eq_ignore_ascii_case("nan")
}

fn discover_kind(
    index: usize,
    name: &str,
    date_index: usize,
    hints: &SchemaHints,
    raw: &[StringRecord],
) -> ColumnKind {
    if index == date_index {
        return ColumnKind::Date;
    }
    if hints.categorical.iter().any(|c| c == name) {
        return ColumnKind::Categorical;
    }

    let mut seen = false;
    for record in raw {
        let cell = record.get(index).unwrap_or_default();
        if is_blank(cell) {
            continue;
        }
        if parse_number(cell).is_none() {
            return ColumnKind::Categorical;
        }
        seen = true;
    }

    if seen {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    }
}

fn typed_cell(cell: &str, kind: ColumnKind) -> Value {
    if is_blank(cell) {
        return Value::Missing;
    }
    match kind {
        // overwritten by Dataset::push
        ColumnKind::Date => Value::Missing,
        ColumnKind::Numeric => parse_number(cell).map_or(Value::Missing, Value::Number),
        ColumnKind::Categorical => Value::Text(cell.to_string()),
    }
}
