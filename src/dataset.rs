//! Tabular data model shared by every pipeline stage.
//!
//! A [`Dataset`] is a schema plus an ordered list of [`Record`]s. The `month`
//! column is always typed as a [`NaiveDate`] from ingestion on; every other
//! column is either categorical text or numeric.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Missing,
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

/// Renders the cell the way it appears in an exported CSV.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Missing => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Date,
    Categorical,
    Numeric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// Column layout of a dataset. Exactly one column is the date column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    columns: Vec<Column>,
    date_column: usize,
}

impl Schema {
    /// Returns `None` unless exactly one column has [`ColumnKind::Date`].
    pub fn new(columns: Vec<Column>) -> Option<Self> {
        let mut dates = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == ColumnKind::Date)
            .map(|(i, _)| i);
        let date_column = dates.next()?;
        if dates.next().is_some() {
            return None;
        }
        Some(Self {
            columns,
            date_column,
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.index_of(name).map(|i| self.columns[i].kind)
    }

    pub fn date_column(&self) -> &Column {
        &self.columns[self.date_column]
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Numeric)
            .map(|c| c.name.as_str())
    }

    pub fn header(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// One row. `month` duplicates the date cell so range filters never have to
/// re-inspect cell types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    month: NaiveDate,
    values: Vec<Value>,
}

impl Record {
    pub fn month(&self) -> NaiveDate {
        self.month
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&Value::Missing)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    schema: Schema,
    rows: Vec<Record>,
}

impl Dataset {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Appends a row, writing `month` into the date cell so the two never
    /// disagree. Short rows are padded with [`Value::Missing`].
    pub fn push(&mut self, month: NaiveDate, mut values: Vec<Value>) {
        values.resize(self.schema.len(), Value::Missing);
        values[self.schema.date_column] = Value::Date(month);
        self.rows.push(Record { month, values });
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Builds a new table holding the rows that satisfy `keep`, in order.
    /// The receiver is left untouched.
    pub fn retain_where<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(&Record) -> bool,
    {
        Dataset {
            schema: self.schema.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Iterates over the cells of `column`; yields nothing for an unknown column.
    pub fn column<'a>(&'a self, column: &str) -> impl Iterator<Item = &'a Value> + 'a {
        let index = self.schema.index_of(column);
        self.rows
            .iter()
            .filter_map(move |r| index.map(|i| r.get(i)))
    }

    /// Distinct text values of a column, sorted ascending.
    pub fn distinct_text(&self, column: &str) -> Vec<String> {
        let mut values: Vec<String> = self
            .column(column)
            .filter_map(Value::as_text)
            .map(str::to_string)
            .collect();
        values.sort();
        values.dedup();
        values
    }

    pub fn month_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.rows.iter().map(Record::month).min()?;
        let max = self.rows.iter().map(Record::month).max()?;
        Some((min, max))
    }

    /// Observed min/max of a numeric column, ignoring missing cells.
    pub fn numeric_bounds(&self, column: &str) -> Option<(f64, f64)> {
        self.column(column)
            .filter_map(Value::as_number)
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}
