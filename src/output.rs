//! Output formatting and persistence for filtered tables.
//!
//! Supports a plain-text table preview, JSON rendering of dashboard views,
//! and CSV export.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::dataset::Dataset;

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: std::fmt::Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Renders a value as pretty-printed JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Serializes `table` as UTF-8 CSV with a header row.
///
/// Dates are written as `YYYY-MM-DD`, numbers in their shortest form and
/// missing cells as empty fields.
///
/// Column kinds are not part of the file. Re-parsing reproduces the table
/// only with the dataset's own [`SchemaHints`](crate::parser::SchemaHints):
/// a categorical column whose surviving values all look numeric is
/// otherwise read back as numeric, and a numeric column with only missing
/// cells as categorical.
pub fn to_csv(table: &Dataset) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut buf);
        writer.write_record(table.schema().header())?;
        for row in table.rows() {
            let cells = row.values().iter().map(|v| v.to_string());
            writer.write_record(cells)?;
        }
        writer.flush()?;
    }
    Ok(buf)
}

/// Writes `table` to `path` as CSV, replacing any existing file.
pub fn write_csv(path: &str, table: &Dataset) -> Result<()> {
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let bytes = to_csv(table)?;
    fs::write(path, &bytes)?;
    info!(
        path,
        rows = table.len(),
        bytes = bytes.len(),
        "CSV export written"
    );

    Ok(())
}

/// Renders up to `limit` rows as an aligned plain-text table.
pub fn preview(table: &Dataset, limit: usize) -> String {
    let header: Vec<String> = table.schema().header().map(str::to_string).collect();
    let body: Vec<Vec<String>> = table
        .rows()
        .iter()
        .take(limit)
        .map(|r| r.values().iter().map(|v| v.to_string()).collect())
        .collect();

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            body.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for line in std::iter::once(&header).chain(body.iter()) {
        let cells: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:<w$}"))
            .collect();
        let _ = writeln!(out, "{}", cells.join("  ").trim_end());
    }
    if table.len() > limit {
        let _ = writeln!(out, "... {} more rows", table.len() - limit);
    }
    out
}
