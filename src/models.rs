//! Core data models used throughout tabwash.
//!
//! These types represent the tables, cells, and previews that flow through
//! the decode → normalize → project pipeline, plus the small response types
//! returned by the orchestrator.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// Literal written in place of every missing value.
pub const NULL_MARKER: &str = "NULL";

/// Storage namespace of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Uploaded, unmodified files.
    Raw,
    /// Normalized artifacts, one per filename.
    Cleaned,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Raw => "raw",
            Namespace::Cleaned => "cleaned",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single table cell, typed once at decode time.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Free text; trimmed by the normalizer.
    Text(String),
    /// Any numeric value. NaN is treated as missing.
    Number(f64),
    /// Absence of data (as opposed to an empty string).
    Missing,
    /// Non-textual value with a fixed rendering (booleans, dates, durations).
    Raw(String),
}

impl Cell {
    /// True for [`Cell::Missing`] and for NaN numbers.
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Missing => true,
            Cell::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Canonical text form used when serializing a table. NaN and
    /// infinities have no canonical spelling and render as `NULL`.
    pub fn render(&self) -> String {
        match self {
            Cell::Text(s) | Cell::Raw(s) => s.clone(),
            Cell::Number(n) if !n.is_finite() => NULL_MARKER.to_string(),
            Cell::Number(n) => format_number(*n),
            Cell::Missing => NULL_MARKER.to_string(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

/// Formats a finite number the way cleaned artifacts spell it.
///
/// Integral values below 1e15 print without a fractional part (`100`, not
/// `100.0`); everything else uses the shortest round-trip form.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    n.to_string()
}

/// A row was wider than the table's header.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("got {found} fields, expected at most {expected}")]
pub struct TableShapeError {
    pub expected: usize,
    pub found: usize,
}

/// An in-memory table: ordered column names plus row-major cells.
///
/// Every row holds exactly `columns().len()` cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a table from rows, padding short rows with [`Cell::Missing`].
    pub fn from_rows(
        columns: Vec<String>,
        rows: Vec<Vec<Cell>>,
    ) -> Result<Self, TableShapeError> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Appends a row. Short rows are padded with [`Cell::Missing`]; rows
    /// wider than the header are rejected.
    pub fn push_row(&mut self, mut row: Vec<Cell>) -> Result<(), TableShapeError> {
        let width = self.columns.len();
        if row.len() > width {
            return Err(TableShapeError {
                expected: width,
                found: row.len(),
            });
        }
        row.resize(width, Cell::Missing);
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Keeps only the rows for which `keep` returns true, in order.
    pub fn retain_rows(&mut self, keep: impl FnMut(&Vec<Cell>) -> bool) {
        self.rows.retain(keep);
    }

    /// Rewrites every cell in place.
    pub fn map_cells(&mut self, mut f: impl FnMut(Cell) -> Cell) {
        for cell in self.rows.iter_mut().flatten() {
            *cell = f(std::mem::replace(cell, Cell::Missing));
        }
    }

    /// Column names for in-place renaming; the count cannot change.
    pub fn columns_mut(&mut self) -> &mut [String] {
        &mut self.columns
    }
}

/// One preview row: column name → text, in column order.
///
/// Serializes as a JSON object whose keys keep the table's column order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreviewRow(pub Vec<(String, String)>);

impl PreviewRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, value)| value.as_str())
    }
}

impl Serialize for PreviewRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A bounded, JSON-safe projection of a table's leading rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub columns: Vec<String>,
    /// Row count of the whole table, not of `rows`.
    pub total_rows: usize,
    pub rows: Vec<PreviewRow>,
}

/// Where an upload landed.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub filename: String,
    pub location: String,
}

/// Result of a clean operation.
#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
    pub filename: String,
    pub cleaned_location: String,
    /// Row count of the cleaned table.
    pub rows: usize,
    /// SHA-256 of the cleaned artifact bytes (hex).
    pub sha256: String,
    pub preview: Preview,
}

/// Names present in each namespace, sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub raw: Vec<String>,
    pub cleaned: Vec<String>,
}
