//! Table decoding for delimited text and spreadsheets.
//!
//! The decoder turns raw bytes plus a declared filename into a [`Table`].
//! The parser is chosen by extension ([`TableFormat::from_filename`]):
//!
//! | Extensions | Parser |
//! |------------|--------|
//! | `csv`, `tsv` | `csv` reader over text decoded with `encoding_rs` |
//! | `xlsx`, `xlsm`, `xlsb`, `xls`, `ods` | first worksheet via `calamine` |
//!
//! Delimited text is decoded with the primary encoding first. If either the
//! text decoding or the record parse fails, the whole decode is retried once
//! with the fallback encoding. Spreadsheet containers fix their own encoding.
//!
//! Every field is typed once here ([`Cell`]); later stages never re-probe.
//! Header names are kept verbatim.

use calamine::{Data, DataType, Reader};
use chrono::{NaiveDateTime, NaiveTime};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::io::Cursor;

use crate::config::DecodeConfig;
use crate::error::{PipelineError, Result};
use crate::models::{Cell, Table, NULL_MARKER};

pub const DELIMITED_EXTENSIONS: &[(&str, u8)] = &[("csv", b','), ("tsv", b'\t')];
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Field values read as missing in delimited text.
const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NULL", "null", "NaN", "nan", "-NaN", "-nan", "None", "#N/A", "#NA",
    "<NA>",
];

/// Parser family selected from a filename's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Delimited { delimiter: u8 },
    Spreadsheet,
}

impl TableFormat {
    /// Case-insensitive extension lookup. `None` for anything unrecognized.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();

        if let Some((_, delimiter)) = DELIMITED_EXTENSIONS.iter().find(|(e, _)| *e == ext) {
            return Some(TableFormat::Delimited {
                delimiter: *delimiter,
            });
        }
        if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
            return Some(TableFormat::Spreadsheet);
        }
        None
    }
}

/// Comma-separated list of accepted extensions, for error messages.
pub fn supported_extensions() -> String {
    DELIMITED_EXTENSIONS
        .iter()
        .map(|(ext, _)| *ext)
        .chain(SPREADSHEET_EXTENSIONS.iter().copied())
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn unsupported(filename: &str) -> PipelineError {
    PipelineError::UnsupportedFormat {
        filename: filename.to_string(),
        expected: supported_extensions(),
    }
}

/// Decodes tabular bytes with a primary/fallback text-encoding policy.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    primary: &'static Encoding,
    fallback: &'static Encoding,
}

impl Default for Decoder {
    fn default() -> Self {
        Self {
            primary: UTF_8,
            fallback: WINDOWS_1252,
        }
    }
}

impl Decoder {
    pub fn new(primary: &'static Encoding, fallback: &'static Encoding) -> Self {
        Self { primary, fallback }
    }

    /// Resolves the configured labels. `load_config` rejects unknown
    /// labels; a hand-built config with one keeps the default and warns.
    pub fn from_config(config: &DecodeConfig) -> Self {
        let default = Self::default();
        Self {
            primary: resolve_label(
                "decode.primary_encoding",
                &config.primary_encoding,
                default.primary,
            ),
            fallback: resolve_label(
                "decode.fallback_encoding",
                &config.fallback_encoding,
                default.fallback,
            ),
        }
    }

    pub fn primary(&self) -> &'static Encoding {
        self.primary
    }

    pub fn fallback(&self) -> &'static Encoding {
        self.fallback
    }

    pub fn decode(&self, bytes: &[u8], filename: &str) -> Result<Table> {
        match TableFormat::from_filename(filename) {
            Some(TableFormat::Delimited { delimiter }) => {
                self.decode_delimited(bytes, filename, delimiter, parse_field)
            }
            Some(TableFormat::Spreadsheet) => decode_spreadsheet(bytes, filename),
            None => Err(unsupported(filename)),
        }
    }

    /// Decodes a cleaned artifact. Cleaned artifacts are always canonical
    /// CSV, whatever extension their filename carries, and `NULL` is the
    /// only missing marker they contain.
    pub fn decode_canonical(&self, bytes: &[u8], filename: &str) -> Result<Table> {
        self.decode_delimited(bytes, filename, b',', parse_canonical_field)
    }

    fn decode_delimited(
        &self,
        bytes: &[u8],
        filename: &str,
        delimiter: u8,
        field: FieldParser,
    ) -> Result<Table> {
        let first = match decode_with(self.primary, bytes, delimiter, field) {
            Ok(table) => return Ok(table),
            Err(reason) => reason,
        };

        tracing::debug!(
            filename,
            primary = self.primary.name(),
            fallback = self.fallback.name(),
            reason = %first,
            "retrying decode with fallback encoding"
        );

        decode_with(self.fallback, bytes, delimiter, field).map_err(|second| {
            PipelineError::decode(
                filename,
                format!(
                    "{}: {}; {}: {}",
                    self.primary.name(),
                    first,
                    self.fallback.name(),
                    second
                ),
            )
        })
    }
}

fn resolve_label(key: &str, label: &str, default: &'static Encoding) -> &'static Encoding {
    match Encoding::for_label(label.as_bytes()) {
        Some(encoding) => encoding,
        None => {
            tracing::warn!(
                key,
                label,
                using = default.name(),
                "unknown encoding label, keeping default"
            );
            default
        }
    }
}

type FieldParser = fn(&str) -> Cell;

fn decode_with(
    encoding: &'static Encoding,
    bytes: &[u8],
    delimiter: u8,
    field: FieldParser,
) -> std::result::Result<Table, String> {
    let text = decode_text(encoding, bytes)
        .ok_or_else(|| format!("invalid {} byte sequence", encoding.name()))?;
    parse_delimited(&text, delimiter, field)
}

/// Strict decode: malformed input yields `None` instead of replacement
/// characters. A leading BOM is dropped when it matches `encoding`.
fn decode_text(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    let body = match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_len)) if bom_encoding == encoding => &bytes[bom_len..],
        _ => bytes,
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
}

fn parse_delimited(
    text: &str,
    delimiter: u8,
    field: FieldParser,
) -> std::result::Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record.map_err(|e| e.to_string())?,
        None => return Err("no header row".to_string()),
    };
    let columns = header
        .iter()
        .enumerate()
        .map(|(i, name)| header_name(i, name))
        .collect();

    let mut table = Table::new(columns);
    for record in records {
        let record = record.map_err(|e| e.to_string())?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let row = record.iter().map(field).collect();
        table
            .push_row(row)
            .map_err(|e| format!("line {}: {}", line, e))?;
    }

    Ok(table)
}

fn header_name(index: usize, name: &str) -> String {
    if name.trim().is_empty() {
        format!("column_{}", index + 1)
    } else {
        name.to_string()
    }
}

/// Types one delimited-text field.
fn parse_field(field: &str) -> Cell {
    if MISSING_TOKENS.contains(&field) {
        return Cell::Missing;
    }
    match parse_number(field.trim()) {
        Some(n) => Cell::Number(n),
        None => Cell::Text(field.to_string()),
    }
}

/// Types one field of a cleaned artifact. Empty fields and tokens such as
/// `NA` are values there, not gaps. Cleaned artifacts hold no non-finite
/// numbers, so `inf` there is text.
fn parse_canonical_field(field: &str) -> Cell {
    if field == NULL_MARKER {
        return Cell::Missing;
    }
    match parse_number(field).filter(|n| n.is_finite()) {
        Some(n) => Cell::Number(n),
        None => Cell::Text(field.to_string()),
    }
}

fn parse_number(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| !n.is_nan())
}

fn decode_spreadsheet(bytes: &[u8], filename: &str) -> Result<Table> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| PipelineError::decode(filename, e.to_string()))?;

    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(|e| PipelineError::decode(filename, e.to_string()))?,
        None => return Err(PipelineError::decode(filename, "workbook has no worksheets")),
    };

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| PipelineError::decode(filename, "no header row"))?;
    let columns = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match spreadsheet_cell(cell) {
            Cell::Missing => header_name(i, ""),
            other => header_name(i, &other.render()),
        })
        .collect();

    let mut table = Table::new(columns);
    for row in rows {
        table
            .push_row(row.iter().map(spreadsheet_cell).collect())
            .map_err(|e| PipelineError::decode(filename, e.to_string()))?;
    }
    Ok(table)
}

fn spreadsheet_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty | Data::Error(_) => Cell::Missing,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) if f.is_nan() => Cell::Missing,
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Raw(if *b { "True" } else { "False" }.to_string()),
        other => match other.as_datetime() {
            Some(dt) => Cell::Raw(format_datetime(dt)),
            None => Cell::Raw(other.to_string()),
        },
    }
}

fn format_datetime(dt: NaiveDateTime) -> String {
    if dt.time() == NaiveTime::MIN {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
