// src/models/export.rs

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Presentation settings shared by every extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    // chrono format string for short dates
    pub date_format: String,
    // Local calendar used when an instant is shown as a date
    pub offset: FixedOffset,
}

impl ExportOptions {
    pub fn new(date_format: impl Into<String>, offset: FixedOffset) -> Self {
        Self { date_format: date_format.into(), offset }
    }

    pub fn date(&self, date: NaiveDate) -> String {
        date.format(&self.date_format).to_string()
    }

    pub fn optional_date(&self, date: Option<NaiveDate>) -> String {
        date.map(|d| self.date(d)).unwrap_or_default()
    }

    pub fn instant_date(&self, instant: DateTime<Utc>) -> String {
        self.date(instant.with_timezone(&self.offset).date_naive())
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { date_format: "%d/%m/%Y".to_string(), offset: Utc.fix() }
    }
}

pub type Extractor<T> = fn(&T, &ExportOptions) -> String;

pub struct Column<T> {
    pub header: &'static str,
    pub extract: Extractor<T>,
}

impl<T> Column<T> {
    pub const fn new(header: &'static str, extract: Extractor<T>) -> Self {
        Self { header, extract }
    }
}

// Manual impls: `T` itself needs neither Clone nor Debug.
impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Column<T> {}

impl<T> std::fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column").field("header", &self.header).finish()
    }
}

/// Declared column order for one export. The same spec drives the CSV and
/// the PDF table, so both always carry the same columns.
#[derive(Debug, Clone)]
pub struct ColumnSpec<T> {
    columns: Vec<Column<T>>,
}

impl<T> ColumnSpec<T> {
    pub fn new(columns: Vec<Column<T>>) -> Self {
        Self { columns }
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|column| column.header).collect()
    }

    pub fn columns(&self) -> &[Column<T>] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One exported row: header/value pairs in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatRow {
    cells: Vec<(&'static str, String)>,
}

impl FlatRow {
    pub fn new(cells: Vec<(&'static str, String)>) -> Self {
        Self { cells }
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| *name == header)
            .map(|(_, value)| value.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, value)| value.as_str())
    }

    pub fn cells(&self) -> &[(&'static str, String)] {
        &self.cells
    }
}

// Serialized as a JSON object that keeps the declared column order.
impl Serialize for FlatRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (header, value) in &self.cells {
            map.serialize_entry(header, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FlatTable {
    pub headers: Vec<&'static str>,
    pub rows: Vec<FlatRow>,
}

impl FlatTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
