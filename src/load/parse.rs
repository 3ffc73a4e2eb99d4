// src/load/parse.rs
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use tracing::trace;

use crate::load::error::LoadError;
use crate::load::utils::clean_column_name;

/// Column labels as the parse produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum Labels {
    /// No header row; columns are only known by position.
    Positional(usize),
    /// Labels from a header row, already cleaned.
    Named(Vec<String>),
}

impl Labels {
    pub fn len(&self) -> usize {
        match self {
            Labels::Positional(n) => *n,
            Labels::Named(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Delimited text before any typing. Empty cells and cells padded onto
/// short rows are `None`.
#[derive(Debug)]
pub struct RawTable {
    pub labels: Labels,
    pub rows: Vec<Vec<Option<String>>>,
}

/// Parse data lines that carry no header row.
pub fn parse_headerless(text: &str) -> Result<RawTable, LoadError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut width: Option<usize> = None;
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let w = *width.get_or_insert(record.len());
        rows.push(widen(&record, w)?);
    }
    let width = width.unwrap_or(0);
    trace!(width, rows = rows.len(), "parsed headerless section");

    Ok(RawTable {
        labels: Labels::Positional(width),
        rows,
    })
}

/// Parse a whole document whose first row is the header.
pub fn parse_with_header(text: &str) -> Result<RawTable, LoadError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(LoadError::DecodeOrParseFailure(
            "no columns to parse from file".into(),
        ));
    }
    let labels = header_labels(&headers);
    let width = labels.len();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(widen(&record, width)?);
    }
    trace!(width, rows = rows.len(), "parsed headed document");

    Ok(RawTable {
        labels: Labels::Named(labels),
        rows,
    })
}

/// Fit a record to `width` cells: pad short rows, reject long ones.
fn widen(record: &StringRecord, width: usize) -> Result<Vec<Option<String>>, LoadError> {
    if record.len() > width {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        return Err(LoadError::DecodeOrParseFailure(format!(
            "expected {} fields in line {}, saw {}",
            width,
            line,
            record.len()
        )));
    }
    let mut cells: Vec<Option<String>> = record
        .iter()
        .map(|c| {
            if c.trim().is_empty() {
                None
            } else {
                Some(c.to_string())
            }
        })
        .collect();
    cells.resize(width, None);
    Ok(cells)
}

/// Clean labels, name blanks `Unnamed: <i>` and suffix repeats with `.1`, `.2`, ...
fn header_labels(headers: &StringRecord) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let mut name = clean_column_name(raw);
            if name.is_empty() {
                name = format!("Unnamed: {}", i);
            }
            let count = seen.entry(name.clone()).or_insert(0);
            let label = if *count == 0 {
                name.clone()
            } else {
                format!("{}.{}", name, count)
            };
            *count += 1;
            label
        })
        .collect()
}
