// src/table.rs
use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;

pub const DATE_COLUMN: &str = "Date";
pub const PRICE_COLUMN: &str = "Price";

/// One observation. `extras` lines up with [`NormalizedTable::extra_columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub date: NaiveDateTime,
    pub price: f64,
    pub extras: Vec<Option<String>>,
}

/// A validated series: `Date` and `Price` always lead the column list,
/// records are sorted by date and none is missing either field.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    columns: Vec<String>,
    records: Vec<Record>,
}

/// Headline numbers for listing a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    pub first_date: String,
    pub last_date: String,
    pub first_price: f64,
    pub last_price: f64,
}

impl NormalizedTable {
    /// `extra_columns` names the pass-through columns after `Date` and `Price`.
    /// Records must already be sorted and validated.
    pub(crate) fn new(extra_columns: Vec<String>, records: Vec<Record>) -> Self {
        let mut columns = Vec::with_capacity(extra_columns.len() + 2);
        columns.push(DATE_COLUMN.to_string());
        columns.push(PRICE_COLUMN.to_string());
        columns.extend(extra_columns);
        debug_assert!(records.windows(2).all(|w| w[0].date <= w[1].date));
        Self { columns, records }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn extra_columns(&self) -> &[String] {
        &self.columns[2..]
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Record> {
        self.records.get(idx)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.records.iter().map(|r| r.date)
    }

    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().map(|r| r.price)
    }

    /// Values of a pass-through column by name.
    pub fn extra_column(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let idx = self.extra_columns().iter().position(|c| c == name)?;
        Some(
            self.records
                .iter()
                .map(|r| r.extras.get(idx).and_then(|v| v.as_deref()))
                .collect(),
        )
    }

    pub fn summary(&self) -> Option<TableSummary> {
        let first = self.records.first()?;
        let last = self.records.last()?;
        Some(TableSummary {
            rows: self.records.len(),
            columns: self.columns.clone(),
            first_date: format_date(&first.date),
            last_date: format_date(&last.date),
            first_price: first.price,
            last_price: last.price,
        })
    }
}

/// `YYYY-MM-DD` for midnight, otherwise with the time of day.
pub fn format_date(dt: &NaiveDateTime) -> String {
    if dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0 {
        dt.format("%Y-%m-%d").to_string()
    } else if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()
    }
}
