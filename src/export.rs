// src/export.rs
use anyhow::{anyhow, bail, Context, Result};
use arrow::{
    array::{ArrayRef, Float64Array, StringArray, TimestampMillisecondArray},
    datatypes::{DataType, Field, Schema, TimeUnit},
    record_batch::RecordBatch,
};
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info};

use crate::store::TableStore;
use crate::table::{format_date, NormalizedTable, DATE_COLUMN, PRICE_COLUMN};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Parquet,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
        }
    }
}

/// Headed CSV: `Date,Price,<extras>`.
pub fn to_csv_string(table: &NormalizedTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(table.columns())?;
    for rec in table.records() {
        let mut row = Vec::with_capacity(table.columns().len());
        row.push(format_date(&rec.date));
        row.push(rec.price.to_string());
        row.extend(rec.extras.iter().map(|v| v.clone().unwrap_or_default()));
        wtr.write_record(&row)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow!("flushing CSV writer: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

pub fn write_csv(table: &NormalizedTable, path: &Path) -> Result<()> {
    let text = to_csv_string(table)?;
    write_atomically(path, |tmp| {
        fs::write(tmp, text.as_bytes()).with_context(|| format!("writing {:?}", tmp))
    })
}

/// `Date` → Timestamp(ms), `Price` → Float64, pass-through columns → Utf8.
pub fn to_record_batch(table: &NormalizedTable) -> Result<RecordBatch> {
    let mut fields = vec![
        Field::new(
            DATE_COLUMN,
            DataType::Timestamp(TimeUnit::Millisecond, None),
            false,
        ),
        Field::new(PRICE_COLUMN, DataType::Float64, false),
    ];
    fields.extend(
        table
            .extra_columns()
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true)),
    );
    let schema = Arc::new(Schema::new(fields));

    let dates = TimestampMillisecondArray::from_iter_values(
        table.dates().map(|d| d.and_utc().timestamp_millis()),
    );
    let prices = Float64Array::from_iter_values(table.prices());
    let mut cols: Vec<ArrayRef> = vec![Arc::new(dates), Arc::new(prices)];
    for idx in 0..table.extra_columns().len() {
        let values: StringArray = table
            .records()
            .iter()
            .map(|r| r.extras.get(idx).and_then(|v| v.as_deref()))
            .collect();
        cols.push(Arc::new(values));
    }

    RecordBatch::try_new(schema, cols).context("building table record batch")
}

pub fn write_parquet(table: &NormalizedTable, path: &Path) -> Result<()> {
    let batch = to_record_batch(table)?;
    write_atomically(path, |tmp| {
        let file = File::create(tmp).with_context(|| format!("creating {:?}", tmp))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
            .context("creating Arrow writer")?;
        writer.write(&batch).context("writing table batch")?;
        writer.close().context("closing Parquet writer")?;
        Ok(())
    })
}

/// Write every stored table to `<dir>/<name>.<ext>`; returns the written paths.
pub fn export_store(store: &TableStore, dir: &Path, format: ExportFormat) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("creating export directory {:?}", dir))?;
    let mut written = Vec::new();
    for (name, table) in store.snapshot() {
        let path = dir.join(export_file_name(&name, format)?);
        match format {
            ExportFormat::Csv => write_csv(&table, &path)?,
            ExportFormat::Parquet => write_parquet(&table, &path)?,
        }
        debug!(%name, path = %path.display(), "exported");
        written.push(path);
    }
    info!(count = written.len(), dir = %dir.display(), "export complete");
    Ok(written)
}

/// `<name>.<ext>`, refusing names that would leave the export directory.
fn export_file_name(name: &str, format: ExportFormat) -> Result<String> {
    if name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        bail!("table name {:?} cannot be used as a file name", name);
    }
    Ok(format!("{}.{}", name, format.extension()))
}

/// Write to `<path>.tmp` first, then rename into place.
fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let tmp = path.with_extension("tmp");
    if let Err(e) = write(&tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path).with_context(|| format!("renaming {:?} to {:?}", tmp, path))
}
