// src/batch.rs
use anyhow::{Context, Result};
use glob::glob;
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{info, instrument, warn};

use crate::load::{utils::display_name, LoadError, Loader};
use crate::store::TableStore;
use crate::table::NormalizedTable;

/// An uploaded file already held in memory.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Name the upload after its file name, extension stripped.
    pub fn from_file_name(file_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: display_name(file_name),
            bytes,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FileError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Load(#[from] LoadError),
}

#[derive(Debug)]
pub struct FileFailure {
    pub name: String,
    pub error: FileError,
}

/// Outcome of one batch: every stored name and every failure, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub loaded: Vec<String>,
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Load every upload independently and store the successes.
///
/// Parsing runs in parallel; results are applied to `store` one at a time in
/// input order, so when two uploads share a name the later one wins.
#[instrument(level = "info", skip_all, fields(files = uploads.len()))]
pub fn load_uploads(loader: &Loader, uploads: Vec<Upload>, store: &TableStore) -> BatchReport {
    let start = Instant::now();
    let outcomes: Vec<(String, Result<NormalizedTable, FileError>)> = uploads
        .into_par_iter()
        .map(|up| {
            let res = loader.load(&up.bytes).map_err(FileError::from);
            (up.name, res)
        })
        .collect();

    let report = merge(outcomes, store);
    info!(
        loaded = report.loaded.len(),
        failed = report.failures.len(),
        elapsed = ?start.elapsed(),
        "batch finished"
    );
    report
}

/// Read and load files from disk; an unreadable file is just another failure.
#[instrument(level = "info", skip_all, fields(files = paths.len()))]
pub fn load_paths<P: AsRef<Path> + Sync>(
    loader: &Loader,
    paths: &[P],
    store: &TableStore,
) -> BatchReport {
    let start = Instant::now();
    let outcomes: Vec<(String, Result<NormalizedTable, FileError>)> = paths
        .par_iter()
        .map(|p| {
            let path = p.as_ref();
            let name = display_name(&path.to_string_lossy());
            let res = fs::read(path)
                .map_err(|source| FileError::Read {
                    path: path.to_path_buf(),
                    source,
                })
                .and_then(|bytes| loader.load(&bytes).map_err(FileError::from));
            (name, res)
        })
        .collect();

    let report = merge(outcomes, store);
    info!(
        loaded = report.loaded.len(),
        failed = report.failures.len(),
        elapsed = ?start.elapsed(),
        "batch finished"
    );
    report
}

fn merge(
    outcomes: Vec<(String, Result<NormalizedTable, FileError>)>,
    store: &TableStore,
) -> BatchReport {
    let mut report = BatchReport::default();
    for (name, res) in outcomes {
        match res {
            Ok(table) => {
                store.insert(name.clone(), table);
                report.loaded.push(name);
            }
            Err(error) => {
                warn!(%name, %error, "file not loaded");
                report.failures.push(FileFailure { name, error });
            }
        }
    }
    report
}

/// Expand each argument as a glob; arguments matching nothing are kept
/// verbatim so the read failure is reported against them.
pub fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for pattern in patterns {
        let matches: Vec<PathBuf> = glob(pattern)
            .with_context(|| format!("Failed to read glob pattern '{}'", pattern))?
            .filter_map(|entry| entry.ok())
            .filter(|p| p.is_file())
            .collect();
        if matches.is_empty() {
            out.push(PathBuf::from(pattern));
        } else {
            out.extend(matches);
        }
    }
    Ok(out)
}
