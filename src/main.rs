use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use seriesload::{
    batch::{self, BatchReport},
    export::{self, ExportFormat},
    table::TableSummary,
    Loader, LoaderConfig, TableStore,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Csv,
    Parquet,
}

impl From<Format> for ExportFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Csv => ExportFormat::Csv,
            Format::Parquet => ExportFormat::Parquet,
        }
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Load price-series CSV files (plain or with a report preamble) into normalized tables"
)]
struct Args {
    /// Files or glob patterns to load
    #[arg(required = true)]
    paths: Vec<String>,
    /// YAML loader config
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Write every loaded table here
    #[arg(long)]
    export_dir: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "csv")]
    format: Format,
    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct JsonLoaded<'a> {
    name: &'a str,
    #[serde(flatten)]
    summary: TableSummary,
}

#[derive(Serialize)]
struct JsonFailure<'a> {
    name: &'a str,
    kind: &'static str,
    error: String,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // ─── 2) config ───────────────────────────────────────────────────
    let config = match &args.config {
        Some(path) => LoaderConfig::from_yaml_file(path)?,
        None => LoaderConfig::default(),
    };
    let loader = Loader::new(config)?;

    // ─── 3) load every file into a fresh store ───────────────────────
    let paths = batch::expand_patterns(&args.paths)?;
    info!("{} files to load", paths.len());
    let store = TableStore::new();
    let report = batch::load_paths(&loader, &paths, &store);

    // ─── 4) report ───────────────────────────────────────────────────
    if args.json {
        print_json(&report, &store)?;
    } else {
        print_text(&report, &store);
    }

    // ─── 5) export ───────────────────────────────────────────────────
    if let Some(dir) = &args.export_dir {
        let written = export::export_store(&store, dir, args.format.into())?;
        info!("wrote {} files to {}", written.len(), dir.display());
    }

    if report.loaded.is_empty() {
        bail!("no file could be loaded");
    }
    Ok(())
}

fn print_text(report: &BatchReport, store: &TableStore) {
    for name in &report.loaded {
        if let Some(summary) = store.get(name).and_then(|t| t.summary()) {
            println!(
                "{:<24} {:>6} rows  {} → {}  {:.4} → {:.4}  [{}]",
                name,
                summary.rows,
                summary.first_date,
                summary.last_date,
                summary.first_price,
                summary.last_price,
                summary.columns.join(", ")
            );
        }
    }
    if !report.failures.is_empty() {
        println!("\n{} file(s) failed:", report.failures.len());
        for f in &report.failures {
            println!("  {}: {}", f.name, f.error);
        }
    }
}

fn print_json(report: &BatchReport, store: &TableStore) -> Result<()> {
    let loaded: Vec<JsonLoaded> = report
        .loaded
        .iter()
        .filter_map(|name| {
            store
                .get(name)
                .and_then(|t| t.summary())
                .map(|summary| JsonLoaded { name, summary })
        })
        .collect();
    let failures: Vec<JsonFailure> = report
        .failures
        .iter()
        .map(|f| JsonFailure {
            name: &f.name,
            kind: match &f.error {
                batch::FileError::Read { .. } => "Read",
                batch::FileError::Load(e) => e.kind().as_str(),
            },
            error: f.error.to_string(),
        })
        .collect();
    let out = serde_json::json!({ "loaded": loaded, "failures": failures });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
