// src/config.rs
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

pub const DEFAULT_SENTINEL: &str = "=== DATI STORICI ===";

/// Line prefixes emitted by the report exporter ahead of the series.
pub const DEFAULT_METADATA_PREFIXES: &[&str] = &[
    "===",
    "Nome",
    "Ticker",
    "Data Download",
    "Periodo",
    "Numero",
    "Performance",
    "Prezzo",
    "Deviazione",
];

/// What to do with records that share a date after sorting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateDates {
    #[default]
    Keep,
    KeepLast,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Substring marking the line right before the observations.
    pub sentinel: String,
    /// Lines starting with any of these are never taken as the first data row.
    pub metadata_prefixes: Vec<String>,
    pub min_valid_rows: usize,
    pub duplicate_dates: DuplicateDates,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
            metadata_prefixes: DEFAULT_METADATA_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_valid_rows: 2,
            duplicate_dates: DuplicateDates::Keep,
        }
    }
}

impl LoaderConfig {
    /// Parse a YAML document; missing keys take their defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let cfg: LoaderConfig = serde_yaml::from_str(text).context("parsing loader config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.sentinel.trim().is_empty() {
            bail!("sentinel must not be empty");
        }
        if self.min_valid_rows < 2 {
            bail!(
                "min_valid_rows must be at least 2, got {}",
                self.min_valid_rows
            );
        }
        Ok(())
    }
}
