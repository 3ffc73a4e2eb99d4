// src/load/section.rs
use crate::config::LoaderConfig;

/// Where the observations begin inside the decoded document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataStart {
    /// Line right after the sentinel marker.
    Sentinel(usize),
    /// First line that looks like `<date>,<...>`.
    Heuristic(usize),
    /// Nothing found; read the whole document as a headed table.
    NotFound,
}

impl DataStart {
    pub fn index(&self) -> Option<usize> {
        match self {
            DataStart::Sentinel(i) | DataStart::Heuristic(i) => Some(*i),
            DataStart::NotFound => None,
        }
    }
}

/// Sentinel first across the whole document, then the data-like heuristic.
pub fn find_data_start(lines: &[&str], config: &LoaderConfig) -> DataStart {
    if let Some(i) = lines.iter().position(|l| l.contains(config.sentinel.as_str())) {
        return DataStart::Sentinel(i + 1);
    }
    match lines
        .iter()
        .position(|l| is_data_row(l, &config.metadata_prefixes))
    {
        Some(i) => DataStart::Heuristic(i),
        None => DataStart::NotFound,
    }
}

/// Non-blank, not a known metadata label, has a comma, and leads with a
/// date-like token.
pub fn is_data_row(line: &str, metadata_prefixes: &[String]) -> bool {
    if line.trim().is_empty() || !line.contains(',') {
        return false;
    }
    if metadata_prefixes
        .iter()
        .any(|p| line.starts_with(p.as_str()))
    {
        return false;
    }
    let first = line.split(',').next().unwrap_or_default().trim();
    looks_date_like(first)
}

/// Loose check only: all digits once `-` and `/` are removed, or holds a
/// `-` or `/`. Bare integers pass here and may still fail real coercion.
pub fn looks_date_like(token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    if token.contains('/') || token.contains('-') {
        return true;
    }
    token.chars().all(|c| c.is_ascii_digit())
}
