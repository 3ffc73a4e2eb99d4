// src/load/error.rs

/// Why a buffer could not be turned into a normalized table.
///
/// The attached strings are diagnostics; branch on the variant (or on
/// [`LoadError::kind`]) rather than on the message.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// A data start was located but no non-blank line followed it.
    #[error("no data found")]
    EmptyDataSection,

    #[error("needs at least 2 columns (Date and Price), found {found}")]
    InsufficientColumns { found: usize },

    #[error("fewer than {required} valid rows ({found} survived cleanup)")]
    InsufficientValidRows { found: usize, required: usize },

    /// Decode or delimited-text failures, with the underlying message.
    #[error("load error: {0}")]
    DecodeOrParseFailure(String),
}

/// Fieldless mirror of [`LoadError`] for matching and reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadErrorKind {
    EmptyDataSection,
    InsufficientColumns,
    InsufficientValidRows,
    DecodeOrParseFailure,
}

impl LoadError {
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            LoadError::EmptyDataSection => LoadErrorKind::EmptyDataSection,
            LoadError::InsufficientColumns { .. } => LoadErrorKind::InsufficientColumns,
            LoadError::InsufficientValidRows { .. } => LoadErrorKind::InsufficientValidRows,
            LoadError::DecodeOrParseFailure(_) => LoadErrorKind::DecodeOrParseFailure,
        }
    }
}

impl LoadErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadErrorKind::EmptyDataSection => "EmptyDataSection",
            LoadErrorKind::InsufficientColumns => "InsufficientColumns",
            LoadErrorKind::InsufficientValidRows => "InsufficientValidRows",
            LoadErrorKind::DecodeOrParseFailure => "DecodeOrParseFailure",
        }
    }
}

impl From<std::str::Utf8Error> for LoadError {
    fn from(e: std::str::Utf8Error) -> Self {
        LoadError::DecodeOrParseFailure(e.to_string())
    }
}

impl From<csv::Error> for LoadError {
    fn from(e: csv::Error) -> Self {
        LoadError::DecodeOrParseFailure(e.to_string())
    }
}
