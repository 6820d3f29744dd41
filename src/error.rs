//! Error types for the cardconv library.

use std::io;
use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while parsing exports or writing statements.
///
/// Row-level problems (a single malformed date or amount) are deliberately
/// not represented here: those rows are skipped with a `tracing` warning
/// and processing continues.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred during read or write operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error reading CSV structure.
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Error reading an Excel workbook.
    #[error("Excel parsing error: {0}")]
    Xlsx(String),

    /// Error writing XML output.
    #[error("XML writing error: {0}")]
    Xml(String),

    /// Error serializing JSON output.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// None of the candidate text encodings produced a valid decode.
    #[error("could not decode file with any supported encoding (tried UTF-8, Windows-1252)")]
    Decode,

    /// Required columns are absent after primary/fallback name resolution.
    #[error("missing required columns: {}; columns found: {}", missing.join(", "), found.join(", "))]
    MissingColumns {
        missing: Vec<String>,
        found: Vec<String>,
    },

    /// The file contains no data rows after the header.
    #[error("file contains no transaction rows")]
    EmptyInput,

    /// Bank key is not present in the parser registry.
    #[error("unknown bank '{given}'; valid banks: {}", valid.join(", "))]
    UnknownBank { given: String, valid: Vec<String> },

    /// Invalid date format.
    #[error("invalid date format: {0}")]
    InvalidDate(String),

    /// Invalid amount format.
    #[error("invalid amount format: {0}")]
    InvalidAmount(String),

    /// Invalid output format specified.
    #[error("invalid output format: {0}")]
    InvalidFormat(String),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<calamine::XlsxError> for Error {
    fn from(err: calamine::XlsxError) -> Self {
        Error::Xlsx(err.to_string())
    }
}
