//! Bank-specific export parsers.
//!
//! Every dialect implements [`BankParser`]; the [`ParserRegistry`] maps a
//! bank key onto its implementation and exposes capability metadata for
//! UI consumers. Dialects differ in delimiter, column names, date pattern
//! and keyword tables, while the stateful rule logic lives in
//! [`crate::rules`].

mod amex;
mod excel;
mod ics;
mod ing;
mod rabobank;

pub use amex::AmexParser;
pub use excel::ExcelTemplateParser;
pub use ics::IcsParser;
pub use ing::IngParser;
pub use rabobank::{RabobankLegacyParser, RabobankNewParser};

use crate::decode::decode_text;
use crate::error::{Error, Result};
use crate::normalize::clean_header;
use crate::types::{AccountInfo, Transaction, ValidationReport};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Common contract for all dialect parsers.
pub trait BankParser: Send + Sync {
    /// Name of the bank this parser handles.
    fn bank_name(&self) -> &'static str;

    /// Human-readable name shown to UI consumers.
    fn display_name(&self) -> &'static str {
        self.bank_name()
    }

    /// Supported file extensions (never empty).
    fn supported_extensions(&self) -> &'static [&'static str];

    /// Parse raw file bytes into an ordered transaction sequence.
    ///
    /// Fails when the file cannot be decoded, required columns are
    /// missing, or there are no data rows. Rows with a malformed date or
    /// amount are skipped with a warning, never aborting the file.
    fn parse(&self, data: &[u8]) -> Result<Vec<Transaction>>;

    /// Derive account number and date range by scanning all parsed dates.
    ///
    /// Fails with [`Error::EmptyInput`] when no dates can be derived.
    fn account_info(&self, data: &[u8]) -> Result<AccountInfo>;

    /// Non-mutating dry run reaching the same accept/reject decision as
    /// [`BankParser::parse`]. Never returns an error.
    fn validate_format(&self, data: &[u8]) -> ValidationReport;
}

impl std::fmt::Debug for dyn BankParser + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BankParser")
            .field("bank_name", &self.bank_name())
            .finish()
    }
}

/// Capability metadata for one registered bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankDescriptor {
    pub display_name: String,
    pub supported_extensions: Vec<String>,
}

/// Maps bank keys onto parser implementations.
pub struct ParserRegistry {
    parsers: BTreeMap<&'static str, Box<dyn BankParser>>,
}

impl ParserRegistry {
    /// Registry with every built-in dialect.
    pub fn with_default_banks() -> Self {
        let mut parsers: BTreeMap<&'static str, Box<dyn BankParser>> = BTreeMap::new();
        parsers.insert("rabobank_old", Box::new(RabobankLegacyParser::new()));
        parsers.insert("rabobank_new", Box::new(RabobankNewParser::new()));
        parsers.insert("ing", Box::new(IngParser::new()));
        parsers.insert("amex", Box::new(AmexParser::new()));
        parsers.insert("ics", Box::new(IcsParser::new()));
        parsers.insert("excel", Box::new(ExcelTemplateParser::new()));
        Self { parsers }
    }

    /// Look up a parser by bank key (case-insensitive).
    pub fn get(&self, bank: &str) -> Result<&dyn BankParser> {
        let key = bank.to_lowercase();
        self.parsers
            .get(key.as_str())
            .map(|p| p.as_ref())
            .ok_or_else(|| Error::UnknownBank {
                given: bank.to_string(),
                valid: self.keys(),
            })
    }

    /// Registered bank keys in stable order.
    pub fn keys(&self) -> Vec<String> {
        self.parsers.keys().map(|k| k.to_string()).collect()
    }

    /// Capability metadata for all registered banks.
    pub fn descriptors(&self) -> BTreeMap<String, BankDescriptor> {
        self.parsers
            .iter()
            .map(|(key, parser)| {
                (
                    key.to_string(),
                    BankDescriptor {
                        display_name: parser.display_name().to_string(),
                        supported_extensions: parser
                            .supported_extensions()
                            .iter()
                            .map(|e| e.to_string())
                            .collect(),
                    },
                )
            })
            .collect()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_default_banks()
    }
}

/// A decoded delimited file: cleaned headers plus data rows.
///
/// Shared by the CSV dialects; handles the encoding retry loop and the
/// primary/fallback column-name resolution.
pub(crate) struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn from_bytes(data: &[u8], delimiter: u8) -> Result<Self> {
        let text = decode_text(data)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()?
            .iter()
            .map(clean_header)
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|c| c.to_string()).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Resolve a semantic column: primary name first, then the fallback.
    pub fn column(&self, primary: &str, fallback: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h == primary)
            .or_else(|| self.headers.iter().position(|h| h == fallback))
    }

    /// Resolve all required columns, collecting missing primary names.
    pub fn require_columns(&self, specs: &[(&str, &str)]) -> Result<Vec<usize>> {
        let mut indices = Vec::with_capacity(specs.len());
        let mut missing = Vec::new();
        for (primary, fallback) in specs {
            match self.column(primary, fallback) {
                Some(idx) => indices.push(idx),
                None => missing.push(primary.to_string()),
            }
        }
        if missing.is_empty() {
            Ok(indices)
        } else {
            Err(Error::MissingColumns {
                missing,
                found: self.headers.clone(),
            })
        }
    }

    /// Cell contents, empty when the row is shorter than the header.
    pub fn cell<'a>(&'a self, row: &'a [String], idx: usize) -> &'a str {
        row.get(idx).map(String::as_str).unwrap_or("").trim()
    }
}

/// Min/max over a sequence of parsed dates.
pub(crate) fn date_range(dates: &[NaiveDate]) -> Result<(NaiveDate, NaiveDate)> {
    let start = dates.iter().min().copied().ok_or(Error::EmptyInput)?;
    let end = dates.iter().max().copied().ok_or(Error::EmptyInput)?;
    Ok((start, end))
}

/// Shared `validate_format` shape for the CSV dialects: decode the file,
/// resolve the required columns, and require at least one data row.
pub(crate) fn validate_csv(
    data: &[u8],
    delimiter: u8,
    specs: &[(&str, &str)],
    bank_name: &str,
) -> ValidationReport {
    let table = match CsvTable::from_bytes(data, delimiter) {
        Ok(table) => table,
        Err(err) => return ValidationReport::failed(err.to_string(), Vec::new()),
    };

    if let Err(err) = table.require_columns(specs) {
        return ValidationReport::failed(err.to_string(), table.headers.clone());
    }

    if table.rows.is_empty() {
        return ValidationReport::failed(
            Error::EmptyInput.to_string(),
            table.headers.clone(),
        );
    }

    ValidationReport::ok(
        format!(
            "{} file is valid with {} transaction rows",
            bank_name,
            table.rows.len()
        ),
        table.headers.clone(),
        table.rows.len(),
    )
}
