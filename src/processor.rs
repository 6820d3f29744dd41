//! Conversion orchestration.
//!
//! The processor resolves a bank key to its parser, parses the file,
//! merges caller overrides with derived statement metadata, computes the
//! closing balance and hands the assembled statement to the requested
//! formatter. It owns no per-conversion state, so a single processor can
//! serve concurrent conversions.

use crate::camt053;
use crate::error::{Error, Result};
use crate::mt940;
use crate::parsers::{BankDescriptor, ParserRegistry};
use crate::types::{AccountStatement, TransactionSummary, ValidationReport};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// MT940 SWIFT text format.
    Mt940,
    /// CAMT.053 ISO 20022 XML format.
    Camt053,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mt940" | "mt-940" | "swift" => Ok(OutputFormat::Mt940),
            "camt053" | "camt.053" | "camt" | "xml" => Ok(OutputFormat::Camt053),
            _ => Err(Error::InvalidFormat(s.to_string())),
        }
    }
}

impl OutputFormat {
    /// File extension conventionally used for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mt940 => "mt940",
            OutputFormat::Camt053 => "xml",
        }
    }
}

/// Caller overrides for [`TransactionProcessor::convert`]; any field left
/// `None` falls back to the derived default.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub account_number: Option<String>,
    pub statement_number: Option<String>,
    pub opening_balance: Option<Decimal>,
}

/// Orchestrates parser selection, statement assembly and formatting.
pub struct TransactionProcessor {
    registry: ParserRegistry,
}

impl TransactionProcessor {
    pub fn new() -> Self {
        Self {
            registry: ParserRegistry::with_default_banks(),
        }
    }

    /// Capability metadata for all registered banks, keyed by bank key.
    pub fn list_supported_banks(&self) -> BTreeMap<String, BankDescriptor> {
        self.registry.descriptors()
    }

    /// Dry-run validation; only an unknown bank key is a hard error.
    pub fn validate(&self, data: &[u8], bank: &str) -> Result<ValidationReport> {
        let parser = self.registry.get(bank)?;
        Ok(parser.validate_format(data))
    }

    /// Parse and total a file for preview consumers.
    pub fn summarize(&self, data: &[u8], bank: &str) -> Result<TransactionSummary> {
        let parser = self.registry.get(bank)?;
        let transactions = parser.parse(data)?;
        let info = parser.account_info(data)?;
        Ok(TransactionSummary::from_transactions(info, transactions))
    }

    /// Convert a bank export into the requested statement format.
    pub fn convert(
        &self,
        data: &[u8],
        bank: &str,
        format: OutputFormat,
        options: &ConvertOptions,
    ) -> Result<String> {
        let statement = self.build_statement(data, bank, options)?;
        tracing::info!(
            bank,
            transactions = statement.transactions.len(),
            statement_number = %statement.statement_number,
            "converting statement"
        );
        match format {
            OutputFormat::Mt940 => Ok(mt940::format(&statement)),
            OutputFormat::Camt053 => camt053::format(&statement),
        }
    }

    /// Assemble the canonical statement: parse, derive account info,
    /// apply overrides, compute the closing balance.
    pub fn build_statement(
        &self,
        data: &[u8],
        bank: &str,
        options: &ConvertOptions,
    ) -> Result<AccountStatement> {
        let parser = self.registry.get(bank)?;
        let transactions = parser.parse(data)?;
        let info = parser.account_info(data)?;

        let account_number = options
            .account_number
            .clone()
            .unwrap_or(info.account_number);
        let statement_number = options
            .statement_number
            .clone()
            .unwrap_or_else(|| format!("CC{}", info.start_date.format("%Y%m%d")));
        // Credit-card statements are period-scoped and open at zero.
        let opening_balance = options.opening_balance.unwrap_or(Decimal::ZERO);

        let transaction_total: Decimal = transactions.iter().map(|t| t.amount).sum();
        Ok(AccountStatement {
            account_number,
            statement_number,
            opening_balance,
            closing_balance: opening_balance + transaction_total,
            transactions,
            currency: "EUR".to_string(),
            reference_date: Some(info.end_date),
        })
    }
}

impl Default for TransactionProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    const RABO_CSV: &str = "\
Tegenrekening IBAN;Transactiereferentie;Datum;Bedrag;Omschrijving
NL54RABO0310737710;7;1-3-2025;-19,30;GTRANSLATE.COM
NL54RABO0310737710;8;1-3-2025;-0,39;Koersopslag
NL54RABO0310737710;9;26-3-2025;-912,40;Verrekening vorig overzicht
NL54RABO0310737710;10;27-3-2025;-108,00;COOKIEBOT KOEBENHAVN K DNK
";

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("mt940".parse::<OutputFormat>().unwrap(), OutputFormat::Mt940);
        assert_eq!("MT940".parse::<OutputFormat>().unwrap(), OutputFormat::Mt940);
        assert_eq!("camt.053".parse::<OutputFormat>().unwrap(), OutputFormat::Camt053);
        assert_eq!("xml".parse::<OutputFormat>().unwrap(), OutputFormat::Camt053);
        assert!("pdf".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_unknown_bank_lists_valid_keys() {
        let processor = TransactionProcessor::new();
        let err = processor
            .convert(b"", "bunq", OutputFormat::Mt940, &ConvertOptions::default())
            .unwrap_err();
        match err {
            Error::UnknownBank { given, valid } => {
                assert_eq!(given, "bunq");
                assert!(valid.contains(&"rabobank_old".to_string()));
            }
            other => panic!("expected UnknownBank, got {other:?}"),
        }
    }

    #[test]
    fn test_build_statement_defaults() {
        let processor = TransactionProcessor::new();
        let statement = processor
            .build_statement(RABO_CSV.as_bytes(), "rabobank_old", &ConvertOptions::default())
            .unwrap();

        assert_eq!(statement.account_number, "NL54RABO0310737710");
        assert_eq!(statement.statement_number, "CC20250301");
        assert_eq!(statement.opening_balance, Decimal::ZERO);
        // -19.69 merged + 912.40 settlement - 108.00
        assert_eq!(
            statement.closing_balance,
            Decimal::from_str("784.71").unwrap()
        );
        assert_eq!(
            statement.reference_date,
            chrono::NaiveDate::from_ymd_opt(2025, 3, 27)
        );
    }

    #[test]
    fn test_convert_overrides_win() {
        let processor = TransactionProcessor::new();
        let options = ConvertOptions {
            account_number: Some("NL91ABNA0417164300".to_string()),
            statement_number: Some("CC20990101".to_string()),
            opening_balance: Some(Decimal::from_str("100.00").unwrap()),
        };
        let statement = processor
            .build_statement(RABO_CSV.as_bytes(), "rabobank_old", &options)
            .unwrap();

        assert_eq!(statement.account_number, "NL91ABNA0417164300");
        assert_eq!(statement.statement_number, "CC20990101");
        assert_eq!(
            statement.closing_balance,
            Decimal::from_str("884.71").unwrap()
        );

        let mt940 = processor
            .convert(RABO_CSV.as_bytes(), "rabobank_old", OutputFormat::Mt940, &options)
            .unwrap();
        assert!(mt940.contains(":25:NL91ABNA0417164300 EUR"));
        assert!(mt940.contains(":28C:90101"));
    }

    #[test]
    fn test_convert_both_formats() {
        let processor = TransactionProcessor::new();
        let options = ConvertOptions::default();

        let mt940 = processor
            .convert(RABO_CSV.as_bytes(), "rabobank_old", OutputFormat::Mt940, &options)
            .unwrap();
        assert!(mt940.starts_with(":940:"));

        let camt = processor
            .convert(RABO_CSV.as_bytes(), "rabobank_old", OutputFormat::Camt053, &options)
            .unwrap();
        assert!(camt.contains("<Ustrd>Settlement previous statement</Ustrd>"));
    }

    #[test]
    fn test_summarize_totals() {
        let processor = TransactionProcessor::new();
        let summary = processor
            .summarize(RABO_CSV.as_bytes(), "rabobank_old")
            .unwrap();

        assert_eq!(summary.transaction_count, 3);
        assert_eq!(summary.total_credits, Decimal::from_str("912.40").unwrap());
        assert_eq!(summary.total_debits, Decimal::from_str("-127.69").unwrap());
        assert_eq!(summary.net_total, Decimal::from_str("784.71").unwrap());
        assert_eq!(
            summary.net_total,
            summary.total_credits + summary.total_debits
        );
    }

    #[test]
    fn test_validate_only_unknown_bank_is_fatal() {
        let processor = TransactionProcessor::new();

        let report = processor.validate(b"garbage", "rabobank_old").unwrap();
        assert!(!report.valid);

        assert!(processor.validate(b"garbage", "nope").is_err());
    }
}
