//! ICS credit-card CSV parser.
//!
//! ICS rows carry an explicit debit/credit flag and the export's sign
//! convention is inverted relative to the statement convention: the
//! amount is unconditionally negated for both flags, so debits (positive
//! in the source) come out negative and credits (negative in the source)
//! come out positive. There is no surcharge/merge logic.

use crate::error::{Error, Result};
use crate::normalize::{parse_date, parse_decimal};
use crate::parsers::{date_range, validate_csv, BankParser, CsvTable};
use crate::rules::SETTLEMENT_DESCRIPTION;
use crate::types::{AccountInfo, Transaction, TransactionType, ValidationReport};
use rust_decimal::Decimal;

const DATE_PATTERN: &str = "%d-%m-%Y";

const SETTLEMENT_KEYWORDS: [&str; 2] = ["geincasseerd vorig saldo", "verrekening vorig saldo"];

/// Reference sequence seed; references are seed + 1, seed + 2, …
const DEFAULT_REFERENCE_SEED: i64 = 50_000_000_000;

/// Required columns: (primary Dutch name, English fallback).
const COLUMNS: [(&str, &str); 4] = [
    ("Transactiedatum", "Transaction Date"),
    ("Omschrijving", "Description"),
    ("Debit/Credit", "Debit/Credit"),
    ("Bedrag", "Amount"),
];

pub struct IcsParser {
    reference_seed: i64,
}

impl IcsParser {
    pub fn new() -> Self {
        Self {
            reference_seed: DEFAULT_REFERENCE_SEED,
        }
    }

    /// Override the reference-sequence seed (statement-scoped, not shared
    /// with other dialects).
    pub fn with_reference_seed(seed: i64) -> Self {
        Self {
            reference_seed: seed,
        }
    }

    fn read_rows(&self, table: &CsvTable) -> Result<Vec<Transaction>> {
        let indices = table.require_columns(&COLUMNS)?;
        let [date_idx, description_idx, flag_idx, amount_idx] =
            [indices[0], indices[1], indices[2], indices[3]];
        let card_idx = table.column("Card nummer", "Card Number");

        if table.rows.is_empty() {
            return Err(Error::EmptyInput);
        }

        let mut transactions = Vec::with_capacity(table.rows.len());
        for (row_number, row) in table.rows.iter().enumerate() {
            let description = table.cell(row, description_idx);
            let amount_raw = table.cell(row, amount_idx);
            if description.is_empty() || amount_raw.is_empty() {
                continue;
            }

            let date_raw = table.cell(row, date_idx);
            let date = match parse_date(date_raw, DATE_PATTERN) {
                Ok(date) => date,
                Err(_) => {
                    tracing::warn!(row = row_number, value = date_raw, "skipping row: invalid date");
                    continue;
                }
            };

            let amount = match parse_decimal(amount_raw) {
                Ok(amount) => amount,
                Err(_) => {
                    tracing::warn!(row = row_number, value = amount_raw, "skipping row: invalid amount");
                    continue;
                }
            };

            let flag = table.cell(row, flag_idx).to_uppercase();
            let (amount, transaction_type) = apply_sign_logic(amount, &flag);

            let card_number = card_idx.map(|idx| table.cell(row, idx)).unwrap_or("");
            let counter_account = synthesize_counter_account(card_number);
            let reference = (self.reference_seed + transactions.len() as i64 + 1).to_string();

            if is_settlement(description) {
                // Sign logic already made the settlement positive; only
                // the type and description are forced.
                transactions.push(Transaction::new(
                    date,
                    amount,
                    SETTLEMENT_DESCRIPTION,
                    Some(counter_account),
                    Some(reference),
                    TransactionType::Credit,
                ));
                continue;
            }

            transactions.push(Transaction::new(
                date,
                amount,
                description,
                Some(counter_account),
                Some(reference),
                transaction_type,
            ));
        }

        Ok(transactions)
    }
}

/// Unconditional sign flip for both flags; unknown flags pass through.
fn apply_sign_logic(amount: Decimal, flag: &str) -> (Decimal, TransactionType) {
    match flag {
        "C" => (-amount, TransactionType::Credit),
        "D" => (-amount, TransactionType::Transfer),
        _ => (amount, TransactionType::Transfer),
    }
}

fn is_settlement(description: &str) -> bool {
    let lower = description.to_lowercase();
    SETTLEMENT_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// ICS provides only a masked card number; the counter account is an
/// IBAN-like placeholder built from it.
fn synthesize_counter_account(card_number: &str) -> String {
    if card_number.is_empty() {
        "NL00ICS0000000000".to_string()
    } else {
        format!("NL00ICS0{}", card_number.replace('*', "0"))
    }
}

impl Default for IcsParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for IcsParser {
    fn bank_name(&self) -> &'static str {
        "ICS"
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &["csv"]
    }

    fn parse(&self, data: &[u8]) -> Result<Vec<Transaction>> {
        let table = CsvTable::from_bytes(data, b';')?;
        self.read_rows(&table)
    }

    fn account_info(&self, data: &[u8]) -> Result<AccountInfo> {
        let table = CsvTable::from_bytes(data, b';')?;
        let transactions = self.read_rows(&table)?;

        let account_number = transactions
            .iter()
            .find_map(|t| t.counter_account.clone())
            .ok_or(Error::EmptyInput)?;
        let dates: Vec<_> = transactions.iter().map(|t| t.date).collect();
        let (start_date, end_date) = date_range(&dates)?;

        Ok(AccountInfo {
            account_number,
            start_date,
            end_date,
        })
    }

    fn validate_format(&self, data: &[u8]) -> ValidationReport {
        validate_csv(data, b';', &COLUMNS, "ICS CSV")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    const ICS_CSV: &str = "\
Transactiedatum;Boekingsdatum;Omschrijving;Naam Card-houder;Card nummer;Debit/Credit;Bedrag;Merchant categorie;Land
01-03-2025;02-03-2025;HOTEL DE ZWAAN;J JANSEN;****1234;D;121,00;Lodging;NLD
05-03-2025;05-03-2025;Geincasseerd vorig saldo;J JANSEN;****1234;C;-1.304,91;;NLD
07-03-2025;07-03-2025;RESTAURANT PETIT;J JANSEN;****1234;D;58,20;Food;FRA
";

    #[test]
    fn test_debit_rows_flip_negative() {
        let parser = IcsParser::new();
        let transactions = parser.parse(ICS_CSV.as_bytes()).unwrap();

        assert_eq!(transactions[0].amount, Decimal::from_str("-121.00").unwrap());
        assert_eq!(transactions[0].transaction_type, TransactionType::Transfer);
        assert_eq!(transactions[2].amount, Decimal::from_str("-58.20").unwrap());
    }

    #[test]
    fn test_credit_settlement_flips_positive() {
        let parser = IcsParser::new();
        let transactions = parser.parse(ICS_CSV.as_bytes()).unwrap();

        assert_eq!(transactions[1].amount, Decimal::from_str("1304.91").unwrap());
        assert_eq!(transactions[1].transaction_type, TransactionType::Credit);
        assert_eq!(transactions[1].description, SETTLEMENT_DESCRIPTION);
    }

    #[test]
    fn test_reference_sequence_from_seed() {
        let parser = IcsParser::new();
        let transactions = parser.parse(ICS_CSV.as_bytes()).unwrap();
        assert_eq!(transactions[0].reference.as_deref(), Some("50000000001"));
        assert_eq!(transactions[1].reference.as_deref(), Some("50000000002"));
        assert_eq!(transactions[2].reference.as_deref(), Some("50000000003"));

        let seeded = IcsParser::with_reference_seed(60_000_000_000);
        let transactions = seeded.parse(ICS_CSV.as_bytes()).unwrap();
        assert_eq!(transactions[0].reference.as_deref(), Some("60000000001"));
    }

    #[test]
    fn test_counter_account_from_masked_card() {
        let parser = IcsParser::new();
        let transactions = parser.parse(ICS_CSV.as_bytes()).unwrap();
        assert_eq!(
            transactions[0].counter_account.as_deref(),
            Some("NL00ICS000001234")
        );
    }

    #[test]
    fn test_account_info_range() {
        let parser = IcsParser::new();
        let info = parser.account_info(ICS_CSV.as_bytes()).unwrap();
        assert_eq!(
            info.start_date,
            chrono::NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
        assert_eq!(
            info.end_date,
            chrono::NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
        );
    }

    #[test]
    fn test_unknown_flag_keeps_amount() {
        let (amount, tx_type) = apply_sign_logic(Decimal::from_str("10.00").unwrap(), "X");
        assert_eq!(amount, Decimal::from_str("10.00").unwrap());
        assert_eq!(tx_type, TransactionType::Transfer);
    }

    #[test]
    fn test_validate_agrees_with_parse() {
        let parser = IcsParser::new();
        let report = parser.validate_format(ICS_CSV.as_bytes());
        assert!(report.valid);
        assert!(parser.parse(ICS_CSV.as_bytes()).is_ok());
    }
}
