//! ING credit-card CSV parser.
//!
//! ING exports carry no surcharge/settlement semantics: every row maps
//! one to one onto a transaction and classification is purely
//! keyword/sign based. ING provides no reference column, so references
//! are synthesized from the row index.

use crate::error::{Error, Result};
use crate::normalize::{parse_date, parse_decimal};
use crate::parsers::{date_range, validate_csv, BankParser, CsvTable};
use crate::types::{AccountInfo, Transaction, TransactionType, ValidationReport};
use rust_decimal::Decimal;

const DATE_PATTERN: &str = "%Y-%m-%d";

const CARD_KEYWORDS: [&str; 4] = ["betaalautomaat", "apple pay", "card", "pos"];

/// Required columns: (primary Dutch name, English fallback).
const COLUMNS: [(&str, &str); 7] = [
    ("Accountnummer", "Account Number"),
    ("Kaartnummer", "Card Number"),
    ("Naam op kaart", "Name on Card"),
    ("Transactiedatum", "Transaction Date"),
    ("Boekingsdatum", "Booking Date"),
    ("Omschrijving", "Description"),
    ("Bedrag in EUR", "Amount in EUR"),
];

pub struct IngParser;

impl IngParser {
    pub fn new() -> Self {
        Self
    }

    fn read_rows(&self, table: &CsvTable) -> Result<Vec<Transaction>> {
        let indices = table.require_columns(&COLUMNS)?;
        let account_idx = indices[0];
        let date_idx = indices[3];
        let description_idx = indices[5];
        let amount_idx = indices[6];

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

            let account_number = table.cell(row, account_idx);
            transactions.push(Transaction::new(
                date,
                amount,
                description,
                (!account_number.is_empty()).then(|| account_number.to_string()),
                Some(format!("ING_{:06}", row_number)),
                classify(description, amount),
            ));
        }

        Ok(transactions)
    }
}

/// Positive amounts are credits regardless of keywords; card keywords
/// only apply to outflows.
fn classify(description: &str, amount: Decimal) -> TransactionType {
    if amount > Decimal::ZERO {
        return TransactionType::Credit;
    }
    let lower = description.to_lowercase();
    if CARD_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return TransactionType::Card;
    }
    TransactionType::Transfer
}

impl Default for IngParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for IngParser {
    fn bank_name(&self) -> &'static str {
        "ING"
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &["csv"]
    }

    fn parse(&self, data: &[u8]) -> Result<Vec<Transaction>> {
        let table = CsvTable::from_bytes(data, b',')?;
        self.read_rows(&table)
    }

    fn account_info(&self, data: &[u8]) -> Result<AccountInfo> {
        let table = CsvTable::from_bytes(data, b',')?;
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
        validate_csv(data, b',', &COLUMNS, "ING CSV")
    }
}
