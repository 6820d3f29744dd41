//! AMEX credit-card Excel parser.
//!
//! AMEX workbooks put metadata rows above the table, so the header row is
//! located by scanning for known header keywords. Columns are positional
//! after that: date in the first column that parses (column 0, then 1),
//! amount in column 2 with a scan fallback, description the longest
//! remaining text cell.
//!
//! Business rule: a payment-to-card row (thank-you memo) becomes a
//! positive credit; every other row is a purchase and is forced negative.

use crate::error::{Error, Result};
use crate::normalize::{parse_date, parse_decimal};
use crate::parsers::{date_range, BankParser};
use crate::types::{AccountInfo, Transaction, TransactionType, ValidationReport};
use calamine::{Data, DataType, Range, Reader};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::io::Cursor;

const PAYMENT_KEYWORDS: [&str; 1] = ["hartelijk bedankt voor uw betaling"];

const HEADER_KEYWORDS: [&str; 7] = [
    "date",
    "datum",
    "amount",
    "bedrag",
    "description",
    "omschrijving",
    "transaction",
];

/// Reference sequence seed; not shared with any other dialect.
const DEFAULT_REFERENCE_SEED: i64 = 49_000_000_000;

/// AMEX exports carry no IBAN; a fixed placeholder is used instead.
const COUNTER_ACCOUNT: &str = "NL00AMEX0000000000";

const DATE_PATTERN: &str = "%Y-%m-%d";

pub struct AmexParser {
    reference_seed: i64,
}

impl AmexParser {
    pub fn new() -> Self {
        Self {
            reference_seed: DEFAULT_REFERENCE_SEED,
        }
    }

    /// Override the reference-sequence seed (statement-scoped counter).
    pub fn with_reference_seed(seed: i64) -> Self {
        Self {
            reference_seed: seed,
        }
    }

    fn read_rows(&self, data: &[u8]) -> Result<Vec<Transaction>> {
        let range = open_first_sheet(data)?;
        let rows: Vec<&[Data]> = range.rows().collect();
        let data_start = find_header_row(&rows).map(|idx| idx + 1).unwrap_or(0);

        let mut transactions = Vec::new();
        for (row_number, row) in rows.iter().enumerate().skip(data_start) {
            if row.first().map(cell_is_blank).unwrap_or(true) {
                continue;
            }
            match self.parse_row(row, row_number, transactions.len()) {
                Some(transaction) => transactions.push(transaction),
                None => {
                    tracing::warn!(row = row_number, "skipping row: no parseable date/amount");
                }
            }
        }

        if transactions.is_empty() {
            return Err(Error::EmptyInput);
        }
        Ok(transactions)
    }

    fn parse_row(&self, row: &[Data], row_number: usize, sequence: usize) -> Option<Transaction> {
        // Date: first column that parses, column 0 then column 1.
        let (date_idx, date) = [0usize, 1]
            .into_iter()
            .find_map(|idx| row.get(idx).and_then(cell_date).map(|d| (idx, d)))?;

        // Amount: column 2, with a scan fallback over the remaining cells.
        let (amount_idx, amount) = row
            .get(2)
            .and_then(cell_amount)
            .map(|a| (2usize, a))
            .or_else(|| {
                row.iter()
                    .enumerate()
                    .filter(|(idx, _)| *idx != date_idx)
                    .find_map(|(idx, cell)| cell_amount(cell).map(|a| (idx, a)))
            })?;

        // Description: the longest remaining text cell.
        let mut description = String::new();
        for (idx, cell) in row.iter().enumerate() {
            if idx == date_idx || idx == amount_idx {
                continue;
            }
            if let Data::String(s) = cell {
                let text = s.trim();
                if !text.is_empty()
                    && !looks_like_date_or_amount(text)
                    && text.len() > description.len()
                {
                    description = text.to_string();
                }
            }
        }
        if description.is_empty() {
            description = format!("AMEX Transaction {}", row_number + 1);
        }

        let (amount, transaction_type) = apply_payment_logic(amount, &description);
        let reference = (self.reference_seed + sequence as i64 + 1).to_string();

        Some(Transaction::new(
            date,
            amount,
            description,
            Some(COUNTER_ACCOUNT.to_string()),
            Some(reference),
            transaction_type,
        ))
    }
}

/// Payments to the card become positive credits; everything else is a
/// purchase and is forced negative (negate-absolute convention).
fn apply_payment_logic(amount: Decimal, description: &str) -> (Decimal, TransactionType) {
    let lower = description.to_lowercase();
    if PAYMENT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        (amount.abs(), TransactionType::Credit)
    } else {
        (-amount.abs(), TransactionType::Transfer)
    }
}

fn open_first_sheet(data: &[u8]) -> Result<Range<Data>> {
    let cursor = Cursor::new(data.to_vec());
    let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
        .map_err(|e| Error::Xlsx(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(Error::EmptyInput)?
        .map_err(|e| Error::Xlsx(e.to_string()))?;
    Ok(range)
}

/// Scan for the first row that mentions a known header keyword.
fn find_header_row(rows: &[&[Data]]) -> Option<usize> {
    rows.iter().position(|row| {
        let joined = row
            .iter()
            .filter_map(|c| match c {
                Data::String(s) => Some(s.to_lowercase()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ");
        HEADER_KEYWORDS.iter().any(|k| joined.contains(k))
    })
}

fn cell_is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn cell_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::DateTime(_) | Data::DateTimeIso(_) => cell.as_datetime().map(|dt| dt.date()),
        Data::String(s) => parse_date(s, DATE_PATTERN).ok(),
        _ => None,
    }
}

fn cell_amount(cell: &Data) -> Option<Decimal> {
    match cell {
        Data::Float(f) => Decimal::from_f64_retain(*f).map(|d| d.round_dp(2)),
        Data::Int(i) => Some(Decimal::from(*i)),
        Data::String(s) => parse_decimal(s).ok(),
        _ => None,
    }
}

/// Heuristic used when hunting for the description cell.
fn looks_like_date_or_amount(text: &str) -> bool {
    let has_digit = text.chars().any(|c| c.is_ascii_digit());
    if !has_digit {
        return false;
    }
    text.chars().any(|c| ".,€$-/".contains(c))
}

impl Default for AmexParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for AmexParser {
    fn bank_name(&self) -> &'static str {
        "AMEX"
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &["xlsx", "xls"]
    }

    fn parse(&self, data: &[u8]) -> Result<Vec<Transaction>> {
        self.read_rows(data)
    }

    fn account_info(&self, data: &[u8]) -> Result<AccountInfo> {
        let transactions = self.read_rows(data)?;
        let dates: Vec<_> = transactions.iter().map(|t| t.date).collect();
        let (start_date, end_date) = date_range(&dates)?;

        Ok(AccountInfo {
            account_number: COUNTER_ACCOUNT.to_string(),
            start_date,
            end_date,
        })
    }

    fn validate_format(&self, data: &[u8]) -> ValidationReport {
        let range = match open_first_sheet(data) {
            Ok(range) => range,
            Err(err) => return ValidationReport::failed(err.to_string(), Vec::new()),
        };
        let columns_found = range
            .rows()
            .next()
            .map(|row| {
                row.iter()
                    .filter_map(|c| match c {
                        Data::String(s) => Some(s.trim().to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        match self.read_rows(data) {
            Ok(transactions) => ValidationReport::ok(
                format!("AMEX Excel file is valid with {} transactions", transactions.len()),
                columns_found,
                transactions.len(),
            ),
            Err(Error::EmptyInput) => ValidationReport::failed(
                "no valid transactions found in AMEX Excel file; expected a date column and an amount column",
                columns_found,
            ),
            Err(err) => ValidationReport::failed(err.to_string(), columns_found),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn row(cells: Vec<Data>) -> Vec<Data> {
        cells
    }

    #[test]
    fn test_purchase_forced_negative() {
        let (amount, tx_type) =
            apply_payment_logic(Decimal::from_str("100.50").unwrap(), "Store Purchase");
        assert_eq!(amount, Decimal::from_str("-100.50").unwrap());
        assert_eq!(tx_type, TransactionType::Transfer);
    }

    #[test]
    fn test_payment_forced_positive_credit() {
        let (amount, tx_type) = apply_payment_logic(
            Decimal::from_str("-250.00").unwrap(),
            "HARTELIJK BEDANKT VOOR UW BETALING",
        );
        assert_eq!(amount, Decimal::from_str("250.00").unwrap());
        assert_eq!(tx_type, TransactionType::Credit);
    }

    #[test]
    fn test_parse_row_positional_layout() {
        let parser = AmexParser::new();
        let cells = row(vec![
            Data::String("2025-05-05".into()),
            Data::String("J JANSEN".into()),
            Data::Float(100.50),
            Data::String("Store Purchase".into()),
        ]);
        let transaction = parser.parse_row(&cells, 1, 0).unwrap();

        assert_eq!(transaction.date, NaiveDate::from_ymd_opt(2025, 5, 5).unwrap());
        assert_eq!(transaction.amount, Decimal::from_str("-100.50").unwrap());
        assert_eq!(transaction.description, "Store Purchase");
        assert_eq!(transaction.reference.as_deref(), Some("49000000001"));
        assert_eq!(transaction.counter_account.as_deref(), Some(COUNTER_ACCOUNT));
    }

    #[test]
    fn test_parse_row_without_date_is_rejected() {
        let parser = AmexParser::new();
        let cells = row(vec![
            Data::String("totaal".into()),
            Data::String("".into()),
            Data::Float(1.0),
        ]);
        assert!(parser.parse_row(&cells, 0, 0).is_none());
    }

    #[test]
    fn test_reference_seed_override() {
        let parser = AmexParser::with_reference_seed(51_000_000_000);
        let cells = row(vec![
            Data::String("2025-05-05".into()),
            Data::Float(10.0),
            Data::Float(10.0),
            Data::String("Store".into()),
        ]);
        let transaction = parser.parse_row(&cells, 0, 4).unwrap();
        assert_eq!(transaction.reference.as_deref(), Some("51000000005"));
    }

    #[test]
    fn test_header_row_detection() {
        let header = vec![
            Data::String("Datum".into()),
            Data::String("Kaarthouder".into()),
            Data::String("Bedrag".into()),
        ];
        let meta = vec![Data::String("American Express overzicht".into())];
        let rows: Vec<&[Data]> = vec![&meta, &header];
        assert_eq!(find_header_row(&rows), Some(1));
    }

    #[test]
    fn test_looks_like_date_or_amount() {
        assert!(looks_like_date_or_amount("12,50"));
        assert!(looks_like_date_or_amount("05-05-2025"));
        assert!(!looks_like_date_or_amount("Store Purchase"));
    }
}
