//! Generic Excel template parser.
//!
//! Accepts any workbook whose first sheet follows the fixed template:
//! named columns in the first row, one transaction per data row. No
//! bank-specific business rules apply; classification is sign-only.

use crate::error::{Error, Result};
use crate::normalize::{clean_header, parse_date, parse_decimal};
use crate::parsers::{date_range, BankParser};
use crate::types::{AccountInfo, Transaction, TransactionType, ValidationReport};
use calamine::{Data, DataType, Range, Reader};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::io::Cursor;

const DATE_PATTERN: &str = "%d-%m-%Y";

/// Template exports carry no IBAN for the statement holder.
const ACCOUNT_PLACEHOLDER: &str = "NL00BANK0000000000";

/// Required columns: (primary Dutch name, English fallback).
const COLUMNS: [(&str, &str); 5] = [
    ("Datum", "Date"),
    ("Bedrag", "Amount"),
    ("Omschrijving", "Description"),
    ("Tegenrekening", "Counter Account"),
    ("Referentie", "Reference"),
];

pub struct ExcelTemplateParser;

impl ExcelTemplateParser {
    pub fn new() -> Self {
        Self
    }

    fn read_rows(&self, data: &[u8]) -> Result<Vec<Transaction>> {
        let range = open_first_sheet(data)?;
        let (indices, _) = resolve_columns(&range)?;
        let [date_idx, amount_idx, description_idx, counter_idx, reference_idx] = indices;

        let mut rows = range.rows();
        rows.next(); // header

        let mut data_rows = 0usize;
        let mut transactions = Vec::new();
        for (row_number, row) in rows.enumerate() {
            data_rows += 1;
            let description = cell_text(row, description_idx);
            if description.is_empty() {
                if !row.iter().all(|c| matches!(c, Data::Empty)) {
                    tracing::warn!(row = row_number, "skipping row: empty description");
                }
                continue;
            }

            let date = match row.get(date_idx).and_then(cell_date) {
                Some(date) => date,
                None => {
                    tracing::warn!(row = row_number, "skipping row: invalid date");
                    continue;
                }
            };

            let amount = match row.get(amount_idx).and_then(cell_amount) {
                Some(amount) => amount,
                None => {
                    tracing::warn!(row = row_number, "skipping row: invalid amount");
                    continue;
                }
            };

            let counter_account = cell_text(row, counter_idx);
            let reference = cell_text(row, reference_idx);
            let reference = if reference.is_empty() {
                format!("EXCEL_{:06}", row_number)
            } else {
                reference
            };

            let transaction_type = if amount > Decimal::ZERO {
                TransactionType::Credit
            } else {
                TransactionType::Transfer
            };

            transactions.push(Transaction::new(
                date,
                amount,
                description,
                (!counter_account.is_empty()).then_some(counter_account),
                Some(reference),
                transaction_type,
            ));
        }

        if data_rows == 0 {
            return Err(Error::EmptyInput);
        }
        Ok(transactions)
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

/// Resolve the template columns from the first row, collecting missing
/// primary names for the error.
fn resolve_columns(range: &Range<Data>) -> Result<([usize; 5], Vec<String>)> {
    let headers: Vec<String> = range
        .rows()
        .next()
        .map(|row| {
            row.iter()
                .map(|c| match c {
                    Data::String(s) => clean_header(s),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let mut indices = [0usize; 5];
    let mut missing = Vec::new();
    for (slot, (primary, fallback)) in COLUMNS.iter().enumerate() {
        let found = headers
            .iter()
            .position(|h| h == primary)
            .or_else(|| headers.iter().position(|h| h == fallback));
        match found {
            Some(idx) => indices[slot] = idx,
            None => missing.push(primary.to_string()),
        }
    }

    if missing.is_empty() {
        Ok((indices, headers))
    } else {
        Err(Error::MissingColumns {
            missing,
            found: headers,
        })
    }
}

fn cell_text(row: &[Data], idx: usize) -> String {
    match row.get(idx) {
        Some(Data::String(s)) => s.trim().to_string(),
        Some(Data::Empty) | None => String::new(),
        Some(other) => other.to_string().trim().to_string(),
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

impl Default for ExcelTemplateParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for ExcelTemplateParser {
    fn bank_name(&self) -> &'static str {
        "Excel"
    }

    fn display_name(&self) -> &'static str {
        "Excel Template"
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
            account_number: ACCOUNT_PLACEHOLDER.to_string(),
            start_date,
            end_date,
        })
    }

    fn validate_format(&self, data: &[u8]) -> ValidationReport {
        let range = match open_first_sheet(data) {
            Ok(range) => range,
            Err(err) => return ValidationReport::failed(err.to_string(), Vec::new()),
        };
        let (_, headers) = match resolve_columns(&range) {
            Ok(resolved) => resolved,
            Err(err) => {
                let headers = match &err {
                    Error::MissingColumns { found, .. } => found.clone(),
                    _ => Vec::new(),
                };
                return ValidationReport::failed(err.to_string(), headers);
            }
        };

        let data_rows = range.rows().count().saturating_sub(1);
        if data_rows == 0 {
            return ValidationReport::failed(Error::EmptyInput.to_string(), headers);
        }

        ValidationReport::ok(
            format!("Excel template is valid with {data_rows} transaction rows"),
            headers,
            data_rows,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn template_range(rows: Vec<Vec<Data>>) -> Range<Data> {
        let height = rows.len() as u32;
        let width = rows.iter().map(Vec::len).max().unwrap_or(0) as u32;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (r, row) in rows.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                range.set_value((r as u32, c as u32), cell);
            }
        }
        range
    }

    fn header() -> Vec<Data> {
        vec![
            Data::String("Datum".into()),
            Data::String("Bedrag".into()),
            Data::String("Omschrijving".into()),
            Data::String("Tegenrekening".into()),
            Data::String("Referentie".into()),
        ]
    }

    #[test]
    fn test_resolve_columns_dutch_and_english() {
        let range = template_range(vec![header()]);
        let (indices, headers) = resolve_columns(&range).unwrap();
        assert_eq!(indices, [0, 1, 2, 3, 4]);
        assert_eq!(headers[0], "Datum");

        let english = template_range(vec![vec![
            Data::String("Date".into()),
            Data::String("Amount".into()),
            Data::String("Description".into()),
            Data::String("Counter Account".into()),
            Data::String("Reference".into()),
        ]]);
        assert!(resolve_columns(&english).is_ok());
    }

    #[test]
    fn test_resolve_columns_missing() {
        let range = template_range(vec![vec![
            Data::String("Datum".into()),
            Data::String("Bedrag".into()),
        ]]);
        let err = resolve_columns(&range).unwrap_err();
        match err {
            Error::MissingColumns { missing, .. } => {
                assert_eq!(
                    missing,
                    vec![
                        "Omschrijving".to_string(),
                        "Tegenrekening".to_string(),
                        "Referentie".to_string()
                    ]
                );
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn test_cell_conversions() {
        assert_eq!(
            cell_date(&Data::String("15-03-2025".into())),
            NaiveDate::from_ymd_opt(2025, 3, 15)
        );
        assert_eq!(
            cell_amount(&Data::String("-1.234,56".into())),
            Some(Decimal::from_str("-1234.56").unwrap())
        );
        assert_eq!(
            cell_amount(&Data::Float(12.5)),
            Some(Decimal::from_str("12.50").unwrap())
        );
        assert_eq!(cell_amount(&Data::Empty), None);
    }

    #[test]
    fn test_sign_only_classification() {
        // Mirrors the parse-time rule: positive is a credit, everything
        // else a transfer.
        let credit = Decimal::from_str("10.00").unwrap();
        let debit = Decimal::from_str("-10.00").unwrap();
        assert!(credit > Decimal::ZERO);
        assert!(debit <= Decimal::ZERO);
    }
}
