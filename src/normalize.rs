//! Shared decimal and date normalization for bank exports.
//!
//! Amounts arrive with comma decimals, dot thousands separators, currency
//! symbols, or mixed European format (`1.234,56`). Dates arrive in a small
//! fixed set of textual patterns per dialect.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Date patterns tried after a dialect's canonical pattern.
pub const DATE_PATTERNS: [&str; 3] = ["%d-%m-%Y", "%Y-%m-%d", "%d/%m/%Y"];

/// Parse an amount in any of the observed export notations.
///
/// Rules: strip currency symbols and whitespace; when both `,` and `.`
/// are present, `.` is a thousands separator and `,` the decimal point;
/// when only `,` is present it is the decimal point. The result is
/// normalized to two fractional digits.
pub fn parse_decimal(raw: &str) -> Result<Decimal> {
    let mut cleaned = raw.trim().to_string();
    for symbol in ["€", "$", "EUR"] {
        cleaned = cleaned.replace(symbol, "");
    }
    cleaned.retain(|c| !c.is_whitespace() && c != '\u{a0}');

    let normalized = if cleaned.contains(',') && cleaned.contains('.') {
        cleaned.replace('.', "").replace(',', ".")
    } else if cleaned.contains(',') {
        cleaned.replace(',', ".")
    } else {
        cleaned
    };

    Decimal::from_str(&normalized)
        .map(|d| d.round_dp(2))
        .map_err(|_| Error::InvalidAmount(raw.to_string()))
}

/// Parse a date, trying the dialect's canonical pattern first and then
/// falling back through the remaining known patterns.
pub fn parse_date(raw: &str, canonical: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, canonical) {
        return Ok(date);
    }
    for pattern in DATE_PATTERNS {
        if pattern == canonical {
            continue;
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, pattern) {
            return Ok(date);
        }
    }
    Err(Error::InvalidDate(raw.to_string()))
}

/// Clean a header cell: strip BOM and normalize non-breaking spaces.
pub fn clean_header(raw: &str) -> String {
    raw.replace('\u{feff}', "")
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_comma_decimal() {
        assert_eq!(parse_decimal("-19,30").unwrap().to_string(), "-19.30");
    }

    #[test]
    fn test_mixed_european_format() {
        assert_eq!(parse_decimal("1.234,56").unwrap().to_string(), "1234.56");
    }

    #[test]
    fn test_dot_decimal() {
        assert_eq!(parse_decimal("912.40").unwrap().to_string(), "912.40");
    }

    #[test]
    fn test_currency_symbols_stripped() {
        assert_eq!(parse_decimal("€ 1 540,00").unwrap().to_string(), "1540.00");
        assert_eq!(parse_decimal("-121.00 EUR").unwrap().to_string(), "-121.00");
    }

    #[test]
    fn test_invalid_amount() {
        assert!(parse_decimal("n/a").is_err());
    }

    #[test]
    fn test_canonical_date_first() {
        let date = parse_date("01-03-2025", "%d-%m-%Y").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    }

    #[test]
    fn test_date_fallback_patterns() {
        // An ISO date fed to a DD-MM-YYYY dialect still parses.
        let date = parse_date("2025-03-26", "%d-%m-%Y").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 26).unwrap());

        let date = parse_date("26/03/2025", "%Y-%m-%d").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 26).unwrap());
    }

    #[test]
    fn test_invalid_date() {
        assert!(parse_date("March 1st", "%d-%m-%Y").is_err());
    }

    #[test]
    fn test_clean_header() {
        assert_eq!(clean_header("\u{feff}Transactiedatum "), "Transactiedatum");
        assert_eq!(clean_header("Oorspr\u{a0}bedrag"), "Oorspr bedrag");
    }
}
