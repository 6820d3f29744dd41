//! Data-driven business-rule engine for credit-card exports.
//!
//! The CSV dialects that carry exchange-rate/settlement semantics share
//! one forward-cursor state machine; dialects differ only in their
//! keyword tables, which are injected as a [`RuleSet`]. This replaces the
//! per-bank copies of the merge/settlement/classification logic in the
//! original exports tooling.

use crate::types::{Transaction, TransactionType};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Fixed description for a previous-statement settlement entry.
pub const SETTLEMENT_DESCRIPTION: &str = "Settlement previous statement";

/// Suffix appended when a surcharge row is merged into its neighbour.
pub const SURCHARGE_SUFFIX: &str = " (incl. exchange rate surcharge)";

/// One raw export row, as seen by the rule engine.
///
/// Each dialect parser maps its own column layout onto this view;
/// dialect-specific extras (original currency, exchange rate, card
/// number) stay local to the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub counter_account: Option<String>,
    pub reference: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
}

/// Per-dialect keyword configuration for the rule pass.
///
/// All matching is case-insensitive substring matching over the
/// description.
#[derive(Debug, Clone, Copy)]
pub struct RuleSet {
    /// Rows matching these are exchange-rate surcharges: merged into the
    /// preceding related row, or silently dropped when unrelated.
    pub exchange_rate_keywords: &'static [&'static str],
    /// Rows matching these are previous-statement settlements.
    pub settlement_keywords: &'static [&'static str],
    /// Rows matching these are dropped before the rule pass.
    pub ignored_keywords: &'static [&'static str],
    /// Classification: card/POS/contactless payments.
    pub card_keywords: &'static [&'static str],
    /// Classification: direct debits and subscriptions.
    pub direct_debit_keywords: &'static [&'static str],
}

impl RuleSet {
    pub fn is_surcharge(&self, record: &RawRecord) -> bool {
        matches_any(&record.description, self.exchange_rate_keywords)
    }

    pub fn is_settlement(&self, record: &RawRecord) -> bool {
        matches_any(&record.description, self.settlement_keywords)
    }

    pub fn is_ignored(&self, description: &str) -> bool {
        matches_any(description, self.ignored_keywords)
    }

    /// Keyword/sign classifier over the pre-merge row.
    pub fn classify(&self, record: &RawRecord) -> TransactionType {
        let description = record.description.to_lowercase();
        if self.card_keywords.iter().any(|k| description.contains(k)) {
            TransactionType::Card
        } else if self
            .direct_debit_keywords
            .iter()
            .any(|k| description.contains(k))
        {
            TransactionType::DirectDebit
        } else if record.amount > Decimal::ZERO {
            TransactionType::Credit
        } else {
            TransactionType::Transfer
        }
    }
}

fn matches_any(description: &str, keywords: &[&str]) -> bool {
    let lower = description.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

/// Two rows are related when they fall on the same calendar date and the
/// second row's numeric reference is exactly the first's plus one.
fn are_related(current: &RawRecord, next: &RawRecord) -> bool {
    if current.date != next.date {
        return false;
    }
    match (
        current.reference.trim().parse::<i64>(),
        next.reference.trim().parse::<i64>(),
    ) {
        (Ok(a), Ok(b)) => b == a + 1,
        _ => false,
    }
}

/// Apply the business-rule pass to an ordered raw-row sequence.
///
/// Single forward cursor, no backtracking:
/// - surcharge rows not absorbed by the previous iteration are dropped;
/// - settlement rows become a standalone credit with the amount forced
///   positive and a fixed description, never merged;
/// - a row followed by a related surcharge row absorbs its amount and
///   gains the surcharge suffix; the surcharge row is consumed;
/// - everything else maps one to one, classified by keywords and sign.
pub fn apply(rules: &RuleSet, raw: &[RawRecord]) -> Vec<Transaction> {
    let mut transactions = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        let current = &raw[i];

        if rules.is_surcharge(current) {
            // Not absorbed by the previous iteration: a surcharge with no
            // preceding related transaction in this file is lost.
            tracing::debug!(reference = %current.reference, "dropping unabsorbed surcharge row");
            i += 1;
            continue;
        }

        if rules.is_settlement(current) {
            transactions.push(Transaction::new(
                current.date,
                current.amount.abs(),
                SETTLEMENT_DESCRIPTION,
                current.counter_account.clone(),
                Some(current.reference.clone()),
                TransactionType::Credit,
            ));
            i += 1;
            continue;
        }

        let mut amount = current.amount;
        let mut description = current.description.clone();

        if let Some(next) = raw.get(i + 1) {
            if rules.is_surcharge(next) && are_related(current, next) {
                // Both amounts are expected negative; the sum is the total.
                amount += next.amount;
                description.push_str(SURCHARGE_SUFFIX);
                i += 1;
            }
        }

        transactions.push(Transaction::new(
            current.date,
            amount,
            description,
            current.counter_account.clone(),
            Some(current.reference.clone()),
            rules.classify(current),
        ));
        i += 1;
    }

    transactions
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    const RULES: RuleSet = RuleSet {
        exchange_rate_keywords: &["koersopslag"],
        settlement_keywords: &["verrekening vorig overzicht"],
        ignored_keywords: &["monthly payment memo"],
        card_keywords: &["betaalautomaat", "apple pay", "card", "pos"],
        direct_debit_keywords: &["incasso", "automatische", "subscription", "recurring"],
    };

    fn record(reference: &str, day: u32, amount: &str, description: &str) -> RawRecord {
        RawRecord {
            counter_account: Some("NL54RABO0310737710".into()),
            reference: reference.into(),
            date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            amount: Decimal::from_str(amount).unwrap(),
            description: description.into(),
        }
    }

    #[test]
    fn test_surcharge_merged_into_previous_row() {
        let raw = vec![
            record("8", 1, "-19.30", "GTRANSLATE.COM"),
            record("9", 1, "-0.39", "Koersopslag"),
        ];
        let transactions = apply(&RULES, &raw);

        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].amount, Decimal::from_str("-19.69").unwrap());
        assert_eq!(
            transactions[0].description,
            "GTRANSLATE.COM (incl. exchange rate surcharge)"
        );
        assert_eq!(transactions[0].reference.as_deref(), Some("8"));
    }

    #[test]
    fn test_surcharge_not_merged_across_dates() {
        let raw = vec![
            record("8", 1, "-19.30", "GTRANSLATE.COM"),
            record("9", 2, "-0.39", "Koersopslag"),
        ];
        let transactions = apply(&RULES, &raw);

        // Unrelated surcharge is dropped, not emitted standalone.
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].amount, Decimal::from_str("-19.30").unwrap());
        assert_eq!(transactions[0].description, "GTRANSLATE.COM");
    }

    #[test]
    fn test_surcharge_not_merged_for_nonconsecutive_references() {
        let raw = vec![
            record("8", 1, "-19.30", "GTRANSLATE.COM"),
            record("12", 1, "-0.39", "Koersopslag"),
        ];
        let transactions = apply(&RULES, &raw);
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].description, "GTRANSLATE.COM");
    }

    #[test]
    fn test_leading_surcharge_is_dropped() {
        let raw = vec![
            record("7", 1, "-0.39", "Koersopslag"),
            record("8", 1, "-19.30", "GTRANSLATE.COM"),
        ];
        let transactions = apply(&RULES, &raw);
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].description, "GTRANSLATE.COM");
    }

    #[test]
    fn test_settlement_forced_to_positive_credit() {
        let raw = vec![record("5", 26, "-150.00", "Verrekening vorig overzicht")];
        let transactions = apply(&RULES, &raw);

        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].amount, Decimal::from_str("150.00").unwrap());
        assert_eq!(transactions[0].description, SETTLEMENT_DESCRIPTION);
        assert_eq!(transactions[0].transaction_type, TransactionType::Credit);
    }

    #[test]
    fn test_settlement_never_merged_with_following_surcharge() {
        let raw = vec![
            record("5", 26, "912.40", "Verrekening vorig overzicht"),
            record("6", 26, "-0.39", "Koersopslag"),
        ];
        let transactions = apply(&RULES, &raw);

        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].amount, Decimal::from_str("912.40").unwrap());
        assert_eq!(transactions[0].description, SETTLEMENT_DESCRIPTION);
    }

    #[test]
    fn test_classification() {
        let raw = vec![
            record("1", 1, "-12.00", "Betaalautomaat Albert Heijn"),
            record("2", 1, "-9.99", "Spotify subscription"),
            record("3", 1, "50.00", "Refund webshop"),
            record("4", 1, "-108.00", "COOKIEBOT KOEBENHAVN K DNK"),
        ];
        let transactions = apply(&RULES, &raw);

        assert_eq!(transactions[0].transaction_type, TransactionType::Card);
        assert_eq!(transactions[1].transaction_type, TransactionType::DirectDebit);
        assert_eq!(transactions[2].transaction_type, TransactionType::Credit);
        assert_eq!(transactions[3].transaction_type, TransactionType::Transfer);
    }

    #[test]
    fn test_full_sequence_matches_expected_totals() {
        let raw = vec![
            record("8", 1, "-19.30", "GTRANSLATE.COM"),
            record("9", 1, "-0.39", "Koersopslag"),
            record("10", 26, "-912.40", "Verrekening vorig overzicht"),
            record("11", 27, "-108.00", "COOKIEBOT KOEBENHAVN K DNK"),
        ];
        let transactions = apply(&RULES, &raw);

        assert_eq!(transactions.len(), 3);
        let total: Decimal = transactions.iter().map(|t| t.amount).sum();
        assert_eq!(total, Decimal::from_str("784.71").unwrap());
    }
}
