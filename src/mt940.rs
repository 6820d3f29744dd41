//! MT940 statement formatter.
//!
//! Emits the padded SWIFT encoding: amounts carry a comma decimal
//! separator and a nine-digit integer part, balances appear as opening,
//! closing, available and forward-available lines, and every transaction
//! line carries a `NONREF//` reference from a statement-scoped counter.
//! The counter restarts at 1 on every [`format`] call, so formatting the
//! same statement twice yields byte-identical output.

use crate::types::{AccountStatement, Transaction, TransactionType};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Character limit for the `/NAME/` description sub-field.
const DESCRIPTION_LIMIT: usize = 25;

/// Serialize a statement into MT940 text.
///
/// Closing, available and forward-available balances are recomputed from
/// the opening balance and the transaction sequence; a stale
/// `closing_balance` on the statement is ignored.
pub fn format(statement: &AccountStatement) -> String {
    let closing = statement.computed_closing_balance();
    let balance_date = statement
        .reference_date
        .or_else(|| statement.transactions.iter().map(|t| t.date).max())
        .unwrap_or_default();

    let mut lines = Vec::with_capacity(statement.transactions.len() * 3 + 8);
    lines.push(":940:".to_string());
    lines.push(format!(
        ":20:940S{}",
        digits_of(&statement.statement_number)
    ));
    lines.push(format!(
        ":25:{} {}",
        statement.account_number, statement.currency
    ));
    lines.push(format!(":28C:{}", sequence_number(&statement.statement_number)));
    lines.push(balance_line(
        "60F",
        statement.opening_balance,
        &statement.currency,
        balance_date,
    ));

    let mut reference_counter: u64 = 1;
    for transaction in &statement.transactions {
        lines.push(transaction_line(transaction, reference_counter));
        reference_counter += 1;
        if let Some(counter_account) = &transaction.counter_account {
            lines.push(counter_account.clone());
        }
        lines.push(information_line(transaction));
    }

    lines.push(balance_line("62F", closing, &statement.currency, balance_date));
    lines.push(balance_line("64", closing, &statement.currency, balance_date));
    lines.push(balance_line("65", closing, &statement.currency, balance_date));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// SWIFT type code for field 61 and the matching `/TRCD/` code.
fn type_codes(transaction_type: TransactionType) -> (&'static str, &'static str) {
    match transaction_type {
        TransactionType::Card => ("N501", "501"),
        TransactionType::Transfer => ("N544", "544"),
        TransactionType::DirectDebit => ("N064", "064"),
        TransactionType::Credit => ("N943", "943"),
    }
}

/// Absolute amount with a comma decimal separator and the integer part
/// zero-padded to nine digits: `19.69` becomes `000000019,69`.
fn padded_amount(amount: Decimal) -> String {
    let abs = amount.abs().round_dp(2);
    let cents = (abs * Decimal::from(100)).round_dp(0);
    let total: i64 = cents.try_into().unwrap_or(0);
    format!("{:09},{:02}", total / 100, total % 100)
}

fn credit_debit_flag(amount: Decimal) -> char {
    if amount >= Decimal::ZERO {
        'C'
    } else {
        'D'
    }
}

fn balance_line(field: &str, amount: Decimal, currency: &str, date: NaiveDate) -> String {
    format!(
        ":{}:{}{}{}{}",
        field,
        credit_debit_flag(amount),
        date.format("%y%m%d"),
        currency,
        padded_amount(amount)
    )
}

fn transaction_line(transaction: &Transaction, reference_counter: u64) -> String {
    let (swift_code, _) = type_codes(transaction.transaction_type);
    format!(
        ":61:{}{}{}{}NONREF//{:010}",
        transaction.date.format("%y%m%d"),
        credit_debit_flag(transaction.amount),
        padded_amount(transaction.amount),
        swift_code,
        reference_counter
    )
}

/// Field 86: `/TRCD/` code, the counter-account `/BENM//` tag when one is
/// present, and the truncated upper-cased description under `/NAME/`.
fn information_line(transaction: &Transaction) -> String {
    let (_, trcd_code) = type_codes(transaction.transaction_type);
    let description: String = transaction
        .description
        .chars()
        .take(DESCRIPTION_LIMIT)
        .collect::<String>()
        .to_uppercase();

    match &transaction.counter_account {
        Some(iban) => format!(":86:/TRCD/{trcd_code}/BENM//{iban}/NAME/{description}"),
        None => format!(":86:/TRCD/{trcd_code}/NAME/{description}"),
    }
}

/// Digits of the statement number, e.g. `CC20250301` → `20250301`.
fn digits_of(statement_number: &str) -> String {
    statement_number
        .chars()
        .filter(char::is_ascii_digit)
        .collect()
}

/// Field 28C sequence number: the last five digits of the statement
/// number, e.g. `CC20250301` → `50301`.
fn sequence_number(statement_number: &str) -> String {
    let digits = digits_of(statement_number);
    let start = digits.len().saturating_sub(5);
    digits[start..].to_string()
}
