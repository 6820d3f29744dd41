//! Common types shared between the parsers and the statement formatters.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Classification of a normalized transaction.
///
/// Parsers assign this from per-dialect keyword tables and sign rules;
/// formatters map it onto SWIFT type codes and ISO 20022 bank transaction
/// code families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransactionType {
    /// Card/POS/contactless payment.
    Card,
    /// Generic transfer (the default).
    #[default]
    Transfer,
    /// Direct debit / recurring collection.
    DirectDebit,
    /// Incoming credit (payments, settlements).
    Credit,
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CARD" => Ok(TransactionType::Card),
            "TRANSFER" => Ok(TransactionType::Transfer),
            "DIRECT_DEBIT" => Ok(TransactionType::DirectDebit),
            "CREDIT" => Ok(TransactionType::Credit),
            _ => Err(format!("Invalid transaction type: {}", s)),
        }
    }
}

/// Represents one normalized transaction.
///
/// Produced by a parser's business-rule stage and immutable afterwards.
/// The sign of `amount` is meaningful: negative = debit/outflow,
/// positive = credit/inflow. The amount carries at most two fractional
/// digits after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Calendar date of the transaction (no time-of-day semantics).
    pub date: NaiveDate,

    /// Signed transaction amount.
    pub amount: Decimal,

    /// Free-text description; must be safely truncatable by formatters.
    pub description: String,

    /// Counter account: IBAN-like string or a bank-specific placeholder.
    pub counter_account: Option<String>,

    /// Opaque reference used for adjacency checks and display.
    pub reference: Option<String>,

    /// Transaction classification.
    pub transaction_type: TransactionType,
}

impl Transaction {
    /// Create a transaction, normalizing the amount to two fractional digits.
    pub fn new(
        date: NaiveDate,
        amount: Decimal,
        description: impl Into<String>,
        counter_account: Option<String>,
        reference: Option<String>,
        transaction_type: TransactionType,
    ) -> Self {
        Self {
            date,
            amount: amount.round_dp(2),
            description: description.into(),
            counter_account,
            reference,
            transaction_type,
        }
    }
}

/// Account statement assembled by the processor and consumed by formatters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountStatement {
    /// Account identification (IBAN or placeholder).
    pub account_number: String,

    /// Statement number; caller-supplied or derived from the start date.
    pub statement_number: String,

    /// Opening balance of the statement period.
    pub opening_balance: Decimal,

    /// Closing balance; always opening + sum of transaction amounts.
    pub closing_balance: Decimal,

    /// Transactions in input file order after business-rule merges/drops.
    pub transactions: Vec<Transaction>,

    /// Currency code for the account.
    pub currency: String,

    /// Reference date for header timestamps; defaults to the end of range.
    pub reference_date: Option<NaiveDate>,
}

impl AccountStatement {
    /// Sum of all transaction amounts, exact decimal arithmetic.
    pub fn transaction_total(&self) -> Decimal {
        self.transactions.iter().map(|t| t.amount).sum()
    }

    /// Closing balance recomputed from the opening balance and the
    /// transaction sequence. Formatters use this value rather than
    /// trusting a separately supplied one.
    pub fn computed_closing_balance(&self) -> Decimal {
        self.opening_balance + self.transaction_total()
    }
}

/// Account metadata derived from a parsed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Account number (IBAN or bank-specific placeholder).
    pub account_number: String,

    /// Earliest transaction date found in the file.
    pub start_date: NaiveDate,

    /// Latest transaction date found in the file.
    pub end_date: NaiveDate,
}

/// Totals and metadata for a parsed file, for preview/summary consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub account_number: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub transaction_count: usize,
    /// Sum of all positive amounts.
    pub total_credits: Decimal,
    /// Sum of all negative amounts.
    pub total_debits: Decimal,
    /// total_credits + total_debits.
    pub net_total: Decimal,
    pub transactions: Vec<Transaction>,
}

impl TransactionSummary {
    /// Build a summary from account info and a transaction sequence.
    pub fn from_transactions(info: AccountInfo, transactions: Vec<Transaction>) -> Self {
        let total_credits: Decimal = transactions
            .iter()
            .filter(|t| t.amount > Decimal::ZERO)
            .map(|t| t.amount)
            .sum();
        let total_debits: Decimal = transactions
            .iter()
            .filter(|t| t.amount < Decimal::ZERO)
            .map(|t| t.amount)
            .sum();

        Self {
            account_number: info.account_number,
            start_date: info.start_date,
            end_date: info.end_date,
            transaction_count: transactions.len(),
            total_credits,
            total_debits,
            net_total: total_credits + total_debits,
            transactions,
        }
    }
}

/// Outcome of a non-mutating format validation dry run.
///
/// `validate_format` never returns an error; every fatal parse category
/// is caught and reported here instead so callers can render a message
/// without a crash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    /// Human-readable success message.
    pub message: Option<String>,
    /// Error description when `valid` is false.
    pub error: Option<String>,
    /// Column headers actually found in the file.
    pub columns_found: Vec<String>,
    /// Number of data rows, when the file was readable.
    pub row_count: Option<usize>,
}

impl ValidationReport {
    pub fn ok(message: impl Into<String>, columns_found: Vec<String>, row_count: usize) -> Self {
        Self {
            valid: true,
            message: Some(message.into()),
            error: None,
            columns_found,
            row_count: Some(row_count),
        }
    }

    pub fn failed(error: impl Into<String>, columns_found: Vec<String>) -> Self {
        Self {
            valid: false,
            message: None,
            error: Some(error.into()),
            columns_found,
            row_count: None,
        }
    }
}
