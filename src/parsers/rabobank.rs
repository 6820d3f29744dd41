//! Rabobank credit-card CSV parsers (legacy and new export formats).
//!
//! Both formats carry the full surcharge/settlement semantics and share
//! the rule engine; they differ in delimiter, date pattern and header
//! language (the legacy export uses Dutch names, the new one English).

use crate::error::{Error, Result};
use crate::normalize::{parse_date, parse_decimal};
use crate::parsers::{date_range, validate_csv, BankParser, CsvTable};
use crate::rules::{self, RawRecord, RuleSet};
use crate::types::{AccountInfo, Transaction, ValidationReport};

const LEGACY_RULES: RuleSet = RuleSet {
    exchange_rate_keywords: &["koersopslag"],
    settlement_keywords: &["verrekening vorig overzicht"],
    ignored_keywords: &["monthly payment memo"],
    card_keywords: &["betaalautomaat", "apple pay", "card", "pos"],
    direct_debit_keywords: &["incasso", "automatische", "subscription", "recurring"],
};

const NEW_RULES: RuleSet = RuleSet {
    exchange_rate_keywords: &["koersopslag"],
    settlement_keywords: &["verrekening vorig overzicht"],
    ignored_keywords: &["monthly payment memo"],
    card_keywords: &["apple pay", "card", "pos"],
    direct_debit_keywords: &["incasso", "automatische", "subscription", "recurring"],
};

/// Column layout: counter account, reference, date, amount, description.
/// Each entry is (primary name, fallback name).
type ColumnSpecs = [(&'static str, &'static str); 5];

const LEGACY_COLUMNS: ColumnSpecs = [
    ("Tegenrekening IBAN", "Counterparty IBAN"),
    ("Transactiereferentie", "Transaction Reference"),
    ("Datum", "Date"),
    ("Bedrag", "Amount"),
    ("Omschrijving", "Description"),
];

const NEW_COLUMNS: ColumnSpecs = [
    ("Counterpty IBAN", "Tegenrekening IBAN"),
    ("Transaction Reference", "Transactiereferentie"),
    ("Date", "Datum"),
    ("Amount", "Bedrag"),
    ("Description", "Omschrijving"),
];

/// Static configuration distinguishing the two Rabobank generations.
struct Dialect {
    bank_name: &'static str,
    display_name: &'static str,
    delimiter: u8,
    date_pattern: &'static str,
    columns: ColumnSpecs,
    rules: RuleSet,
}

impl Dialect {
    fn read_raw(&self, table: &CsvTable) -> Result<Vec<RawRecord>> {
        let indices = table.require_columns(&self.columns)?;
        let [counter_idx, reference_idx, date_idx, amount_idx, description_idx] =
            [indices[0], indices[1], indices[2], indices[3], indices[4]];

        if table.rows.is_empty() {
            return Err(Error::EmptyInput);
        }

        let mut raw = Vec::with_capacity(table.rows.len());
        for (row_number, row) in table.rows.iter().enumerate() {
            let description = table.cell(row, description_idx);
            let amount_raw = table.cell(row, amount_idx);
            if description.is_empty() || amount_raw.is_empty() {
                continue;
            }
            if self.rules.is_ignored(description) {
                continue;
            }

            let date_raw = table.cell(row, date_idx);
            let date = match parse_date(date_raw, self.date_pattern) {
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

            let counter_account = table.cell(row, counter_idx);
            raw.push(RawRecord {
                counter_account: (!counter_account.is_empty())
                    .then(|| counter_account.to_string()),
                reference: table.cell(row, reference_idx).to_string(),
                date,
                amount,
                description: description.to_string(),
            });
        }

        Ok(raw)
    }

    fn parse(&self, data: &[u8]) -> Result<Vec<Transaction>> {
        let table = CsvTable::from_bytes(data, self.delimiter)?;
        let raw = self.read_raw(&table)?;
        Ok(rules::apply(&self.rules, &raw))
    }

    fn account_info(&self, data: &[u8]) -> Result<AccountInfo> {
        let table = CsvTable::from_bytes(data, self.delimiter)?;
        let raw = self.read_raw(&table)?;

        let account_number = raw
            .iter()
            .find_map(|r| r.counter_account.clone())
            .ok_or(Error::EmptyInput)?;
        let dates: Vec<_> = raw.iter().map(|r| r.date).collect();
        let (start_date, end_date) = date_range(&dates)?;

        Ok(AccountInfo {
            account_number,
            start_date,
            end_date,
        })
    }
}

/// Parser for the legacy `;`-delimited Rabobank credit-card export.
pub struct RabobankLegacyParser {
    dialect: Dialect,
}

impl RabobankLegacyParser {
    pub fn new() -> Self {
        Self {
            dialect: Dialect {
                bank_name: "Rabobank",
                display_name: "Rabobank (Old Format)",
                delimiter: b';',
                date_pattern: "%d-%m-%Y",
                columns: LEGACY_COLUMNS,
                rules: LEGACY_RULES,
            },
        }
    }
}

impl Default for RabobankLegacyParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for RabobankLegacyParser {
    fn bank_name(&self) -> &'static str {
        self.dialect.bank_name
    }

    fn display_name(&self) -> &'static str {
        self.dialect.display_name
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &["csv"]
    }

    fn parse(&self, data: &[u8]) -> Result<Vec<Transaction>> {
        self.dialect.parse(data)
    }

    fn account_info(&self, data: &[u8]) -> Result<AccountInfo> {
        self.dialect.account_info(data)
    }

    fn validate_format(&self, data: &[u8]) -> ValidationReport {
        validate_csv(data, self.dialect.delimiter, &self.dialect.columns, "Rabobank CSV")
    }
}

/// Parser for the new `,`-delimited Rabobank credit-card export.
pub struct RabobankNewParser {
    dialect: Dialect,
}

impl RabobankNewParser {
    pub fn new() -> Self {
        Self {
            dialect: Dialect {
                bank_name: "Rabobank",
                display_name: "Rabobank (New Format)",
                delimiter: b',',
                date_pattern: "%Y-%m-%d",
                columns: NEW_COLUMNS,
                rules: NEW_RULES,
            },
        }
    }
}

impl Default for RabobankNewParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for RabobankNewParser {
    fn bank_name(&self) -> &'static str {
        self.dialect.bank_name
    }

    fn display_name(&self) -> &'static str {
        self.dialect.display_name
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &["csv"]
    }

    fn parse(&self, data: &[u8]) -> Result<Vec<Transaction>> {
        self.dialect.parse(data)
    }

    fn account_info(&self, data: &[u8]) -> Result<AccountInfo> {
        self.dialect.account_info(data)
    }

    fn validate_format(&self, data: &[u8]) -> ValidationReport {
        validate_csv(
            data,
            self.dialect.delimiter,
            &self.dialect.columns,
            "New format Rabobank CSV",
        )
    }
}
