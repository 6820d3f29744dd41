//! CAMT.053 (ISO 20022) statement formatter.
//!
//! CAMT.053 is the XML-based bank-to-customer account statement format
//! defined by the ISO 20022 standard. The output carries a single
//! `BkToCstmrStmt` with one statement, one closing balance and one entry
//! per transaction. All header timestamps derive from the statement's
//! reference date, so repeated formatting is byte-identical.

use crate::error::Result;
use crate::types::{AccountStatement, Transaction, TransactionType};
use chrono::NaiveDate;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use rust_decimal::Decimal;

const NAMESPACE: &str = "urn:iso:std:iso:20022:tech:xsd:camt.053.001.02";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

const BANK_NAME: &str = "Rabobank Nederland";
const BANK_BIC: &str = "RABONL2U";

/// Remittance information (`Ustrd`) character limit.
const USTRD_LIMIT: usize = 140;

/// Serialize a statement into pretty-indented CAMT.053 XML.
///
/// The closing balance is recomputed from the opening balance and the
/// transaction sequence, matching the MT940 formatter's contract.
pub fn format(statement: &AccountStatement) -> Result<String> {
    let closing = statement.computed_closing_balance();
    let reference_date = statement
        .reference_date
        .or_else(|| statement.transactions.iter().map(|t| t.date).max())
        .unwrap_or_default();
    let creation_stamp = format!("{}T00:00:00", reference_date.format("%Y-%m-%d"));

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut document = BytesStart::new("Document");
    document.push_attribute(("xmlns", NAMESPACE));
    document.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
    writer.write_event(Event::Start(document))?;
    open(&mut writer, "BkToCstmrStmt")?;

    write_group_header(&mut writer, statement, &creation_stamp)?;

    open(&mut writer, "Stmt")?;
    leaf(&mut writer, "Id", &statement.statement_number)?;
    leaf(&mut writer, "CreDtTm", &creation_stamp)?;
    write_account(&mut writer, statement)?;
    write_closing_balance(&mut writer, statement, closing, reference_date)?;
    for (sequence, transaction) in statement.transactions.iter().enumerate() {
        write_entry(&mut writer, statement, transaction, sequence + 1)?;
    }
    close(&mut writer, "Stmt")?;

    close(&mut writer, "BkToCstmrStmt")?;
    close(&mut writer, "Document")?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(String::from_utf8(bytes).map_err(|e| crate::error::Error::Xml(e.to_string()))?)
}

fn write_group_header<W: std::io::Write>(
    writer: &mut Writer<W>,
    statement: &AccountStatement,
    creation_stamp: &str,
) -> Result<()> {
    open(writer, "GrpHdr")?;
    leaf(
        writer,
        "MsgId",
        &format!("{}-C53", statement.statement_number),
    )?;
    leaf(writer, "CreDtTm", creation_stamp)?;

    open(writer, "MsgRcpt")?;
    leaf(writer, "Nm", "Customer")?;
    close(writer, "MsgRcpt")?;

    open(writer, "InitgPty")?;
    leaf(writer, "Nm", BANK_NAME)?;
    open(writer, "Id")?;
    open(writer, "OrgId")?;
    leaf(writer, "BIC", BANK_BIC)?;
    close(writer, "OrgId")?;
    close(writer, "Id")?;
    close(writer, "InitgPty")?;

    close(writer, "GrpHdr")?;
    Ok(())
}

fn write_account<W: std::io::Write>(
    writer: &mut Writer<W>,
    statement: &AccountStatement,
) -> Result<()> {
    open(writer, "Acct")?;
    open(writer, "Id")?;
    leaf(writer, "IBAN", &statement.account_number)?;
    close(writer, "Id")?;
    leaf(writer, "Ccy", &statement.currency)?;
    open(writer, "Svcr")?;
    open(writer, "FinInstnId")?;
    leaf(writer, "BIC", BANK_BIC)?;
    leaf(writer, "Nm", BANK_NAME)?;
    close(writer, "FinInstnId")?;
    close(writer, "Svcr")?;
    close(writer, "Acct")?;
    Ok(())
}

fn write_closing_balance<W: std::io::Write>(
    writer: &mut Writer<W>,
    statement: &AccountStatement,
    closing: Decimal,
    reference_date: NaiveDate,
) -> Result<()> {
    open(writer, "Bal")?;
    open(writer, "Tp")?;
    open(writer, "CdOrPrtry")?;
    leaf(writer, "Cd", "CLBD")?;
    close(writer, "CdOrPrtry")?;
    close(writer, "Tp")?;
    amount_leaf(writer, &statement.currency, closing)?;
    leaf(writer, "CdtDbtInd", credit_debit_indicator(closing))?;
    open(writer, "Dt")?;
    leaf(writer, "Dt", &reference_date.format("%Y-%m-%d").to_string())?;
    close(writer, "Dt")?;
    close(writer, "Bal")?;
    Ok(())
}

fn write_entry<W: std::io::Write>(
    writer: &mut Writer<W>,
    statement: &AccountStatement,
    transaction: &Transaction,
    sequence: usize,
) -> Result<()> {
    let date = transaction.date.format("%Y-%m-%d").to_string();
    let reference = transaction
        .reference
        .clone()
        .unwrap_or_else(|| format!("RABO{sequence:010}"));

    open(writer, "Ntry")?;
    amount_leaf(writer, &statement.currency, transaction.amount)?;
    leaf(
        writer,
        "CdtDbtInd",
        credit_debit_indicator(transaction.amount),
    )?;
    leaf(writer, "Sts", "BOOK")?;
    open(writer, "BookgDt")?;
    leaf(writer, "Dt", &date)?;
    close(writer, "BookgDt")?;
    open(writer, "ValDt")?;
    leaf(writer, "Dt", &date)?;
    close(writer, "ValDt")?;
    leaf(writer, "AcctSvcrRef", &reference)?;

    open(writer, "BkTxCd")?;
    open(writer, "Domn")?;
    leaf(writer, "Cd", "PMNT")?;
    open(writer, "Fmly")?;
    leaf(writer, "Cd", family_code(transaction.transaction_type))?;
    close(writer, "Fmly")?;
    close(writer, "Domn")?;
    close(writer, "BkTxCd")?;

    open(writer, "NtryDtls")?;
    open(writer, "TxDtls")?;
    open(writer, "Refs")?;
    leaf(writer, "EndToEndId", &reference)?;
    close(writer, "Refs")?;
    if let Some(counter_account) = &transaction.counter_account {
        open(writer, "RltdPties")?;
        open(writer, "DbtrAcct")?;
        open(writer, "Id")?;
        leaf(writer, "IBAN", counter_account)?;
        close(writer, "Id")?;
        close(writer, "DbtrAcct")?;
        close(writer, "RltdPties")?;
    }
    open(writer, "RmtInf")?;
    let remittance: String = transaction.description.chars().take(USTRD_LIMIT).collect();
    leaf(writer, "Ustrd", &remittance)?;
    close(writer, "RmtInf")?;
    close(writer, "TxDtls")?;
    close(writer, "NtryDtls")?;

    close(writer, "Ntry")?;
    Ok(())
}

/// ISO 20022 bank-transaction-code family within the `PMNT` domain.
fn family_code(transaction_type: TransactionType) -> &'static str {
    match transaction_type {
        TransactionType::Card => "CCRD",
        TransactionType::Transfer => "ICDT",
        TransactionType::DirectDebit => "DDBT",
        TransactionType::Credit => "TRAF",
    }
}

fn credit_debit_indicator(amount: Decimal) -> &'static str {
    if amount >= Decimal::ZERO {
        "CRDT"
    } else {
        "DBIT"
    }
}

fn open<W: std::io::Write>(writer: &mut Writer<W>, name: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    Ok(())
}

fn close<W: std::io::Write>(writer: &mut Writer<W>, name: &str) -> Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn leaf<W: std::io::Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// `Amt` element: absolute value with exactly two fractional digits and
/// the currency as an attribute.
fn amount_leaf<W: std::io::Write>(
    writer: &mut Writer<W>,
    currency: &str,
    amount: Decimal,
) -> Result<()> {
    let mut start = BytesStart::new("Amt");
    start.push_attribute(("Ccy", currency));
    writer.write_event(Event::Start(start))?;
    let text = format!("{:.2}", amount.abs());
    writer.write_event(Event::Text(BytesText::new(&text)))?;
    writer.write_event(Event::End(BytesEnd::new("Amt")))?;
    Ok(())
}
