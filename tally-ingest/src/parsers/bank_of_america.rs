//! Bank of America checking statement grammar (text)
//!
//! Expected extracted-text sections:
//!   Deposits and other additions
//!   Date        Description                                              Amount
//!   07/01/22    DIRECT DEP DES:PAYROLL ID:XXXXX13579 INDN:DOE JANE      2,500.00
//!   Total deposits and other additions                                 $2,500.00
//!   Withdrawals and other subtractions
//!   07/05/22    CHECKCARD 0703 STARBUCKS STORE 12345 SEATTLE WA
//!               24431062185                                               -5.75
//!   Checks
//!   07/08/22    1234                                                     150.00
//!
//! Descriptions wrap (multi-line reconstruction). Rows normally print their
//! own sign; unsigned rows take the sign of the section they appear in.

use once_cell::sync::Lazy;
use regex::Regex;
use tally_core::{parse_amount, Issuer, ParsedEntry, StatementPeriod};

use super::{clean_description, is_remittance_address, period_from, resolve_sign, IssuerGrammar, ParseContext};
use crate::types::{RawLine, Section, SegmentMode};

static STARTS_WITH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}/\d{2}/\d{2}\s").expect("boa date regex"));

static ENDS_WITH_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s-?[\d,]+\.\d{2}$").expect("boa amount regex"));

static TXN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?P<date>\d{2}/\d{2}/\d{2})\s+",
        r"(?P<desc>.+?)\s+",
        r"(?P<amt>-?[\d,]+\.\d{2})$"
    ))
    .expect("boa txn regex")
});

static CREDIT_SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^deposits and other additions(?:\s*-\s*continued)?$").expect("boa credit section regex")
});

static DEBIT_SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:withdrawals and other subtractions|checks|service fees)(?:\s*-\s*continued)?$")
        .expect("boa debit section regex")
});

static GARBAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\d{2}/\d{2}/\d{2}\s+total\b|bankofamerica\.com|daily ledger balances|account number:")
        .expect("boa garbage regex")
});

static BOILERPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:date\s+description\s+amount|date\s+check\s*#|your checking account|account summary)")
        .expect("boa boilerplate regex")
});

static PERIOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)for ([A-Z][a-z]+ \d{1,2}, \d{4}) to ([A-Z][a-z]+ \d{1,2}, \d{4})").expect("boa period regex")
});

/// Remittance ZIP printed on the Bank of America deposit/payment slip.
const REMITTANCE_ZIPS: &[&str] = &["19886", "79998"];

pub fn grammar() -> IssuerGrammar {
    IssuerGrammar {
        issuer: Issuer::BankOfAmerica,
        mode: SegmentMode::MultiLine,
        filename_rule: None,
        header_rule: |h| h.contains("bank of america"),
        starts_with_date: || &*STARTS_WITH_DATE,
        ends_with_amount: || &*ENDS_WITH_AMOUNT,
        is_boilerplate: |l| BOILERPLATE_RE.is_match(l),
        section_marker,
        column_header: super::no_columns,
        is_garbage,
        parse,
        statement_period,
        filename_year: super::any_filename_year,
    }
}

pub fn section_marker(line: &str) -> Option<Section> {
    if CREDIT_SECTION_RE.is_match(line) {
        Some(Section::Credit)
    } else if DEBIT_SECTION_RE.is_match(line) {
        Some(Section::Debit)
    } else {
        None
    }
}

pub fn is_garbage(line: &str) -> bool {
    is_remittance_address(line, REMITTANCE_ZIPS) || GARBAGE_RE.is_match(line)
}

pub fn parse(line: &RawLine, _ctx: &ParseContext) -> Option<ParsedEntry> {
    let caps = TXN_RE.captures(&line.text)?;
    let date = tally_core::parse_statement_date(&caps["date"], 0)?;
    let amount = parse_amount(&caps["amt"])?;
    let description = clean_description(&caps["desc"])?;
    Some(ParsedEntry::new(
        tally_core::to_us_date(date),
        description,
        resolve_sign(&amount, line.section),
    ))
}

pub fn statement_period(text: &str) -> Option<StatementPeriod> {
    period_from(&PERIOD_RE, text)
}
