//! Wells Fargo checking statement grammar (text, `pdftotext -layout`)
//!
//! Expected extracted-text section:
//!   Date     Description                             Deposits/Additions   Withdrawals/Subtractions   Ending daily balance
//!   7/1      Online Transfer From Savings                       500.00
//!   7/5      Purchase authorized on 07/03 Safeway #1234                                   54.20             1,020.15
//!
//! Amounts print unsigned in one of two columns. The column header line
//! fixes where each column ends; an amount belongs to the column whose right
//! edge it is closest to. A row with both columns filled is rejected.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use tally_core::{parse_amount, Issuer, ParsedEntry};

use super::{clean_description, is_remittance_address, IssuerGrammar, ParseContext};
use crate::types::{ColumnLayout, RawLine, SegmentMode};

static STARTS_WITH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}/\d{1,2}\s").expect("wells fargo date regex"));

static ENDS_WITH_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s[\d,]+\.\d{2}$").expect("wells fargo amount regex"));

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<date>\d{1,2}/\d{1,2})\s+").expect("wells fargo row date regex"));

static AMOUNT_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,3}(?:,\d{3})*\.\d{2}").expect("wells fargo amount token regex"));

static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)deposits\s*/\s*(?P<credit>additions)\s+",
        r"withdrawals\s*/\s*(?P<debit>subtractions)",
        r"(?:\s+ending daily\s+(?P<balance>balance))?"
    ))
    .expect("wells fargo header regex")
});

static GARBAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\d{1,2}/\d{1,2}\s+(?:ending daily balance|totals?\b)|wellsfargo\.com|account number:")
        .expect("wells fargo garbage regex")
});

static BOILERPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:transaction history|check\s+deposits\s*/|number\s+description|ending balance on)")
        .expect("wells fargo boilerplate regex")
});

static PERIOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)statement period\s*:?\s*(\d{1,2}/\d{1,2}/\d{4})\s*(?:to|-)\s*(\d{1,2}/\d{1,2}/\d{4})")
        .expect("wells fargo period regex")
});

/// Remittance ZIP printed on the Wells Fargo payment coupon.
const REMITTANCE_ZIPS: &[&str] = &["97228"];

const CREDIT_COLUMN: usize = 0;
const DEBIT_COLUMN: usize = 1;

pub fn grammar() -> IssuerGrammar {
    IssuerGrammar {
        issuer: Issuer::WellsFargo,
        mode: SegmentMode::SingleLine,
        filename_rule: None,
        header_rule: |h| h.contains("wells fargo"),
        starts_with_date: || &*STARTS_WITH_DATE,
        ends_with_amount: || &*ENDS_WITH_AMOUNT,
        is_boilerplate: |l| BOILERPLATE_RE.is_match(l),
        section_marker: super::no_section,
        column_header,
        is_garbage,
        parse,
        statement_period: |t| super::period_from(&PERIOD_RE, t),
        filename_year: super::any_filename_year,
    }
}

/// Right edges of the Deposits, Withdrawals and (optional) balance headers.
pub fn column_header(line: &str) -> Option<ColumnLayout> {
    let caps = HEADER_RE.captures(line)?;
    let mut edges = vec![caps.name("credit")?.end(), caps.name("debit")?.end()];
    if let Some(balance) = caps.name("balance") {
        edges.push(balance.end());
    }
    Some(ColumnLayout { edges })
}

pub fn is_garbage(line: &str) -> bool {
    is_remittance_address(line, REMITTANCE_ZIPS) || GARBAGE_RE.is_match(line)
}

/// Amount tokens at the end of the line, separated only by whitespace.
fn trailing_amounts(text: &str) -> Vec<regex::Match<'_>> {
    let mut trailing = Vec::new();
    let mut boundary = text.len();
    for m in AMOUNT_TOKEN_RE.find_iter(text).collect::<Vec<_>>().into_iter().rev() {
        let gap = &text[m.end()..boundary];
        let separated = m.start() > 0 && text[..m.start()].ends_with(char::is_whitespace);
        if !gap.trim().is_empty() || !separated {
            break;
        }
        trailing.push(m);
        boundary = m.start();
    }
    trailing.reverse();
    trailing
}

pub fn parse(line: &RawLine, ctx: &ParseContext) -> Option<ParsedEntry> {
    let layout = line.columns.as_ref()?;
    let text = line.text.as_str();
    let date_caps = DATE_RE.captures(text)?;
    let date = ctx.resolve_slash_date(&date_caps["date"])?;
    let desc_start = date_caps.get(0)?.end();

    let amounts = trailing_amounts(text);
    let first = amounts.first()?;
    if first.start() < desc_start {
        return None;
    }
    let description = clean_description(&text[desc_start..first.start()])?;

    let mut credit: Option<Decimal> = None;
    let mut debit: Option<Decimal> = None;
    let mut balance: Option<Decimal> = None;
    for m in &amounts {
        let value = parse_amount(m.as_str())?.magnitude;
        let slot = match layout.column_of(m.end())? {
            CREDIT_COLUMN => &mut credit,
            DEBIT_COLUMN => &mut debit,
            _ => &mut balance,
        };
        if slot.replace(value).is_some() {
            // two amounts landed in one column
            return None;
        }
    }

    let signed = match (credit, debit) {
        (Some(c), None) => c,
        (None, Some(d)) => -d,
        _ => return None,
    };

    let mut entry = ParsedEntry::new(date, description, signed);
    if let Some(b) = balance {
        entry = entry.with_balance(b);
    }
    Some(entry)
}
