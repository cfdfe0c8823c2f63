//! American Express card statement grammar (text)
//!
//! Expected extracted-text rows:
//!   08/21/22   AMERICAN EXPRESS TRAVEL SEATTLE WA                 $500.19
//!   12/26/22   TARGET 013821 09100013821 WESLEY CHAPEL FL         -$334.89
//!   09/02/22*  DELTA AIR LINES ATLANTA GA                         $212.40
//!
//! The `*` after a date marks a Pay Over Time item. A `$` is always printed;
//! a leading minus marks money leaving the account (a debit), anything else
//! is a credit.

use once_cell::sync::Lazy;
use regex::Regex;
use tally_core::{parse_amount, ParsedEntry, StatementPeriod};

use super::{clean_description, is_remittance_address, named_outside_rows, IssuerGrammar, ParseContext};
use crate::types::{RawLine, SegmentMode};
use tally_core::Issuer;

static STARTS_WITH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}/\d{2}/\d{2}\*?\s").expect("amex date regex"));

static ENDS_WITH_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s-?\$[\d,]+\.\d{2}$").expect("amex amount regex"));

static TXN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?P<date>\d{2}/\d{2}/\d{2})\*?\s+",
        r"(?P<desc>.+?)\s+",
        r"(?P<amt>-?\$[\d,]+\.\d{2})$"
    ))
    .expect("amex txn regex")
});

static GARBAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)account ending|membership rewards|pay over time limit|",
        r"minimum payment due|payment due date|closing date|",
        r"total (?:fees|interest charged|new charges|payments)|",
        r"amount enclosed|americanexpress\.com"
    ))
    .expect("amex garbage regex")
});

static BOILERPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:detail continued|continued on (?:the )?next page|summary of|fees$|interest charged$)")
        .expect("amex boilerplate regex")
});

static CLOSING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(next\s+)?closing date\s*:?\s*(\d{1,2}/\d{1,2}/\d{2,4})").expect("amex closing regex")
});

static OPENING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)opening date\s*:?\s*(\d{1,2}/\d{1,2}/\d{2,4})").expect("amex opening regex")
});

/// Remittance ZIPs printed on the Amex payment coupon.
const REMITTANCE_ZIPS: &[&str] = &["60197", "79998", "30348"];

pub fn grammar() -> IssuerGrammar {
    IssuerGrammar {
        issuer: Issuer::Amex,
        mode: SegmentMode::SingleLine,
        filename_rule: None,
        header_rule: |h| {
            named_outside_rows(h, "american express") || named_outside_rows(h, "americanexpress.com")
        },
        starts_with_date: || &*STARTS_WITH_DATE,
        ends_with_amount: || &*ENDS_WITH_AMOUNT,
        is_boilerplate: |l| BOILERPLATE_RE.is_match(l),
        section_marker: super::no_section,
        column_header: super::no_columns,
        is_garbage,
        parse,
        statement_period,
        filename_year: super::any_filename_year,
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

    // Amex prints its own sign on every row; sections do not change it.
    Some(ParsedEntry::new(tally_core::to_us_date(date), description, amount.signed()))
}

pub fn statement_period(text: &str) -> Option<StatementPeriod> {
    let end = CLOSING_RE
        .captures_iter(text)
        .find(|c| c.get(1).is_none())
        .and_then(|c| tally_core::parse_statement_date(&c[2], 0))?;
    let start = OPENING_RE
        .captures(text)
        .and_then(|c| tally_core::parse_statement_date(&c[1], 0));
    Some(StatementPeriod { start, end: Some(end) })
}
