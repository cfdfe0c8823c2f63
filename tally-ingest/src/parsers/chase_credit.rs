//! Chase credit card statement grammar (text)
//!
//! Expected extracted-text section:
//!   ACCOUNT ACTIVITY
//!   Date of Transaction    Merchant Name or Transaction Description    $ Amount
//!   PAYMENTS AND OTHER CREDITS
//!   01/10                  Payment Thank You-Mobile                    -500.00
//!   PURCHASE
//!   01/05                  AMAZON MKTPL*AB12C3D4 Amzn.com/bill WA        23.45
//!
//! Amounts never carry a `$`. Statement exports are named
//! `YYYYMMDD-statements-NNNN-.pdf`.

use once_cell::sync::Lazy;
use regex::Regex;
use tally_core::{parse_amount, Issuer, ParsedEntry, StatementPeriod};

use super::{clean_description, is_remittance_address, resolve_sign, IssuerGrammar, ParseContext};
use crate::types::{RawLine, Section, SegmentMode};

static STARTS_WITH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}/\d{2}\s").expect("chase credit date regex"));

static ENDS_WITH_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s-?[\d,]+\.\d{2}$").expect("chase credit amount regex"));

static TXN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?P<date>\d{2}/\d{2})\s+",
        r"(?P<desc>.+?)\s+",
        r"(?P<amt>-?[\d,]+\.\d{2})$"
    ))
    .expect("chase credit txn regex")
});

static CREDIT_SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^payments and other credits$").expect("chase credit section regex")
});

static DEBIT_SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:purchases?|fees charged|interest charged|cash advances?|balance transfers?)$")
        .expect("chase debit section regex")
});

static GARBAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)total (?:fees|interest) (?:charged|for this period)|year-to-date|",
        r"account number:|minimum payment due|payment due date|",
        r"ultimate rewards|chase\.com/cardhelp|order number"
    ))
    .expect("chase credit garbage regex")
});

static BOILERPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:account activity|date of\s+transaction|merchant name or transaction)")
        .expect("chase credit boilerplate regex")
});

static PERIOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)opening/closing date\s+(\d{2}/\d{2}/\d{2})\s*-\s*(\d{2}/\d{2}/\d{2})")
        .expect("chase credit period regex")
});

static FILENAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})(\d{2})(\d{2})-statements-\d{4}-?\.pdf$").expect("chase filename regex")
});

/// Remittance ZIPs printed on the Chase card payment coupon.
const REMITTANCE_ZIPS: &[&str] = &["60197", "19850", "19886"];

pub fn grammar() -> IssuerGrammar {
    IssuerGrammar {
        issuer: Issuer::ChaseCredit,
        mode: SegmentMode::SingleLine,
        filename_rule: Some(|name| FILENAME_RE.is_match(name)),
        header_rule: matches_header,
        starts_with_date: || &*STARTS_WITH_DATE,
        ends_with_amount: || &*ENDS_WITH_AMOUNT,
        is_boilerplate: |l| BOILERPLATE_RE.is_match(l),
        section_marker,
        column_header: super::no_columns,
        is_garbage,
        parse,
        statement_period,
        filename_year,
    }
}

/// Chase, card wording, and nothing that says checking.
pub fn matches_header(header: &str) -> bool {
    super::named_outside_rows(header, "chase")
        && !header.contains("checking")
        && ["cardmember", "credit card", "card services", "ultimate rewards", "sapphire", "freedom"]
            .iter()
            .any(|k| header.contains(k))
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

pub fn parse(line: &RawLine, ctx: &ParseContext) -> Option<ParsedEntry> {
    let caps = TXN_RE.captures(&line.text)?;
    let date = ctx.resolve_slash_date(&caps["date"])?;
    let amount = parse_amount(&caps["amt"])?;
    let description = clean_description(&caps["desc"])?;
    Some(ParsedEntry::new(date, description, resolve_sign(&amount, line.section)))
}

pub fn statement_period(text: &str) -> Option<StatementPeriod> {
    let caps = PERIOD_RE.captures(text)?;
    Some(StatementPeriod {
        start: tally_core::parse_statement_date(&caps[1], 0),
        end: tally_core::parse_statement_date(&caps[2], 0),
    })
}

pub fn filename_year(name: &str) -> Option<i32> {
    FILENAME_RE.captures(name)?.get(1)?.as_str().parse().ok()
}
