//! Capital One US card statement grammar
//!
//! Expected text rows after PDF-to-text:
//!   Trans Date     Post Date      Description                                         Amount
//!   Jul 20         Jul 22         H-E-B #455SAN MARCOSTX                                $5.82
//!   Jul 28         Jul 29         WALMART.COMWALMART.COMAR                            - $14.05
//!
//! Statement exports are named `Statement_MMYYYY_NNNN.pdf`.

use once_cell::sync::Lazy;
use regex::Regex;
use tally_core::dates::month_from_name;
use tally_core::{parse_amount, Issuer, ParsedEntry, StatementPeriod};

use super::{clean_description, is_remittance_address, period_from, IssuerGrammar, ParseContext};
use crate::types::{RawLine, SegmentMode};

static STARTS_WITH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-z]{2}\s+\d{1,2}\s").expect("capital one date regex"));

static ENDS_WITH_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s(?:-\s*)?\$[\d,]+\.\d{2}$").expect("capital one amount regex"));

static TXN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^\s*(?P<trans>[A-Za-z]{3}\s+\d{1,2})\s+",
        r"(?P<post>[A-Za-z]{3}\s+\d{1,2})\s+",
        r"(?P<desc>.+?)\s+",
        r"(?P<amt>(?:-\s*)?\$\d{1,3}(?:,\d{3})*\.\d{2})\s*$"
    ))
    .expect("capital one txn regex")
});

static GARBAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)total (?:transactions|payments|fees|interest)|interest charge on|",
        r"rewards? (?:balance|earned)|ending in \d{4}|capitalone\.com|",
        r"minimum payment|payment due date|days in billing cycle"
    ))
    .expect("capital one garbage regex")
});

static BOILERPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:trans(?:\.|action)?\s+date\s+post|transactions$|payments, credits and adjustments)")
        .expect("capital one boilerplate regex")
});

static PERIOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z][a-z]{2}\.? \d{1,2}, \d{4})\s*-\s*([A-Z][a-z]{2}\.? \d{1,2}, \d{4})")
        .expect("capital one period regex")
});

static FILENAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Statement_(\d{2})(\d{4})_\d{4}\.pdf$").expect("capital one filename regex")
});

/// Remittance ZIPs printed on the Capital One payment coupon.
const REMITTANCE_ZIPS: &[&str] = &["91716", "84130", "23286"];

/// How far on either side of "capital one" a "payment" mention disqualifies
/// the match. Other issuers' coupons say "Capital One payment".
const PAYMENT_WINDOW: usize = 40;

pub fn grammar() -> IssuerGrammar {
    IssuerGrammar {
        issuer: Issuer::CapitalOne,
        mode: SegmentMode::SingleLine,
        filename_rule: Some(|name| FILENAME_RE.is_match(name)),
        header_rule: matches_header,
        starts_with_date: || &*STARTS_WITH_DATE,
        ends_with_amount: || &*ENDS_WITH_AMOUNT,
        is_boilerplate: |l| BOILERPLATE_RE.is_match(l),
        section_marker: super::no_section,
        column_header: super::no_columns,
        is_garbage,
        parse,
        statement_period,
        filename_year,
    }
}

/// "capital one" with no "payment" nearby.
pub fn matches_header(header: &str) -> bool {
    header.match_indices("capital one").any(|(at, m)| {
        let start = floor_boundary(header, at.saturating_sub(PAYMENT_WINDOW));
        let end = floor_boundary(header, (at + m.len() + PAYMENT_WINDOW).min(header.len()));
        !header[start..end].contains("payment")
    })
}

fn floor_boundary(s: &str, mut i: usize) -> usize {
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

pub fn is_garbage(line: &str) -> bool {
    is_remittance_address(line, REMITTANCE_ZIPS) || GARBAGE_RE.is_match(line)
}

fn parse_mmm_dd(s: &str, ctx: &ParseContext) -> Option<String> {
    // Example: "Jul 20"
    let parts: Vec<_> = s.split_whitespace().collect();
    if parts.len() != 2 {
        return None;
    }
    let month = month_from_name(parts[0])?;
    let day: u32 = parts[1].parse().ok()?;
    ctx.resolve_month_day(month, day)
}

pub fn parse(line: &RawLine, ctx: &ParseContext) -> Option<ParsedEntry> {
    let caps = TXN_RE.captures(&line.text)?;
    let trans = parse_mmm_dd(&caps["trans"], ctx)?;
    let amount = parse_amount(&caps["amt"])?;
    let description = clean_description(&caps["desc"])?;

    let mut entry = ParsedEntry::new(trans, description, amount.signed());
    if let Some(post) = parse_mmm_dd(&caps["post"], ctx) {
        entry = entry.with_posted_date(post);
    }
    Some(entry)
}

pub fn statement_period(text: &str) -> Option<StatementPeriod> {
    period_from(&PERIOD_RE, text)
}

pub fn filename_year(name: &str) -> Option<i32> {
    FILENAME_RE.captures(name)?.get(2)?.as_str().parse().ok()
}
