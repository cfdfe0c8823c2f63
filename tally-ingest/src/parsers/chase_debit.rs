//! Chase Debit (Checking) statement grammar (text)
//!
//! Expected extracted-text section:
//!   TRANSACTION DETAIL
//!          DATE        DESCRIPTION                                     AMOUNT     BALANCE
//!                      Beginning Balance                                          $68.70
//!          04/22       Discover     E-Payment 8148   Web ID: ...       -15.00      53.70
//!          04/25       Zelle Payment To Jane Doe
//!                      Jpm99Bx4Ktyz                                    -25.00      28.70
//!
//! Long descriptions wrap, so this layout uses multi-line reconstruction: a
//! row is complete once a line ends with the AMOUNT and BALANCE columns.

use once_cell::sync::Lazy;
use regex::Regex;
use tally_core::{parse_amount, Issuer, ParsedEntry, StatementPeriod};

use super::{clean_description, period_from, IssuerGrammar, ParseContext};
use crate::types::{RawLine, SegmentMode};

static STARTS_WITH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}/\d{2}\s").expect("chase checking date regex"));

// AMOUNT and BALANCE
static ENDS_WITH_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s-?[\d,]+\.\d{2}\s+-?[\d,]+\.\d{2}$").expect("chase checking amount regex")
});

// DATE DESCRIPTION AMOUNT BALANCE
static TXN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^\s*(?P<date>\d{2}/\d{2})\s+",
        r"(?P<desc>.+?)\s+",
        r"(?P<amount>-?[\d,]+\.\d{2})\s+",
        r"(?P<balance>-?[\d,]+\.\d{2})\s*$"
    ))
    .expect("chase checking txn regex")
});

static GARBAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\btotal (?:deposits|withdrawals|checks|fees)|^\d{2}/\d{2}\s+(?:beginning|ending) balance")
        .expect("chase checking garbage regex")
});

static BOILERPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:transaction detail|date\s+description\s+amount|",
        r"(?:beginning|ending) balance\b|checking summary|chase\.com)"
    ))
    .expect("chase checking boilerplate regex")
});

static PERIOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z][a-z]+ \d{1,2}, \d{4})\s+through\s+([A-Z][a-z]+ \d{1,2}, \d{4})")
        .expect("chase checking period regex")
});

pub fn grammar() -> IssuerGrammar {
    IssuerGrammar {
        issuer: Issuer::ChaseChecking,
        mode: SegmentMode::MultiLine,
        filename_rule: None,
        header_rule: |h| {
            super::named_outside_rows(h, "chase")
                && (h.contains("checking") || h.contains("transaction detail"))
        },
        starts_with_date: || &*STARTS_WITH_DATE,
        ends_with_amount: || &*ENDS_WITH_AMOUNT,
        is_boilerplate: |l| BOILERPLATE_RE.is_match(l),
        section_marker: super::no_section,
        column_header: super::no_columns,
        is_garbage: |l| GARBAGE_RE.is_match(l),
        parse,
        statement_period,
        filename_year: super::any_filename_year,
    }
}

pub fn parse(line: &RawLine, ctx: &ParseContext) -> Option<ParsedEntry> {
    let caps = TXN_RE.captures(&line.text)?;
    let date = ctx.resolve_slash_date(&caps["date"])?;
    let amount = parse_amount(&caps["amount"])?;
    let balance = parse_amount(&caps["balance"])?;
    let description = clean_description(&caps["desc"])?;

    Some(ParsedEntry::new(date, description, amount.signed()).with_balance(balance.signed()))
}

pub fn statement_period(text: &str) -> Option<StatementPeriod> {
    period_from(&PERIOD_RE, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::segment;
    use rust_decimal::Decimal;

    #[test]
    fn test_parse_chase_debit_basic() {
        let text = r#"
TRANSACTION DETAIL
       DATE        DESCRIPTION                                     AMOUNT     BALANCE
                   Beginning Balance                                          $68.70
       04/22       Discover     E-Payment 8148   Web ID: 123       -15.00      53.70
       04/23       PAYROLL ACME INC                                100.00     153.70
"#;

        let ctx = ParseContext::new(2026);
        let txns: Vec<_> = segment(text, Issuer::ChaseChecking)
            .iter()
            .filter_map(|l| parse(l, &ctx))
            .collect();
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].signed_amount, "-15.00".parse::<Decimal>().unwrap());
        assert_eq!(txns[0].balance, Some("53.70".parse::<Decimal>().unwrap()));
        assert_eq!(txns[0].description, "Discover E-Payment 8148 Web ID: 123");
        assert_eq!(txns[1].signed_amount, "100.00".parse::<Decimal>().unwrap());
        assert_eq!(txns[1].balance, Some("153.70".parse::<Decimal>().unwrap()));
    }

    #[test]
    fn test_wrapped_description_is_rejoined() {
        let text = r#"
TRANSACTION DETAIL
       04/25       Zelle Payment To Jane Doe
                   Jpm99Bx4Ktyz                                    -25.00      28.70
"#;
        let ctx = ParseContext::new(2026);
        let lines = segment(text, Issuer::ChaseChecking);
        assert_eq!(lines.len(), 1);
        let entry = parse(&lines[0], &ctx).unwrap();
        assert_eq!(entry.description, "Zelle Payment To Jane Doe Jpm99Bx4Ktyz");
        assert_eq!(entry.date, "04/25/2026");
    }

    #[test]
    fn test_period_through() {
        let p = statement_period("April 01, 2026 through April 30, 2026").unwrap();
        assert_eq!(p.start.unwrap().to_string(), "2026-04-01");
        assert_eq!(p.end.unwrap().to_string(), "2026-04-30");
    }
}
