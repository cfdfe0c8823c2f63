//! Synchrony card statement grammars (generic and the Amazon store card)
//!
//! Expected extracted-text rows:
//!   07/15   P9281ABC0EHK7LHHD   AMAZON.COM SEATTLE WA              $23.45
//!   07/20   F9281008300CHGDDA   PAYMENT - THANK YOU               -$50.00
//!   07/22   P9281ABC0EHK7XYZQ   AMAZON MARKETPLACE RETURN         ($12.99)
//!
//! Rows print month/day only; the year comes from the billing cycle line
//! ("Billing Cycle from 06/15/2022 to 07/14/2022").

use once_cell::sync::Lazy;
use regex::Regex;
use tally_core::{parse_amount, Issuer, ParsedEntry, StatementPeriod};

use super::{clean_description, is_remittance_address, named_outside_rows, period_from, IssuerGrammar, ParseContext};
use crate::types::{RawLine, SegmentMode};

static STARTS_WITH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}/\d{2}\s").expect("synchrony date regex"));

static ENDS_WITH_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s\(?-?\$[\d,]+\.\d{2}\)?-?$").expect("synchrony amount regex"));

static TXN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?P<date>\d{2}/\d{2})\s+",
        r"(?P<reference>[A-Z0-9]{10,20})\s+",
        r"(?P<desc>.+?)\s+",
        r"(?P<amt>\(?-?\$[\d,]+\.\d{2}\)?-?)$"
    ))
    .expect("synchrony txn regex")
});

static GARBAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)payment due date|new balance|minimum payment|total fees|total interest|",
        r"syf\.com|mysynchrony\.com|account number ending|promotional (?:balance|purchase)|",
        r"deferred interest|rewards? (?:earned|balance)"
    ))
    .expect("synchrony garbage regex")
});

static BOILERPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:transaction detail|date\s+reference\s*#?\s+description|continued)")
        .expect("synchrony boilerplate regex")
});

/// The Amazon card extraction sometimes emits a zero-amount row whose
/// description is the merchant name cut off right after `AMZN Mktp US*`.
/// Only that exact shape is dropped; other zero-amount rows are kept.
static AMAZON_PHANTOM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{2}/\d{2}\s+[A-Z0-9]{10,20}\s+AMZN Mktp US\*\s*\$0\.00$").expect("amazon phantom regex")
});

static PERIOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)billing cycle from\s+(\d{2}/\d{2}/\d{4})\s+to\s+(\d{2}/\d{2}/\d{4})")
        .expect("synchrony period regex")
});

/// Remittance ZIPs printed on Synchrony payment coupons.
const REMITTANCE_ZIPS: &[&str] = &["32896", "30353"];

pub fn grammar() -> IssuerGrammar {
    IssuerGrammar {
        issuer: Issuer::Synchrony,
        mode: SegmentMode::SingleLine,
        filename_rule: None,
        header_rule: |h| named_outside_rows(h, "synchrony") || named_outside_rows(h, "syf.com"),
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

/// The Amazon store card shares the Synchrony layout. Its header rule is
/// stricter and must be evaluated before the generic one.
pub fn amazon_grammar() -> IssuerGrammar {
    IssuerGrammar {
        issuer: Issuer::AmazonSynchrony,
        header_rule: |h| {
            named_outside_rows(h, "amazon") && (named_outside_rows(h, "synchrony") || named_outside_rows(h, "syf"))
        },
        is_garbage: is_amazon_garbage,
        ..grammar()
    }
}

pub fn is_garbage(line: &str) -> bool {
    is_remittance_address(line, REMITTANCE_ZIPS) || GARBAGE_RE.is_match(line)
}

pub fn is_amazon_garbage(line: &str) -> bool {
    is_garbage(line) || AMAZON_PHANTOM_RE.is_match(line)
}

pub fn parse(line: &RawLine, ctx: &ParseContext) -> Option<ParsedEntry> {
    let caps = TXN_RE.captures(&line.text)?;
    let date = ctx.resolve_slash_date(&caps["date"])?;
    let amount = parse_amount(&caps["amt"])?;
    let description = clean_description(&caps["desc"])?;
    Some(ParsedEntry::new(date, description, amount.signed()))
}

pub fn statement_period(text: &str) -> Option<StatementPeriod> {
    period_from(&PERIOD_RE, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_synchrony_rows() {
        let ctx = ParseContext::new(2022).with_closing_month(7);
        let purchase = parse(
            &RawLine::new("07/15 P9281ABC0EHK7LHHD AMAZON.COM SEATTLE WA $23.45", Issuer::Synchrony),
            &ctx,
        )
        .unwrap();
        assert_eq!(purchase.date, "07/15/2022");
        assert_eq!(purchase.description, "AMAZON.COM SEATTLE WA");
        assert_eq!(purchase.signed_amount, dec("23.45"));

        let refund = parse(
            &RawLine::new("07/22 P9281ABC0EHK7XYZQ AMAZON MARKETPLACE RETURN ($12.99)", Issuer::Synchrony),
            &ctx,
        )
        .unwrap();
        assert_eq!(refund.signed_amount, dec("-12.99"));
    }

    #[test]
    fn test_missing_reference_does_not_parse() {
        let ctx = ParseContext::new(2022);
        assert!(parse(&RawLine::new("07/15 AMAZON $23.45", Issuer::Synchrony), &ctx).is_none());
    }

    #[test]
    fn test_phantom_fragment_only_for_amazon() {
        let phantom = "07/18 P9281ABC0EHK7QQQQ AMZN Mktp US* $0.00";
        assert!(is_amazon_garbage(phantom));
        assert!(!is_garbage(phantom));
        // a real zero-dollar row with a full merchant name survives
        assert!(!is_amazon_garbage("07/18 P9281ABC0EHK7QQQQ AMZN Mktp US*2K4LM0 $0.00"));
    }

    #[test]
    fn test_billing_cycle_period() {
        let p = statement_period("Billing Cycle from 06/15/2022 to 07/14/2022").unwrap();
        assert_eq!(p.start.unwrap().to_string(), "2022-06-15");
        assert_eq!(p.end.unwrap().to_string(), "2022-07-14");
    }
}
