//! Issuer grammars.
//!
//! Each issuer is a plain data record of functions (classification rules,
//! boilerplate and garbage predicates, line shape, parser, period/year
//! inference). Adding an issuer means writing one module and adding its
//! record to [`GRAMMARS`].

pub mod amex;
pub mod bank_of_america;
pub mod capital_one_us;
pub mod chase_credit;
pub mod chase_debit;
pub mod synchrony;
pub mod wells_fargo;

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use tally_core::{Issuer, ParsedEntry, StatementPeriod};

use crate::types::{ColumnLayout, RawLine, Section, SegmentMode};

/// Statement-level facts a line parser needs but a single line lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseContext {
    pub statement_year: i32,
    /// Month the statement closes in, when known. Rows dated after it
    /// belong to the previous year (a December row on a January statement).
    pub closing_month: Option<u32>,
}

impl ParseContext {
    pub fn new(statement_year: i32) -> Self {
        Self {
            statement_year,
            closing_month: None,
        }
    }

    pub fn with_closing_month(mut self, month: u32) -> Self {
        self.closing_month = Some(month);
        self
    }

    pub fn year_for_month(&self, month: u32) -> i32 {
        match self.closing_month {
            Some(closing) if month > closing => self.statement_year - 1,
            _ => self.statement_year,
        }
    }

    /// Resolve a yearless `MM/DD` (or `M/D`) into `MM/DD/YYYY`.
    pub fn resolve_month_day(&self, month: u32, day: u32) -> Option<String> {
        let date = NaiveDate::from_ymd_opt(self.year_for_month(month), month, day)?;
        Some(tally_core::to_us_date(date))
    }

    /// Parse statement date text; a yearless date takes the year its
    /// month falls in.
    pub fn resolve_date(&self, raw: &str) -> Option<NaiveDate> {
        tally_core::parse_statement_date_with(raw, |m| self.year_for_month(m))
    }

    /// Resolve `MM/DD` text.
    pub fn resolve_slash_date(&self, raw: &str) -> Option<String> {
        let mut it = raw.trim().split('/');
        let m: u32 = it.next()?.parse().ok()?;
        let d: u32 = it.next()?.parse().ok()?;
        if it.next().is_some() {
            return None;
        }
        self.resolve_month_day(m, d)
    }
}

/// The per-issuer record.
pub struct IssuerGrammar {
    pub issuer: Issuer,
    pub mode: SegmentMode,
    /// Matches a bare file name (no directories).
    pub filename_rule: Option<fn(&str) -> bool>,
    /// Matches the ASCII-lowercased statement header.
    pub header_rule: fn(&str) -> bool,
    pub starts_with_date: fn() -> &'static Regex,
    pub ends_with_amount: fn() -> &'static Regex,
    /// Issuer-specific header/footer lines dropped before candidate selection.
    pub is_boilerplate: fn(&str) -> bool,
    /// Section header lines; consumed by the segmenter.
    pub section_marker: fn(&str) -> Option<Section>,
    /// Amount column header lines; consumed by the segmenter.
    pub column_header: fn(&str) -> Option<ColumnLayout>,
    pub is_garbage: fn(&str) -> bool,
    pub parse: fn(&RawLine, &ParseContext) -> Option<ParsedEntry>,
    pub statement_period: fn(&str) -> Option<StatementPeriod>,
    pub filename_year: fn(&str) -> Option<i32>,
}

impl IssuerGrammar {
    /// Year context from the billing period, else the file name, else `today`.
    pub fn infer_context(&self, text: &str, file_name: Option<&str>, today: NaiveDate) -> ParseContext {
        if let Some(end) = (self.statement_period)(text).and_then(|p| p.end) {
            return ParseContext::new(end.year()).with_closing_month(end.month());
        }
        if let Some(year) = file_name.and_then(|f| (self.filename_year)(base_name(f))) {
            return ParseContext::new(year);
        }
        ParseContext::new(today.year())
    }

    /// A line has the single-line transaction shape.
    pub fn is_candidate(&self, line: &str) -> bool {
        (self.starts_with_date)().is_match(line) && (self.ends_with_amount)().is_match(line)
    }
}

pub static GRAMMARS: Lazy<Vec<IssuerGrammar>> = Lazy::new(|| {
    vec![
        amex::grammar(),
        synchrony::amazon_grammar(),
        synchrony::grammar(),
        capital_one_us::grammar(),
        chase_credit::grammar(),
        chase_debit::grammar(),
        bank_of_america::grammar(),
        wells_fargo::grammar(),
    ]
});

/// Grammar for a known issuer; `None` for [`Issuer::Unknown`].
pub fn grammar_for(issuer: Issuer) -> Option<&'static IssuerGrammar> {
    GRAMMARS.iter().find(|g| g.issuer == issuer)
}

/// Counts from running a grammar over segmented lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrammarOutput {
    pub entries: Vec<ParsedEntry>,
    pub garbage: usize,
    pub skipped: usize,
}

/// Garbage filter then parse, line by line. Garbage never reaches the parser
/// and a `None` parse is a skip, never an abort.
pub fn parse_lines(grammar: &IssuerGrammar, lines: &[RawLine], ctx: &ParseContext) -> GrammarOutput {
    let mut out = GrammarOutput::default();
    for line in lines {
        if (grammar.is_garbage)(&line.text) {
            tracing::trace!(issuer = %grammar.issuer, line = %line.text, "garbage line");
            out.garbage += 1;
            continue;
        }
        match (grammar.parse)(line, ctx) {
            Some(entry) => out.entries.push(entry),
            None => {
                tracing::debug!(issuer = %grammar.issuer, line = %line.text, "line did not parse");
                out.skipped += 1;
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub(crate) fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

pub(crate) fn no_section(_: &str) -> Option<Section> {
    None
}

pub(crate) fn no_columns(_: &str) -> Option<ColumnLayout> {
    None
}

static ROW_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d{1,2}/\d{1,2}(?:/\d{2,4})?\*?\s").expect("row date regex"));

/// `needle` appears on a header line that is not a dated transaction row.
/// Issuer names show up in descriptions ("AMERICAN EXPRESS DES:SETTLEMENT")
/// and must not decide the issuer.
pub(crate) fn named_outside_rows(header: &str, needle: &str) -> bool {
    header
        .lines()
        .any(|line| line.contains(needle) && !ROW_DATE_RE.is_match(line))
}

static ANY_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^0-9])(20\d{2})(?:[^0-9]|$)").expect("file year regex"));

/// First standalone `20YY` in a file name.
pub(crate) fn any_filename_year(name: &str) -> Option<i32> {
    ANY_YEAR_RE.captures(name)?.get(1)?.as_str().parse().ok()
}

static PO_BOX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bP\.?\s*O\.?\s*BOX\s+\d+\b.*?\b(\d{5})(?:-\d{4})?\b").expect("po box regex")
});

/// A payment-coupon remittance address: a PO box followed by one of the
/// issuer's known remittance ZIP codes.
pub(crate) fn is_remittance_address(line: &str, zips: &[&str]) -> bool {
    PO_BOX_RE
        .captures_iter(line)
        .any(|c| c.get(1).is_some_and(|z| zips.contains(&z.as_str())))
}

/// Strip and collapse internal whitespace; `None` when nothing is left.
pub(crate) fn clean_description(raw: &str) -> Option<String> {
    let desc = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if desc.is_empty() { None } else { Some(desc) }
}

/// Apply the sign rules for a single-amount row: an explicit marker always
/// means negative; otherwise the current section decides, and outside any
/// section the amount stays positive.
pub(crate) fn resolve_sign(amount: &tally_core::Amount, section: Section) -> rust_decimal::Decimal {
    if amount.negative {
        return -amount.magnitude;
    }
    match section {
        Section::Debit => -amount.magnitude,
        Section::Credit | Section::None => amount.magnitude,
    }
}

/// Parse a `<Month> <D>, <YYYY> <sep> <Month> <D>, <YYYY>` period with `re`
/// capturing the two dates as groups 1 and 2.
pub(crate) fn period_from(re: &Regex, text: &str) -> Option<StatementPeriod> {
    let caps = re.captures(text)?;
    let start = caps.get(1).and_then(|m| tally_core::parse_statement_date(m.as_str(), 0));
    let end = caps.get(2).and_then(|m| tally_core::parse_statement_date(m.as_str(), 0));
    if start.is_none() && end.is_none() {
        return None;
    }
    Some(StatementPeriod { start, end })
}

static ACCOUNT_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:account\s+(?:number\s+)?ending(?:\s+in)?|ending\s+in)\s*:?\s*(?:[-x*]+|\d-)?\s*(\d{4,5})\b")
        .expect("account suffix regex")
});

/// Trailing account digits from "Account Ending 1-23456" style boilerplate.
pub fn account_suffix(text: &str) -> Option<String> {
    ACCOUNT_SUFFIX_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
