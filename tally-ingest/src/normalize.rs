//! Grammar output or remote entities to [`CanonicalTransaction`]s.
//!
//! Both sources are first flattened into [`SourceRow`]s so that date
//! resolution, the debit/credit split and balance-row suppression run the
//! same way regardless of where a row came from.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use tally_core::{parse_amount, parse_statement_date, CanonicalTransaction, Issuer, ParsedEntry, StatementPeriod};

use crate::parsers::ParseContext;
use crate::remote::{Entity, RemoteDocument, RemoteValue, TableProperty};

/// Whole words that mark a dateless row as a balance or summary line.
static SUMMARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:balance|beginning|ending|total|summary|subtotal|previous|opening|closing)\b")
        .expect("summary keyword regex")
});

pub const FLAG_KEY: &str = "flag";
pub const RAW_DATE_KEY: &str = "rawDate";

pub enum NormalizeInput<'a> {
    Parsed(&'a [ParsedEntry]),
    Remote(&'a RemoteDocument),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub transactions: Vec<CanonicalTransaction>,
    pub warnings: Vec<String>,
    /// Rows that could not be normalized at all.
    pub dropped: usize,
    /// Balance and summary rows removed on purpose.
    pub suppressed: usize,
}

/// One row before normalization, whatever its source.
#[derive(Debug, Clone, Default, PartialEq)]
struct SourceRow {
    date: Option<String>,
    structured_date: Option<NaiveDate>,
    posted: Option<String>,
    description: String,
    amount: Option<Decimal>,
    balance: Option<Decimal>,
}

impl SourceRow {
    fn has_date(&self) -> bool {
        self.structured_date.is_some() || self.date.as_deref().is_some_and(|d| !d.trim().is_empty())
    }

    fn is_summary(&self) -> bool {
        if self.has_date() {
            return false;
        }
        if SUMMARY_RE.is_match(&self.description) {
            return true;
        }
        self.description.trim().is_empty()
            && self.amount.is_none_or(|a| a.is_zero())
            && self.balance.is_some()
    }
}

impl From<&ParsedEntry> for SourceRow {
    fn from(e: &ParsedEntry) -> Self {
        Self {
            date: Some(e.date.clone()),
            structured_date: None,
            posted: e.posted_date.clone(),
            description: e.description.clone(),
            amount: Some(e.signed_amount),
            balance: e.balance,
        }
    }
}

fn value_amount(v: &RemoteValue) -> Option<Decimal> {
    v.money
        .or_else(|| v.mention.as_deref().and_then(parse_amount).map(|a| a.signed()))
        .map(|d| d.abs())
}

/// One row per direction present in a `table_item`.
fn table_rows(props: &[TableProperty], ctx: &ParseContext) -> Vec<SourceRow> {
    let mut deposit = (None::<&RemoteValue>, None::<&RemoteValue>, None::<&RemoteValue>);
    let mut withdrawal = (None::<&RemoteValue>, None::<&RemoteValue>, None::<&RemoteValue>);
    for p in props {
        match p {
            TableProperty::Deposit(v) => deposit.0 = Some(v),
            TableProperty::DepositDate(v) => deposit.1 = Some(v),
            TableProperty::DepositDescription(v) => deposit.2 = Some(v),
            TableProperty::Withdrawal(v) => withdrawal.0 = Some(v),
            TableProperty::WithdrawalDate(v) => withdrawal.1 = Some(v),
            TableProperty::WithdrawalDescription(v) => withdrawal.2 = Some(v),
            TableProperty::Unrecognized(kind) => {
                tracing::trace!(kind = %kind, "ignoring table property");
            }
        }
    }

    let build = |(amount, date, desc): (Option<&RemoteValue>, Option<&RemoteValue>, Option<&RemoteValue>),
                 negative: bool| {
        if amount.is_none() && date.is_none() && desc.is_none() {
            return None;
        }
        let magnitude = amount.and_then(value_amount);
        Some(SourceRow {
            date: date.and_then(|d| d.mention.clone()),
            structured_date: date.and_then(|d| d.date).and_then(|d| d.resolve(ctx.year_for_month(d.month))),
            posted: None,
            description: desc.and_then(|d| d.mention.clone()).unwrap_or_default(),
            amount: magnitude.map(|m| if negative { -m } else { m }),
            balance: None,
        })
    };

    build(deposit, false).into_iter().chain(build(withdrawal, true)).collect()
}

/// Account and period facts carried by a remote document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteFacts {
    pub account_id: Option<String>,
    pub period: StatementPeriod,
    pub starting_balance: Option<Decimal>,
    pub ending_balance: Option<Decimal>,
}

fn value_date(v: &RemoteValue, year: i32) -> Option<NaiveDate> {
    v.date
        .and_then(|d| d.resolve(year))
        .or_else(|| v.mention.as_deref().and_then(|m| parse_statement_date(m, year)))
}

fn balance_value(v: &RemoteValue) -> Option<Decimal> {
    v.money
        .or_else(|| v.mention.as_deref().and_then(parse_amount).map(|a| a.signed()))
}

pub fn remote_facts(doc: &RemoteDocument, year: i32) -> RemoteFacts {
    let mut facts = RemoteFacts::default();
    for entity in &doc.entities {
        match entity {
            Entity::AccountNumber(v) => {
                facts.account_id = v
                    .mention
                    .as_deref()
                    .map(|m| m.chars().filter(char::is_ascii_digit).collect::<String>())
                    .filter(|digits| digits.len() >= 4)
                    .map(|digits| digits[digits.len() - 4..].to_string());
            }
            Entity::StatementStartDate(v) => facts.period.start = value_date(v, year),
            Entity::StatementEndDate(v) => facts.period.end = value_date(v, year),
            Entity::StartingBalance(v) => facts.starting_balance = balance_value(v),
            Entity::EndingBalance(v) => facts.ending_balance = balance_value(v),
            Entity::TableItem(_) | Entity::Unrecognized(_) => {}
        }
    }
    facts
}

fn rows_from(input: &NormalizeInput<'_>, ctx: &ParseContext) -> Vec<SourceRow> {
    match input {
        NormalizeInput::Parsed(entries) => entries.iter().map(SourceRow::from).collect(),
        NormalizeInput::Remote(doc) => doc
            .entities
            .iter()
            .flat_map(|e| match e {
                Entity::TableItem(props) => table_rows(props, ctx),
                Entity::Unrecognized(kind) => {
                    tracing::trace!(kind = %kind, "ignoring remote entity");
                    Vec::new()
                }
                _ => Vec::new(),
            })
            .collect(),
    }
}

/// Normalize one statement's rows. Never fails; rows that cannot be
/// salvaged are dropped and described in `warnings`. Yearless dates are
/// placed with `ctx`.
pub fn normalize(input: NormalizeInput<'_>, issuer: Issuer, ctx: &ParseContext) -> Normalized {
    let mut out = Normalized::default();
    let source_issuer = issuer.is_known().then(|| issuer.as_str().to_string());

    for (idx, row) in rows_from(&input, ctx).into_iter().enumerate() {
        if row.is_summary() {
            tracing::trace!(row = idx, description = %row.description, "suppressed balance row");
            out.suppressed += 1;
            continue;
        }

        let date = row
            .structured_date
            .or_else(|| row.date.as_deref().and_then(|d| ctx.resolve_date(d)));

        if date.is_none() && row.amount.is_none() {
            out.dropped += 1;
            out.warnings.push(format!(
                "row {idx} dropped: unparseable date {:?} and amount ({})",
                row.date.as_deref().unwrap_or(""),
                row.description
            ));
            continue;
        }

        let mut txn = CanonicalTransaction::from_signed(date, row.description.trim(), row.amount.unwrap_or_default());
        txn.posted_date = row.posted.as_deref().and_then(|p| ctx.resolve_date(p));
        txn.balance = row.balance;
        txn.source_issuer = source_issuer.clone();

        if row.amount.is_none() {
            txn.metadata.insert(FLAG_KEY.to_string(), "missing-amount".to_string());
            out.warnings.push(format!("row {idx} flagged: no amount ({})", row.description));
        } else if date.is_none() {
            txn.metadata.insert(FLAG_KEY.to_string(), "unparsed-date".to_string());
            if let Some(raw) = row.date.as_deref().filter(|d| !d.trim().is_empty()) {
                txn.metadata.insert(RAW_DATE_KEY.to_string(), raw.to_string());
            }
            out.warnings.push(format!("row {idx} kept without a date ({})", row.description));
        }

        out.transactions.push(txn);
    }

    out
}

/// [`normalize`] over grammar output.
pub fn normalize_entries(entries: &[ParsedEntry], issuer: Issuer, statement_year: i32) -> Normalized {
    normalize(NormalizeInput::Parsed(entries), issuer, &ParseContext::new(statement_year))
}

/// [`normalize`] over a remote extraction.
pub fn normalize_remote(doc: &RemoteDocument, issuer: Issuer, ctx: &ParseContext) -> Normalized {
    normalize(NormalizeInput::Remote(doc), issuer, ctx)
}
