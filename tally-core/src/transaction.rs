//! Transaction records: grammar output and the canonical, source-agnostic shape.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Output of an issuer grammar for one statement line.
///
/// `date` is still statement-formatted text (`MM/DD/YYYY` once the grammar
/// has resolved the year); the normalizer turns it into an ISO date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedEntry {
    pub date: String,
    pub description: String,
    /// Positive = money in (credit), negative = money out (debit).
    pub signed_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<String>,
    /// Running balance printed on the same row, when the layout has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Decimal>,
}

impl ParsedEntry {
    pub fn new(date: impl Into<String>, description: impl Into<String>, signed_amount: Decimal) -> Self {
        Self {
            date: date.into(),
            description: description.into(),
            signed_amount,
            posted_date: None,
            balance: None,
        }
    }

    pub fn with_posted_date(mut self, posted: impl Into<String>) -> Self {
        self.posted_date = Some(posted.into());
        self
    }

    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = Some(balance);
        self
    }
}

/// Billing period covered by one statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementPeriod {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// The durable, normalized transaction record.
///
/// `debit` and `credit` are never negative and never both nonzero; both zero
/// marks a flagged row whose direction could not be determined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTransaction {
    pub date: Option<NaiveDate>,
    pub posted_date: Option<NaiveDate>,
    pub description: String,
    pub payee: Option<String>,
    pub debit: Decimal,
    pub credit: Decimal,
    pub balance: Option<Decimal>,
    pub account_id: Option<String>,
    pub source_issuer: Option<String>,
    pub statement_period: StatementPeriod,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl CanonicalTransaction {
    /// Build a record from a signed amount: positive lands in `credit`,
    /// negative in `debit`, zero in neither.
    pub fn from_signed(date: Option<NaiveDate>, description: impl Into<String>, signed: Decimal) -> Self {
        let (debit, credit) = split_signed(signed);
        Self {
            date,
            posted_date: None,
            description: description.into(),
            payee: None,
            debit,
            credit,
            balance: None,
            account_id: None,
            source_issuer: None,
            statement_period: StatementPeriod::default(),
            metadata: BTreeMap::new(),
        }
    }

    /// `credit - debit`.
    pub fn net_amount(&self) -> Decimal {
        self.credit - self.debit
    }

    pub fn is_debit(&self) -> bool {
        self.debit > Decimal::ZERO
    }

    pub fn is_credit(&self) -> bool {
        self.credit > Decimal::ZERO
    }

    /// Both columns zero: direction unknown.
    pub fn is_flagged(&self) -> bool {
        self.debit.is_zero() && self.credit.is_zero()
    }

    /// The debit/credit invariant.
    pub fn is_consistent(&self) -> bool {
        self.debit >= Decimal::ZERO
            && self.credit >= Decimal::ZERO
            && !(self.is_debit() && self.is_credit())
    }

    /// Rewrite the free-text fields. This is the only mutation a cleanup
    /// pass may apply; amounts, dates and balance stay untouched.
    pub fn rewrite_text(&mut self, description: Option<String>, payee: Option<String>) {
        if let Some(d) = description {
            self.description = d;
        }
        if payee.is_some() {
            self.payee = payee;
        }
    }
}

/// Split a signed amount into nonnegative `(debit, credit)` columns.
pub fn split_signed(signed: Decimal) -> (Decimal, Decimal) {
    if signed < Decimal::ZERO {
        (-signed, Decimal::ZERO)
    } else {
        (Decimal::ZERO, signed)
    }
}
