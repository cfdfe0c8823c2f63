//! Issuer tags: the closed set of statement layouts the grammars recognize.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The bank or card company whose statement layout produced a text.
///
/// Declaration order is significant: classification rules are evaluated in
/// this order and the first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Issuer {
    Amex,
    AmazonSynchrony,
    Synchrony,
    CapitalOne,
    ChaseCredit,
    ChaseChecking,
    BankOfAmerica,
    WellsFargo,
    Unknown,
}

impl Issuer {
    /// Every issuer with a grammar, in precedence order. `Unknown` is excluded.
    pub const KNOWN: [Issuer; 8] = [
        Issuer::Amex,
        Issuer::AmazonSynchrony,
        Issuer::Synchrony,
        Issuer::CapitalOne,
        Issuer::ChaseCredit,
        Issuer::ChaseChecking,
        Issuer::BankOfAmerica,
        Issuer::WellsFargo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Issuer::Amex => "amex",
            Issuer::AmazonSynchrony => "amazon-synchrony",
            Issuer::Synchrony => "synchrony",
            Issuer::CapitalOne => "capital-one",
            Issuer::ChaseCredit => "chase-credit",
            Issuer::ChaseChecking => "chase-checking",
            Issuer::BankOfAmerica => "bank-of-america",
            Issuer::WellsFargo => "wells-fargo",
            Issuer::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Issuer::Unknown
    }
}

impl fmt::Display for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Issuer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        Issuer::KNOWN
            .iter()
            .chain(std::iter::once(&Issuer::Unknown))
            .find(|i| i.as_str() == tag)
            .copied()
            .ok_or_else(|| format!("unknown issuer tag: {s}"))
    }
}
