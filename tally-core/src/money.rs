//! Amount parsing shared by every grammar and by the remote entity merge.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?P<open>\()?\s*(?P<lead>-)?\s*(?P<cur>\$)?\s*(?P<lead2>-)?\s*",
        r"(?P<num>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?|\.\d+)",
        r"\s*(?P<trail>-)?\s*(?P<close>\))?$"
    ))
    .expect("amount regex")
});

/// A parsed amount: always-nonnegative magnitude plus whether the text
/// carried an explicit negative marker (minus sign or parentheses).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amount {
    pub magnitude: Decimal,
    pub negative: bool,
    pub had_currency: bool,
}

impl Amount {
    pub fn signed(&self) -> Decimal {
        if self.negative { -self.magnitude } else { self.magnitude }
    }
}

/// Parse statement amount text such as `$1,234.56`, `-$14.05`, `- $14.05`,
/// `($3.00)`, `12.00-` or `500.19`.
///
/// Returns `None` for anything that is not a single amount.
pub fn parse_amount(raw: &str) -> Option<Amount> {
    let caps = AMOUNT_RE.captures(raw.trim())?;

    // parentheses must be balanced
    if caps.name("open").is_some() != caps.name("close").is_some() {
        return None;
    }

    let minus_count = ["lead", "lead2", "trail"]
        .iter()
        .filter(|n| caps.name(n).is_some())
        .count();
    if minus_count > 1 {
        return None;
    }

    let magnitude: Decimal = caps["num"].replace(',', "").parse().ok()?;
    Some(Amount {
        magnitude,
        negative: minus_count == 1 || caps.name("open").is_some(),
        had_currency: caps.name("cur").is_some(),
    })
}

/// Build a decimal from a `units` + `nanos` money pair.
pub fn from_units_nanos(units: i64, nanos: i32) -> Decimal {
    (Decimal::from(units) + Decimal::new(nanos as i64, 9)).normalize()
}
