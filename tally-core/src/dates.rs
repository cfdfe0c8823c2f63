//! Date utilities: statement date text to ISO calendar dates.
//!
//! Statements print dates as `MM/DD`, `MM/DD/YY`, `MM/DD/YYYY`, `Mon DD`,
//! long-form `January 5, 2024`, or ISO. Everything is normalized to a
//! `NaiveDate` whose `Display` is exactly `YYYY-MM-DD`.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static ISO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("iso date regex"));

static SLASH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[/-](\d{1,2})(?:[/-](\d{2}|\d{4}))?$").expect("slash date regex")
});

static MONTH_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]{3,9})\.?\s+(\d{1,2})(?:,?\s+(\d{4}))?$").expect("month name regex")
});

/// Month number for an English month name or three-letter abbreviation.
pub fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.trim().trim_end_matches('.').to_ascii_lowercase();
    let month = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    // "Mayday" is not a month; accept the abbreviation or the full name only
    let full = [
        "january", "february", "march", "april", "may", "june", "july", "august",
        "september", "october", "november", "december",
    ][month as usize - 1];
    if lower.len() == 3 || lower == full || (month == 9 && lower == "sept") {
        Some(month)
    } else {
        None
    }
}

/// Expand a two-digit statement year (`22` → `2022`).
pub fn expand_year(raw: &str) -> Option<i32> {
    let y: i32 = raw.parse().ok()?;
    match raw.len() {
        2 => Some(2000 + y),
        4 => Some(y),
        _ => None,
    }
}

/// Parse statement date text, using `fallback_year` when the text has none.
pub fn parse_statement_date(raw: &str, fallback_year: i32) -> Option<NaiveDate> {
    parse_statement_date_with(raw, |_| fallback_year)
}

/// Like [`parse_statement_date`], but a yearless date asks `year_for_month`
/// which year its month belongs to.
pub fn parse_statement_date_with(raw: &str, year_for_month: impl Fn(u32) -> i32) -> Option<NaiveDate> {
    let s = raw.trim();

    if let Some(c) = ISO_RE.captures(s) {
        return NaiveDate::from_ymd_opt(c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?);
    }

    if let Some(c) = SLASH_RE.captures(s) {
        let m: u32 = c[1].parse().ok()?;
        let d: u32 = c[2].parse().ok()?;
        let year = match c.get(3) {
            Some(y) => expand_year(y.as_str())?,
            None => year_for_month(m),
        };
        return NaiveDate::from_ymd_opt(year, m, d);
    }

    if let Some(c) = MONTH_NAME_RE.captures(s) {
        let m = month_from_name(&c[1])?;
        let d: u32 = c[2].parse().ok()?;
        let year = match c.get(3) {
            Some(y) => y.as_str().parse().ok()?,
            None => year_for_month(m),
        };
        return NaiveDate::from_ymd_opt(year, m, d);
    }

    None
}

/// Format as `MM/DD/YYYY`, the form grammars hand to the normalizer.
pub fn to_us_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_all_supported_shapes() {
        assert_eq!(parse_statement_date("08/21", 2022), Some(ymd(2022, 8, 21)));
        assert_eq!(parse_statement_date("08/21/22", 1999), Some(ymd(2022, 8, 21)));
        assert_eq!(parse_statement_date("08/21/2022", 1999), Some(ymd(2022, 8, 21)));
        assert_eq!(parse_statement_date("2022-08-21", 1999), Some(ymd(2022, 8, 21)));
        assert_eq!(parse_statement_date("Jul 20", 2024), Some(ymd(2024, 7, 20)));
        assert_eq!(parse_statement_date("January 5, 2024", 1999), Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn test_iso_display_is_zero_padded() {
        let d = parse_statement_date("1/2/23", 2000).unwrap();
        assert_eq!(d.to_string(), "2023-01-02");
    }

    #[test]
    fn test_invalid_dates_are_none() {
        assert_eq!(parse_statement_date("13/01/2022", 2022), None);
        assert_eq!(parse_statement_date("02/30", 2022), None);
        assert_eq!(parse_statement_date("Mayday 3", 2022), None);
        assert_eq!(parse_statement_date("PAYMENT", 2022), None);
    }

    #[test]
    fn test_yearless_dates_ask_for_their_year() {
        let january_statement = |m: u32| if m > 1 { 2022 } else { 2023 };
        assert_eq!(parse_statement_date_with("12/28", january_statement), Some(ymd(2022, 12, 28)));
        assert_eq!(parse_statement_date_with("Jan 3", january_statement), Some(ymd(2023, 1, 3)));
        assert_eq!(parse_statement_date_with("12/28/2023", january_statement), Some(ymd(2023, 12, 28)));
    }

    #[test]
    fn test_month_names() {
        assert_eq!(month_from_name("Sep"), Some(9));
        assert_eq!(month_from_name("Sept"), Some(9));
        assert_eq!(month_from_name("december"), Some(12));
        assert_eq!(month_from_name("Decimal"), None);
    }
}
