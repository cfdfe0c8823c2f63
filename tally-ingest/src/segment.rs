//! Raw statement text to transaction-candidate lines.
//!
//! Every issuer shares the same front half: split, trim, drop blanks, drop
//! generic page furniture, drop the issuer's own boilerplate, then consume
//! section and column header lines into scanner state. What survives is
//! selected either one line at a time or through the multi-line
//! reconstruction machine, depending on the issuer's [`SegmentMode`].

use once_cell::sync::Lazy;
use regex::Regex;
use tally_core::Issuer;

use crate::parsers::{grammar_for, IssuerGrammar};
use crate::types::{ColumnLayout, RawLine, Section, SegmentMode};

static GENERIC_BOILERPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:",
        r"page\s+\d+\s+(?:of|/)\s+\d+|",
        r"\d{1,3}|",
        r"\(?continued(?: on next page)?\)?|",
        r"total\b.*|",
        r"[A-Z][A-Z .'-]+,?\s+[A-Z]{2}\s+\d{5}(?:-\d{4})?",
        r")$"
    ))
    .expect("generic boilerplate regex")
});

/// Page numbers, "Page X of Y", continuation banners, section totals and
/// bare `CITY ST 12345` mailing-address lines.
pub fn is_generic_boilerplate(line: &str) -> bool {
    GENERIC_BOILERPLATE_RE.is_match(line)
}

/// Multi-line reconstruction state.
#[derive(Debug, Clone, PartialEq)]
enum Pending {
    Idle,
    Partial { text: String, section: Section },
}

/// Scanner state threaded through one pass over a statement.
struct Scanner<'g> {
    grammar: &'g IssuerGrammar,
    section: Section,
    columns: Option<ColumnLayout>,
    pending: Pending,
    out: Vec<RawLine>,
}

impl<'g> Scanner<'g> {
    fn new(grammar: &'g IssuerGrammar) -> Self {
        Self {
            grammar,
            section: Section::None,
            columns: None,
            pending: Pending::Idle,
            out: Vec::new(),
        }
    }

    fn emit(&mut self, text: String, section: Section) {
        self.out.push(RawLine {
            text,
            issuer: self.grammar.issuer,
            section,
            columns: self.columns.clone(),
        });
    }

    /// Returns true when the line was consumed as state rather than content.
    fn absorb_header(&mut self, line: &str) -> bool {
        if is_generic_boilerplate(line) || (self.grammar.is_boilerplate)(line) {
            return true;
        }
        if let Some(section) = (self.grammar.section_marker)(line) {
            tracing::trace!(issuer = %self.grammar.issuer, ?section, "section marker");
            self.section = section;
            return true;
        }
        if let Some(layout) = (self.grammar.column_header)(line) {
            tracing::trace!(issuer = %self.grammar.issuer, edges = ?layout.edges, "column header");
            self.columns = Some(layout);
            return true;
        }
        false
    }

    fn single_line(&mut self, line: &str) {
        if self.grammar.is_candidate(line) {
            self.emit(line.to_string(), self.section);
        }
    }

    fn multi_line(&mut self, line: &str) {
        let starts = (self.grammar.starts_with_date)().is_match(line);
        let ends = (self.grammar.ends_with_amount)().is_match(line);

        match std::mem::replace(&mut self.pending, Pending::Idle) {
            Pending::Idle => {
                if starts && ends {
                    self.emit(line.to_string(), self.section);
                } else if starts {
                    self.pending = Pending::Partial {
                        text: line.to_string(),
                        section: self.section,
                    };
                }
            }
            Pending::Partial { mut text, section } => {
                if ends {
                    text.push(' ');
                    text.push_str(line);
                    self.emit(text, section);
                } else if starts {
                    tracing::debug!(issuer = %self.grammar.issuer, dropped = %text, "incomplete row replaced");
                    self.pending = Pending::Partial {
                        text: line.to_string(),
                        section: self.section,
                    };
                } else {
                    text.push(' ');
                    text.push_str(line);
                    self.pending = Pending::Partial { text, section };
                }
            }
        }
    }

    fn finish(self) -> Vec<RawLine> {
        if let Pending::Partial { text, .. } = &self.pending {
            tracing::debug!(issuer = %self.grammar.issuer, dropped = %text, "incomplete row at end of input");
        }
        self.out
    }
}

/// Segment `text` with an explicit grammar.
pub fn segment_with(text: &str, grammar: &IssuerGrammar) -> Vec<RawLine> {
    let mut scanner = Scanner::new(grammar);
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if scanner.absorb_header(line) {
            continue;
        }
        match grammar.mode {
            SegmentMode::SingleLine => scanner.single_line(line),
            SegmentMode::MultiLine => scanner.multi_line(line),
        }
    }
    scanner.finish()
}

/// Segment `text` for `issuer`. [`Issuer::Unknown`] has no grammar and
/// yields nothing.
pub fn segment(text: &str, issuer: Issuer) -> Vec<RawLine> {
    match grammar_for(issuer) {
        Some(grammar) => segment_with(text, grammar),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: &[RawLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn test_generic_boilerplate() {
        assert!(is_generic_boilerplate("Page 2 of 4"));
        assert!(is_generic_boilerplate("3"));
        assert!(is_generic_boilerplate("(continued)"));
        assert!(is_generic_boilerplate("Total fees charged this period $0.00"));
        assert!(is_generic_boilerplate("CAROL STREAM IL 60197-6031"));
        assert!(!is_generic_boilerplate("08/21/22 AMERICAN EXPRESS TRAVEL SEATTLE WA $500.19"));
    }

    #[test]
    fn test_single_line_mode_keeps_only_candidate_shapes() {
        let text = r#"
Page 1 of 3

08/21/22 AMERICAN EXPRESS TRAVEL SEATTLE WA $500.19
Membership Rewards points earned 120
08/22/22* LYFT RIDE SAN FRANCISCO CA $12.40
   12/26/22   TARGET 013821 09100013821 WESLEY CHAPEL FL -$334.89
"#;
        let lines = segment(text, Issuer::Amex);
        assert_eq!(
            texts(&lines),
            vec![
                "08/21/22 AMERICAN EXPRESS TRAVEL SEATTLE WA $500.19",
                "08/22/22* LYFT RIDE SAN FRANCISCO CA $12.40",
                "12/26/22   TARGET 013821 09100013821 WESLEY CHAPEL FL -$334.89",
            ]
        );
        assert!(lines.iter().all(|l| l.issuer == Issuer::Amex));
    }

    #[test]
    fn test_unknown_issuer_segments_nothing() {
        assert!(segment("08/21/22 ANYTHING $1.00", Issuer::Unknown).is_empty());
    }

    #[test]
    fn test_multi_line_joins_continuations_with_single_space() {
        let text = "\
04/25 Zelle Payment To
Jane Doe
Jpm99Bx4Ktyz -25.00 28.70
";
        let lines = segment(text, Issuer::ChaseChecking);
        assert_eq!(texts(&lines), vec!["04/25 Zelle Payment To Jane Doe Jpm99Bx4Ktyz -25.00 28.70"]);
    }

    #[test]
    fn test_multi_line_dated_amount_line_completes_partial() {
        let text = "\
04/25 Zelle Payment To
04/26 Card Purchase Starbucks -5.25 23.45
";
        let lines = segment(text, Issuer::ChaseChecking);
        assert_eq!(
            texts(&lines),
            vec!["04/25 Zelle Payment To 04/26 Card Purchase Starbucks -5.25 23.45"]
        );
    }

    #[test]
    fn test_multi_line_new_date_discards_partial() {
        let text = "\
04/25 Orphaned start of a row
04/26 Card Purchase Starbucks
Seattle WA -5.25 23.45
";
        let lines = segment(text, Issuer::ChaseChecking);
        assert_eq!(texts(&lines), vec!["04/26 Card Purchase Starbucks Seattle WA -5.25 23.45"]);
    }

    #[test]
    fn test_multi_line_pending_at_end_never_leaks() {
        let text = "\
04/22 Discover E-Payment -15.00 53.70
04/25 Zelle Payment To
Jane Doe
";
        let lines = segment(text, Issuer::ChaseChecking);
        assert_eq!(texts(&lines), vec!["04/22 Discover E-Payment -15.00 53.70"]);
    }

    #[test]
    fn test_multi_line_idle_noise_is_discarded() {
        let text = "\
Customer Service 1-800-935-9935
Jane Doe
04/22 Discover E-Payment -15.00 53.70
";
        let lines = segment(text, Issuer::ChaseChecking);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_page_break_inside_wrapped_row_is_skipped() {
        let text = "\
04/25 Zelle Payment To Jane Doe
Page 2 of 3
Jpm99Bx4Ktyz -25.00 28.70
";
        let lines = segment(text, Issuer::ChaseChecking);
        assert_eq!(texts(&lines), vec!["04/25 Zelle Payment To Jane Doe Jpm99Bx4Ktyz -25.00 28.70"]);
    }

    #[test]
    fn test_section_state_is_threaded_and_marker_lines_consumed() {
        let text = "\
PAYMENTS AND OTHER CREDITS
01/10 Payment Thank You-Mobile -500.00
PURCHASE
01/05 STARBUCKS STORE 0123 5.25
";
        let lines = segment(text, Issuer::ChaseCredit);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].section, Section::Credit);
        assert_eq!(lines[1].section, Section::Debit);
    }

    #[test]
    fn test_wrapped_row_keeps_section_it_started_in() {
        let text = "\
Withdrawals and other subtractions
07/05/22 CHECKCARD 0703 STARBUCKS
Deposits and other additions
24431062185 5.75
";
        let lines = segment(text, Issuer::BankOfAmerica);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].section, Section::Debit);
    }
}
