use serde::{Deserialize, Serialize};
use tally_core::Issuer;

/// Which part of a statement the scanner is currently inside.
///
/// Only consulted for rows that print an unsigned amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Debit,
    Credit,
    #[default]
    None,
}

/// How raw text is cut into transaction-candidate lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentMode {
    /// One physical line per transaction.
    SingleLine,
    /// A transaction may wrap onto following lines.
    MultiLine,
}

/// Right edges (character offsets) of amount column headers, left to right.
///
/// Amounts are right-aligned under their header, so the nearest edge names
/// the column an amount belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnLayout {
    pub edges: Vec<usize>,
}

impl ColumnLayout {
    /// Index of the column whose edge is closest to `end`.
    pub fn column_of(&self, end: usize) -> Option<usize> {
        self.edges
            .iter()
            .enumerate()
            .min_by_key(|(_, edge)| edge.abs_diff(end))
            .map(|(i, _)| i)
    }
}

/// One transaction-candidate line, tagged with the scanner state it was seen in.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLine {
    pub text: String,
    pub issuer: Issuer,
    pub section: Section,
    pub columns: Option<ColumnLayout>,
}

impl RawLine {
    pub fn new(text: impl Into<String>, issuer: Issuer) -> Self {
        Self {
            text: text.into(),
            issuer,
            section: Section::None,
            columns: None,
        }
    }

    pub fn in_section(mut self, section: Section) -> Self {
        self.section = section;
        self
    }
}
