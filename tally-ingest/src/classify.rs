//! Statement text + file name to issuer tag.

use tally_core::Issuer;

use crate::parsers::{base_name, GRAMMARS};

/// How much of the statement counts as its header.
pub const HEADER_CHARS: usize = 500;

/// Lowercased first [`HEADER_CHARS`] characters.
fn header_of(text: &str) -> String {
    text.chars().take(HEADER_CHARS).collect::<String>().to_ascii_lowercase()
}

/// Total and deterministic: file-name templates first, then header keyword
/// rules, both in registry order. No match is [`Issuer::Unknown`].
pub fn classify(text: &str, file_name: Option<&str>) -> Issuer {
    if let Some(name) = file_name.map(base_name) {
        let by_name = GRAMMARS
            .iter()
            .find(|g| g.filename_rule.is_some_and(|rule| rule(name)));
        if let Some(g) = by_name {
            tracing::debug!(issuer = %g.issuer, file = name, "classified by file name");
            return g.issuer;
        }
    }

    let header = header_of(text);
    match GRAMMARS.iter().find(|g| (g.header_rule)(&header)) {
        Some(g) => {
            tracing::debug!(issuer = %g.issuer, "classified by header");
            g.issuer
        }
        None => Issuer::Unknown,
    }
}
