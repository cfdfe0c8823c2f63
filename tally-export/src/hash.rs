//! Content hash of a canonical transaction.
//!
//! Recomputed on demand and never stored on the record, so the definition
//! can change without migrating stored transactions.

use std::fmt::Write;

use sha2::{Digest, Sha256};
use tally_core::CanonicalTransaction;

/// The hashed fields: ISO date (empty when unknown), net amount with
/// trailing zeros dropped, description.
pub fn hash_input(t: &CanonicalTransaction) -> String {
    let date = t.date.map(|d| d.to_string()).unwrap_or_default();
    format!("{date}|{}|{}", t.net_amount().normalize(), t.description)
}

/// Lowercase hex sha256 of [`hash_input`].
pub fn transaction_hash(t: &CanonicalTransaction) -> String {
    let digest = Sha256::digest(hash_input(t).as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for b in digest {
        let _ = write!(hex, "{b:02x}");
    }
    hex
}
