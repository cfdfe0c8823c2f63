//! tally-core: statement transaction model, issuer tags, and amount/date helpers

pub mod dates;
pub mod issuer;
pub mod money;
pub mod transaction;

pub use dates::{parse_statement_date, parse_statement_date_with, to_us_date};
pub use issuer::Issuer;
pub use money::{parse_amount, Amount};
pub use transaction::{split_signed, CanonicalTransaction, ParsedEntry, StatementPeriod};
