use std::collections::HashSet;

use tally_core::CanonicalTransaction;

use crate::hash::transaction_hash;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterResult {
    pub unique: Vec<CanonicalTransaction>,
    pub duplicate_count: usize,
    /// Hashes of `unique`, in order.
    pub new_hashes: Vec<String>,
}

/// Drop transactions already in `existing` or seen earlier in the batch.
/// The working set grows as the batch is scanned, so intra-batch repeats are
/// caught too.
pub fn filter_new(transactions: &[CanonicalTransaction], existing: &HashSet<String>) -> FilterResult {
    let mut seen = existing.clone();
    let mut out = FilterResult::default();
    for t in transactions {
        let hash = transaction_hash(t);
        if seen.insert(hash.clone()) {
            out.unique.push(t.clone());
            out.new_hashes.push(hash);
        } else {
            out.duplicate_count += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn txn(day: u32, desc: &str, amount: &str) -> CanonicalTransaction {
        CanonicalTransaction::from_signed(NaiveDate::from_ymd_opt(2024, 3, day), desc, amount.parse().unwrap())
    }

    #[test]
    fn test_same_transaction_three_times() {
        let t = txn(1, "PAYROLL ACME", "1250.00");
        let out = filter_new(&[t.clone(), t.clone(), t], &HashSet::new());
        assert_eq!(out.unique.len(), 1);
        assert_eq!(out.duplicate_count, 2);
        assert_eq!(out.new_hashes.len(), 1);
    }

    #[test]
    fn test_known_hashes_are_excluded() {
        let a = txn(1, "PAYROLL ACME", "1250.00");
        let b = txn(14, "CITY WATER", "-41.20");
        let existing: HashSet<String> = [transaction_hash(&a)].into_iter().collect();
        let out = filter_new(&[a, b.clone()], &existing);
        assert_eq!(out.unique, vec![b]);
        assert_eq!(out.duplicate_count, 1);
    }

    #[test]
    fn test_idempotent_for_same_inputs() {
        let batch = vec![txn(1, "A", "1"), txn(2, "B", "-2"), txn(1, "A", "1")];
        let existing: HashSet<String> = [transaction_hash(&txn(2, "B", "-2"))].into_iter().collect();
        let first = filter_new(&batch, &existing);
        let second = filter_new(&batch, &existing);
        assert_eq!(first, second);
        assert_eq!(first.unique.len(), 1);
        assert_eq!(first.duplicate_count, 2);
    }
}
