//! Idempotent append of canonical transactions to a shared sheet.

use tally_core::CanonicalTransaction;

use crate::dedup::filter_new;
use crate::error::ExportError;
use crate::lock::Lock;
use crate::sheet::{SheetRow, SheetStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendReport {
    pub appended: usize,
    pub duplicate_count: usize,
}

pub struct DedupExporter {
    lock: Box<dyn Lock>,
    sheet: Box<dyn SheetStore>,
}

impl DedupExporter {
    pub fn new(lock: Box<dyn Lock>, sheet: Box<dyn SheetStore>) -> Self {
        Self { lock, sheet }
    }

    /// Append the transactions the sheet has not seen yet.
    ///
    /// The hash read, row append and hash record run under the lock. The
    /// lock is released whether or not that step succeeded; a failed release
    /// is logged and left to TTL recovery.
    pub async fn append(&self, transactions: &[CanonicalTransaction]) -> Result<AppendReport, ExportError> {
        let lease = self.lock.acquire().await?;
        let outcome = self.append_locked(transactions).await;
        if let Err(e) = self.lock.release(&lease).await {
            tracing::warn!(lock = %lease.name, error = %e, "lock release failed");
        }
        let report = outcome?;
        tracing::info!(
            appended = report.appended,
            duplicates = report.duplicate_count,
            "sheet append complete"
        );
        Ok(report)
    }

    async fn append_locked(&self, transactions: &[CanonicalTransaction]) -> Result<AppendReport, ExportError> {
        let known = self.sheet.load_hashes().await?;
        let filtered = filter_new(transactions, &known);
        let rows: Vec<SheetRow> = filtered
            .unique
            .into_iter()
            .zip(filtered.new_hashes.iter().cloned())
            .map(|(transaction, hash)| SheetRow { transaction, hash })
            .collect();

        self.sheet.append_rows(&rows).await?;
        self.sheet.record_hashes(&filtered.new_hashes).await?;
        Ok(AppendReport {
            appended: rows.len(),
            duplicate_count: filtered.duplicate_count,
        })
    }
}
