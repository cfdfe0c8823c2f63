//! Append-only destination for exported rows plus its known-hash set.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tally_core::CanonicalTransaction;

use crate::error::ExportError;

/// Column order of exported rows.
pub const SHEET_HEADER: [&str; 12] = [
    "date",
    "posted_date",
    "description",
    "payee",
    "debit",
    "credit",
    "balance",
    "account_id",
    "source_issuer",
    "period_start",
    "period_end",
    "hash",
];

/// One exported row: the transaction and its content hash.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub transaction: CanonicalTransaction,
    pub hash: String,
}

impl SheetRow {
    fn record(&self) -> Vec<String> {
        let t = &self.transaction;
        let opt_date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
        vec![
            opt_date(t.date),
            opt_date(t.posted_date),
            t.description.clone(),
            t.payee.clone().unwrap_or_default(),
            t.debit.to_string(),
            t.credit.to_string(),
            t.balance.map(|b| b.to_string()).unwrap_or_default(),
            t.account_id.clone().unwrap_or_default(),
            t.source_issuer.clone().unwrap_or_default(),
            opt_date(t.statement_period.start),
            opt_date(t.statement_period.end),
            self.hash.clone(),
        ]
    }
}

#[async_trait]
pub trait SheetStore: Send + Sync {
    async fn load_hashes(&self) -> Result<HashSet<String>, ExportError>;
    async fn append_rows(&self, rows: &[SheetRow]) -> Result<(), ExportError>;
    async fn record_hashes(&self, hashes: &[String]) -> Result<(), ExportError>;
}

// ---------------------------------------------------------------------------
// CSV file
// ---------------------------------------------------------------------------

/// A CSV file with a `<file>.hashes` sibling, one hash per line.
#[derive(Debug, Clone)]
pub struct CsvSheet {
    path: PathBuf,
    hashes_path: PathBuf,
}

impl CsvSheet {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut hashes = path.clone().into_os_string();
        hashes.push(".hashes");
        Self {
            path,
            hashes_path: PathBuf::from(hashes),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn hashes_path(&self) -> &Path {
        &self.hashes_path
    }

    /// All data rows as raw string records, header excluded.
    pub fn read_rows(&self) -> Result<Vec<Vec<String>>, ExportError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_path(&self.path)?;
        let mut rows = Vec::new();
        for record in rdr.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }

    fn append_blocking(path: &Path, rows: &[SheetRow]) -> Result<(), ExportError> {
        let fresh = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if fresh {
            wtr.write_record(SHEET_HEADER)?;
        }
        for row in rows {
            wtr.write_record(row.record())?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn load_hashes_blocking(path: &Path) -> Result<HashSet<String>, ExportError> {
        let file = match std::fs::File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(e.into()),
        };
        let mut set = HashSet::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let line = line.trim();
            if !line.is_empty() {
                set.insert(line.to_string());
            }
        }
        Ok(set)
    }

    fn record_hashes_blocking(path: &Path, hashes: &[String]) -> Result<(), ExportError> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        for h in hashes {
            writeln!(file, "{h}")?;
        }
        file.flush()?;
        Ok(())
    }
}

async fn blocking<T, F>(f: F) -> Result<T, ExportError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ExportError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ExportError::Store(format!("sheet task failed: {e}")))?
}

#[async_trait]
impl SheetStore for CsvSheet {
    async fn load_hashes(&self) -> Result<HashSet<String>, ExportError> {
        let path = self.hashes_path.clone();
        blocking(move || Self::load_hashes_blocking(&path)).await
    }

    async fn append_rows(&self, rows: &[SheetRow]) -> Result<(), ExportError> {
        if rows.is_empty() {
            return Ok(());
        }
        let path = self.path.clone();
        let rows = rows.to_vec();
        blocking(move || Self::append_blocking(&path, &rows)).await
    }

    async fn record_hashes(&self, hashes: &[String]) -> Result<(), ExportError> {
        if hashes.is_empty() {
            return Ok(());
        }
        let path = self.hashes_path.clone();
        let hashes = hashes.to_vec();
        blocking(move || Self::record_hashes_blocking(&path, &hashes)).await
    }
}

// ---------------------------------------------------------------------------
// In memory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemorySheetState {
    rows: Vec<SheetRow>,
    hashes: HashSet<String>,
}

/// Shared in-memory sheet. Clones see the same rows.
#[derive(Debug, Clone, Default)]
pub struct MemorySheet {
    inner: Arc<Mutex<MemorySheetState>>,
}

impl MemorySheet {
    fn state(&self) -> Result<std::sync::MutexGuard<'_, MemorySheetState>, ExportError> {
        self.inner
            .lock()
            .map_err(|_| ExportError::Store("sheet state poisoned".to_string()))
    }

    pub fn rows(&self) -> Vec<SheetRow> {
        self.state().map(|s| s.rows.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SheetStore for MemorySheet {
    async fn load_hashes(&self) -> Result<HashSet<String>, ExportError> {
        Ok(self.state()?.hashes.clone())
    }

    async fn append_rows(&self, rows: &[SheetRow]) -> Result<(), ExportError> {
        self.state()?.rows.extend_from_slice(rows);
        Ok(())
    }

    async fn record_hashes(&self, hashes: &[String]) -> Result<(), ExportError> {
        self.state()?.hashes.extend(hashes.iter().cloned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(desc: &str, amount: &str, hash: &str) -> SheetRow {
        let mut t = CanonicalTransaction::from_signed(
            NaiveDate::from_ymd_opt(2022, 8, 21),
            desc,
            amount.parse().unwrap(),
        );
        t.source_issuer = Some("amex".into());
        SheetRow {
            transaction: t,
            hash: hash.into(),
        }
    }

    #[tokio::test]
    async fn test_csv_sheet_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = CsvSheet::new(dir.path().join("ledger.csv"));

        sheet.append_rows(&[row("TARGET", "-334.89", "aa")]).await.unwrap();
        sheet.append_rows(&[row("PAYMENT", "500.19", "bb")]).await.unwrap();

        let text = std::fs::read_to_string(sheet.path()).unwrap();
        assert_eq!(text.matches("date,posted_date").count(), 1);

        let rows = sheet.read_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "2022-08-21");
        assert_eq!(rows[0][4], "334.89");
        assert_eq!(rows[1][5], "500.19");
        assert_eq!(rows[1][8], "amex");
        assert_eq!(rows[1][11], "bb");
    }

    #[tokio::test]
    async fn test_csv_sheet_hash_file() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = CsvSheet::new(dir.path().join("ledger.csv"));
        assert!(sheet.load_hashes().await.unwrap().is_empty());

        sheet.record_hashes(&["aa".into(), "bb".into()]).await.unwrap();
        sheet.record_hashes(&["cc".into()]).await.unwrap();
        let hashes = sheet.load_hashes().await.unwrap();
        assert_eq!(hashes.len(), 3);
        assert!(hashes.contains("cc"));
        assert!(sheet.hashes_path().to_string_lossy().ends_with("ledger.csv.hashes"));
    }

    #[tokio::test]
    async fn test_memory_sheet_clones_share_state() {
        let sheet = MemorySheet::default();
        let other = sheet.clone();
        other.append_rows(&[row("TARGET", "-1", "aa")]).await.unwrap();
        other.record_hashes(&["aa".into()]).await.unwrap();
        assert_eq!(sheet.rows().len(), 1);
        assert!(sheet.load_hashes().await.unwrap().contains("aa"));
    }
}
