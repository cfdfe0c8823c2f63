//! tally-export: content-hash dedup and the locked append protocol for
//! exporting canonical transactions to a shared sheet.

pub mod dedup;
pub mod error;
pub mod exporter;
pub mod hash;
pub mod lock;
pub mod sheet;

pub use dedup::{filter_new, FilterResult};
pub use error::{ExportError, LockError};
pub use exporter::{AppendReport, DedupExporter};
pub use hash::transaction_hash;
pub use lock::{
    CooperativeLock, CreateOutcome, FileReservation, Lease, Lock, LockSettings, MemoryReservation, Reservation,
    ReservationStore,
};
pub use sheet::{CsvSheet, MemorySheet, SheetRow, SheetStore, SHEET_HEADER};
