//! Cooperative lock over a store with no transactions.
//!
//! Acquiring means creating a uniquely named reservation; "already exists"
//! means someone else holds it. Waiters back off exponentially with jitter
//! up to a maximum wait. A reservation older than the TTL is treated as
//! abandoned and removed by whichever waiter notices first.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::LockError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// The backing primitive: anything that can create a named object
/// atomically and fail when it already exists.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn create(&self, name: &str, reservation: &Reservation) -> Result<CreateOutcome, LockError>;
    async fn inspect(&self, name: &str) -> Result<Option<Reservation>, LockError>;
    async fn remove(&self, name: &str) -> Result<(), LockError>;
}

/// Proof of holding a lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub name: String,
    pub owner: String,
}

#[async_trait]
pub trait Lock: Send + Sync {
    async fn acquire(&self) -> Result<Lease, LockError>;
    async fn release(&self, lease: &Lease) -> Result<(), LockError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    pub ttl: Duration,
    pub max_wait: Duration,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(120),
            max_wait: Duration::from_secs(30),
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(2000),
        }
    }
}

impl LockSettings {
    /// Exponential delay for `attempt`, capped, plus up to half again of jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.base_backoff.saturating_mul(1u32 << attempt.min(16));
        let capped = exp.min(self.max_backoff);
        let jitter_ms = rand::thread_rng().gen_range(0..=(capped.as_millis() as u64 / 2));
        capped + Duration::from_millis(jitter_ms)
    }
}

pub struct CooperativeLock<S> {
    store: S,
    name: String,
    owner: String,
    settings: LockSettings,
}

impl<S: ReservationStore> CooperativeLock<S> {
    pub fn new(store: S, name: impl Into<String>, settings: LockSettings) -> Self {
        let owner = format!("{}-{:016x}", std::process::id(), rand::random::<u64>());
        Self {
            store,
            name: name.into(),
            owner,
            settings,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    fn is_stale(&self, reservation: &Reservation) -> bool {
        let age = Utc::now().signed_duration_since(reservation.created_at);
        age.to_std().is_ok_and(|age| age > self.settings.ttl)
    }
}

#[async_trait]
impl<S: ReservationStore> Lock for CooperativeLock<S> {
    async fn acquire(&self) -> Result<Lease, LockError> {
        let started = Instant::now();
        let mut attempt = 0u32;
        loop {
            let reservation = Reservation {
                owner: self.owner.clone(),
                created_at: Utc::now(),
            };
            match self.store.create(&self.name, &reservation).await? {
                CreateOutcome::Created => {
                    tracing::debug!(lock = %self.name, owner = %self.owner, attempts = attempt + 1, "lock acquired");
                    return Ok(Lease {
                        name: self.name.clone(),
                        owner: self.owner.clone(),
                    });
                }
                CreateOutcome::AlreadyExists => match self.store.inspect(&self.name).await? {
                    Some(held) if self.is_stale(&held) => {
                        tracing::warn!(lock = %self.name, holder = %held.owner, created_at = %held.created_at, "removing abandoned lock");
                        self.store.remove(&self.name).await?;
                        continue;
                    }
                    Some(_) => {}
                    // released between create and inspect
                    None => continue,
                },
            }

            let waited = started.elapsed();
            if waited >= self.settings.max_wait {
                tracing::warn!(lock = %self.name, waited_ms = waited.as_millis() as u64, "lock wait exhausted");
                return Err(LockError::Timeout {
                    name: self.name.clone(),
                    waited_ms: waited.as_millis() as u64,
                });
            }
            let delay = self.settings.backoff(attempt).min(self.settings.max_wait - waited);
            tracing::trace!(lock = %self.name, attempt, delay_ms = delay.as_millis() as u64, "lock busy");
            tokio::time::sleep(delay).await;
            attempt = attempt.saturating_add(1);
        }
    }

    async fn release(&self, lease: &Lease) -> Result<(), LockError> {
        match self.store.inspect(&lease.name).await? {
            Some(held) if held.owner == lease.owner => self.store.remove(&lease.name).await,
            Some(held) => {
                tracing::warn!(lock = %lease.name, holder = %held.owner, "lock was taken over; not releasing");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// File-backed reservations
// ---------------------------------------------------------------------------

/// Reservations as `<dir>/<name>.lock` files created with `create_new`.
#[derive(Debug, Clone)]
pub struct FileReservation {
    dir: PathBuf,
}

impl FileReservation {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.lock"))
    }
}

#[async_trait]
impl ReservationStore for FileReservation {
    async fn create(&self, name: &str, reservation: &Reservation) -> Result<CreateOutcome, LockError> {
        let path = self.path_for(name);
        let opened = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;
        let mut file = match opened {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(CreateOutcome::AlreadyExists),
            Err(e) => return Err(e.into()),
        };
        let body = serde_json::to_vec(reservation).map_err(|e| LockError::Store(e.to_string()))?;
        file.write_all(&body).await?;
        file.flush().await?;
        Ok(CreateOutcome::Created)
    }

    async fn inspect(&self, name: &str) -> Result<Option<Reservation>, LockError> {
        let path = self.path_for(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if let Ok(r) = serde_json::from_slice::<Reservation>(&bytes) {
            return Ok(Some(r));
        }
        // Half-written or foreign file: age it by its mtime.
        let modified = match tokio::fs::metadata(&path).await {
            Ok(m) => m.modified()?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(Reservation {
            owner: "unknown".to_string(),
            created_at: DateTime::<Utc>::from(modified),
        }))
    }

    async fn remove(&self, name: &str) -> Result<(), LockError> {
        match tokio::fs::remove_file(self.path_for(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// In-process reservations
// ---------------------------------------------------------------------------

/// Shared in-memory reservations. Clones see the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryReservation {
    inner: Arc<Mutex<HashMap<String, Reservation>>>,
}

impl MemoryReservation {
    fn table(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Reservation>>, LockError> {
        self.inner
            .lock()
            .map_err(|_| LockError::Store("reservation table poisoned".to_string()))
    }

    /// Insert a reservation directly, bypassing `create`.
    pub fn seed(&self, name: &str, reservation: Reservation) -> Result<(), LockError> {
        self.table()?.insert(name.to_string(), reservation);
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for MemoryReservation {
    async fn create(&self, name: &str, reservation: &Reservation) -> Result<CreateOutcome, LockError> {
        let mut table = self.table()?;
        if table.contains_key(name) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        table.insert(name.to_string(), reservation.clone());
        Ok(CreateOutcome::Created)
    }

    async fn inspect(&self, name: &str) -> Result<Option<Reservation>, LockError> {
        Ok(self.table()?.get(name).cloned())
    }

    async fn remove(&self, name: &str) -> Result<(), LockError> {
        self.table()?.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> LockSettings {
        LockSettings {
            ttl: Duration::from_secs(60),
            max_wait: Duration::from_millis(120),
            base_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
        }
    }

    #[test]
    fn test_backoff_grows_and_is_capped() {
        let s = quick();
        for attempt in 0..20 {
            let d = s.backoff(attempt);
            assert!(d >= s.base_backoff.min(s.max_backoff));
            assert!(d <= s.max_backoff + s.max_backoff / 2, "attempt {attempt}: {d:?}");
        }
        let first = LockSettings {
            base_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_secs(10),
            ..s
        };
        assert!(first.backoff(3) >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_acquire_release_acquire() {
        let store = MemoryReservation::default();
        let a = CooperativeLock::new(store.clone(), "sheet", quick());
        let b = CooperativeLock::new(store.clone(), "sheet", quick());

        let lease = a.acquire().await.unwrap();
        assert_eq!(lease.owner, a.owner());
        let err = b.acquire().await.unwrap_err();
        assert!(err.is_retryable());

        a.release(&lease).await.unwrap();
        let lease_b = b.acquire().await.unwrap();
        assert_eq!(lease_b.owner, b.owner());
    }

    #[tokio::test]
    async fn test_stale_reservation_is_removed() {
        let store = MemoryReservation::default();
        store
            .seed(
                "sheet",
                Reservation {
                    owner: "crashed".into(),
                    created_at: Utc::now() - chrono::Duration::minutes(10),
                },
            )
            .unwrap();
        let lock = CooperativeLock::new(store.clone(), "sheet", quick());
        let lease = lock.acquire().await.unwrap();
        assert_eq!(store.inspect("sheet").await.unwrap().unwrap().owner, lease.owner);
    }

    #[tokio::test]
    async fn test_release_leaves_someone_elses_reservation() {
        let store = MemoryReservation::default();
        let lock = CooperativeLock::new(store.clone(), "sheet", quick());
        let lease = lock.acquire().await.unwrap();
        store
            .seed(
                "sheet",
                Reservation {
                    owner: "new-holder".into(),
                    created_at: Utc::now(),
                },
            )
            .unwrap();
        lock.release(&lease).await.unwrap();
        assert_eq!(store.inspect("sheet").await.unwrap().unwrap().owner, "new-holder");
    }

    #[tokio::test]
    async fn test_file_reservation_create_new_semantics() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileReservation::new(dir.path());
        let r = Reservation {
            owner: "me".into(),
            created_at: Utc::now(),
        };
        assert_eq!(store.create("sheet", &r).await.unwrap(), CreateOutcome::Created);
        assert_eq!(store.create("sheet", &r).await.unwrap(), CreateOutcome::AlreadyExists);
        assert_eq!(store.inspect("sheet").await.unwrap(), Some(r));
        store.remove("sheet").await.unwrap();
        assert_eq!(store.inspect("sheet").await.unwrap(), None);
        store.remove("sheet").await.unwrap();
    }

    #[tokio::test]
    async fn test_file_reservation_content_and_mtime_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileReservation::new(dir.path());
        let r = Reservation {
            owner: "4242-00000000000000ff".into(),
            created_at: Utc::now(),
        };
        store.create("sheet", &r).await.unwrap();
        let body: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path_for("sheet")).unwrap()).unwrap();
        assert_eq!(body["owner"], "4242-00000000000000ff");
        assert!(body["created_at"].is_string());

        std::fs::write(store.path_for("other"), b"{half").unwrap();
        let aged = store.inspect("other").await.unwrap().unwrap();
        assert_eq!(aged.owner, "unknown");
        assert!(Utc::now().signed_duration_since(aged.created_at) < chrono::Duration::minutes(1));
    }
}
