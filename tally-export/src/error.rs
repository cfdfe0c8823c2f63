use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    /// Another holder kept the lock past the wait budget. Retryable.
    #[error("timed out after {waited_ms} ms waiting for lock `{name}`")]
    Timeout { name: String, waited_ms: u64 },

    #[error("lock store error: {0}")]
    Store(String),
}

impl LockError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<std::io::Error> for LockError {
    fn from(e: std::io::Error) -> Self {
        Self::Store(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("sheet store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl ExportError {
    /// Only a lock timeout is worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Lock(e) if e.is_retryable())
    }
}
