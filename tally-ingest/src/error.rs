use thiserror::Error;

/// Failures of the remote document-understanding path. None of these escape
/// the orchestrator; they become warnings on a `none` result.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Not configured, switched off, or missing credentials.
    #[error("remote extraction disabled: {0}")]
    Disabled(String),

    #[error("remote extraction request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote extraction returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode remote extraction response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Disabled is a configuration state, everything else a failed attempt.
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled(_))
    }
}
