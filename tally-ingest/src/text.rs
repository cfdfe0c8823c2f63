//! Statement bytes to raw page text.
//!
//! An empty string means "no local extraction possible" and is never an
//! error: the orchestrator falls through to the remote path.

use std::io::Write;

use async_trait::async_trait;

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, bytes: &[u8]) -> String;
}

/// Treats the bytes as already-extracted text (`.txt` fixtures, tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract_text(&self, bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

/// Runs `pdftotext -layout <file> -` from poppler-utils.
#[derive(Debug, Clone)]
pub struct PdftotextExtractor {
    command: String,
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new("pdftotext")
    }
}

impl PdftotextExtractor {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }

    async fn run(&self, bytes: &[u8]) -> anyhow::Result<String> {
        let binary = which::which(&self.command)
            .map_err(|_| anyhow::anyhow!("{} not installed (poppler-utils)", self.command))?;

        let mut file = tempfile::Builder::new().prefix("tally-").suffix(".pdf").tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        let output = tokio::process::Command::new(binary)
            .arg("-layout")
            .arg(file.path())
            .arg("-")
            .output()
            .await?;
        if !output.status.success() {
            anyhow::bail!(
                "pdftotext exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl TextExtractor for PdftotextExtractor {
    async fn extract_text(&self, bytes: &[u8]) -> String {
        if !is_pdf(bytes) {
            return String::from_utf8_lossy(bytes).into_owned();
        }
        match self.run(bytes).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "local text extraction unavailable");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_text_passthrough() {
        let text = PlainTextExtractor.extract_text(b"08/21/22 X $1.00").await;
        assert_eq!(text, "08/21/22 X $1.00");
    }

    #[tokio::test]
    async fn test_missing_binary_is_empty_not_error() {
        let extractor = PdftotextExtractor::new("tally-no-such-pdftotext-binary");
        let text = extractor.extract_text(b"%PDF-1.7\n...").await;
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn test_non_pdf_bytes_are_read_as_text() {
        let extractor = PdftotextExtractor::new("tally-no-such-pdftotext-binary");
        assert_eq!(extractor.extract_text(b"already text").await, "already text");
    }
}
