//! Google Document AI bank-statement processor client.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::{RemoteDocument, RemoteExtractor};
use crate::error::RemoteError;

/// `[remote]` section of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentAiConfig {
    pub enabled: bool,
    pub project_id: Option<String>,
    pub location: String,
    pub processor_id: Option<String>,
    /// Overrides `https://{location}-documentai.googleapis.com`.
    pub endpoint: Option<String>,
    /// Environment variable holding the OAuth bearer token.
    pub access_token_env: String,
    pub timeout_secs: u64,
}

impl Default for DocumentAiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            project_id: None,
            location: "us".to_string(),
            processor_id: None,
            endpoint: None,
            access_token_env: "TALLY_DOCAI_TOKEN".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequest<'a> {
    raw_document: RawDocumentBody<'a>,
    skip_human_review: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RawDocumentBody<'a> {
    content: String,
    mime_type: &'a str,
}

pub struct DocumentAiClient {
    http: reqwest::Client,
    url: String,
    processor_name: String,
    token: String,
}

impl std::fmt::Debug for DocumentAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentAiClient")
            .field("url", &self.url)
            .field("processor_name", &self.processor_name)
            .finish_non_exhaustive()
    }
}

impl DocumentAiClient {
    /// Build a client, or say why remote extraction is disabled.
    pub fn from_config(cfg: &DocumentAiConfig) -> Result<Self, RemoteError> {
        if !cfg.enabled {
            return Err(RemoteError::Disabled("remote.enabled is false".to_string()));
        }
        let token = std::env::var(&cfg.access_token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| RemoteError::Disabled(format!("{} is not set", cfg.access_token_env)))?;
        Self::new(cfg, token)
    }

    /// Build a client with an explicit bearer token.
    pub fn new(cfg: &DocumentAiConfig, token: impl Into<String>) -> Result<Self, RemoteError> {
        let project = cfg
            .project_id
            .as_deref()
            .ok_or_else(|| RemoteError::Disabled("remote.project_id is missing".to_string()))?;
        let processor = cfg
            .processor_id
            .as_deref()
            .ok_or_else(|| RemoteError::Disabled("remote.processor_id is missing".to_string()))?;

        let endpoint = cfg
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}-documentai.googleapis.com", cfg.location));
        let processor_name = format!("projects/{project}/locations/{}/processors/{processor}", cfg.location);
        let url = format!("{}/v1/{processor_name}:process", endpoint.trim_end_matches('/'));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url,
            processor_name,
            token: token.into(),
        })
    }

    fn headers(&self) -> Result<HeaderMap, RemoteError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|e| RemoteError::Disabled(format!("unusable access token: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl RemoteExtractor for DocumentAiClient {
    fn processor_id(&self) -> Option<String> {
        Some(self.processor_name.clone())
    }

    async fn extract(&self, bytes: &[u8], document_type: &str) -> Result<RemoteDocument, RemoteError> {
        let body = ProcessRequest {
            raw_document: RawDocumentBody {
                content: base64::engine::general_purpose::STANDARD.encode(bytes),
                mime_type: document_type,
            },
            skip_human_review: true,
        };

        tracing::debug!(processor = %self.processor_name, bytes = bytes.len(), "document ai request");
        let resp = self
            .http
            .post(&self.url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        RemoteDocument::from_response_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> DocumentAiConfig {
        DocumentAiConfig {
            enabled: true,
            project_id: Some("acme-books".into()),
            processor_id: Some("abc123".into()),
            ..DocumentAiConfig::default()
        }
    }

    #[test]
    fn test_default_endpoint_from_location() {
        let client = DocumentAiClient::new(&configured(), "t").unwrap();
        assert_eq!(
            client.url,
            "https://us-documentai.googleapis.com/v1/projects/acme-books/locations/us/processors/abc123:process"
        );
        assert_eq!(
            client.processor_id().as_deref(),
            Some("projects/acme-books/locations/us/processors/abc123")
        );
    }

    #[test]
    fn test_missing_pieces_are_disabled() {
        let off = DocumentAiConfig::default();
        assert!(DocumentAiClient::from_config(&off).unwrap_err().is_disabled());

        let no_processor = DocumentAiConfig {
            processor_id: None,
            ..configured()
        };
        assert!(DocumentAiClient::new(&no_processor, "t").unwrap_err().is_disabled());

        let no_token = DocumentAiConfig {
            access_token_env: "TALLY_TEST_TOKEN_THAT_IS_NEVER_SET".into(),
            ..configured()
        };
        assert!(DocumentAiClient::from_config(&no_token).unwrap_err().is_disabled());
    }
}
