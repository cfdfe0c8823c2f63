//! Per-file fallback between the local grammars and the remote service.
//!
//! ```text
//! Start -> LocalAttempted -> LocalNonEmpty -> Done(local)
//!                         -> LocalEmpty    -> RemoteAttempted -> RemoteSucceeded          -> Done(remote)
//!                                                             -> RemoteFailed | Disabled  -> Done(none)
//! ```
//!
//! The remote service is metered, so it only runs when the local path
//! produced nothing. No outcome is an error for the caller: failures end in
//! `Done(none)` with warnings.

use std::time::Instant;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tally_core::{CanonicalTransaction, Issuer, StatementPeriod};

use crate::classify::classify;
use crate::error::RemoteError;
use crate::normalize::{normalize_entries, normalize_remote, remote_facts};
use crate::parsers::{account_suffix, any_filename_year, base_name, grammar_for, parse_lines, ParseContext};
use crate::remote::{RemoteExtractor, PDF_MIME_TYPE};
use crate::segment::segment_with;
use crate::telemetry::{Telemetry, METRICS};
use crate::text::TextExtractor;

/// One submitted statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFile {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl StatementFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Local,
    Remote,
    None,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Provenance::Local => "local",
            Provenance::Remote => "remote",
            Provenance::None => "none",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionResult {
    pub file_name: Option<String>,
    pub issuer: Issuer,
    pub transactions: Vec<CanonicalTransaction>,
    pub provenance: Provenance,
    pub telemetry: Telemetry,
    pub warnings: Vec<String>,
}

/// Statement-level facts stamped onto every transaction.
#[derive(Debug, Clone, Default)]
struct StatementFacts {
    issuer: Option<String>,
    account_id: Option<String>,
    period: StatementPeriod,
}

fn stamp(transactions: &mut [CanonicalTransaction], facts: &StatementFacts) {
    for t in transactions {
        if t.source_issuer.is_none() {
            t.source_issuer = facts.issuer.clone();
        }
        t.account_id = facts.account_id.clone();
        t.statement_period = facts.period;
    }
}

struct LocalOutcome {
    transactions: Vec<CanonicalTransaction>,
    warnings: Vec<String>,
}

pub struct Ingestor {
    text: Box<dyn TextExtractor>,
    remote: Option<Box<dyn RemoteExtractor>>,
    today: Option<NaiveDate>,
}

impl Ingestor {
    pub fn new(text: Box<dyn TextExtractor>) -> Self {
        Self {
            text,
            remote: None,
            today: None,
        }
    }

    pub fn with_remote(mut self, remote: Box<dyn RemoteExtractor>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Pin the current-date fallback used for year inference.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Run the local path over already-extracted text.
    fn ingest_local(&self, text: &str, file_name: Option<&str>, issuer: Issuer, telemetry: &mut Telemetry) -> LocalOutcome {
        let Some(grammar) = grammar_for(issuer) else {
            return LocalOutcome {
                transactions: Vec::new(),
                warnings: Vec::new(),
            };
        };
        let started = Instant::now();
        let ctx = grammar.infer_context(text, file_name, self.today());
        let lines = segment_with(text, grammar);
        let parsed = parse_lines(grammar, &lines, &ctx);
        let mut normalized = normalize_entries(&parsed.entries, issuer, ctx.statement_year);

        let facts = StatementFacts {
            issuer: Some(issuer.as_str().to_string()),
            account_id: account_suffix(text),
            period: (grammar.statement_period)(text).unwrap_or_default(),
        };
        stamp(&mut normalized.transactions, &facts);

        telemetry.lines_segmented = lines.len();
        telemetry.lines_skipped = parsed.garbage + parsed.skipped;
        telemetry.local_latency_ms = Some(started.elapsed().as_millis() as u64);
        tracing::debug!(
            issuer = %issuer,
            year = ctx.statement_year,
            lines = lines.len(),
            garbage = parsed.garbage,
            skipped = parsed.skipped,
            transactions = normalized.transactions.len(),
            "local extraction"
        );

        LocalOutcome {
            transactions: normalized.transactions,
            warnings: normalized.warnings,
        }
    }

    async fn ingest_remote(
        &self,
        remote: &dyn RemoteExtractor,
        file: &StatementFile,
        issuer: Issuer,
        telemetry: &mut Telemetry,
    ) -> Result<LocalOutcome, RemoteError> {
        let started = Instant::now();
        let result = remote.extract(&file.bytes, PDF_MIME_TYPE).await;
        telemetry.latency_ms = Some(started.elapsed().as_millis() as u64);
        let doc = result?;
        telemetry.entity_count = doc.entity_count();

        let fallback_year = file
            .file_name
            .as_deref()
            .and_then(|f| any_filename_year(base_name(f)))
            .unwrap_or_else(|| self.today().year());
        let probe = remote_facts(&doc, fallback_year);
        let ctx = match probe.period.end {
            Some(end) => ParseContext::new(end.year()).with_closing_month(end.month()),
            None => ParseContext::new(fallback_year),
        };
        let facts = remote_facts(&doc, ctx.statement_year);

        let mut normalized = normalize_remote(&doc, issuer, &ctx);
        stamp(
            &mut normalized.transactions,
            &StatementFacts {
                issuer: issuer.is_known().then(|| issuer.as_str().to_string()),
                account_id: facts.account_id,
                period: facts.period,
            },
        );
        Ok(LocalOutcome {
            transactions: normalized.transactions,
            warnings: normalized.warnings,
        })
    }

    /// Extract, classify, parse and normalize one statement.
    pub async fn ingest(&self, file: &StatementFile) -> IngestionResult {
        let file_name = file.file_name.as_deref();
        let mut telemetry = Telemetry {
            enabled: self.remote.is_some(),
            processor_identifier: self.remote.as_ref().and_then(|r| r.processor_id()),
            attempted_source: Some("local".to_string()),
            ..Telemetry::default()
        };
        let mut warnings = Vec::new();

        let text = self.text.extract_text(&file.bytes).await;
        let issuer = if text.trim().is_empty() {
            warnings.push("no text could be extracted locally".to_string());
            Issuer::Unknown
        } else {
            classify(&text, file_name)
        };

        let local = self.ingest_local(&text, file_name, issuer, &mut telemetry);
        warnings.extend(local.warnings);
        if !local.transactions.is_empty() {
            return self.finish(file, issuer, local.transactions, Provenance::Local, telemetry, warnings);
        }
        if issuer.is_known() {
            warnings.push(format!("{issuer} grammar found no transactions"));
        } else if !text.trim().is_empty() {
            warnings.push("statement issuer not recognized".to_string());
        }

        let Some(remote) = self.remote.as_deref() else {
            tracing::info!(file = file_name.unwrap_or("-"), "local path empty and remote extraction disabled");
            warnings.push("remote extraction disabled; no transactions extracted".to_string());
            return self.finish(file, issuer, Vec::new(), Provenance::None, telemetry, warnings);
        };

        telemetry.attempted_source = Some("remote".to_string());
        tracing::info!(file = file_name.unwrap_or("-"), issuer = %issuer, "falling back to remote extraction");
        match self.ingest_remote(remote, file, issuer, &mut telemetry).await {
            Ok(outcome) => {
                warnings.extend(outcome.warnings);
                if outcome.transactions.is_empty() {
                    warnings.push("remote extraction ran but found no transactions".to_string());
                }
                self.finish(file, issuer, outcome.transactions, Provenance::Remote, telemetry, warnings)
            }
            Err(e) => {
                tracing::warn!(file = file_name.unwrap_or("-"), error = %e, "remote extraction failed");
                warnings.push(e.to_string());
                self.finish(file, issuer, Vec::new(), Provenance::None, telemetry, warnings)
            }
        }
    }

    fn finish(
        &self,
        file: &StatementFile,
        issuer: Issuer,
        transactions: Vec<CanonicalTransaction>,
        provenance: Provenance,
        telemetry: Telemetry,
        warnings: Vec<String>,
    ) -> IngestionResult {
        METRICS.record(provenance);
        tracing::info!(
            file = file.file_name.as_deref().unwrap_or("-"),
            issuer = %issuer,
            provenance = %provenance,
            transactions = transactions.len(),
            warnings = warnings.len(),
            "ingested statement"
        );
        IngestionResult {
            file_name: file.file_name.clone(),
            issuer,
            transactions,
            provenance,
            telemetry,
            warnings,
        }
    }
}
