//! tally-ingest: statement classification, per-issuer line grammars,
//! normalization, and the local/remote ingestion fallback.

pub mod classify;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod parsers;
pub mod remote;
pub mod segment;
pub mod telemetry;
pub mod text;
pub mod types;

pub use classify::classify;
pub use error::RemoteError;
pub use normalize::{normalize, normalize_entries, normalize_remote, NormalizeInput, Normalized};
pub use orchestrator::{IngestionResult, Ingestor, Provenance, StatementFile};
pub use parsers::{grammar_for, IssuerGrammar, ParseContext, GRAMMARS};
pub use remote::{DocumentAiClient, RemoteDocument, RemoteExtractor};
pub use remote::document_ai::DocumentAiConfig;
pub use segment::segment;
pub use telemetry::{IngestMetrics, MetricsSnapshot, Telemetry, METRICS};
pub use text::{PdftotextExtractor, PlainTextExtractor, TextExtractor};
pub use types::{ColumnLayout, RawLine, Section, SegmentMode};
