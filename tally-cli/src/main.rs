use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use tally_core::CanonicalTransaction;
use tally_export::{CooperativeLock, CsvSheet, DedupExporter, FileReservation};
use tally_ingest::{
    classify, DocumentAiClient, IngestionResult, Ingestor, PdftotextExtractor, StatementFile, TextExtractor,
    METRICS,
};

mod config;
mod state;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TALLY_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "tally", version = VERSION, about = "Bank and card statement ingestion")]
struct Cli {
    /// Log at debug level (twice for trace) regardless of RUST_LOG
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the issuer tag for a statement
    Classify {
        /// Statement PDF, or already-extracted .txt
        file: PathBuf,
    },

    /// Extract canonical transactions from one or more statements
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Year to assume when neither the statement nor its filename gives one
        #[arg(long)]
        year: Option<i32>,
    },

    /// Ingest statements and append new transactions to a CSV sheet
    Append {
        /// Destination CSV; created on first use
        #[arg(long)]
        sheet: PathBuf,

        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long)]
        year: Option<i32>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config to ~/.tally/config.toml
    Init,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Classify { file } => {
            let cfg = config::load_config()?;
            let extractor = PdftotextExtractor::new(cfg.extract.pdftotext_command);
            let bytes = read_input(&file)?;
            let text = extractor.extract_text(&bytes).await;
            println!("{}", classify(&text, file.to_str()));
        }

        Command::Ingest { files, json, year } => {
            let cfg = config::load_config()?;
            let results = ingest_all(&files, &cfg, year).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results).context("serialize results")?);
            } else {
                for r in &results {
                    print_result(r);
                }
            }
            let m = METRICS.snapshot();
            tracing::info!(files = m.files, local = m.local, remote = m.remote, none = m.none, "batch complete");
        }

        Command::Append { sheet, files, year } => {
            let cfg = config::load_config()?;
            let results = ingest_all(&files, &cfg, year).await?;
            let transactions: Vec<CanonicalTransaction> =
                results.into_iter().flat_map(|r| r.transactions).collect();

            let exporter = exporter_for(&sheet, &cfg)?;
            let report = exporter
                .append(&transactions)
                .await
                .with_context(|| format!("append to {}", sheet.display()))?;
            println!(
                "Appended {} transactions to {} ({} duplicates skipped)",
                report.appended,
                sheet.display(),
                report.duplicate_count
            );
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
        },
    }

    Ok(())
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        bail!("file not found: {}", path.display());
    }
    std::fs::read(path).with_context(|| format!("read {}", path.display()))
}

fn build_ingestor(cfg: &config::Config, year: Option<i32>) -> Ingestor {
    let mut ingestor = Ingestor::new(Box::new(PdftotextExtractor::new(cfg.extract.pdftotext_command.clone())));
    match DocumentAiClient::from_config(&cfg.remote) {
        Ok(client) => ingestor = ingestor.with_remote(Box::new(client)),
        Err(e) => tracing::debug!(reason = %e, "remote extraction not configured"),
    }
    if let Some(today) = year.and_then(|y| chrono::NaiveDate::from_ymd_opt(y, 12, 31)) {
        ingestor = ingestor.with_today(today);
    }
    ingestor
}

/// Ingest every file in order. A file that cannot be read or yields nothing
/// is reported and skipped; the batch continues.
async fn ingest_all(files: &[PathBuf], cfg: &config::Config, year: Option<i32>) -> Result<Vec<IngestionResult>> {
    let ingestor = build_ingestor(cfg, year);

    let mut results = Vec::with_capacity(files.len());
    for path in files {
        let bytes = match read_input(path) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("warning: {e:#}");
                continue;
            }
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let result = ingestor.ingest(&StatementFile::new(name, bytes)).await;
        if result.transactions.is_empty() {
            eprintln!(
                "warning: {} yielded no transactions ({})",
                path.display(),
                result.warnings.join("; ")
            );
        }
        results.push(result);
    }
    Ok(results)
}

fn exporter_for(sheet: &Path, cfg: &config::Config) -> Result<DedupExporter> {
    let dir = match sheet.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = sheet
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("sheet path has no file name")?;
    let lock = CooperativeLock::new(FileReservation::new(dir), name, cfg.export.lock_settings());
    Ok(DedupExporter::new(Box::new(lock), Box::new(CsvSheet::new(sheet))))
}

fn print_result(r: &IngestionResult) {
    println!(
        "# {} [{}] via {}: {} transactions",
        r.file_name.as_deref().unwrap_or("-"),
        r.issuer,
        r.provenance,
        r.transactions.len()
    );
    for t in &r.transactions {
        let date = t.date.map(|d| d.to_string()).unwrap_or_else(|| "----------".to_string());
        let amount = t.net_amount();
        let flag = if t.metadata.is_empty() { "" } else { "  *" };
        println!("{date}  {amount:>12}  {}{flag}", t.description);
    }
    for w in &r.warnings {
        println!("  ! {w}");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ingest_all_uses_given_config_and_skips_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let statement = dir.path().join("amex.txt");
        std::fs::write(
            &statement,
            "American Express\nClosing Date 09/20/22\n08/21/22 AMERICAN EXPRESS TRAVEL SEATTLE WA $500.19\n",
        )
        .unwrap();

        let mut cfg = config::Config::default();
        cfg.extract.pdftotext_command = "tally-no-such-pdftotext".to_string();
        let files = vec![dir.path().join("missing.pdf"), statement];

        let results = ingest_all(&files, &cfg, Some(2022)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].issuer, tally_core::Issuer::Amex);
        assert_eq!(results[0].transactions.len(), 1);
        assert!(!results[0].telemetry.enabled);
    }
}
