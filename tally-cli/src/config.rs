use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tally_export::LockSettings;
use tally_ingest::DocumentAiConfig;

use crate::state::{ensure_tally_home, tally_home};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: DocumentAiConfig,
    pub export: ExportSection,
    pub extract: ExtractSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    pub lock_ttl_secs: u64,
    pub lock_max_wait_secs: u64,
    pub lock_base_backoff_ms: u64,
    pub lock_max_backoff_ms: u64,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            lock_ttl_secs: 120,
            lock_max_wait_secs: 30,
            lock_base_backoff_ms: 100,
            lock_max_backoff_ms: 2000,
        }
    }
}

impl ExportSection {
    pub fn lock_settings(&self) -> LockSettings {
        LockSettings {
            ttl: Duration::from_secs(self.lock_ttl_secs),
            max_wait: Duration::from_secs(self.lock_max_wait_secs),
            base_backoff: Duration::from_millis(self.lock_base_backoff_ms),
            max_backoff: Duration::from_millis(self.lock_max_backoff_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractSection {
    /// Binary used for local PDF text extraction.
    pub pdftotext_command: String,
}

impl Default for ExtractSection {
    fn default() -> Self {
        Self {
            pdftotext_command: "pdftotext".to_string(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(tally_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config_to(cfg: &Config, p: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = ensure_tally_home()?.join("config.toml");
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config_to(&Config::default(), &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}
