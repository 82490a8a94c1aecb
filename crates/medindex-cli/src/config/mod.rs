//! Configuration loading for medindex.
//! Reads medindex.toml from the current directory or path in MEDINDEX_CONFIG env var.
//! The file is optional; every field has a default.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use medindex_common::{MedindexError, Result, SourceFormat};
use medindex_db::{ElasticConfig, RetryPolicy};
use medindex_ingestion::TextNormaliser;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub normaliser: NormaliserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,
    /// Prepended to every collection name, e.g. `"test-"`.
    #[serde(default)]
    pub collection_prefix: String,
}

fn default_store_url()       -> String { "http://localhost:9200".to_string() }
fn default_timeout_secs()    -> u64    { 30 }
fn default_connect_retries() -> u32    { 3 }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            timeout_secs: default_timeout_secs(),
            connect_retries: default_connect_retries(),
            collection_prefix: String::new(),
        }
    }
}

impl StoreConfig {
    pub fn elastic_config(&self) -> ElasticConfig {
        ElasticConfig {
            url: self.url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            connect_retries: self.connect_retries,
        }
    }

    pub fn collection_for(&self, format: SourceFormat) -> String {
        format!("{}{}", self.collection_prefix, format.collection())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_write_attempts")]
    pub write_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_concurrency()    -> usize { 4 }
fn default_queue_capacity() -> usize { 1024 }
fn default_write_attempts() -> u32   { 5 }
fn default_retry_delay_ms() -> u64   { 1000 }

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            queue_capacity: default_queue_capacity(),
            write_attempts: default_write_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl IngestionConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.write_attempts, Duration::from_millis(self.retry_delay_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormaliserConfig {
    #[serde(default = "bool_true")]
    pub lowercase: bool,
    #[serde(default)]
    pub extra_stop_words: Vec<String>,
}

fn bool_true() -> bool { true }

impl Default for NormaliserConfig {
    fn default() -> Self {
        Self { lowercase: true, extra_stop_words: Vec::new() }
    }
}

impl NormaliserConfig {
    pub fn build(&self) -> TextNormaliser {
        TextNormaliser::new(self.lowercase, &self.extra_stop_words)
    }
}


impl Config {
    /// Load configuration from medindex.toml.
    /// Checks MEDINDEX_CONFIG env var first, then current directory.
    /// A missing default file yields the built-in defaults.
    pub fn load() -> Result<Self> {
        match std::env::var("MEDINDEX_CONFIG") {
            Ok(path) => Self::load_from(Path::new(&path)),
            Err(_) if Path::new("medindex.toml").exists() => Self::load_from(Path::new("medindex.toml")),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Load an explicitly named file; it must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MedindexError::Config(format!(
                "Config file not found: {}\n\
                 Copy medindex.example.toml to medindex.toml and edit it.",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| MedindexError::Config(e.to_string()))
    }
}
