//! Runtime configuration.
//!
//! Defaults are compiled in, a TOML file may override any of them, and the
//! CLI (flags or environment variables, see `main.rs`) overrides the file.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub sampling: SamplingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// CSV with a header row; first column holds the product code
    pub product_codes: PathBuf,
    /// JSON object keyed by product code, or an array of records
    pub product_graph: PathBuf,
    /// Pause between streamed lines. Zero streams as fast as the client reads.
    pub line_delay_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8066,
            product_codes: PathBuf::from("product_codes.csv"),
            product_graph: PathBuf::from("productGraph.json"),
            line_delay_ms: 100,
        }
    }
}

impl ServerConfig {
    pub fn line_delay(&self) -> Duration {
        Duration::from_millis(self.line_delay_ms)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8066".to_string(),
            max_attempts: 3,
            backoff_ms: 1000,
        }
    }
}

/// What the generator does when asked for more items than exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SamplingPolicy {
    /// Fail the generation with `Error::Sampling`
    #[default]
    Strict,
    /// Draw everything that is available
    Clamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub min_products: usize,
    pub max_products: usize,
    pub categories: usize,
    pub min_associated: usize,
    pub max_associated: usize,
    pub policy: SamplingPolicy,
    /// Fixed seed for reproducible sample sequences
    pub seed: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            min_products: 20,
            max_products: 50,
            categories: 5,
            min_associated: 3,
            max_associated: 10,
            policy: SamplingPolicy::Strict,
            seed: None,
        }
    }
}

impl Config {
    /// Load from a TOML file, falling back to defaults for missing keys.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.sampling;
        if s.min_products > s.max_products {
            return Err(Error::Config(format!(
                "sampling.min_products ({}) exceeds sampling.max_products ({})",
                s.min_products, s.max_products
            )));
        }
        if s.min_associated > s.max_associated {
            return Err(Error::Config(format!(
                "sampling.min_associated ({}) exceeds sampling.max_associated ({})",
                s.min_associated, s.max_associated
            )));
        }
        if self.client.max_attempts == 0 {
            return Err(Error::Config(
                "client.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.client.base_url.trim().is_empty() {
            return Err(Error::Config("client.base_url is empty".to_string()));
        }
        Ok(())
    }
}
