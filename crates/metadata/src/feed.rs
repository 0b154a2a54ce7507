use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::MetadataError;

/// Placeholder expanded with the lower-cased symbol when building the stream URL
pub const SYMBOL_PLACEHOLDER: &str = "{symbol}";

/// Binance spot 24hr ticker stream
pub const DEFAULT_ENDPOINT: &str = "wss://stream.binance.com:9443/ws/{symbol}@ticker";

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_flush_every() -> usize {
    10
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

/// One ticker feed: where to connect, which symbol, where batches land.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    pub name: String,
    /// URI template, must contain `{symbol}`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub symbol: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Flush the batch whenever its length is a multiple of this
    #[serde(default = "default_flush_every")]
    pub flush_every: usize,
    /// Fixed delay between connect attempts
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

impl FeedConfig {
    pub fn load(path: &Path) -> Result<Self, MetadataError> {
        let content = std::fs::read_to_string(path)?;
        let config: FeedConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Default Binance ticker feed for a single symbol
    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        Self {
            name: "binance".to_string(),
            endpoint: default_endpoint(),
            symbol: symbol.into(),
            output_dir: default_output_dir(),
            flush_every: default_flush_every(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }

    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.name.trim().is_empty() {
            return Err(MetadataError::Validation("name must not be empty".to_string()));
        }
        if self.symbol.trim().is_empty() {
            return Err(MetadataError::Validation("symbol must not be empty".to_string()));
        }
        if !self.endpoint.contains(SYMBOL_PLACEHOLDER) {
            return Err(MetadataError::Validation(format!(
                "endpoint {} does not contain {}",
                self.endpoint, SYMBOL_PLACEHOLDER
            )));
        }
        if self.flush_every == 0 {
            return Err(MetadataError::Validation(
                "flush_every must be greater than zero".to_string(),
            ));
        }
        if self.reconnect_delay_secs == 0 {
            return Err(MetadataError::Validation(
                "reconnect_delay_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Expand the endpoint template with the lower-cased symbol
    pub fn stream_url(&self) -> Result<Url, MetadataError> {
        let expanded = self
            .endpoint
            .replace(SYMBOL_PLACEHOLDER, &self.symbol.to_lowercase());
        Ok(Url::parse(&expanded)?)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}
