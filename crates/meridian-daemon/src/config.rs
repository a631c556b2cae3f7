//! Configuration file management.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use meridian_oracle::stub::DEFAULT_PERIOD as DEFAULT_SOURCE_PERIOD;
use meridian_oracle::AggregatorConfig;
use meridian_types::{QuoteToken, SourceId, TokenId, UFixed};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "MERIDIAN_DATA_DIR";

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Aggregator settings.
    #[serde(default)]
    pub aggregator: AggregatorSection,
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Fixed-rate underlying oracles.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// Aggregator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorSection {
    /// Identifier of the aggregator.
    #[serde(default = "default_aggregator_id")]
    pub id: SourceId,
    /// Staleness period in seconds.
    #[serde(default = "default_period")]
    pub period: u64,
    /// Seconds between polls of the configured tokens.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Tokens kept up to date by the poll loop.
    #[serde(default)]
    pub tokens: Vec<TokenId>,
    /// The token prices are quoted in.
    #[serde(default = "default_quote_token")]
    pub quote_token: QuoteToken,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
    /// Keep observations in an in-memory database.
    #[serde(default)]
    pub in_memory: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// A fixed-rate underlying oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: SourceId,
    /// Decimals of the quote token amounts this source reports.
    #[serde(default = "default_source_decimals")]
    pub decimals: u8,
    /// The source's own staleness period.
    #[serde(default = "default_source_period")]
    pub period: u64,
    /// Restrict the source to one token. Absent = general source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenId>,
    #[serde(default)]
    pub rates: Vec<RateConfig>,
}

/// One token's fixed rate. Amounts are decimal strings since they exceed
/// TOML's 64-bit integers.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateConfig {
    pub token: TokenId,
    #[serde_as(as = "DisplayFromStr")]
    pub price: UFixed,
    #[serde_as(as = "DisplayFromStr")]
    pub token_liquidity: UFixed,
    #[serde_as(as = "DisplayFromStr")]
    pub quote_token_liquidity: UFixed,
}

// Default value functions

fn default_aggregator_id() -> SourceId {
    SourceId::repeat_byte(0xAA)
}

fn default_period() -> u64 {
    300
}

fn default_poll_interval() -> u64 {
    15
}

fn default_quote_token() -> QuoteToken {
    QuoteToken {
        name: "USD Coin".to_string(),
        address: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
            .parse()
            .unwrap_or_default(),
        symbol: "USDC".to_string(),
        decimals: 6,
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_source_decimals() -> u8 {
    6
}

fn default_source_period() -> u64 {
    DEFAULT_SOURCE_PERIOD
}

impl Default for AggregatorSection {
    fn default() -> Self {
        Self {
            id: default_aggregator_id(),
            period: default_period(),
            poll_interval_secs: default_poll_interval(),
            tokens: Vec::new(),
            quote_token: default_quote_token(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl AggregatorSection {
    /// The oracle-level configuration.
    pub fn oracle_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            id: self.id,
            quote_token: self.quote_token.clone(),
            period: self.period,
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reject settings the daemon cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.aggregator.poll_interval_secs > 0,
            "aggregator.poll_interval_secs must be positive"
        );
        for source in &self.sources {
            if let Some(token) = source.token {
                for rate in &source.rates {
                    anyhow::ensure!(
                        rate.token == token,
                        "source {} is specific to {token} but has a rate for {}",
                        source.id,
                        rate.token
                    );
                }
            }
        }
        Ok(())
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/Meridian")
        }
        #[cfg(target_os = "windows")]
        {
            dirs_fallback("Meridian")
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            dirs_fallback(".meridian")
        }
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/meridian"))
}
