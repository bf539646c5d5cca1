use crate::registry::DEFAULT_INSTRUMENTS;
use crate::trade::ExchangeCode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Brokerage charged per trade when nothing is configured (cents)
pub const DEFAULT_BROKERAGE_CENTS: u32 = 5;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub market: MarketConfig,

    #[serde(default = "default_asx")]
    pub asx: ExchangeSettings,

    #[serde(default = "default_cxa")]
    pub cxa: ExchangeSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            market: MarketConfig::default(),
            asx: default_asx(),
            cxa: default_cxa(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Instruments open for trading on every exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "default_instruments")]
    pub instruments: Vec<String>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            instruments: default_instruments(),
        }
    }
}

/// Everything one exchange needs, already resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeSettings {
    /// Brokerage stamped on each accepted trade, in cents
    pub brokerage_cents: u32,

    /// Append-only trade journal
    pub journal_path: PathBuf,

    /// Lock sentinel guarding the journal
    pub lock_path: PathBuf,
}

impl ExchangeSettings {
    /// Defaults for an exchange: `data/<code>_journal.{csv,lock}`
    pub fn for_exchange(exchange: ExchangeCode) -> Self {
        let stem = format!("data/{}_journal", exchange.as_str().to_lowercase());
        Self {
            brokerage_cents: DEFAULT_BROKERAGE_CENTS,
            journal_path: PathBuf::from(format!("{}.csv", stem)),
            lock_path: PathBuf::from(format!("{}.lock", stem)),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_instruments() -> Vec<String> {
    DEFAULT_INSTRUMENTS.iter().map(|c| c.to_string()).collect()
}

fn default_asx() -> ExchangeSettings {
    ExchangeSettings::for_exchange(ExchangeCode::Asx)
}

fn default_cxa() -> ExchangeSettings {
    ExchangeSettings::for_exchange(ExchangeCode::Cxa)
}
