//! Common utilities for all binaries
//!
//! Shared initialization, CLI parsing, and setup code.

use anyhow::{Context, Result};
use bourse_core::utils::init_logger;
use bourse_core::{Config, ExchangeCode};
use clap::Parser;
use std::path::PathBuf;

/// Common CLI arguments for all binaries
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CommonArgs {
    /// Exchange to trade on (ASX or CXA)
    #[arg(short, long)]
    pub exchange: ExchangeCode,

    /// TOML configuration file (defaults and BOURSE__* variables apply without one)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level, overriding the configured one
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Seed for the random playbook, for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Load configuration and fold in command-line overrides
pub fn load_config(args: &CommonArgs) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref()).with_context(|| match &args.config {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })?;

    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json = true;
    }

    config.validate()?;
    Ok(config)
}

/// Initialize tracing/logging
pub fn init_logging(config: &Config) -> Result<()> {
    init_logger(&config.logging.level, config.logging.json)
}
