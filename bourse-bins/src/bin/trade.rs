//! Random trading session against one exchange
//!
//! This binary:
//! - Loads configuration (defaults, optional TOML, BOURSE__* overrides)
//! - Opens the exchange's journal and lock files
//! - Generates and submits a random playbook of buys and sells
//! - Prints the trading report to stdout
//!
//! Exits 1 on anything other than a buy refused for lack of supply.

use anyhow::{Context, Result};
use bourse_bins::common::{init_logging, load_config, CommonArgs};
use bourse_bins::playbook;
use bourse_bins::report::TradingReport;
use bourse_core::open_exchange;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::process::ExitCode;

const STOPPED_BANNER: &str = "-------< TRADING STOPPED >-------";

fn main() -> ExitCode {
    // Parse CLI arguments
    let args = CommonArgs::parse();

    match trade(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", STOPPED_BANNER);
            eprintln!("{:#}", e);
            eprintln!("{}", STOPPED_BANNER);
            ExitCode::FAILURE
        }
    }
}

fn trade(args: &CommonArgs) -> Result<()> {
    let config = load_config(args)?;

    // Initialize logging
    init_logging(&config)?;

    tracing::info!("=== Bourse: {} trading session ===", args.exchange);

    let registry = config.registry()?;
    let settings = config.exchange(args.exchange);
    let exchange = open_exchange(args.exchange, settings, registry.clone())
        .with_context(|| format!("Failed to open {} exchange", args.exchange))?;

    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!("Playbook seed: {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let (buys, sells) = playbook::random_counts(&mut rng);
    let orders = playbook::generate(&registry, buys, sells, &mut rng);
    playbook::run(&exchange, &orders).context("Trading run aborted")?;

    let report = TradingReport::collect(&exchange).context("Failed to compile trading report")?;
    println!("{}", report);

    Ok(())
}
