//! Random trading playbook
//!
//! A playbook is a shuffled mix of buy and sell orders of random size. There
//! is no guarantee that sells come before the buys they would satisfy, so a
//! realistic share of buys gets rejected for lack of supply.

use bourse_core::{Instrument, InstrumentRegistry, LedgerError, Side, StockExchange};
use rand::Rng;
use std::fmt;
use tracing::{debug, info, warn};

/// Upper bound on orders of each side per playbook
pub const MAX_ORDERS_PER_SIDE: u32 = 40;

/// Upper bound on units per order
pub const MAX_ORDER_UNITS: u32 = 100;

/// One order to submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub side: Side,
    pub instrument: Instrument,
    pub quantity: u32,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} x{}", self.side, self.instrument, self.quantity)
    }
}

/// Outcome of submitting a playbook
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub buys_accepted: usize,
    pub buys_rejected: usize,
    pub sells_accepted: usize,
}

impl RunSummary {
    pub fn submitted(&self) -> usize {
        self.buys_accepted + self.buys_rejected + self.sells_accepted
    }
}

/// Buy and sell counts, each uniform in `1..=MAX_ORDERS_PER_SIDE`
pub fn random_counts<R: Rng + ?Sized>(rng: &mut R) -> (u32, u32) {
    (
        rng.gen_range(1..=MAX_ORDERS_PER_SIDE),
        rng.gen_range(1..=MAX_ORDERS_PER_SIDE),
    )
}

/// Interleave exactly `buys` buy orders and `sells` sell orders.
///
/// Each slot goes to a fair coin flip while both sides have orders left.
/// Instruments are drawn uniformly from the registry, quantities uniformly
/// from `1..=MAX_ORDER_UNITS`.
pub fn generate<R: Rng + ?Sized>(
    registry: &InstrumentRegistry,
    buys: u32,
    sells: u32,
    rng: &mut R,
) -> Vec<Order> {
    // registries are never empty
    let instruments: Vec<&Instrument> = registry.iter().collect();
    let mut remaining_buys = buys;
    let mut remaining_sells = sells;
    let mut orders = Vec::with_capacity((buys + sells) as usize);

    while remaining_buys > 0 || remaining_sells > 0 {
        let side = match (remaining_buys, remaining_sells) {
            (0, _) => Side::Sell,
            (_, 0) => Side::Buy,
            _ if rng.gen_bool(0.5) => Side::Buy,
            _ => Side::Sell,
        };
        match side {
            Side::Buy => remaining_buys -= 1,
            Side::Sell => remaining_sells -= 1,
        }

        let instrument = instruments[rng.gen_range(0..instruments.len())].clone();
        orders.push(Order {
            side,
            instrument,
            quantity: rng.gen_range(1..=MAX_ORDER_UNITS),
        });
    }

    orders
}

/// Submit orders in sequence.
///
/// A buy refused for insufficient units is logged and skipped. Any other
/// failure stops the run.
pub fn run<E: StockExchange + ?Sized>(
    exchange: &E,
    orders: &[Order],
) -> Result<RunSummary, LedgerError> {
    let mut summary = RunSummary::default();
    info!(
        "Submitting {} orders to {}",
        orders.len(),
        exchange.exchange_code()
    );

    for order in orders {
        let code = order.instrument.as_str();
        match order.side {
            Side::Sell => {
                exchange.sell(code, order.quantity)?;
                summary.sells_accepted += 1;
            }
            Side::Buy => match exchange.buy(code, order.quantity) {
                Ok(()) => summary.buys_accepted += 1,
                Err(e) if e.is_insufficient_units() => {
                    warn!("Refused {}: {}", order, e);
                    summary.buys_rejected += 1;
                }
                Err(e) => return Err(e),
            },
        }
        debug!("Submitted {}", order);
    }

    info!(
        "Run complete: {} sells, {} buys accepted, {} buys refused",
        summary.sells_accepted, summary.buys_accepted, summary.buys_rejected
    );
    Ok(summary)
}
