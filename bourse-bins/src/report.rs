//! End-of-run trading report

use bourse_core::{ExchangeCode, LedgerError, StockExchange, VolumeBook};
use rust_decimal::Decimal;
use std::fmt;

/// Snapshot of an exchange's costs and order book
#[derive(Debug, Clone, PartialEq)]
pub struct TradingReport {
    pub exchange: ExchangeCode,
    pub trading_costs: Decimal,
    pub volumes: VolumeBook,
}

impl TradingReport {
    pub fn collect<E: StockExchange + ?Sized>(exchange: &E) -> Result<Self, LedgerError> {
        Ok(Self {
            exchange: exchange.exchange_code(),
            trading_costs: exchange.trading_costs()?,
            volumes: exchange.order_book_total_volume()?,
        })
    }
}

impl fmt::Display for TradingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--------< {}: Trading Report START >--------------", self.exchange)?;
        let costs = format!("{:.2}", self.trading_costs);
        writeln!(f, "Total brokerage charged ${:>9}", costs)?;
        writeln!(f, "Stock volumes")?;
        for (instrument, volume) in &self.volumes {
            writeln!(f, "{} : {} units", instrument, volume)?;
        }
        write!(f, "--------< {}: Trading Report END >--------------", self.exchange)
    }
}
