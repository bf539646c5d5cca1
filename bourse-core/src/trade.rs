//! Trade record types
//!
//! A [`TradeRecord`] is one accepted buy or sell, exactly as it is stored in
//! the journal. Records are immutable once appended.

use crate::journal::codec::EncodingError;
use crate::registry::Instrument;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Milliseconds since the Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_millis() as u64
}

/// A code that does not name a known exchange or side
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} {value:?}")]
pub struct ParseCodeError {
    pub kind: &'static str,
    pub value: String,
}

/// Exchanges this system can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExchangeCode {
    Asx,
    Cxa,
}

impl ExchangeCode {
    pub const ALL: [ExchangeCode; 2] = [ExchangeCode::Asx, ExchangeCode::Cxa];

    /// Wire form used in the journal
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeCode::Asx => "ASX",
            ExchangeCode::Cxa => "CXA",
        }
    }
}

impl fmt::Display for ExchangeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeCode {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ASX" => Ok(ExchangeCode::Asx),
            "CXA" => Ok(ExchangeCode::Cxa),
            other => Err(ParseCodeError {
                kind: "exchange",
                value: other.to_string(),
            }),
        }
    }
}

/// Trade side (Buy or Sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Units taken off the exchange
    Buy,
    /// Units supplied to the exchange
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(ParseCodeError {
                kind: "side",
                value: other.to_string(),
            }),
        }
    }
}

/// One journal entry: a buy or sell on a single exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRecord {
    /// Which ledger the record belongs to
    pub exchange: ExchangeCode,
    pub side: Side,
    /// When the trade was accepted (ms since epoch). Advisory only; journal
    /// order is the authoritative order.
    pub timestamp_ms: u64,
    pub instrument: Instrument,
    /// Units transacted, at least 1
    pub quantity: u32,
    /// Brokerage charged, in cents. `None` is excluded from cost totals.
    pub fee: Option<u32>,
}

impl TradeRecord {
    pub fn builder() -> TradeRecordBuilder {
        TradeRecordBuilder::default()
    }

    /// Signed effect on the exchange's available volume
    pub fn signed_quantity(&self) -> i64 {
        match self.side {
            Side::Sell => i64::from(self.quantity),
            Side::Buy => -i64::from(self.quantity),
        }
    }
}

impl fmt::Display for TradeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} x{} @{}",
            self.exchange, self.side, self.instrument, self.quantity, self.timestamp_ms
        )?;
        match self.fee {
            Some(fee) => write!(f, " fee={}c", fee),
            None => write!(f, " fee=none"),
        }
    }
}

/// Incremental construction of a [`TradeRecord`].
///
/// `build` names every missing required field at once.
#[derive(Debug, Clone, Default)]
pub struct TradeRecordBuilder {
    exchange: Option<ExchangeCode>,
    side: Option<Side>,
    timestamp_ms: Option<u64>,
    instrument: Option<Instrument>,
    quantity: Option<u32>,
    fee: Option<u32>,
}

impl TradeRecordBuilder {
    pub fn exchange(mut self, exchange: ExchangeCode) -> Self {
        self.exchange = Some(exchange);
        self
    }

    pub fn side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    pub fn timestamp_ms(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    /// Stamp with the current wall-clock time
    pub fn now(self) -> Self {
        self.timestamp_ms(now_ms())
    }

    pub fn instrument(mut self, instrument: Instrument) -> Self {
        self.instrument = Some(instrument);
        self
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn fee(mut self, fee: Option<u32>) -> Self {
        self.fee = fee;
        self
    }

    pub fn build(self) -> Result<TradeRecord, EncodingError> {
        let mut missing = Vec::new();
        if self.exchange.is_none() {
            missing.push("exchange");
        }
        if self.side.is_none() {
            missing.push("side");
        }
        if self.timestamp_ms.is_none() {
            missing.push("timestamp");
        }
        if self.instrument.is_none() {
            missing.push("instrument");
        }
        if self.quantity.is_none() {
            missing.push("quantity");
        }

        match (
            self.exchange,
            self.side,
            self.timestamp_ms,
            self.instrument,
            self.quantity,
        ) {
            (Some(exchange), Some(side), Some(timestamp_ms), Some(instrument), Some(quantity)) => {
                if quantity == 0 {
                    return Err(EncodingError::InvalidQuantity);
                }
                Ok(TradeRecord {
                    exchange,
                    side,
                    timestamp_ms,
                    instrument,
                    quantity,
                    fee: self.fee,
                })
            }
            _ => Err(EncodingError::MissingFields { fields: missing }),
        }
    }
}
