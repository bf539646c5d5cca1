//! Bourse Core - journal-backed stock exchange ledger
//!
//! Every buy and sell accepted by an exchange is appended to a durable,
//! plain-text journal. Nothing else is stored: available volume and total
//! brokerage are derived by replaying the journal in full on every query.
//!
//! ## Architecture
//! - **Append-only journal**: one record per line, never rewritten
//! - **Advisory lock**: sentinel file holding an expiry, shared by every
//!   process that trades on the same exchange
//! - **Injected seams**: `TradeStore` and `JournalLock` are traits, so tests
//!   run against in-memory doubles
//!
//! ## Core Modules
//! - `trade`: record types (`TradeRecord`, `ExchangeCode`, `Side`)
//! - `registry`: closed, injectable set of tradable instruments
//! - `journal`: line codec, file store and sentinel lock
//! - `exchange`: buy/sell validation and journal replays
//! - `config`: layered configuration (defaults, TOML, environment)
//! - `testing`: in-memory doubles and record fixtures

pub mod config;
pub mod error;
pub mod exchange;
pub mod journal;
pub mod registry;
pub mod testing;
pub mod trade;
pub mod utils;

pub use config::{Config, ExchangeSettings};
pub use error::LedgerError;
pub use exchange::{
    open_exchange, FileExchange, JournalBackedExchange, StockExchange, VolumeBook, LOCK_DURATION,
};
pub use journal::{
    FileTradeStore, JournalError, JournalLock, LockError, SentinelFileLock, TradeStore,
};
pub use registry::{Instrument, InstrumentRegistry};
pub use trade::{ExchangeCode, Side, TradeRecord};

/// Prelude for convenient imports
pub mod prelude {
    // Record types
    pub use crate::trade::{ExchangeCode, Side, TradeRecord};
    pub use crate::registry::{Instrument, InstrumentRegistry};

    // Exchange
    pub use crate::exchange::{open_exchange, StockExchange, VolumeBook};

    // Error types
    pub use crate::error::LedgerError;
}
