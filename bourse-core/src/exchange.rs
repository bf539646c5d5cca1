//! Journal-backed stock exchange
//!
//! The exchange keeps no state of its own beyond its configuration. Every
//! question ("how many CBA are available?", "what has brokerage cost?") is
//! answered by replaying the whole journal.
//!
//! ## Flow
//! ```text
//! buy/sell ──> validate ──> acquire lock ──> read journal ──> check ──> append ──> release
//! ```
//!
//! Validation failures never touch the lock. Once the lock is held it is
//! released by [`LockGuard`] on every exit path.

use crate::config::ExchangeSettings;
use crate::error::LedgerError;
use crate::journal::{
    FileTradeStore, JournalError, JournalLock, LockToken, SentinelFileLock, TradeStore,
};
use crate::registry::{Instrument, InstrumentRegistry};
use crate::trade::{ExchangeCode, Side, TradeRecord};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, error, warn};

/// How long an exchange holds the journal lock per operation
pub const LOCK_DURATION: Duration = Duration::from_millis(5_000);

/// Net units of each instrument offered on an exchange
pub type VolumeBook = BTreeMap<Instrument, u64>;

/// The four operations drivers and reports rely on
pub trait StockExchange {
    /// Which exchange this is
    fn exchange_code(&self) -> ExchangeCode;

    /// Take `units` of `code` off the exchange. Fails with
    /// [`LedgerError::InsufficientUnits`] when fewer are on offer.
    fn buy(&self, code: &str, units: u32) -> Result<(), LedgerError>;

    /// Offer `units` of `code` on the exchange. Never supply-constrained.
    fn sell(&self, code: &str, units: u32) -> Result<(), LedgerError>;

    /// Units currently on offer, per instrument ever traded here
    fn order_book_total_volume(&self) -> Result<VolumeBook, LedgerError>;

    /// Total brokerage charged, in dollars
    fn trading_costs(&self) -> Result<Decimal, LedgerError>;
}

/// Releases the journal lock when dropped
struct LockGuard<'a, L: JournalLock + ?Sized> {
    lock: &'a L,
    token: LockToken,
}

impl<L: JournalLock + ?Sized> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        self.lock.release();
        debug!("Released journal lock (held until {})", self.token.expires_at_ms);
    }
}

/// [`StockExchange`] whose only state is an append-only journal
pub struct JournalBackedExchange<S: TradeStore, L: JournalLock> {
    exchange: ExchangeCode,
    store: S,
    lock: L,
    brokerage_cents: AtomicU32,
    registry: InstrumentRegistry,
}

impl<S: TradeStore, L: JournalLock> JournalBackedExchange<S, L> {
    pub fn new(
        exchange: ExchangeCode,
        store: S,
        lock: L,
        brokerage_cents: u32,
        registry: InstrumentRegistry,
    ) -> Self {
        Self {
            exchange,
            store,
            lock,
            brokerage_cents: AtomicU32::new(brokerage_cents),
            registry,
        }
    }

    /// Brokerage stamped on the next accepted trade (cents)
    pub fn brokerage_cents(&self) -> u32 {
        self.brokerage_cents.load(Ordering::Acquire)
    }

    /// Change the brokerage for subsequent trades. Trades already in the
    /// journal keep what they were charged.
    pub fn set_brokerage_cents(&self, cents: u32) {
        self.brokerage_cents.store(cents, Ordering::Release);
    }

    pub fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn lock(&self) -> &L {
        &self.lock
    }

    fn validate(&self, code: &str, units: u32) -> Result<Instrument, LedgerError> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::InvalidCode {
                code: code.to_string(),
            });
        }
        if units < 1 {
            return Err(LedgerError::InvalidArgument(format!(
                "units must be a positive whole number, got {}",
                units
            )));
        }

        self.registry
            .resolve(&trimmed.to_ascii_uppercase())
            .ok_or_else(|| LedgerError::InvalidCode {
                code: code.to_string(),
            })
    }

    fn record(&self, side: Side, instrument: Instrument, units: u32) -> Result<TradeRecord, LedgerError> {
        let record = TradeRecord::builder()
            .exchange(self.exchange)
            .side(side)
            .now()
            .instrument(instrument)
            .quantity(units)
            .fee(Some(self.brokerage_cents()))
            .build()?;
        Ok(record)
    }

    fn acquire(&self, operation: &'static str) -> Result<LockGuard<'_, L>, LedgerError> {
        match self.lock.acquire(LOCK_DURATION) {
            Ok(token) => Ok(LockGuard {
                lock: &self.lock,
                token,
            }),
            Err(source) => {
                error!("FAILED to lock {} journal for {}: {}", self.exchange, operation, source);
                Err(LedgerError::LockAcquisitionFailed {
                    exchange: self.exchange,
                    operation,
                    source,
                })
            }
        }
    }

    fn insufficient(&self, instrument: &Instrument, available: u64, requested: u32) -> LedgerError {
        let err = LedgerError::InsufficientUnits {
            exchange: self.exchange,
            instrument: instrument.to_string(),
            available,
            requested,
        };
        warn!("{}", err);
        err
    }
}

impl<S: TradeStore, L: JournalLock> StockExchange for JournalBackedExchange<S, L> {
    fn exchange_code(&self) -> ExchangeCode {
        self.exchange
    }

    fn buy(&self, code: &str, units: u32) -> Result<(), LedgerError> {
        let instrument = self.validate(code, units)?;
        let record = self.record(Side::Buy, instrument, units)?;

        let _guard = self.acquire("buy")?;
        let records = self.store.read_all()?;

        // nothing has ever been sold here
        if records.is_empty() {
            return Err(self.insufficient(&record.instrument, 0, units));
        }

        let surplus: i64 = records
            .iter()
            .filter(|r| r.exchange == self.exchange && r.instrument == record.instrument)
            .map(TradeRecord::signed_quantity)
            .sum();

        if surplus < 0 {
            let err = LedgerError::CorruptLedger {
                exchange: self.exchange,
                instrument: record.instrument.to_string(),
                line: None,
                volume: surplus,
            };
            error!("FATAL - {}", err);
            return Err(err);
        }

        let available = surplus as u64;
        if available < u64::from(units) {
            return Err(self.insufficient(&record.instrument, available, units));
        }

        self.store.append(&record)?;
        debug!("Accepted {}", record);
        Ok(())
    }

    fn sell(&self, code: &str, units: u32) -> Result<(), LedgerError> {
        let instrument = self.validate(code, units)?;
        let record = self.record(Side::Sell, instrument, units)?;

        let _guard = self.acquire("sell")?;
        if let Err(e) = self.store.append(&record) {
            error!("FATAL - failed to append {} to journal: {}", record, e);
            return Err(e.into());
        }

        debug!("Accepted {}", record);
        Ok(())
    }

    fn order_book_total_volume(&self) -> Result<VolumeBook, LedgerError> {
        let records = {
            let _guard = self.acquire("order book totals")?;
            self.store.read_all()?
        };

        let mut running: BTreeMap<Instrument, i64> = BTreeMap::new();
        for (index, record) in records.iter().enumerate() {
            if record.exchange != self.exchange {
                continue;
            }

            let volume = running.entry(record.instrument.clone()).or_insert(0);
            *volume += record.signed_quantity();
            if *volume < 0 {
                let err = LedgerError::CorruptLedger {
                    exchange: self.exchange,
                    instrument: record.instrument.to_string(),
                    line: Some(index + 1),
                    volume: *volume,
                };
                error!("FATAL - {}", err);
                return Err(err);
            }
        }

        Ok(running
            .into_iter()
            .map(|(instrument, volume)| (instrument, volume as u64))
            .collect())
    }

    fn trading_costs(&self) -> Result<Decimal, LedgerError> {
        // read without the lock; a report may lag an in-flight append
        let cents: u64 = self
            .store
            .read_all()?
            .iter()
            .filter(|r| r.exchange == self.exchange)
            .filter_map(|r| r.fee)
            .map(u64::from)
            .sum();

        Ok(Decimal::from_i128_with_scale(i128::from(cents), 2))
    }
}

/// File-backed exchange as deployed
pub type FileExchange = JournalBackedExchange<FileTradeStore, SentinelFileLock>;

/// Wire an exchange to its journal and lock files, creating their parent
/// directories.
pub fn open_exchange(
    exchange: ExchangeCode,
    settings: &ExchangeSettings,
    registry: InstrumentRegistry,
) -> Result<FileExchange, JournalError> {
    for path in [&settings.journal_path, &settings.lock_path] {
        ensure_parent(path)?;
    }

    debug!(
        "Opening {} journal {} (lock {}, brokerage {}c)",
        exchange,
        settings.journal_path.display(),
        settings.lock_path.display(),
        settings.brokerage_cents
    );

    Ok(JournalBackedExchange::new(
        exchange,
        FileTradeStore::new(&settings.journal_path, registry.clone()),
        SentinelFileLock::new(&settings.lock_path),
        settings.brokerage_cents,
        registry,
    ))
}

fn ensure_parent(path: &Path) -> Result<(), JournalError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| JournalError::Io {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}
