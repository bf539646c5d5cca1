//! In-memory journal doubles and fixture builders

use crate::journal::{JournalError, JournalLock, LockError, LockToken, TradeStore};
use crate::registry::InstrumentRegistry;
use crate::trade::{now_ms, ExchangeCode, Side, TradeRecord};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Journal held in memory.
///
/// Clones share the same records, so a test can keep a handle while the
/// exchange owns another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTradeStore {
    records: Arc<Mutex<Vec<TradeRecord>>>,
}

impl InMemoryTradeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing journal
    pub fn with_records(records: Vec<TradeRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    /// Snapshot of everything appended so far
    pub fn records(&self) -> Vec<TradeRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl TradeStore for InMemoryTradeStore {
    fn append(&self, record: &TradeRecord) -> Result<(), JournalError> {
        // same acceptance rule as the file codec
        crate::journal::codec::encode(record)?;
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<TradeRecord>, JournalError> {
        Ok(self.records())
    }
}

/// Lock that never contends. Counts acquires and releases so tests can check
/// that every acquire is paired with a release.
#[derive(Debug, Clone, Default)]
pub struct NoopLock {
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl NoopLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquisitions(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl JournalLock for NoopLock {
    fn acquire(&self, duration: Duration) -> Result<LockToken, LockError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(LockToken {
            expires_at_ms: now_ms().saturating_add(duration.as_millis() as u64),
        })
    }

    fn is_locked(&self) -> bool {
        self.acquisitions() > self.releases()
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Lock that is always held by someone else
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableLock;

impl JournalLock for UnavailableLock {
    fn acquire(&self, _duration: Duration) -> Result<LockToken, LockError> {
        Err(LockError::Contention {
            attempts: 5,
            waited_ms: 2_000,
        })
    }

    fn is_locked(&self) -> bool {
        true
    }

    fn release(&self) {}
}

/// Build a journal record against the default registry.
///
/// Panics on an unlisted code; fixtures are expected to use QAN, CBA or NAB.
pub fn create_test_record(
    exchange: ExchangeCode,
    side: Side,
    code: &str,
    quantity: u32,
    fee: Option<u32>,
) -> TradeRecord {
    let instrument = InstrumentRegistry::default()
        .resolve(code)
        .unwrap_or_else(|| panic!("{} is not a default instrument", code));

    TradeRecord {
        exchange,
        side,
        timestamp_ms: 1023439393000,
        instrument,
        quantity,
        fee,
    }
}

/// ASX sell with a 5 cent fee
pub fn create_sell(code: &str, quantity: u32) -> TradeRecord {
    create_test_record(ExchangeCode::Asx, Side::Sell, code, quantity, Some(5))
}

/// ASX buy with a 5 cent fee
pub fn create_buy(code: &str, quantity: u32) -> TradeRecord {
    create_test_record(ExchangeCode::Asx, Side::Buy, code, quantity, Some(5))
}
