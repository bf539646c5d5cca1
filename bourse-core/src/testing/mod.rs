//! Testing utilities for unit and integration tests
//!
//! Provides in-memory stand-ins for the journal seams:
//! - InMemoryTradeStore: `TradeStore` backed by a shared `Vec`
//! - NoopLock: `JournalLock` that always succeeds and counts calls
//! - UnavailableLock: `JournalLock` that is always contended
//! - Record builders for journal fixtures

pub mod helpers;

pub use helpers::*;
