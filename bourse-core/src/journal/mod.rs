//! Durable trade journal
//!
//! - `codec`: one record <-> one delimited text line
//! - `store`: append-only file of records ([`TradeStore`])
//! - `lock`: sentinel-file advisory lock arbitrating access across processes
//!   ([`JournalLock`])
//!
//! The journal is the single source of truth. Nothing is cached between
//! reads; every aggregate is derived by replaying it in full.

pub mod codec;
pub mod lock;
pub mod store;

pub use codec::{DecodingError, EncodingError};
pub use lock::{JournalLock, LockConfig, LockError, LockToken, SentinelFileLock};
pub use store::FileTradeStore;

use crate::trade::TradeRecord;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    /// A line failed to decode; nothing from the read is returned
    #[error("corrupt journal {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: DecodingError,
    },

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("journal i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Append-only sequence of trade records.
///
/// Implementations perform no advisory locking; callers hold the
/// [`JournalLock`] around any append.
pub trait TradeStore: Send + Sync {
    /// Durably append one record
    fn append(&self, record: &TradeRecord) -> Result<(), JournalError>;

    /// Every record in append order. An absent journal reads as empty.
    fn read_all(&self) -> Result<Vec<TradeRecord>, JournalError>;
}
