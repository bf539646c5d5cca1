//! Errors surfaced by exchange operations
//!
//! Callers are expected to treat [`LedgerError::InsufficientUnits`] as an
//! ordinary rejection and everything else as fatal to the operation.

use crate::journal::{EncodingError, JournalError, LockError};
use crate::trade::ExchangeCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed caller input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Blank or unlisted instrument code
    #[error("instrument code {code:?} is not valid")]
    InvalidCode { code: String },

    /// Not enough sell-side volume to satisfy a buy
    #[error(
        "insufficient units ({available}) of {instrument} on {exchange} to accommodate purchase of {requested} units"
    )]
    InsufficientUnits {
        exchange: ExchangeCode,
        instrument: String,
        available: u64,
        requested: u32,
    },

    /// The journal lock could not be taken within its bounded wait
    #[error("failed to lock {exchange} journal for {operation}: {source}")]
    LockAcquisitionFailed {
        exchange: ExchangeCode,
        operation: &'static str,
        #[source]
        source: LockError,
    },

    /// The journal records more units bought than were ever sold
    #[error(
        "corrupt {exchange} ledger: negative volume ({volume}) of {instrument}{}",
        .line.map(|l| format!(" at line {}", l)).unwrap_or_default()
    )]
    CorruptLedger {
        exchange: ExchangeCode,
        instrument: String,
        /// 1-based line in the journal file of the first offending record,
        /// when known. Lines belonging to other exchanges are counted too, so
        /// this is a file position and not an index among this exchange's
        /// trades.
        line: Option<usize>,
        volume: i64,
    },

    #[error(transparent)]
    Journal(#[from] JournalError),

    /// A trade could not be turned into a journal record
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl LedgerError {
    /// Whether this is the expected "not enough supply" rejection
    pub fn is_insufficient_units(&self) -> bool {
        matches!(self, LedgerError::InsufficientUnits { .. })
    }
}
