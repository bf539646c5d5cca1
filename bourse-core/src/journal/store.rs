//! File-backed trade journal

use super::codec;
use super::{DecodingError, JournalError, TradeStore};
use crate::registry::InstrumentRegistry;
use crate::trade::TradeRecord;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Plain-text journal, one encoded record per line.
///
/// Every append is flushed and synced before returning. Reads always go back
/// to disk. A mutex serialises callers within this process; other processes
/// are kept out by the journal lock.
pub struct FileTradeStore {
    path: PathBuf,
    registry: InstrumentRegistry,
    io_lock: Mutex<()>,
}

impl FileTradeStore {
    pub fn new(path: impl Into<PathBuf>, registry: InstrumentRegistry) -> Self {
        Self {
            path: path.into(),
            registry,
            io_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> JournalError {
        JournalError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TradeStore for FileTradeStore {
    fn append(&self, record: &TradeRecord) -> Result<(), JournalError> {
        let line = codec::encode(record)?;

        let _io = self.io_lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;

        writeln!(file, "{}", line).map_err(|e| self.io_error(e))?;
        file.flush().map_err(|e| self.io_error(e))?;
        file.sync_data().map_err(|e| self.io_error(e))?;

        debug!("Appended to {}: {}", self.path.display(), line);
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<TradeRecord>, JournalError> {
        let _io = self.io_lock.lock();
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Journal file {} does not yet exist", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (index, raw) in reader.split(b'\n').enumerate() {
            let mut raw = raw.map_err(|e| self.io_error(e))?;
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }

            let decoded = match std::str::from_utf8(&raw) {
                Ok(line) => codec::decode(line, index + 1, &self.registry),
                Err(_) => Err(DecodingError::InvalidUtf8 { line: index + 1 }),
            };
            match decoded {
                Ok(record) => records.push(record),
                Err(source) => {
                    error!("Corrupt journal {}: {}", self.path.display(), source);
                    return Err(JournalError::Corrupt {
                        path: self.path.clone(),
                        source,
                    });
                }
            }
        }

        Ok(records)
    }
}
