//! Advisory journal lock
//!
//! The lock is a sentinel file next to the journal holding a single integer:
//! the wall-clock millisecond at which the lock expires.
//!
//! - No sentinel: unlocked
//! - Sentinel with an expiry in the past: unlocked, and the next acquirer
//!   deletes it
//! - Sentinel with unparseable content: treated as unlocked and deleted
//!
//! The protocol is cooperative. Anything that writes the journal without
//! going through [`JournalLock::acquire`] is not kept out; the append-only
//! journal format is what protects against lost updates.
//!
//! ## Claiming
//!
//! Checking for a live sentinel and writing a fresh one happens while holding
//! an OS advisory lock (`flock`/`LockFileEx` via `fs2`) on a companion
//! `<sentinel>.guard` file, so two processes cannot both observe "unlocked"
//! and both write. The guard is held for the claim step only, never for the
//! lifetime of the journal lock, so a crashed holder still frees up once its
//! sentinel expires.
//!
//! The guard file is created on first use and left in place afterwards: an
//! empty `<sentinel>.guard` next to each lock is expected. Deleting it while
//! another process holds it would let two claimers lock different inodes.
//!
//! Waiters in the same process park on a condvar that `release` signals; waiters
//! in other processes notice at their next poll.

use crate::trade::now_ms;
use fs2::FileExt;
use parking_lot::{Condvar, Mutex};
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Longest lock a caller may ask for
pub const MAX_LOCK_DURATION: Duration = Duration::from_millis(10_000);

/// Pause between polls while the lock is held elsewhere
pub const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Polls before giving up
pub const MAX_LOCK_ATTEMPTS: u32 = 5;

/// Wall-clock budget for one acquire call
pub const MAX_LOCK_WAIT: Duration = Duration::from_millis(10_000);

/// Re-reads allowed when the sentinel disappears mid-read
pub const MAX_VANISHED_RETRIES: u32 = 5;

const GUARD_SUFFIX: &str = ".guard";

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock duration {requested_ms}ms exceeds the {max_ms}ms ceiling")]
    InvalidTimeout { requested_ms: u128, max_ms: u128 },

    #[error("unable to acquire lock, still held after {attempts} attempts over {waited_ms}ms")]
    Contention { attempts: u32, waited_ms: u128 },

    #[error("lock i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Proof of a successful acquire: the expiry written to the sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockToken {
    pub expires_at_ms: u64,
}

/// Cooperative, time-bounded mutual exclusion over a journal.
pub trait JournalLock: Send + Sync {
    /// Take the lock for at most `duration`, waiting a bounded time for a
    /// current holder to finish.
    fn acquire(&self, duration: Duration) -> Result<LockToken, LockError>;

    /// Whether an unexpired lock is currently held by anyone
    fn is_locked(&self) -> bool;

    /// Drop the lock. No ownership check: callers are trusted to hold it.
    fn release(&self);
}

/// Tunables for [`SentinelFileLock`]
#[derive(Debug, Clone)]
pub struct LockConfig {
    pub max_lock_duration: Duration,
    pub retry_interval: Duration,
    pub max_attempts: u32,
    pub max_wait: Duration,
    pub vanished_retries: u32,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            max_lock_duration: MAX_LOCK_DURATION,
            retry_interval: LOCK_RETRY_INTERVAL,
            max_attempts: MAX_LOCK_ATTEMPTS,
            max_wait: MAX_LOCK_WAIT,
            vanished_retries: MAX_VANISHED_RETRIES,
        }
    }
}

enum Claim {
    Acquired(LockToken),
    /// Held elsewhere; expiry unknown when another process owns the guard
    Held(Option<u64>),
}

/// Sentinel-file implementation of [`JournalLock`]
pub struct SentinelFileLock {
    path: PathBuf,
    guard_path: PathBuf,
    config: LockConfig,
    state: Mutex<()>,
    released: Condvar,
}

impl SentinelFileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_config(path, LockConfig::default())
    }

    pub fn with_config(path: impl Into<PathBuf>, config: LockConfig) -> Self {
        let path = path.into();
        let mut guard_name = OsString::from(path.as_os_str());
        guard_name.push(GUARD_SUFFIX);

        Self {
            guard_path: PathBuf::from(guard_name),
            path,
            config,
            state: Mutex::new(()),
            released: Condvar::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Expiry of the current lock, if one is live. Read-only.
    pub fn lock_expiry(&self) -> Option<u64> {
        let _state = self.state.lock();
        match self.read_expiry(false) {
            Ok(expiry) => expiry,
            Err(e) => {
                warn!("Unable to read lock sentinel: {}", e);
                None
            }
        }
    }

    fn io_error(&self, path: &Path, source: io::Error) -> LockError {
        LockError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn try_claim(&self, duration: Duration) -> Result<Claim, LockError> {
        let guard = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&self.guard_path)
            .map_err(|e| self.io_error(&self.guard_path, e))?;

        match FileExt::try_lock_exclusive(&guard) {
            Ok(()) => {}
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                trace!("Lock guard {} busy in another process", self.guard_path.display());
                return Ok(Claim::Held(None));
            }
            Err(e) => return Err(self.io_error(&self.guard_path, e)),
        }

        let claim = match self.read_expiry(true) {
            Ok(Some(expiry)) => Ok(Claim::Held(Some(expiry))),
            Ok(None) => {
                let expires_at_ms = now_ms().saturating_add(duration.as_millis() as u64);
                self.write_sentinel(expires_at_ms)
                    .map(|()| Claim::Acquired(LockToken { expires_at_ms }))
            }
            Err(e) => Err(e),
        };

        if let Err(e) = FileExt::unlock(&guard) {
            warn!("Failed to unlock guard {}: {}", self.guard_path.display(), e);
        }
        claim
    }

    /// Read the sentinel. `reclaim` deletes expired and corrupt sentinels.
    fn read_expiry(&self, reclaim: bool) -> Result<Option<u64>, LockError> {
        let text = match read_sentinel(&self.path, self.config.vanished_retries, |p| {
            fs::read_to_string(p)
        }) {
            Ok(Some(text)) => text,
            Ok(None) => return Ok(None),
            Err(e) => return Err(self.io_error(&self.path, e)),
        };

        match parse_expiry(&text) {
            Some(expiry) if expiry >= now_ms() => Ok(Some(expiry)),
            Some(expiry) => {
                if reclaim {
                    debug!("Lock expired at {}, reclaiming {}", expiry, self.path.display());
                    self.remove_sentinel()?;
                }
                Ok(None)
            }
            None => {
                if reclaim {
                    warn!("Detected corrupt lock file {}, removing it", self.path.display());
                    self.remove_sentinel()?;
                }
                Ok(None)
            }
        }
    }

    fn write_sentinel(&self, expires_at_ms: u64) -> Result<(), LockError> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| self.io_error(&self.path, e))?;
        writeln!(file, "{}", expires_at_ms).map_err(|e| self.io_error(&self.path, e))?;
        file.sync_data().map_err(|e| self.io_error(&self.path, e))
    }

    fn remove_sentinel(&self) -> Result<(), LockError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(&self.path, e)),
        }
    }
}

impl JournalLock for SentinelFileLock {
    fn acquire(&self, duration: Duration) -> Result<LockToken, LockError> {
        if duration > self.config.max_lock_duration {
            return Err(LockError::InvalidTimeout {
                requested_ms: duration.as_millis(),
                max_ms: self.config.max_lock_duration.as_millis(),
            });
        }

        let started = Instant::now();
        let mut attempts = 0;
        let mut state = self.state.lock();

        loop {
            attempts += 1;
            match self.try_claim(duration)? {
                Claim::Acquired(token) => {
                    debug!(
                        "Acquired {} until {} (attempt {})",
                        self.path.display(),
                        token.expires_at_ms,
                        attempts
                    );
                    return Ok(token);
                }
                Claim::Held(expiry) => {
                    trace!("Lock {} held (expiry {:?})", self.path.display(), expiry);
                }
            }

            let waited = started.elapsed();
            if attempts >= self.config.max_attempts || waited >= self.config.max_wait {
                break;
            }
            let pause = self.config.retry_interval.min(self.config.max_wait - waited);
            self.released.wait_for(&mut state, pause);
        }

        let waited_ms = started.elapsed().as_millis();
        warn!(
            "Unable to acquire {} after {} attempts over {}ms",
            self.path.display(),
            attempts,
            waited_ms
        );
        Err(LockError::Contention {
            attempts,
            waited_ms,
        })
    }

    fn is_locked(&self) -> bool {
        self.lock_expiry().is_some()
    }

    fn release(&self) {
        let _state = self.state.lock();
        if let Err(e) = self.remove_sentinel() {
            warn!("Failed to remove lock sentinel: {}", e);
        }
        self.released.notify_all();
    }
}

/// Sentinel contents, or `None` when there is no sentinel.
///
/// A sentinel released between the existence check and the read is checked
/// again, up to `retries` times, then reported as absent. Non-UTF-8 content
/// comes back empty so it parses as corrupt.
fn read_sentinel<F>(path: &Path, retries: u32, mut read: F) -> io::Result<Option<String>>
where
    F: FnMut(&Path) -> io::Result<String>,
{
    let mut retries_left = retries;

    loop {
        if !path.exists() {
            return Ok(None);
        }

        match read(path) {
            Ok(text) => return Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if retries_left == 0 {
                    return Ok(None);
                }
                retries_left -= 1;
                trace!("Lock sentinel vanished mid-read, retrying");
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => return Ok(Some(String::new())),
            Err(e) => return Err(e),
        }
    }
}

fn parse_expiry(text: &str) -> Option<u64> {
    let line = text.lines().next()?.trim();
    if !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit()) {
        line.parse().ok()
    } else {
        None
    }
}
