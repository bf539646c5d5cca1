//! Tradable instrument registry
//!
//! The set of instrument codes an exchange accepts is closed but injectable:
//! an [`InstrumentRegistry`] is handed to the journal codec and the exchange
//! at construction time, so new codes never require touching core logic.
//! The default registry carries the three listed companies (QAN, CBA, NAB).

use crate::error::LedgerError;
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Codes listed by default
pub const DEFAULT_INSTRUMENTS: [&str; 3] = ["QAN", "CBA", "NAB"];

/// Maximum length of an instrument code
pub const MAX_CODE_LEN: usize = 12;

/// An instrument code admitted by an [`InstrumentRegistry`].
///
/// Only the registry hands these out, so holding one means the code is
/// known to be tradable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instrument(Arc<str>);

impl Instrument {
    fn new(code: &str) -> Self {
        Self(Arc::from(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Instrument {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Closed set of tradable instrument codes.
///
/// Cheap to clone; clones share the same underlying set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentRegistry {
    codes: Arc<BTreeSet<Instrument>>,
}

impl InstrumentRegistry {
    /// Build a registry from a list of codes.
    ///
    /// Codes must be 1-12 uppercase ASCII letters or digits. Anything else
    /// could not survive a round trip through the journal line format.
    pub fn new<I, S>(codes: I) -> Result<Self, LedgerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for code in codes {
            let code = code.as_ref();
            if !is_valid_code(code) {
                return Err(LedgerError::InvalidArgument(format!(
                    "instrument code {:?} must be 1-{} uppercase letters or digits",
                    code, MAX_CODE_LEN
                )));
            }
            set.insert(Instrument::new(code));
        }

        if set.is_empty() {
            return Err(LedgerError::InvalidArgument(
                "instrument registry must list at least one code".to_string(),
            ));
        }

        Ok(Self {
            codes: Arc::new(set),
        })
    }

    /// Look up an exact code
    pub fn resolve(&self, code: &str) -> Option<Instrument> {
        self.codes.get(code).cloned()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    /// Iterate codes in lexical order
    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.codes.iter()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Default for InstrumentRegistry {
    fn default() -> Self {
        Self {
            codes: Arc::new(DEFAULT_INSTRUMENTS.iter().map(|c| Instrument::new(c)).collect()),
        }
    }
}

fn is_valid_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}
