//! Journal line codec
//!
//! One record per line, six comma-separated fields in fixed order:
//!
//! ```text
//! exchange,side,timestampMillis,instrument,quantity,fee
//! ASX,BUY,1023439393000,NAB,23,7
//! ```
//!
//! An absent fee is written as `-`, never omitted. Decoding is strict: exact
//! enum spellings, plain ASCII digits for numbers, no whitespace, no extra
//! fields.

use crate::registry::InstrumentRegistry;
use crate::trade::{ExchangeCode, Side, TradeRecord};
use std::str::FromStr;
use thiserror::Error;

pub const FIELD_DELIMITER: char = ',';
pub const FIELD_COUNT: usize = 6;

/// Fee field marker for "no fee recorded"
pub const ABSENT_FEE: &str = "-";

const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "exchange",
    "side",
    "timestamp",
    "instrument",
    "quantity",
    "fee",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("unable to persist trade, fields ({}) are missing", .fields.join(","))]
    MissingFields { fields: Vec<&'static str> },

    #[error("unable to persist trade, quantity must be at least 1")]
    InvalidQuantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodingError {
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: not valid UTF-8")]
    InvalidUtf8 { line: usize },

    #[error("line {line}: {field} field is blank")]
    BlankField { line: usize, field: &'static str },

    #[error("line {line}: {value:?} does not represent a valid {field}")]
    InvalidValue {
        line: usize,
        field: &'static str,
        value: String,
    },
}

impl DecodingError {
    /// 1-based line number of the offending entry
    pub fn line(&self) -> usize {
        match self {
            DecodingError::FieldCount { line, .. }
            | DecodingError::InvalidUtf8 { line }
            | DecodingError::BlankField { line, .. }
            | DecodingError::InvalidValue { line, .. } => *line,
        }
    }
}

/// Encode a record as a journal line (without the trailing newline)
pub fn encode(record: &TradeRecord) -> Result<String, EncodingError> {
    if record.quantity == 0 {
        return Err(EncodingError::InvalidQuantity);
    }

    let fee = match record.fee {
        Some(fee) => fee.to_string(),
        None => ABSENT_FEE.to_string(),
    };

    Ok(format!(
        "{},{},{},{},{},{}",
        record.exchange.as_str(),
        record.side.as_str(),
        record.timestamp_ms,
        record.instrument,
        record.quantity,
        fee
    ))
}

/// Decode one journal line. `line_number` is 1-based and carried into errors.
pub fn decode(
    line: &str,
    line_number: usize,
    registry: &InstrumentRegistry,
) -> Result<TradeRecord, DecodingError> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if fields.len() != FIELD_COUNT {
        return Err(DecodingError::FieldCount {
            line: line_number,
            expected: FIELD_COUNT,
            found: fields.len(),
        });
    }

    if let Some(index) = fields.iter().position(|f| f.trim().is_empty()) {
        return Err(DecodingError::BlankField {
            line: line_number,
            field: FIELD_NAMES[index],
        });
    }

    let invalid = |index: usize| DecodingError::InvalidValue {
        line: line_number,
        field: FIELD_NAMES[index],
        value: fields[index].to_string(),
    };

    let exchange = fields[0].parse::<ExchangeCode>().map_err(|_| invalid(0))?;
    let side = fields[1].parse::<Side>().map_err(|_| invalid(1))?;
    let timestamp_ms = parse_digits::<u64>(fields[2]).ok_or_else(|| invalid(2))?;
    let instrument = registry.resolve(fields[3]).ok_or_else(|| invalid(3))?;
    let quantity = parse_digits::<u32>(fields[4])
        .filter(|q| *q >= 1)
        .ok_or_else(|| invalid(4))?;
    let fee = if fields[5] == ABSENT_FEE {
        None
    } else {
        Some(parse_digits::<u32>(fields[5]).ok_or_else(|| invalid(5))?)
    };

    Ok(TradeRecord {
        exchange,
        side,
        timestamp_ms,
        instrument,
        quantity,
        fee,
    })
}

// `str::parse` alone would accept a leading '+'
fn parse_digits<T: FromStr>(text: &str) -> Option<T> {
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().ok()
    } else {
        None
    }
}
