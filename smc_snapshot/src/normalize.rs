//! Raw broker rows to a [`CandleSeries`].
//!
//! Rows are expected as `[timestamp, open, high, low, close, volume]`. Parsing is
//! best-effort per batch: a malformed row is logged with its raw content and skipped, the
//! rest of the batch carries on. The only whole-batch failure is input that is not a
//! sequence of rows at all.

use chrono::NaiveDateTime;
use chrono_tz::Tz;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::exchange_time::{TimestampError, parse_exchange_timestamp};
use crate::models::candle::{Candle, CandleError, CandleSeries};
use crate::models::interval::Interval;

const ROW_ARITY: usize = 6;
const PRICE_FIELDS: [&str; 4] = ["open", "high", "low", "close"];

/// Why a single row was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowParseError {
    #[error("expected a 6-element array, got {0}")]
    Shape(String),

    #[error("timestamp field is not a string: {0}")]
    TimestampType(String),

    #[error(transparent)]
    Timestamp(#[from] TimestampError),

    #[error("{field} is not numeric: {raw}")]
    NotNumeric { field: &'static str, raw: String },

    #[error("volume is not a non-negative integer: {0}")]
    Volume(String),

    #[error(transparent)]
    Candle(#[from] CandleError),
}

/// The input was not a sequence of rows.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("candle data is not an array: {0}")]
    NotASequence(String),
}

/// A rejected row alongside its raw content.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    pub position: usize,
    pub raw: Value,
    pub error: RowParseError,
}

/// Result of normalizing one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub series: CandleSeries,
    pub rejected: Vec<RejectedRow>,
}

/// Parse one raw row into a [`Candle`].
pub fn parse_row(row: &Value, tz: Tz) -> Result<Candle, RowParseError> {
    let fields = match row.as_array() {
        Some(fields) if fields.len() == ROW_ARITY => fields,
        _ => return Err(RowParseError::Shape(row.to_string())),
    };

    let timestamp = parse_timestamp(&fields[0], tz)?;

    let mut prices = [0.0f64; 4];
    for (slot, (field, raw)) in prices
        .iter_mut()
        .zip(PRICE_FIELDS.into_iter().zip(&fields[1..5]))
    {
        *slot = parse_price(field, raw)?;
    }
    let [open, high, low, close] = prices;

    let volume = parse_volume(&fields[5])?;

    Ok(Candle::new(timestamp, open, high, low, close, volume)?)
}

/// Normalize a slice of rows, keeping input order and skipping bad rows.
pub fn normalize_rows(rows: &[Value], symbol: &str, interval: Interval, tz: Tz) -> Normalized {
    let mut candles = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();

    for (position, row) in rows.iter().enumerate() {
        match parse_row(row, tz) {
            Ok(candle) => candles.push(candle),
            Err(error) => {
                warn!(%symbol, %interval, position, row = %row, %error, "skipping bad candle row");
                rejected.push(RejectedRow {
                    position,
                    raw: row.clone(),
                    error,
                });
            }
        }
    }

    Normalized {
        series: CandleSeries::new(symbol, interval, candles),
        rejected,
    }
}

/// Normalize the broker's `data` value, which must be an array of rows.
///
/// `null` (the broker's answer for "no candles in range") counts as an empty array.
pub fn normalize_value(
    data: &Value,
    symbol: &str,
    interval: Interval,
    tz: Tz,
) -> Result<Normalized, NormalizeError> {
    match data {
        Value::Array(rows) => Ok(normalize_rows(rows, symbol, interval, tz)),
        Value::Null => Ok(normalize_rows(&[], symbol, interval, tz)),
        other => Err(NormalizeError::NotASequence(truncate(other.to_string()))),
    }
}

fn parse_timestamp(raw: &Value, tz: Tz) -> Result<NaiveDateTime, RowParseError> {
    let s = raw
        .as_str()
        .ok_or_else(|| RowParseError::TimestampType(raw.to_string()))?;
    Ok(parse_exchange_timestamp(s, tz)?)
}

fn parse_price(field: &'static str, raw: &Value) -> Result<f64, RowParseError> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| RowParseError::NotNumeric {
        field,
        raw: raw.to_string(),
    })
}

fn parse_volume(raw: &Value) -> Result<u64, RowParseError> {
    let parsed = match raw {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(integral_u64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral_u64))
        }
        _ => None,
    };
    parsed.ok_or_else(|| RowParseError::Volume(raw.to_string()))
}

fn integral_u64(v: f64) -> Option<u64> {
    let integral = v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64;
    integral.then_some(v as u64)
}

fn truncate(mut s: String) -> String {
    const MAX: usize = 120;
    if s.len() > MAX {
        let cut = (0..=MAX).rfind(|&i| s.is_char_boundary(i)).unwrap_or(0);
        s.truncate(cut);
        s.push_str("...");
    }
    s
}
