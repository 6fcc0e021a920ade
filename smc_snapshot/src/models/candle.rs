//! Canonical in-memory representation of a time-series candle (OHLCV).
//!
//! Every [`CandleSource`](crate::providers::CandleSource) row ends up here after passing
//! through the [normalizer](crate::normalize), regardless of which broker produced it.

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

use crate::io::json::iso_timestamp;
use crate::models::interval::Interval;

/// A candle violated the OHLC price invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CandleError {
    /// One of the prices is NaN or infinite.
    #[error("non-finite {field} price: {value}")]
    NonFinite { field: &'static str, value: f64 },

    /// `high` is below the body or `low` is above it.
    #[error("inconsistent range: open={open} high={high} low={low} close={close}")]
    InconsistentRange {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
}

/// A single OHLCV observation.
///
/// `open <= high` and `low <= close` are NOT implied; the only invariants are
/// `high >= max(open, close)` and `low <= min(open, close)`, checked by [`Candle::new`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    /// Exchange-local wall time at which the candle opens.
    #[serde(with = "iso_timestamp")]
    pub timestamp: NaiveDateTime,

    /// Opening price.
    pub open: f64,

    /// Highest price during the candle interval.
    pub high: f64,

    /// Lowest price during the candle interval.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Volume traded during the candle interval.
    pub volume: u64,
}

impl Candle {
    /// Builds a candle, rejecting non-finite prices and impossible ranges.
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, CandleError> {
        for (field, value) in [
            ("open", open),
            ("high", high),
            ("low", low),
            ("close", close),
        ] {
            if !value.is_finite() {
                return Err(CandleError::NonFinite { field, value });
            }
        }
        if high < open.max(close) || low > open.min(close) {
            return Err(CandleError::InconsistentRange {
                open,
                high,
                low,
                close,
            });
        }
        Ok(Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// `true` when the candle closed above its open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// `true` when the candle closed below its open.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Represents the candles fetched for one symbol and one interval.
///
/// Order is the broker's delivery order (ascending time); the series is never re-sorted.
/// Bar indices used by the [detectors](crate::smc) are positions in `candles`.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    /// The symbol label this data represents (e.g., "NIFTY", "Reliance").
    pub symbol: String,
    /// The granularity of each candle.
    pub interval: Interval,
    /// The collection of OHLCV candles.
    pub candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(symbol: impl Into<String>, interval: Interval, candles: Vec<Candle>) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            candles,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Timestamp of the bar at `index`, if the index is inside the series.
    pub fn timestamp_at(&self, index: usize) -> Option<NaiveDateTime> {
        self.candles.get(index).map(|c| c.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, 13)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap()
    }

    #[test]
    fn accepts_bearish_candle() {
        // open > close is fine as long as the wicks bound the body
        let c = Candle::new(ts(), 105.0, 106.0, 99.0, 100.0, 10).unwrap();
        assert!(c.is_bearish());
        assert!(!c.is_bullish());
    }

    #[test]
    fn rejects_high_below_body() {
        let err = Candle::new(ts(), 100.0, 101.0, 99.0, 102.0, 10).unwrap_err();
        assert!(matches!(err, CandleError::InconsistentRange { .. }));
    }

    #[test]
    fn rejects_low_above_body() {
        let err = Candle::new(ts(), 100.0, 103.0, 100.5, 102.0, 10).unwrap_err();
        assert!(matches!(err, CandleError::InconsistentRange { .. }));
    }

    #[test]
    fn rejects_nan() {
        let err = Candle::new(ts(), f64::NAN, 103.0, 99.0, 102.0, 10).unwrap_err();
        assert!(matches!(err, CandleError::NonFinite { field: "open", .. }));
    }

    #[test]
    fn timestamp_lookup_is_positional() {
        let c = Candle::new(ts(), 1.0, 2.0, 0.5, 1.5, 1).unwrap();
        let series = CandleSeries::new("NIFTY", Interval::FiveMinute, vec![c]);
        assert_eq!(series.timestamp_at(0), Some(ts()));
        assert_eq!(series.timestamp_at(1), None);
    }
}
