use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error("Invalid interval: {}", input)]
    InvalidInput { input: String },
}

/// Candle granularities the historical endpoint understands.
///
/// The serde form is the broker label (`FIVE_MINUTE`); [`fmt::Display`] gives the short
/// key used in payloads and on the CLI (`5m`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Interval {
    OneMinute,
    ThreeMinute,
    FiveMinute,
    TenMinute,
    FifteenMinute,
    ThirtyMinute,
    OneHour,
    OneDay,
}

impl Interval {
    pub const ALL: [Interval; 8] = [
        Interval::OneMinute,
        Interval::ThreeMinute,
        Interval::FiveMinute,
        Interval::TenMinute,
        Interval::FifteenMinute,
        Interval::ThirtyMinute,
        Interval::OneHour,
        Interval::OneDay,
    ];

    /// The label the broker expects in the `interval` request field.
    pub const fn broker_label(self) -> &'static str {
        match self {
            Interval::OneMinute => "ONE_MINUTE",
            Interval::ThreeMinute => "THREE_MINUTE",
            Interval::FiveMinute => "FIVE_MINUTE",
            Interval::TenMinute => "TEN_MINUTE",
            Interval::FifteenMinute => "FIFTEEN_MINUTE",
            Interval::ThirtyMinute => "THIRTY_MINUTE",
            Interval::OneHour => "ONE_HOUR",
            Interval::OneDay => "ONE_DAY",
        }
    }
}

/// Short form for payload keys and CLI ergonomics (`"5m"`, `"1h"`, `"1d"`).
impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Interval::OneMinute => "1m",
            Interval::ThreeMinute => "3m",
            Interval::FiveMinute => "5m",
            Interval::TenMinute => "10m",
            Interval::FifteenMinute => "15m",
            Interval::ThirtyMinute => "30m",
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
        };
        f.write_str(s)
    }
}

/// Accepts either the short form (`5m`) or the broker label (`FIVE_MINUTE`).
impl FromStr for Interval {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Interval::ALL
            .into_iter()
            .find(|i| {
                i.to_string().eq_ignore_ascii_case(trimmed)
                    || i.broker_label().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| IntervalError::InvalidInput {
                input: s.to_string(),
            })
    }
}
