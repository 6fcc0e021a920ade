use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::interval::Interval;

/// Parameters for one historical candle request.
///
/// Broker-agnostic on purpose: each [`CandleSource`](crate::providers::CandleSource)
/// translates it to its own wire format and validates what its API allows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleRequest {
    /// Broker instrument token (e.g., `"99926000"` for NIFTY 50, `"2885"` for Reliance).
    pub symbol_token: String,

    /// Exchange segment the token belongs to (e.g., `"NSE"`).
    pub exchange: String,

    /// The granularity of each candle.
    pub interval: Interval,

    /// Start of the requested window (inclusive, exchange-local).
    pub from: NaiveDateTime,

    /// End of the requested window (inclusive, exchange-local).
    pub to: NaiveDateTime,
}
