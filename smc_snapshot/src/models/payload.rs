//! The aggregate output of one run.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::Serialize;

use crate::io::json::iso_timestamp;
use crate::models::{annotations::Annotations, candle::Candle};

/// What a timeframe slice carries besides its header.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SliceContent {
    /// SMC annotations (`fvg`, `bos_choch`, `ob`, `liquidity_levels`).
    Annotated(Annotations),
    /// Plain candles, used as context by downstream consumers.
    Raw { candles: Vec<Candle> },
}

/// One timeframe's contribution to the payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeframeSlice {
    /// Source symbol label.
    pub stock: String,
    /// Requested window start.
    #[serde(with = "iso_timestamp")]
    pub from: NaiveDateTime,
    /// Requested window end.
    #[serde(with = "iso_timestamp")]
    pub to: NaiveDateTime,
    #[serde(flatten)]
    pub content: SliceContent,
}

/// Top-level payload: a symbol plus the slices that succeeded, keyed by timeframe.
///
/// A missing key means that timeframe was unavailable for this run, not that it was empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload {
    pub symbol: String,
    pub timeframes: IndexMap<String, TimeframeSlice>,
}

impl Payload {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframes: IndexMap::new(),
        }
    }
}
