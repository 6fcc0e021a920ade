//! Timestamp-keyed annotation records, as they leave the pipeline.
//!
//! Detectors speak in bar indices; these records never do. Every referenced bar has
//! already been resolved to the timestamp of that bar (or null when unresolved) by the
//! [adapter](crate::annotate). The serde field names are the downstream JSON contract.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::io::json::{iso_timestamp, iso_timestamp_opt};

/// A fair value gap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapRecord {
    /// `1` bullish, `-1` bearish.
    #[serde(rename = "FVG")]
    pub direction: i8,
    #[serde(rename = "Top")]
    pub top: f64,
    #[serde(rename = "Bottom")]
    pub bottom: f64,
    /// When price came back into the gap.
    #[serde(rename = "MitigatedIndex", with = "iso_timestamp_opt")]
    pub mitigated_at: Option<NaiveDateTime>,
    #[serde(rename = "Timestamp", with = "iso_timestamp")]
    pub timestamp: NaiveDateTime,
}

/// A break of structure or change of character.
///
/// Exactly one of `bos` / `choch` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureBreakRecord {
    #[serde(rename = "BOS")]
    pub bos: Option<i8>,
    #[serde(rename = "CHOCH")]
    pub choch: Option<i8>,
    #[serde(rename = "Level")]
    pub level: f64,
    /// When a candle crossed the level.
    #[serde(rename = "BrokenIndex", with = "iso_timestamp_opt")]
    pub broken_at: Option<NaiveDateTime>,
    #[serde(rename = "Timestamp", with = "iso_timestamp")]
    pub timestamp: NaiveDateTime,
}

/// An order block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBlockRecord {
    /// `1` bullish, `-1` bearish.
    #[serde(rename = "OB")]
    pub direction: i8,
    #[serde(rename = "Top")]
    pub top: f64,
    #[serde(rename = "Bottom")]
    pub bottom: f64,
    #[serde(rename = "OBVolume")]
    pub volume: f64,
    #[serde(rename = "Percentage")]
    pub percentage: f64,
    #[serde(rename = "MitigatedIndex", with = "iso_timestamp_opt")]
    pub mitigated_at: Option<NaiveDateTime>,
    #[serde(rename = "Timestamp", with = "iso_timestamp")]
    pub timestamp: NaiveDateTime,
}

/// Lifecycle of a liquidity level.
///
/// Only [`LiquidityStatus::Unhit`] is ever produced; nothing watches levels after detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityStatus {
    Unhit,
}

/// A cluster of resting liquidity around equal highs or equal lows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiquidityLevel {
    #[serde(with = "iso_timestamp")]
    pub timestamp_detected: NaiveDateTime,
    /// `1` buy-side (equal highs), `-1` sell-side (equal lows).
    pub direction: i8,
    pub price: f64,
    #[serde(with = "iso_timestamp_opt")]
    pub liquidity_hit_time: Option<NaiveDateTime>,
    pub status: LiquidityStatus,
    /// Last swing that joined the cluster.
    #[serde(rename = "End", with = "iso_timestamp")]
    pub end: NaiveDateTime,
    /// Candle that ran through the cluster, if any.
    #[serde(rename = "Swept", with = "iso_timestamp_opt")]
    pub swept: Option<NaiveDateTime>,
}

/// Everything the adapter extracted from one series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Annotations {
    pub fvg: Vec<GapRecord>,
    pub bos_choch: Vec<StructureBreakRecord>,
    pub ob: Vec<OrderBlockRecord>,
    pub liquidity_levels: Vec<LiquidityLevel>,
}
