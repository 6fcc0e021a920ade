//! Smart-money-concepts detection.
//!
//! This module defines the [`SmcDetector`] trait, the seam between the
//! [adapter](crate::annotate) and whatever computes the signals. Detectors work purely on
//! bar positions: every output vector has exactly one entry per candle, and every
//! cross-reference (mitigation, break, sweep) is an index into the same candle slice.
//! Turning those indices into timestamps is the adapter's job, not the detector's.
//!
//! [`SmcEngine`] is the built-in implementation.
//!
//! # Example
//!
//! ```rust
//! use smc_snapshot::models::candle::Candle;
//! use smc_snapshot::smc::{AnalysisSettings, SmcDetector, SmcEngine};
//!
//! let engine = SmcEngine;
//! let candles: Vec<Candle> = Vec::new();
//! let gaps = engine.fair_value_gaps(&candles, &AnalysisSettings::default()).unwrap();
//! assert!(gaps.is_empty());
//! ```

mod engine;
mod fvg;
mod liquidity;
mod order_blocks;
mod structure;
mod swings;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::candle::Candle;

pub use engine::SmcEngine;

/// Which way a signal points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    /// `1` for bullish, `-1` for bearish.
    pub const fn sign(self) -> i8 {
        match self {
            Direction::Bullish => 1,
            Direction::Bearish => -1,
        }
    }
}

/// A fair value gap detected on the middle candle of a three-candle pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapSignal {
    pub direction: Direction,
    pub top: f64,
    pub bottom: f64,
    /// First later bar that traded back into the gap.
    pub mitigated_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwingKind {
    High,
    Low,
}

/// A swing high or low; `level` is the candle's high or low respectively.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Swing {
    pub kind: SwingKind,
    pub level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    /// Break of structure (trend continuation).
    Bos,
    /// Change of character (reversal).
    Choch,
}

/// A BOS/CHOCH placed on the bar of the swing whose level was broken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructureSignal {
    pub kind: BreakKind,
    pub direction: Direction,
    pub level: f64,
    /// Bar that crossed `level`.
    pub broken_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderBlockSignal {
    pub direction: Direction,
    pub top: f64,
    pub bottom: f64,
    /// Volume of the displacement candle plus the two before it.
    pub volume: f64,
    /// Balance between the two halves of `volume`, 0..=100.
    pub percentage: f64,
    pub mitigated_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquiditySignal {
    /// Bullish for buy-side liquidity above equal highs, bearish for sell-side below lows.
    pub direction: Direction,
    /// Mean of the clustered swing levels.
    pub level: f64,
    /// Last swing that joined the cluster.
    pub end_index: usize,
    /// Bar that ran through the cluster.
    pub swept_index: Option<usize>,
}

/// Tunables shared by all detectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisSettings {
    /// Bars on each side a swing must dominate.
    pub swing_length: usize,
    /// Width of a liquidity cluster as a fraction of the series' full range.
    pub liquidity_range_fraction: f64,
    /// Structure breaks need a close beyond the level (otherwise a wick is enough).
    pub close_break: bool,
    /// Order-block mitigation needs a body beyond the block (otherwise a wick is enough).
    pub close_mitigation: bool,
    /// Merge back-to-back gaps of the same direction into the later one.
    pub join_consecutive_gaps: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            swing_length: 15,
            liquidity_range_fraction: 0.05,
            close_break: true,
            close_mitigation: false,
            join_consecutive_gaps: false,
        }
    }
}

impl AnalysisSettings {
    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.swing_length == 0 {
            return Err(DetectorError::InvalidSetting {
                name: "swing_length",
                message: "must be at least 1".into(),
            });
        }
        let f = self.liquidity_range_fraction;
        if !f.is_finite() || f <= 0.0 || f > 1.0 {
            return Err(DetectorError::InvalidSetting {
                name: "liquidity_range_fraction",
                message: format!("must be in (0, 1], got {f}"),
            });
        }
        Ok(())
    }
}

/// Names the detector in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorKind {
    FairValueGap,
    SwingHighsLows,
    StructureBreak,
    OrderBlock,
    Liquidity,
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DetectorKind::FairValueGap => "fvg",
            DetectorKind::SwingHighsLows => "swing_highs_lows",
            DetectorKind::StructureBreak => "bos_choch",
            DetectorKind::OrderBlock => "ob",
            DetectorKind::Liquidity => "liquidity",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectorError {
    #[error("invalid analysis setting {name}: {message}")]
    InvalidSetting { name: &'static str, message: String },

    #[error("{detector} returned {actual} rows for {expected} candles")]
    LengthMismatch {
        detector: DetectorKind,
        expected: usize,
        actual: usize,
    },

    #[error("{detector} referenced bar {index} outside a series of {len}")]
    DanglingReference {
        detector: DetectorKind,
        index: usize,
        len: usize,
    },

    #[error("{detector} failed: {message}")]
    Failed {
        detector: DetectorKind,
        message: String,
    },
}

/// The five detector passes.
///
/// Each pass returns one entry per candle (`None` where nothing was detected). The swing
/// output feeds the three passes that take `swings`.
pub trait SmcDetector {
    fn fair_value_gaps(
        &self,
        candles: &[Candle],
        settings: &AnalysisSettings,
    ) -> Result<Vec<Option<GapSignal>>, DetectorError>;

    fn swing_highs_lows(
        &self,
        candles: &[Candle],
        settings: &AnalysisSettings,
    ) -> Result<Vec<Option<Swing>>, DetectorError>;

    fn structure_breaks(
        &self,
        candles: &[Candle],
        swings: &[Option<Swing>],
        settings: &AnalysisSettings,
    ) -> Result<Vec<Option<StructureSignal>>, DetectorError>;

    fn order_blocks(
        &self,
        candles: &[Candle],
        swings: &[Option<Swing>],
        settings: &AnalysisSettings,
    ) -> Result<Vec<Option<OrderBlockSignal>>, DetectorError>;

    fn liquidity(
        &self,
        candles: &[Candle],
        swings: &[Option<Swing>],
        settings: &AnalysisSettings,
    ) -> Result<Vec<Option<LiquiditySignal>>, DetectorError>;
}
