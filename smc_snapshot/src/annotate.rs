//! Index-keyed detector output to timestamp-keyed [`Annotations`].
//!
//! The adapter calls each [`SmcDetector`] pass on a series, checks that the output is
//! aligned with the series, keeps only the bars where something was detected, and resolves
//! every bar reference against that same series. A failing pass aborts the whole series.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::models::annotations::{
    Annotations, GapRecord, LiquidityLevel, LiquidityStatus, OrderBlockRecord, StructureBreakRecord,
};
use crate::models::candle::CandleSeries;
use crate::smc::{AnalysisSettings, BreakKind, DetectorError, DetectorKind, SmcDetector};

#[derive(Debug, Clone)]
pub struct SmcAdapter<D> {
    detector: D,
    settings: AnalysisSettings,
}

impl<D: SmcDetector> SmcAdapter<D> {
    pub fn new(detector: D, settings: AnalysisSettings) -> Self {
        Self { detector, settings }
    }

    /// Run every detector pass over `series` and collect the timestamped records.
    pub fn annotate(&self, series: &CandleSeries) -> Result<Annotations, DetectorError> {
        let candles = series.candles.as_slice();
        let n = candles.len();
        let settings = &self.settings;

        let gaps = aligned(
            DetectorKind::FairValueGap,
            n,
            self.detector.fair_value_gaps(candles, settings)?,
        )?;
        let swings = aligned(
            DetectorKind::SwingHighsLows,
            n,
            self.detector.swing_highs_lows(candles, settings)?,
        )?;
        let breaks = aligned(
            DetectorKind::StructureBreak,
            n,
            self.detector.structure_breaks(candles, &swings, settings)?,
        )?;
        let blocks = aligned(
            DetectorKind::OrderBlock,
            n,
            self.detector.order_blocks(candles, &swings, settings)?,
        )?;
        let pools = aligned(
            DetectorKind::Liquidity,
            n,
            self.detector.liquidity(candles, &swings, settings)?,
        )?;

        let resolver = Resolver { series };
        let mut out = Annotations::default();

        for (i, gap) in gaps.iter().enumerate() {
            let Some(gap) = gap else { continue };
            out.fvg.push(GapRecord {
                direction: gap.direction.sign(),
                top: gap.top,
                bottom: gap.bottom,
                mitigated_at: resolver.optional(DetectorKind::FairValueGap, gap.mitigated_index)?,
                timestamp: resolver.at(DetectorKind::FairValueGap, i)?,
            });
        }

        for (i, signal) in breaks.iter().enumerate() {
            let Some(signal) = signal else { continue };
            let sign = signal.direction.sign();
            out.bos_choch.push(StructureBreakRecord {
                bos: (signal.kind == BreakKind::Bos).then_some(sign),
                choch: (signal.kind == BreakKind::Choch).then_some(sign),
                level: signal.level,
                broken_at: resolver.optional(DetectorKind::StructureBreak, signal.broken_index)?,
                timestamp: resolver.at(DetectorKind::StructureBreak, i)?,
            });
        }

        for (i, block) in blocks.iter().enumerate() {
            let Some(block) = block else { continue };
            out.ob.push(OrderBlockRecord {
                direction: block.direction.sign(),
                top: block.top,
                bottom: block.bottom,
                volume: block.volume,
                percentage: block.percentage,
                mitigated_at: resolver.optional(DetectorKind::OrderBlock, block.mitigated_index)?,
                timestamp: resolver.at(DetectorKind::OrderBlock, i)?,
            });
        }

        for (i, pool) in pools.iter().enumerate() {
            let Some(pool) = pool else { continue };
            out.liquidity_levels.push(LiquidityLevel {
                timestamp_detected: resolver.at(DetectorKind::Liquidity, i)?,
                direction: pool.direction.sign(),
                price: pool.level,
                liquidity_hit_time: None,
                status: LiquidityStatus::Unhit,
                end: resolver.at(DetectorKind::Liquidity, pool.end_index)?,
                swept: resolver.optional(DetectorKind::Liquidity, pool.swept_index)?,
            });
        }

        debug!(
            symbol = %series.symbol,
            interval = %series.interval,
            candles = n,
            fvg = out.fvg.len(),
            bos_choch = out.bos_choch.len(),
            ob = out.ob.len(),
            liquidity = out.liquidity_levels.len(),
            "annotated series"
        );
        Ok(out)
    }
}

fn aligned<T>(
    detector: DetectorKind,
    expected: usize,
    rows: Vec<T>,
) -> Result<Vec<T>, DetectorError> {
    if rows.len() != expected {
        return Err(DetectorError::LengthMismatch {
            detector,
            expected,
            actual: rows.len(),
        });
    }
    Ok(rows)
}

/// Looks bar indices up in the series the detectors ran on.
struct Resolver<'a> {
    series: &'a CandleSeries,
}

impl Resolver<'_> {
    fn at(&self, detector: DetectorKind, index: usize) -> Result<NaiveDateTime, DetectorError> {
        self.series
            .timestamp_at(index)
            .ok_or(DetectorError::DanglingReference {
                detector,
                index,
                len: self.series.len(),
            })
    }

    fn optional(
        &self,
        detector: DetectorKind,
        index: Option<usize>,
    ) -> Result<Option<NaiveDateTime>, DetectorError> {
        index.map(|i| self.at(detector, i)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candle::Candle;
    use crate::models::interval::Interval;
    use crate::smc::test_support::candles;
    use crate::smc::{Direction, GapSignal, LiquiditySignal, OrderBlockSignal};
    use crate::smc::{StructureSignal, Swing};

    /// Returns canned rows regardless of input.
    struct Scripted {
        gaps: Vec<Option<GapSignal>>,
        breaks: Vec<Option<StructureSignal>>,
        blocks: Vec<Option<OrderBlockSignal>>,
        pools: Vec<Option<LiquiditySignal>>,
        fail_liquidity: bool,
    }

    impl Scripted {
        fn empty(n: usize) -> Self {
            Self {
                gaps: vec![None; n],
                breaks: vec![None; n],
                blocks: vec![None; n],
                pools: vec![None; n],
                fail_liquidity: false,
            }
        }
    }

    impl SmcDetector for Scripted {
        fn fair_value_gaps(
            &self,
            _: &[Candle],
            _: &AnalysisSettings,
        ) -> Result<Vec<Option<GapSignal>>, DetectorError> {
            Ok(self.gaps.clone())
        }

        fn swing_highs_lows(
            &self,
            candles: &[Candle],
            _: &AnalysisSettings,
        ) -> Result<Vec<Option<Swing>>, DetectorError> {
            Ok(vec![None; candles.len()])
        }

        fn structure_breaks(
            &self,
            _: &[Candle],
            _: &[Option<Swing>],
            _: &AnalysisSettings,
        ) -> Result<Vec<Option<StructureSignal>>, DetectorError> {
            Ok(self.breaks.clone())
        }

        fn order_blocks(
            &self,
            _: &[Candle],
            _: &[Option<Swing>],
            _: &AnalysisSettings,
        ) -> Result<Vec<Option<OrderBlockSignal>>, DetectorError> {
            Ok(self.blocks.clone())
        }

        fn liquidity(
            &self,
            _: &[Candle],
            _: &[Option<Swing>],
            _: &AnalysisSettings,
        ) -> Result<Vec<Option<LiquiditySignal>>, DetectorError> {
            if self.fail_liquidity {
                return Err(DetectorError::Failed {
                    detector: DetectorKind::Liquidity,
                    message: "boom".into(),
                });
            }
            Ok(self.pools.clone())
        }
    }

    fn series(n: usize) -> CandleSeries {
        let rows: Vec<_> = (0..n)
            .map(|i| {
                let base = 100.0 + i as f64;
                (base, base + 1.0, base - 1.0, base + 0.5)
            })
            .collect();
        CandleSeries::new("NIFTY", Interval::FiveMinute, candles(&rows))
    }

    fn annotate(d: Scripted, s: &CandleSeries) -> Result<Annotations, DetectorError> {
        SmcAdapter::new(d, AnalysisSettings::default()).annotate(s)
    }

    #[test]
    fn only_detected_bars_survive_with_their_timestamps() {
        let s = series(5);
        let mut d = Scripted::empty(5);
        d.gaps[1] = Some(GapSignal {
            direction: Direction::Bearish,
            top: 102.0,
            bottom: 101.0,
            mitigated_index: Some(4),
        });
        d.breaks[2] = Some(StructureSignal {
            kind: BreakKind::Choch,
            direction: Direction::Bullish,
            level: 103.0,
            broken_index: None,
        });

        let out = annotate(d, &s).unwrap();
        assert_eq!(out.fvg.len(), 1);
        assert_eq!(out.fvg[0].direction, -1);
        assert_eq!(out.fvg[0].timestamp, s.candles[1].timestamp);
        assert_eq!(out.fvg[0].mitigated_at, Some(s.candles[4].timestamp));

        assert_eq!(out.bos_choch.len(), 1);
        assert_eq!(out.bos_choch[0].bos, None);
        assert_eq!(out.bos_choch[0].choch, Some(1));
        assert_eq!(out.bos_choch[0].broken_at, None);
        assert!(out.ob.is_empty());
    }

    #[test]
    fn self_reference_resolves_to_the_detection_timestamp() {
        let s = series(4);
        let mut d = Scripted::empty(4);
        d.gaps[2] = Some(GapSignal {
            direction: Direction::Bullish,
            top: 1.0,
            bottom: 0.5,
            mitigated_index: Some(2),
        });
        d.blocks[3] = Some(OrderBlockSignal {
            direction: Direction::Bullish,
            top: 2.0,
            bottom: 1.0,
            volume: 10.0,
            percentage: 50.0,
            mitigated_index: Some(3),
        });
        let out = annotate(d, &s).unwrap();
        assert_eq!(out.fvg[0].mitigated_at, Some(out.fvg[0].timestamp));
        assert_eq!(out.ob[0].mitigated_at, Some(out.ob[0].timestamp));
    }

    #[test]
    fn no_liquidity_is_an_empty_collection() {
        let s = series(3);
        let out = annotate(Scripted::empty(3), &s).unwrap();
        assert!(out.liquidity_levels.is_empty());
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["liquidity_levels"], serde_json::json!([]));
    }

    #[test]
    fn liquidity_levels_start_unhit() {
        let s = series(4);
        let mut d = Scripted::empty(4);
        d.pools[0] = Some(LiquiditySignal {
            direction: Direction::Bearish,
            level: 99.0,
            end_index: 2,
            swept_index: None,
        });
        let out = annotate(d, &s).unwrap();
        let level = &out.liquidity_levels[0];
        assert_eq!(level.status, LiquidityStatus::Unhit);
        assert_eq!(level.liquidity_hit_time, None);
        assert_eq!(level.direction, -1);
        assert_eq!(level.end, s.candles[2].timestamp);
        assert_eq!(level.swept, None);
    }

    #[test]
    fn one_failing_pass_aborts_the_series() {
        let s = series(3);
        let mut d = Scripted::empty(3);
        d.gaps[1] = Some(GapSignal {
            direction: Direction::Bullish,
            top: 1.0,
            bottom: 0.5,
            mitigated_index: None,
        });
        d.fail_liquidity = true;
        let err = annotate(d, &s).unwrap_err();
        assert!(matches!(
            err,
            DetectorError::Failed {
                detector: DetectorKind::Liquidity,
                ..
            }
        ));
    }

    #[test]
    fn misaligned_output_is_rejected() {
        let s = series(3);
        let mut d = Scripted::empty(3);
        d.blocks.pop();
        let err = annotate(d, &s).unwrap_err();
        assert_eq!(
            err,
            DetectorError::LengthMismatch {
                detector: DetectorKind::OrderBlock,
                expected: 3,
                actual: 2,
            }
        );
    }

    #[test]
    fn reference_past_the_end_is_rejected() {
        let s = series(3);
        let mut d = Scripted::empty(3);
        d.breaks[0] = Some(StructureSignal {
            kind: BreakKind::Bos,
            direction: Direction::Bearish,
            level: 1.0,
            broken_index: Some(7),
        });
        let err = annotate(d, &s).unwrap_err();
        assert_eq!(
            err,
            DetectorError::DanglingReference {
                detector: DetectorKind::StructureBreak,
                index: 7,
                len: 3,
            }
        );
    }
}
