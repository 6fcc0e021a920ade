use tracing::trace;

use crate::models::candle::Candle;
use crate::smc::{
    AnalysisSettings, DetectorError, DetectorKind, GapSignal, LiquiditySignal, OrderBlockSignal,
    SmcDetector, StructureSignal, Swing, fvg, liquidity, order_blocks, structure, swings,
};

/// Built-in detector: a deterministic, single-pass implementation of every SMC pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmcEngine;

fn check_swings(
    detector: DetectorKind,
    candles: &[Candle],
    swings: &[Option<Swing>],
) -> Result<(), DetectorError> {
    if swings.len() != candles.len() {
        return Err(DetectorError::Failed {
            detector,
            message: format!(
                "swing series has {} rows for {} candles",
                swings.len(),
                candles.len()
            ),
        });
    }
    Ok(())
}

impl SmcDetector for SmcEngine {
    fn fair_value_gaps(
        &self,
        candles: &[Candle],
        settings: &AnalysisSettings,
    ) -> Result<Vec<Option<GapSignal>>, DetectorError> {
        let out = fvg::fair_value_gaps(candles, settings.join_consecutive_gaps);
        trace!(found = out.iter().flatten().count(), "fvg pass done");
        Ok(out)
    }

    fn swing_highs_lows(
        &self,
        candles: &[Candle],
        settings: &AnalysisSettings,
    ) -> Result<Vec<Option<Swing>>, DetectorError> {
        settings.validate()?;
        Ok(swings::swing_highs_lows(candles, settings.swing_length))
    }

    fn structure_breaks(
        &self,
        candles: &[Candle],
        swings: &[Option<Swing>],
        settings: &AnalysisSettings,
    ) -> Result<Vec<Option<StructureSignal>>, DetectorError> {
        check_swings(DetectorKind::StructureBreak, candles, swings)?;
        Ok(structure::structure_breaks(candles, swings, settings.close_break))
    }

    fn order_blocks(
        &self,
        candles: &[Candle],
        swings: &[Option<Swing>],
        settings: &AnalysisSettings,
    ) -> Result<Vec<Option<OrderBlockSignal>>, DetectorError> {
        check_swings(DetectorKind::OrderBlock, candles, swings)?;
        Ok(order_blocks::order_blocks(candles, swings, settings.close_mitigation))
    }

    fn liquidity(
        &self,
        candles: &[Candle],
        swings: &[Option<Swing>],
        settings: &AnalysisSettings,
    ) -> Result<Vec<Option<LiquiditySignal>>, DetectorError> {
        settings.validate()?;
        check_swings(DetectorKind::Liquidity, candles, swings)?;
        Ok(liquidity::liquidity(candles, swings, settings.liquidity_range_fraction))
    }
}
