use crate::models::candle::Candle;
use crate::smc::{Direction, LiquiditySignal, Swing, SwingKind};

/// Liquidity pools around clusters of equal swing highs or lows.
///
/// The band is `(max high - min low) * range_fraction`. Starting from each unconsumed
/// swing, later same-kind swings within the band join (and are consumed) until a candle
/// runs clean through the band, which sweeps the pool. Pools need at least two swings.
pub(crate) fn liquidity(
    candles: &[Candle],
    swings: &[Option<Swing>],
    range_fraction: f64,
) -> Vec<Option<LiquiditySignal>> {
    let n = candles.len().min(swings.len());
    let mut out = vec![None; candles.len()];
    if n == 0 {
        return out;
    }

    let max_high = candles
        .iter()
        .map(|c| c.high)
        .fold(f64::NEG_INFINITY, f64::max);
    let min_low = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let band = (max_high - min_low) * range_fraction;

    for (kind, direction) in [
        (SwingKind::High, Direction::Bullish),
        (SwingKind::Low, Direction::Bearish),
    ] {
        let level_of = |i: usize| swings[i].filter(|s| s.kind == kind).map(|s| s.level);
        let mut consumed = vec![false; n];

        for i in 0..n {
            let Some(level) = level_of(i) else { continue };
            if consumed[i] {
                continue;
            }
            let (lower, upper) = (level - band, level + band);
            let mut members = vec![level];
            let mut end_index = i;
            let mut swept_index = None;

            for j in i + 1..n {
                if let Some(other) = level_of(j) {
                    if !consumed[j] && (lower..=upper).contains(&other) {
                        members.push(other);
                        end_index = j;
                        consumed[j] = true;
                    }
                }
                let through = match kind {
                    SwingKind::High => candles[j].high >= upper,
                    SwingKind::Low => candles[j].low <= lower,
                };
                if through {
                    swept_index = Some(j);
                    break;
                }
            }

            if members.len() > 1 {
                out[i] = Some(LiquiditySignal {
                    direction,
                    level: members.iter().sum::<f64>() / members.len() as f64,
                    end_index,
                    swept_index,
                });
            }
        }
    }

    out
}
