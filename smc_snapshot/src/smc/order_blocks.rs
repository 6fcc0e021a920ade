use crate::models::candle::Candle;
use crate::smc::{Direction, OrderBlockSignal, Swing, SwingKind};

/// Order blocks.
///
/// When a close takes out the most recent not-yet-crossed swing high, the candle with the
/// lowest low between that swing and the breakout becomes a bullish block spanning its
/// range. Bearish blocks mirror this against swing lows. Once price trades through a
/// block it turns into a breaker (`mitigated_index` is set); a breaker that price later
/// reclaims in full is discarded.
pub(crate) fn order_blocks(
    candles: &[Candle],
    swings: &[Option<Swing>],
    close_mitigation: bool,
) -> Vec<Option<OrderBlockSignal>> {
    let n = candles.len();
    let mut tracker = Tracker {
        blocks: vec![None; n],
        breaker: vec![false; n],
    };

    let swing_bars = |kind: SwingKind| -> Vec<usize> {
        (0..n.min(swings.len()))
            .filter(|&i| swings[i].is_some_and(|s| s.kind == kind))
            .collect()
    };
    let highs = swing_bars(SwingKind::High);
    let lows = swing_bars(SwingKind::Low);
    let mut crossed = vec![false; n];
    let mut active_bull: Vec<usize> = Vec::new();
    let mut active_bear: Vec<usize> = Vec::new();

    for i in 0..n {
        let c = &candles[i];

        active_bull.retain(|&idx| tracker.update(idx, i, c, Direction::Bullish, close_mitigation));
        if let Some(&top_idx) = highs[..highs.partition_point(|&h| h < i)].last() {
            if c.close > candles[top_idx].high && !crossed[top_idx] {
                crossed[top_idx] = true;
                let ob_idx = extreme_between(candles, top_idx, i, Direction::Bullish);
                tracker.open(candles, ob_idx, i, Direction::Bullish);
                if !active_bull.contains(&ob_idx) {
                    active_bull.push(ob_idx);
                }
            }
        }

        active_bear.retain(|&idx| tracker.update(idx, i, c, Direction::Bearish, close_mitigation));
        if let Some(&btm_idx) = lows[..lows.partition_point(|&l| l < i)].last() {
            if c.close < candles[btm_idx].low && !crossed[btm_idx] {
                crossed[btm_idx] = true;
                let ob_idx = extreme_between(candles, btm_idx, i, Direction::Bearish);
                tracker.open(candles, ob_idx, i, Direction::Bearish);
                if !active_bear.contains(&ob_idx) {
                    active_bear.push(ob_idx);
                }
            }
        }
    }

    tracker.blocks
}

struct Tracker {
    blocks: Vec<Option<OrderBlockSignal>>,
    breaker: Vec<bool>,
}

impl Tracker {
    /// Apply bar `i` to the block at `idx`. Returns `false` once the block is gone.
    fn update(
        &mut self,
        idx: usize,
        i: usize,
        c: &Candle,
        direction: Direction,
        close_mitigation: bool,
    ) -> bool {
        let Some(block) = self.blocks[idx].as_mut() else {
            return false;
        };
        if block.direction != direction {
            return false;
        }
        let (body_low, body_high) = (c.open.min(c.close), c.open.max(c.close));

        if self.breaker[idx] {
            let reclaimed = match direction {
                Direction::Bullish => c.high > block.top,
                Direction::Bearish => c.low < block.bottom,
            };
            if reclaimed {
                self.blocks[idx] = None;
                self.breaker[idx] = false;
                return false;
            }
        } else {
            let (low, high) = if close_mitigation {
                (body_low, body_high)
            } else {
                (c.low, c.high)
            };
            let through = match direction {
                Direction::Bullish => low < block.bottom,
                Direction::Bearish => high > block.top,
            };
            if through {
                self.breaker[idx] = true;
                block.mitigated_index = Some(i);
            }
        }
        true
    }

    fn open(&mut self, candles: &[Candle], ob_idx: usize, i: usize, direction: Direction) {
        let vol = |k: Option<usize>| k.map_or(0.0, |k| candles[k].volume as f64);
        let (cur, prev1, prev2) = (vol(Some(i)), vol(i.checked_sub(1)), vol(i.checked_sub(2)));
        let (high_volume, low_volume) = match direction {
            Direction::Bullish => (cur + prev1, prev2),
            Direction::Bearish => (prev2, cur + prev1),
        };
        let max = high_volume.max(low_volume);
        let percentage = if max == 0.0 {
            100.0
        } else {
            high_volume.min(low_volume) / max * 100.0
        };

        self.blocks[ob_idx] = Some(OrderBlockSignal {
            direction,
            top: candles[ob_idx].high,
            bottom: candles[ob_idx].low,
            volume: cur + prev1 + prev2,
            percentage,
            mitigated_index: None,
        });
        self.breaker[ob_idx] = false;
    }
}

/// The candle strictly between `swing` and `i` with the lowest low (bullish) or highest
/// high (bearish), latest on ties. Defaults to `i - 1` when nothing lies between.
fn extreme_between(candles: &[Candle], swing: usize, i: usize, direction: Direction) -> usize {
    (swing + 1..i)
        .reduce(|best, k| {
            let better = match direction {
                Direction::Bullish => candles[k].low <= candles[best].low,
                Direction::Bearish => candles[k].high >= candles[best].high,
            };
            if better { k } else { best }
        })
        .unwrap_or(i - 1)
}
