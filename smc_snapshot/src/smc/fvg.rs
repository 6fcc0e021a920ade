use crate::models::candle::Candle;
use crate::smc::{Direction, GapSignal};

/// Fair value gaps, marked on the middle candle of each three-candle pattern.
///
/// Bullish: the previous high sits below the next low and the middle candle closes up.
/// Bearish: the previous low sits above the next high and the middle candle closes down.
pub(crate) fn fair_value_gaps(
    candles: &[Candle],
    join_consecutive: bool,
) -> Vec<Option<GapSignal>> {
    let n = candles.len();
    let mut out: Vec<Option<GapSignal>> = vec![None; n];

    for i in 1..n.saturating_sub(1) {
        let (prev, cur, next) = (&candles[i - 1], &candles[i], &candles[i + 1]);
        let zone = if prev.high < next.low && cur.is_bullish() {
            Some((Direction::Bullish, next.low, prev.high))
        } else if prev.low > next.high && cur.is_bearish() {
            Some((Direction::Bearish, prev.low, next.high))
        } else {
            None
        };
        out[i] = zone.map(|(direction, top, bottom)| GapSignal {
            direction,
            top,
            bottom,
            mitigated_index: None,
        });
    }

    if join_consecutive {
        for i in 0..n.saturating_sub(1) {
            match (out[i], out[i + 1]) {
                (Some(a), Some(b)) if a.direction == b.direction => {
                    out[i + 1] = Some(GapSignal {
                        top: a.top.max(b.top),
                        bottom: a.bottom.min(b.bottom),
                        ..b
                    });
                    out[i] = None;
                }
                _ => {}
            }
        }
    }

    for (i, slot) in out.iter_mut().enumerate() {
        if let Some(gap) = slot {
            gap.mitigated_index = (i + 2..n).find(|&j| match gap.direction {
                Direction::Bullish => candles[j].low <= gap.top,
                Direction::Bearish => candles[j].high >= gap.bottom,
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smc::test_support::candles;

    #[test]
    fn bullish_gap_sits_between_outer_wicks() {
        let c = candles(&[
            (100.0, 101.0, 99.0, 100.5),
            (101.0, 105.0, 100.8, 104.5),
            (104.5, 106.0, 103.0, 105.5),
            (105.5, 107.0, 104.0, 106.0),
        ]);
        let out = fair_value_gaps(&c, false);
        let gap = out[1].unwrap();
        assert_eq!(gap.direction, Direction::Bullish);
        assert_eq!(gap.top, 103.0);
        assert_eq!(gap.bottom, 101.0);
        assert_eq!(gap.mitigated_index, None);
        assert!(out.iter().enumerate().all(|(i, g)| i == 1 || g.is_none()));
    }

    #[test]
    fn bearish_gap_is_mitigated_by_a_later_high() {
        let c = candles(&[
            (100.0, 101.0, 99.0, 99.5),
            (99.0, 99.2, 95.0, 95.5),
            (95.5, 97.0, 94.0, 94.5),
            (94.5, 95.0, 93.0, 94.0),
            (94.0, 98.0, 93.5, 97.5),
        ]);
        let gap = fair_value_gaps(&c, false)[1].unwrap();
        assert_eq!(gap.direction, Direction::Bearish);
        assert_eq!((gap.top, gap.bottom), (99.0, 97.0));
        assert_eq!(gap.mitigated_index, Some(4));
    }

    #[test]
    fn wrong_body_direction_is_not_a_gap() {
        // same wick layout as the bullish case but the middle bar closes down
        let c = candles(&[
            (100.0, 101.0, 99.0, 100.5),
            (104.5, 105.0, 100.8, 101.0),
            (104.5, 106.0, 103.0, 105.5),
        ]);
        assert!(fair_value_gaps(&c, false).iter().all(Option::is_none));
    }

    #[test]
    fn short_series_yield_nothing() {
        assert!(fair_value_gaps(&[], false).is_empty());
        let two = candles(&[(1.0, 2.0, 0.5, 1.5), (1.5, 3.0, 1.0, 2.5)]);
        assert_eq!(fair_value_gaps(&two, false), vec![None, None]);
    }

    #[test]
    fn joining_keeps_the_later_gap_with_the_union_zone() {
        let c = candles(&[
            (100.0, 101.0, 99.0, 100.5),
            (101.0, 104.0, 100.8, 103.5),
            (103.5, 107.0, 102.0, 106.5),
            (106.5, 109.0, 105.0, 108.0),
        ]);
        let plain = fair_value_gaps(&c, false);
        assert!(plain[1].is_some() && plain[2].is_some());

        let joined = fair_value_gaps(&c, true);
        assert!(joined[1].is_none());
        let gap = joined[2].unwrap();
        assert_eq!(gap.top, 105.0);
        assert_eq!(gap.bottom, 101.0);
    }
}
