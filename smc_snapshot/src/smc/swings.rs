use crate::models::candle::Candle;
use crate::smc::{Swing, SwingKind};

/// Swing highs and lows.
///
/// Bar `i` is a swing high when its high is the maximum of the window
/// `i + 1 - length ..= i + length` (a full window is required), and a swing low likewise
/// on lows. Runs of same-kind swings are then collapsed to their most extreme member so
/// the output alternates, and the first and last bars are seeded with the kind opposite
/// to their nearest swing.
pub(crate) fn swing_highs_lows(candles: &[Candle], length: usize) -> Vec<Option<Swing>> {
    let n = candles.len();
    let mut kinds: Vec<Option<SwingKind>> = vec![None; n];
    if length == 0 {
        return vec![None; n];
    }

    for i in (length - 1)..n.saturating_sub(length) {
        let window = &candles[i + 1 - length..=i + length];
        let max_high = window
            .iter()
            .map(|c| c.high)
            .fold(f64::NEG_INFINITY, f64::max);
        let min_low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        kinds[i] = if candles[i].high == max_high {
            Some(SwingKind::High)
        } else if candles[i].low == min_low {
            Some(SwingKind::Low)
        } else {
            None
        };
    }

    collapse_runs(candles, &mut kinds);
    seed_ends(&mut kinds);

    kinds
        .into_iter()
        .zip(candles)
        .map(|(kind, c)| {
            kind.map(|kind| Swing {
                kind,
                level: match kind {
                    SwingKind::High => c.high,
                    SwingKind::Low => c.low,
                },
            })
        })
        .collect()
}

fn collapse_runs(candles: &[Candle], kinds: &mut [Option<SwingKind>]) {
    loop {
        let positions: Vec<usize> = (0..kinds.len()).filter(|&i| kinds[i].is_some()).collect();
        let mut drop = Vec::new();
        for pair in positions.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            match (kinds[a], kinds[b]) {
                (Some(SwingKind::High), Some(SwingKind::High)) => {
                    let a_lower = candles[a].high < candles[b].high;
                    drop.push(if a_lower { a } else { b });
                }
                (Some(SwingKind::Low), Some(SwingKind::Low)) => {
                    let a_higher = candles[a].low > candles[b].low;
                    drop.push(if a_higher { a } else { b });
                }
                _ => {}
            }
        }
        if drop.is_empty() {
            break;
        }
        for i in drop {
            kinds[i] = None;
        }
    }
}

fn seed_ends(kinds: &mut [Option<SwingKind>]) {
    let opposite = |kind: SwingKind| match kind {
        SwingKind::High => SwingKind::Low,
        SwingKind::Low => SwingKind::High,
    };
    let Some(first) = kinds.iter().position(Option::is_some) else {
        return;
    };
    let last = kinds.iter().rposition(Option::is_some).unwrap_or(first);
    let (first_kind, last_kind) = (kinds[first], kinds[last]);

    if first != 0 {
        kinds[0] = first_kind.map(opposite);
    }
    let end = kinds.len() - 1;
    if last != end {
        kinds[end] = last_kind.map(opposite);
    }
}
