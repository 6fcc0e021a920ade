use crate::models::candle::Candle;
use crate::smc::{BreakKind, Direction, StructureSignal, Swing, SwingKind};

/// Break of structure and change of character.
///
/// Every time a swing arrives, the last four swings (`l4` oldest, `l1` newest) are
/// checked against the four patterns below. A match is placed on the bar of `l3` with
/// `l3` as the level.
///
/// | signal        | kinds (old to new) | levels                  |
/// |---------------|--------------------|-------------------------|
/// | bullish BOS   | L H L H            | l4 < l2 < l3 < l1       |
/// | bearish BOS   | H L H L            | l4 > l2 > l3 > l1       |
/// | bullish CHOCH | L H L H            | l1 > l3 > l4 > l2       |
/// | bearish CHOCH | H L H L            | l1 < l3 < l4 < l2       |
///
/// A signal only survives if some bar from `i + 2` on crosses its level. A break at `j`
/// also cancels every earlier signal that was not broken before `j`.
pub(crate) fn structure_breaks(
    candles: &[Candle],
    swings: &[Option<Swing>],
    close_break: bool,
) -> Vec<Option<StructureSignal>> {
    let n = candles.len();
    let mut found: Vec<Option<(BreakKind, Direction, f64)>> = vec![None; n];
    let mut seen: Vec<(usize, SwingKind, f64)> = Vec::new();

    for (i, swing) in swings.iter().enumerate().take(n) {
        let Some(swing) = swing else { continue };
        seen.push((i, swing.kind, swing.level));
        if seen.len() < 4 {
            continue;
        }
        let w = &seen[seen.len() - 4..];
        let pattern = [w[0].1, w[1].1, w[2].1, w[3].1];
        let (l4, l3, l2, l1) = (w[0].2, w[1].2, w[2].2, w[3].2);
        let at = w[1].0;

        use SwingKind::{High, Low};
        found[at] = if pattern == [Low, High, Low, High] {
            if l4 < l2 && l2 < l3 && l3 < l1 {
                Some((BreakKind::Bos, Direction::Bullish, l3))
            } else if l1 > l3 && l3 > l4 && l4 > l2 {
                Some((BreakKind::Choch, Direction::Bullish, l3))
            } else {
                None
            }
        } else if pattern == [High, Low, High, Low] {
            if l4 > l2 && l2 > l3 && l3 > l1 {
                Some((BreakKind::Bos, Direction::Bearish, l3))
            } else if l1 < l3 && l3 < l4 && l4 < l2 {
                Some((BreakKind::Choch, Direction::Bearish, l3))
            } else {
                None
            }
        } else {
            None
        };
    }

    let crossed = |c: &Candle, direction: Direction, level: f64| match direction {
        Direction::Bullish => (if close_break { c.close } else { c.high }) > level,
        Direction::Bearish => (if close_break { c.close } else { c.low }) < level,
    };

    let mut broken: Vec<Option<usize>> = vec![None; n];
    let candidates: Vec<usize> = (0..n).filter(|&i| found[i].is_some()).collect();
    for i in candidates {
        let Some((_, direction, level)) = found[i] else {
            continue;
        };
        let Some(j) = (i + 2..n).find(|&j| crossed(&candles[j], direction, level)) else {
            continue;
        };
        broken[i] = Some(j);
        for k in 0..i {
            if found[k].is_some() && broken[k].is_some_and(|b| b >= j) {
                found[k] = None;
            }
        }
    }

    found
        .into_iter()
        .zip(broken)
        .map(|(signal, broken)| match (signal, broken) {
            (Some((kind, direction, level)), Some(j)) => Some(StructureSignal {
                kind,
                direction,
                level,
                broken_index: Some(j),
            }),
            _ => None,
        })
        .collect()
}
