//! Breakeven between two resampled curves.
//!
//! This is a nearest-approach heuristic, not a root finder: it returns the
//! grid index where the curves are closest, whether or not they cross.
//! The tail of the grid is ignored because extrapolated curves bunch up
//! against the horizon.

use super::Extrapolation;

/// Grid points at the end of the common range that are never reported.
pub const BREAKEVEN_TAIL_EXCLUSION: usize = 10;

/// Index minimizing `|a[x] - b[x]|` over the common prefix minus the tail.
///
/// The first index wins ties; NaN differences are skipped. `None` when the
/// common prefix has no more than [`BREAKEVEN_TAIL_EXCLUSION`] points.
///
/// ```
/// use projplan_core::velocity::breakeven;
///
/// let a: Vec<f64> = (0..100).map(|x| x as f64).collect();
/// let b: Vec<f64> = (0..100).map(|x| 0.5 * x as f64 + 21.0).collect();
/// assert_eq!(breakeven(&a, &b), Some(42));
/// ```
pub fn breakeven(a: &[f64], b: &[f64]) -> Option<usize> {
    let common = a.len().min(b.len());
    let searchable = common.checked_sub(BREAKEVEN_TAIL_EXCLUSION)?;

    let mut best: Option<(usize, f64)> = None;
    for (idx, (x, y)) in a.iter().zip(b).take(searchable).enumerate() {
        let gap = (x - y).abs();
        if gap.is_nan() {
            continue;
        }
        match best {
            Some((_, smallest)) if gap >= smallest => {}
            _ => best = Some((idx, gap)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// [`breakeven`] over two extrapolations' resampled grids.
pub fn breakeven_between(first: &Extrapolation, second: &Extrapolation) -> Option<usize> {
    breakeven(&first.resampled, &second.resampled)
}
