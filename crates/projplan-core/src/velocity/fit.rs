use serde::{Deserialize, Serialize};

use super::CurvePoint;

/// Ordinary least squares line through a curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    /// Completed tasks per effort unit.
    pub slope: f64,
    pub intercept: f64,
    pub samples: usize,
}

impl LinearFit {
    pub fn predict(&self, effort: f64) -> f64 {
        self.intercept + self.slope * effort
    }
}

/// Fits `completed = slope * effort + intercept`.
///
/// Fewer than two points or no spread in effort gives a flat line through
/// the mean.
pub fn fit_linear(points: &[CurvePoint]) -> LinearFit {
    let n = points.len();
    if n == 0 {
        return LinearFit {
            slope: 0.0,
            intercept: 0.0,
            samples: 0,
        };
    }

    let nf = n as f64;
    let mean_x = points.iter().map(|p| p.effort).sum::<f64>() / nf;
    let mean_y = points.iter().map(|p| p.completed).sum::<f64>() / nf;
    let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), p| {
        let dx = p.effort - mean_x;
        (sxy + dx * (p.completed - mean_y), sxx + dx * dx)
    });

    let slope = if n < 2 || sxx <= f64::EPSILON { 0.0 } else { sxy / sxx };
    LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
        samples: n,
    }
}
