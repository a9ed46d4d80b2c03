//! Velocity extrapolation.
//!
//! Turns a focus area's historical `(effort, completed tasks)` curve into a
//! long-range projection:
//! - Fit one line to the history; its slope is the current velocity
//! - Split the rest of the horizon into equal transition segments and a
//!   final segment, stepping the slope towards `slope * (1 + delta)`
//! - Chain the segments end to start and resample on an integer effort grid
//!
//! Curves resampled on the same grid can be compared with [`breakeven`].

mod breakeven;
mod fit;

pub use breakeven::{breakeven, breakeven_between, BREAKEVEN_TAIL_EXCLUSION};
pub use fit::{fit_linear, LinearFit};

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};

/// Largest resampling grid, in points. Bounds the horizon to below `1e7`.
pub const MAX_GRID_POINTS: usize = 10_000_000;

/// One sample of a completion curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub effort: f64,
    pub completed: f64,
}

impl CurvePoint {
    pub fn new(effort: f64, completed: f64) -> Self {
        Self { effort, completed }
    }
}

/// Extrapolation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtrapolationParams {
    /// Effort at which the projection ends.
    pub horizon: f64,
    /// Relative slope change reached by the final segment.
    pub productivity_delta: f64,
    pub transition_steps: u32,
    /// Length of the constant-slope tail.
    pub final_interval_len: f64,
}

impl ExtrapolationParams {
    pub fn new(horizon: f64) -> Self {
        Self {
            horizon,
            productivity_delta: 0.0,
            transition_steps: 4,
            final_interval_len: 10.0,
        }
    }

    pub fn with_delta(mut self, delta: f64) -> Self {
        self.productivity_delta = delta;
        self
    }

    pub fn with_steps(mut self, steps: u32) -> Self {
        self.transition_steps = steps;
        self
    }

    pub fn with_final_len(mut self, len: f64) -> Self {
        self.final_interval_len = len;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.transition_steps == 0 {
            return Err(PlanError::invalid("transition steps must be at least 1"));
        }
        if !(self.horizon.is_finite() && self.horizon > 0.0) {
            return Err(PlanError::invalid(format!(
                "extrapolation horizon must be positive, got {}",
                self.horizon
            )));
        }
        if self.horizon >= MAX_GRID_POINTS as f64 {
            return Err(PlanError::invalid(format!(
                "extrapolation horizon {} exceeds the {MAX_GRID_POINTS}-point grid",
                self.horizon
            )));
        }
        if !(self.final_interval_len.is_finite() && self.final_interval_len >= 0.0) {
            return Err(PlanError::invalid(format!(
                "final interval length must not be negative, got {}",
                self.final_interval_len
            )));
        }
        if !self.productivity_delta.is_finite() {
            return Err(PlanError::invalid("productivity delta must be finite"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    History,
    /// 1-based transition step.
    Transition(u32),
    Final,
}

/// A piece of the extrapolated curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSegment {
    pub kind: SegmentKind,
    pub slope: f64,
    pub points: Vec<CurvePoint>,
}

impl CurveSegment {
    pub fn first(&self) -> Option<&CurvePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&CurvePoint> {
        self.points.last()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extrapolation {
    pub fit: LinearFit,
    /// History first, then transitions, then the final segment.
    pub segments: Vec<CurveSegment>,
    /// Completed tasks at effort `0, 1, ..., floor(horizon)`.
    pub resampled: Vec<f64>,
}

impl Extrapolation {
    /// Segments joined into one curve, shared endpoints kept once.
    pub fn points(&self) -> Vec<CurvePoint> {
        concat(&self.segments)
    }
}

/// Sorts by effort, collapses equal efforts to the highest count and makes
/// the curve start at the origin.
pub fn normalize_history(history: &[CurvePoint]) -> Vec<CurvePoint> {
    let mut points: Vec<CurvePoint> = history
        .iter()
        .copied()
        .filter(|p| p.effort.is_finite() && p.completed.is_finite())
        .collect();
    points.sort_by(|a, b| a.effort.total_cmp(&b.effort));

    let mut normalized: Vec<CurvePoint> = Vec::with_capacity(points.len() + 1);
    for point in points {
        match normalized.last_mut() {
            Some(last) if last.effort == point.effort => {
                last.completed = last.completed.max(point.completed);
            }
            _ => normalized.push(point),
        }
    }

    if normalized.first().map_or(true, |p| p.effort > 0.0) {
        normalized.insert(0, CurvePoint::new(0.0, 0.0));
    }
    normalized
}

/// Projects `history` out to `params.horizon`.
///
/// Segment `k` of `n` transition steps runs at
/// `slope * (1 + delta * k / n)`, the final segment at `slope * (1 + delta)`;
/// negative slopes are clamped to zero. A horizon at or before the last
/// historical effort adds no segments.
///
/// # Errors
/// [`PlanError::InvalidConfiguration`] for zero steps, a horizon that is not
/// positive, not finite or too large for [`MAX_GRID_POINTS`], a negative final
/// length or a non-finite delta.
pub fn extrapolate(history: &[CurvePoint], params: &ExtrapolationParams) -> Result<Extrapolation> {
    params.validate()?;

    let normalized = normalize_history(history);
    let fit = fit_linear(&normalized);
    let velocity = fit.slope.max(0.0);

    let mut segments = Vec::with_capacity(params.transition_steps as usize + 2);
    let mut cursor = *normalized
        .last()
        .ok_or_else(|| PlanError::invalid("empty history"))?;
    segments.push(CurveSegment {
        kind: SegmentKind::History,
        slope: velocity,
        points: normalized,
    });

    let remaining = params.horizon - cursor.effort;
    if remaining > 0.0 {
        let final_len = params.final_interval_len.min(remaining);
        let transition_len = remaining - final_len;
        let steps = params.transition_steps;
        let origin = cursor.effort;

        if transition_len > 0.0 {
            for k in 1..=steps {
                let factor = 1.0 + params.productivity_delta * f64::from(k) / f64::from(steps);
                let end = if k == steps {
                    origin + transition_len
                } else {
                    origin + transition_len * f64::from(k) / f64::from(steps)
                };
                let segment = linear_segment(SegmentKind::Transition(k), cursor, end, velocity * factor);
                cursor = segment.points[1];
                segments.push(segment);
            }
        }
        if final_len > 0.0 && cursor.effort < params.horizon {
            let slope = velocity * (1.0 + params.productivity_delta);
            segments.push(linear_segment(SegmentKind::Final, cursor, params.horizon, slope));
        }
    }

    let resampled = resample(&concat(&segments), params.horizon.floor() as usize)?;
    tracing::debug!(
        velocity,
        segments = segments.len(),
        grid = resampled.len(),
        "extrapolated curve"
    );

    Ok(Extrapolation {
        fit,
        segments,
        resampled,
    })
}

fn linear_segment(kind: SegmentKind, start: CurvePoint, end: f64, slope: f64) -> CurveSegment {
    let slope = slope.max(0.0);
    let completed = start.completed + slope * (end - start.effort);
    CurveSegment {
        kind,
        slope,
        points: vec![start, CurvePoint::new(end, completed)],
    }
}

fn concat(segments: &[CurveSegment]) -> Vec<CurvePoint> {
    let mut points: Vec<CurvePoint> = Vec::new();
    for segment in segments {
        for point in &segment.points {
            if points.last().is_some_and(|last| last.effort == point.effort) {
                continue;
            }
            points.push(*point);
        }
    }
    points
}

/// Linear interpolation of `points` at efforts `0..=grid_max`.
///
/// `points` must be sorted by effort. Values before the first point take its
/// count, values after the last point hold the last count.
///
/// # Errors
/// [`PlanError::InvalidConfiguration`] when the grid would exceed
/// [`MAX_GRID_POINTS`].
pub fn resample(points: &[CurvePoint], grid_max: usize) -> Result<Vec<f64>> {
    let len = grid_max
        .checked_add(1)
        .filter(|len| *len <= MAX_GRID_POINTS)
        .ok_or_else(|| PlanError::invalid(format!("resampling grid 0..={grid_max} is too large")))?;
    let Some(first) = points.first() else {
        return Ok(vec![0.0; len]);
    };

    let mut out = Vec::with_capacity(len);
    let mut seg = 0;
    for x in 0..=grid_max {
        let x = x as f64;
        while seg + 1 < points.len() && points[seg + 1].effort < x {
            seg += 1;
        }
        let value = if x <= first.effort {
            first.completed
        } else if seg + 1 >= points.len() {
            points[seg].completed
        } else {
            let (a, b) = (points[seg], points[seg + 1]);
            let span = b.effort - a.effort;
            if span <= 0.0 {
                b.completed
            } else {
                a.completed + (b.completed - a.completed) * (x - a.effort) / span
            }
        };
        out.push(value);
    }
    Ok(out)
}
