//! Piecewise-constant constraint series.
//!
//! A [`ConstraintSeries`] is a value that changes at discrete calendar dates:
//! team headcount, or the share of that headcount dedicated to one focus area.
//!
//! # Lookup rule
//! The value at date `d` is the value of the last interval whose start is
//! `<= d`. Declared end dates are kept for display only: a date after a
//! closed end with no later interval keeps the last known value.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};

/// One `[start, end]` interval of a series.
///
/// `end == None` means the value holds indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstraintInterval {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub value: f64,
}

impl ConstraintInterval {
    /// Closed interval `[start, end]`.
    pub fn closed(start: NaiveDate, end: NaiveDate, value: f64) -> Self {
        Self {
            start,
            end: Some(end),
            value,
        }
    }

    /// Open-ended interval starting at `start`.
    pub fn open(start: NaiveDate, value: f64) -> Self {
        Self {
            start,
            end: None,
            value,
        }
    }
}

/// Sorted, validated, immutable list of constraint intervals.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use projplan_core::timeline::{ConstraintInterval, ConstraintSeries};
///
/// let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
/// let series = ConstraintSeries::new(vec![
///     ConstraintInterval::closed(d(2024, 1, 1), d(2024, 12, 31), 0.5),
///     ConstraintInterval::open(d(2025, 1, 1), 1.0),
/// ])
/// .unwrap();
///
/// assert_eq!(series.value_at(d(2024, 6, 1)).unwrap(), 0.5);
/// assert_eq!(series.value_at(d(2031, 1, 1)).unwrap(), 1.0);
/// assert!(series.value_at(d(2023, 12, 31)).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SeriesSpec", into = "SeriesSpec")]
pub struct ConstraintSeries {
    intervals: Vec<ConstraintInterval>,
}

impl ConstraintSeries {
    /// Builds a series from chronologically ordered intervals.
    ///
    /// # Errors
    /// Returns [`PlanError::InvalidConfiguration`] if the list is empty, a value
    /// is not finite, an interval ends before it starts, start dates are not
    /// strictly increasing, a closed interval overlaps its successor, or an
    /// open-ended interval is followed by another one.
    pub fn new(intervals: Vec<ConstraintInterval>) -> Result<Self> {
        if intervals.is_empty() {
            return Err(PlanError::invalid("constraint series needs at least one interval"));
        }

        for (idx, iv) in intervals.iter().enumerate() {
            if !iv.value.is_finite() {
                return Err(PlanError::invalid(format!(
                    "interval starting {} has non-finite value {}",
                    iv.start, iv.value
                )));
            }
            if let Some(end) = iv.end {
                if end < iv.start {
                    return Err(PlanError::invalid(format!(
                        "interval starting {} ends before it starts ({end})",
                        iv.start
                    )));
                }
            }

            let Some(next) = intervals.get(idx + 1) else {
                continue;
            };
            if next.start <= iv.start {
                return Err(PlanError::invalid(format!(
                    "intervals are not in chronological order: {} follows {}",
                    next.start, iv.start
                )));
            }
            match iv.end {
                None => {
                    return Err(PlanError::invalid(format!(
                        "open-ended interval starting {} must be the last one",
                        iv.start
                    )))
                }
                Some(end) if end >= next.start => {
                    return Err(PlanError::invalid(format!(
                        "interval ending {end} overlaps interval starting {}",
                        next.start
                    )))
                }
                Some(_) => {}
            }
        }

        Ok(Self { intervals })
    }

    /// A value that holds for all dates.
    pub fn constant(value: f64) -> Self {
        Self {
            intervals: vec![ConstraintInterval::open(NaiveDate::MIN, value)],
        }
    }

    /// Value in effect at `date`.
    ///
    /// # Errors
    /// [`PlanError::OutOfRange`] if `date` precedes the first interval.
    pub fn value_at(&self, date: NaiveDate) -> Result<f64> {
        self.interval_index(date)
            .map(|idx| self.intervals[idx].value)
            .ok_or(PlanError::OutOfRange {
                date,
                first_start: self.first_start(),
            })
    }

    /// Index of the interval governing `date`, if any.
    pub fn interval_index(&self, date: NaiveDate) -> Option<usize> {
        let after = self.intervals.partition_point(|iv| iv.start <= date);
        after.checked_sub(1)
    }

    pub fn first_start(&self) -> NaiveDate {
        self.intervals[0].start
    }

    pub fn intervals(&self) -> &[ConstraintInterval] {
        &self.intervals
    }

    /// Whether the series is a single interval covering all dates.
    pub fn is_constant(&self) -> bool {
        self.intervals.len() == 1
            && self.intervals[0].start == NaiveDate::MIN
            && self.intervals[0].end.is_none()
    }

    /// Smallest value of any interval.
    pub fn min_value(&self) -> f64 {
        self.intervals
            .iter()
            .map(|iv| iv.value)
            .fold(f64::INFINITY, f64::min)
    }

    /// Start dates at which the value may change.
    pub fn breakpoints(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.intervals.iter().map(|iv| iv.start)
    }
}

impl From<f64> for ConstraintSeries {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

/// Serialized shape: a bare number, or a list of `{start, end, value}` tables.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SeriesSpec {
    Constant(f64),
    Intervals(Vec<IntervalSpec>),
}

#[derive(Serialize, Deserialize)]
struct IntervalSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end: Option<NaiveDate>,
    value: f64,
}

impl TryFrom<SeriesSpec> for ConstraintSeries {
    type Error = PlanError;

    fn try_from(spec: SeriesSpec) -> Result<Self> {
        match spec {
            SeriesSpec::Constant(value) => {
                if value.is_finite() {
                    Ok(Self::constant(value))
                } else {
                    Err(PlanError::invalid(format!("non-finite constant {value}")))
                }
            }
            SeriesSpec::Intervals(items) => {
                let intervals = items
                    .into_iter()
                    .map(|item| ConstraintInterval {
                        start: item.start.unwrap_or(NaiveDate::MIN),
                        end: item.end,
                        value: item.value,
                    })
                    .collect();
                Self::new(intervals)
            }
        }
    }
}

impl From<ConstraintSeries> for SeriesSpec {
    fn from(series: ConstraintSeries) -> Self {
        if series.is_constant() {
            return SeriesSpec::Constant(series.intervals[0].value);
        }
        SeriesSpec::Intervals(
            series
                .intervals
                .into_iter()
                .map(|iv| IntervalSpec {
                    start: (iv.start != NaiveDate::MIN).then_some(iv.start),
                    end: iv.end,
                    value: iv.value,
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn yearly() -> ConstraintSeries {
        ConstraintSeries::new(vec![
            ConstraintInterval::closed(d(2024, 1, 1), d(2024, 12, 31), 0.5),
            ConstraintInterval::open(d(2025, 1, 1), 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_value_lookup() {
        let s = yearly();
        assert_eq!(s.value_at(d(2024, 1, 1)).unwrap(), 0.5);
        assert_eq!(s.value_at(d(2024, 12, 31)).unwrap(), 0.5);
        assert_eq!(s.value_at(d(2025, 1, 1)).unwrap(), 1.0);
        assert_eq!(s.value_at(d(2099, 7, 4)).unwrap(), 1.0);
    }

    #[test]
    fn test_before_first_interval_is_out_of_range() {
        let err = yearly().value_at(d(2023, 12, 31)).unwrap_err();
        match err {
            PlanError::OutOfRange { date, first_start } => {
                assert_eq!(date, d(2023, 12, 31));
                assert_eq!(first_start, d(2024, 1, 1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_gap_after_closed_end_keeps_last_value() {
        let s = ConstraintSeries::new(vec![
            ConstraintInterval::closed(d(2024, 1, 1), d(2024, 3, 31), 2.0),
            ConstraintInterval::closed(d(2024, 7, 1), d(2024, 9, 30), 4.0),
        ])
        .unwrap();
        // Gap between Q1 and Q3
        assert_eq!(s.value_at(d(2024, 5, 15)).unwrap(), 2.0);
        // After the last closed end
        assert_eq!(s.value_at(d(2026, 1, 1)).unwrap(), 4.0);
    }

    #[test]
    fn test_constant() {
        let s = ConstraintSeries::constant(3.0);
        assert!(s.is_constant());
        assert_eq!(s.value_at(d(1900, 1, 1)).unwrap(), 3.0);
        assert_eq!(s.value_at(d(2200, 1, 1)).unwrap(), 3.0);
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            ConstraintSeries::new(vec![]),
            Err(PlanError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_rejects_unsorted() {
        let result = ConstraintSeries::new(vec![
            ConstraintInterval::closed(d(2025, 1, 1), d(2025, 12, 31), 1.0),
            ConstraintInterval::closed(d(2024, 1, 1), d(2024, 12, 31), 0.5),
        ]);
        assert!(matches!(result, Err(PlanError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rejects_duplicate_start() {
        let result = ConstraintSeries::new(vec![
            ConstraintInterval::closed(d(2024, 1, 1), d(2024, 1, 1), 1.0),
            ConstraintInterval::open(d(2024, 1, 1), 0.5),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_open_interval_not_last() {
        let result = ConstraintSeries::new(vec![
            ConstraintInterval::open(d(2024, 1, 1), 1.0),
            ConstraintInterval::open(d(2025, 1, 1), 2.0),
        ]);
        assert!(matches!(result, Err(PlanError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rejects_overlap() {
        let result = ConstraintSeries::new(vec![
            ConstraintInterval::closed(d(2024, 1, 1), d(2024, 6, 30), 1.0),
            ConstraintInterval::open(d(2024, 6, 30), 2.0),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_inverted_interval() {
        let result = ConstraintSeries::new(vec![ConstraintInterval::closed(
            d(2024, 6, 1),
            d(2024, 1, 1),
            1.0,
        )]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_nan() {
        let result = ConstraintSeries::new(vec![ConstraintInterval::open(d(2024, 1, 1), f64::NAN)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_interval_index() {
        let s = yearly();
        assert_eq!(s.interval_index(d(2023, 1, 1)), None);
        assert_eq!(s.interval_index(d(2024, 5, 1)), Some(0));
        assert_eq!(s.interval_index(d(2025, 5, 1)), Some(1));
    }

    #[test]
    fn test_deserialize_constant_and_intervals() {
        #[derive(Deserialize)]
        struct Doc {
            ftes: ConstraintSeries,
            proj: ConstraintSeries,
        }

        let doc: Doc = toml::from_str(
            r#"
            ftes = 4
            proj = [
                { start = "2024-01-01", end = "2024-12-31", value = 0.5 },
                { start = "2025-01-01", value = 1.0 },
            ]
            "#,
        )
        .unwrap();

        assert!(doc.ftes.is_constant());
        assert_eq!(doc.ftes.value_at(d(2030, 1, 1)).unwrap(), 4.0);
        assert_eq!(doc.proj, yearly());
    }

    #[test]
    fn test_deserialize_rejects_invalid_intervals() {
        let result: std::result::Result<ConstraintSeries, _> = serde_json::from_str(
            r#"[{"value": 1.0}, {"start": "2024-01-01", "value": 2.0}]"#,
        );
        // The first interval is open-ended and not last
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_round_shape() {
        let json = serde_json::to_value(ConstraintSeries::constant(2.5)).unwrap();
        assert_eq!(json, serde_json::json!(2.5));

        let json = serde_json::to_value(yearly()).unwrap();
        assert_eq!(json[0]["start"], "2024-01-01");
        assert_eq!(json[1].get("end"), None);
    }
}
