//! Discrete scheduling buckets.
//!
//! Buckets are laid out from the timeline start in steps of the chosen
//! granularity. Each step is computed from the start date directly, so
//! month-end starts do not drift. The final bucket is cut at the timeline
//! end and its budget is prorated by the days it actually covers.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::WorkCalendar;
use crate::error::{PlanError, Result};

/// Bucket length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
    #[default]
    Quarter,
}

impl Granularity {
    /// Start of the `k`-th bucket counted from `origin`.
    fn offset(self, origin: NaiveDate, k: u32) -> Option<NaiveDate> {
        match self {
            Self::Day => origin.checked_add_days(Days::new(u64::from(k))),
            Self::Week => origin.checked_add_days(Days::new(7 * u64::from(k))),
            Self::Month => origin.checked_add_months(Months::new(k)),
            Self::Quarter => origin.checked_add_months(Months::new(3 * k)),
        }
    }
}

/// One time slice of the roadmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub index: usize,
    pub start: NaiveDate,
    /// Last day of the bucket (inclusive).
    pub end: NaiveDate,
    pub calendar_days: u32,
    /// Days that contribute budget under the scenario's calendar.
    pub effective_days: u32,
    /// Cut short by the timeline end.
    pub partial: bool,
}

impl Bucket {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Builds the buckets covering `[start, end]`.
///
/// # Errors
/// [`PlanError::InvalidConfiguration`] if `start > end`.
pub fn build_timeline(
    start: NaiveDate,
    end: NaiveDate,
    granularity: Granularity,
    calendar: &WorkCalendar,
) -> Result<Vec<Bucket>> {
    if start > end {
        return Err(PlanError::invalid(format!(
            "timeline start {start} is after timeline end {end}"
        )));
    }

    let mut buckets = Vec::new();
    let mut k: u32 = 0;
    while let Some(bucket_start) = granularity.offset(start, k) {
        if bucket_start > end {
            break;
        }
        let nominal_end = granularity
            .offset(start, k + 1)
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX);
        let bucket_end = nominal_end.min(end);

        buckets.push(Bucket {
            index: buckets.len(),
            start: bucket_start,
            end: bucket_end,
            calendar_days: ((bucket_end - bucket_start).num_days() + 1) as u32,
            effective_days: calendar.effective_days(bucket_start, bucket_end),
            partial: bucket_end < nominal_end,
        });
        k += 1;
    }

    Ok(buckets)
}
