//! Day counting for bucket budgets.
//!
//! A bucket's budget scales with the number of days it contributes. With
//! [`DayCounting::Calendar`] every day counts; with [`DayCounting::Working`]
//! weekends and declared holidays contribute nothing.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Which days contribute capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayCounting {
    /// Every calendar day
    #[default]
    Calendar,
    /// Monday to Friday, minus holidays
    Working,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendar {
    #[serde(default)]
    pub counting: DayCounting,
    /// Only consulted with [`DayCounting::Working`].
    #[serde(default)]
    pub holidays: BTreeSet<NaiveDate>,
}

impl WorkCalendar {
    /// Counts every day.
    pub fn calendar_days() -> Self {
        Self::default()
    }

    /// Counts weekdays that are not holidays.
    pub fn working_days() -> Self {
        Self {
            counting: DayCounting::Working,
            holidays: BTreeSet::new(),
        }
    }

    pub fn with_holiday(mut self, date: NaiveDate) -> Self {
        self.holidays.insert(date);
        self
    }

    /// Whether `date` contributes capacity.
    pub fn counts(&self, date: NaiveDate) -> bool {
        match self.counting {
            DayCounting::Calendar => true,
            DayCounting::Working => {
                !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
                    && !self.holidays.contains(&date)
            }
        }
    }

    /// Number of contributing days in `[start, end]` (inclusive).
    pub fn effective_days(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        if end < start {
            return 0;
        }
        match self.counting {
            DayCounting::Calendar => ((end - start).num_days() + 1) as u32,
            DayCounting::Working => start
                .iter_days()
                .take_while(|day| *day <= end)
                .filter(|day| self.counts(*day))
                .count() as u32,
        }
    }
}
