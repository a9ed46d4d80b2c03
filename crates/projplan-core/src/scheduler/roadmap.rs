//! Scheduling results.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::timeline::Bucket;
use crate::velocity::CurvePoint;

/// Cumulative progress of a focus area at the end of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressPoint {
    /// Effort invested since the timeline start.
    pub effort: f64,
    /// Tasks finished since the timeline start.
    pub completed: usize,
}

/// What one schedulable focus area did during a bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaActivity {
    /// Dedicated FTE.
    pub allocation: f64,
    /// Effort units the allocation could advance.
    pub budget: f64,
    pub consumed: f64,
    /// Budget left over: backlog exhausted or blocked.
    pub idle: f64,
    /// Task that absorbed the last unit of budget.
    pub active_task: Option<String>,
}

/// Per-bucket accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRecord {
    pub bucket: Bucket,
    /// Total FTE available.
    pub capacity: f64,
    /// FTE allocated over every focus area, schedulable or not.
    pub allocated: f64,
    /// `capacity - allocated`, never negative.
    pub unallocated: f64,
    /// Keyed by schedulable focus area name.
    pub areas: BTreeMap<String, AreaActivity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCompletion {
    pub focus_area: String,
    pub task_number: String,
    pub group: Option<usize>,
    pub bucket_index: usize,
    /// End of the bucket in which the last effort unit was spent.
    pub date: NaiveDate,
}

/// When a task group is done in one focus area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDeadline {
    pub focus_area: String,
    pub group: usize,
    pub group_name: String,
    /// Latest completion among the group's tasks; `None` while any of them
    /// is unfinished at the timeline end.
    pub date: Option<NaiveDate>,
}

/// Everything a schedule run produces. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roadmap {
    pub scenario: String,
    /// Schedulable focus areas in registry order.
    pub focus_areas: Vec<String>,
    pub buckets: Vec<BucketRecord>,
    /// One point per bucket for every schedulable focus area.
    pub curves: BTreeMap<String, Vec<ProgressPoint>>,
    /// In completion order.
    pub completions: Vec<TaskCompletion>,
    pub group_deadlines: Vec<GroupDeadline>,
    /// Effort left in each focus area's backlog at the timeline end.
    pub remaining: BTreeMap<String, f64>,
    pub colors: BTreeMap<String, String>,
    /// Relative display weight per focus area.
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
}

impl Roadmap {
    pub fn timeline(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter().map(|r| &r.bucket)
    }

    /// Task active for `focus_area` at the end of bucket `index`.
    pub fn active_task(&self, index: usize, focus_area: &str) -> Option<&str> {
        self.buckets
            .get(index)?
            .areas
            .get(focus_area)?
            .active_task
            .as_deref()
    }

    pub fn curve(&self, focus_area: &str) -> Option<&[ProgressPoint]> {
        self.curves.get(focus_area).map(Vec::as_slice)
    }

    pub fn consumed_total(&self, focus_area: &str) -> f64 {
        self.curve(focus_area)
            .and_then(|c| c.last())
            .map_or(0.0, |p| p.effort)
    }

    /// Effort consumed in buckets ending on or before `date`.
    pub fn consumed_through(&self, focus_area: &str, date: NaiveDate) -> f64 {
        self.buckets
            .iter()
            .take_while(|r| r.bucket.end <= date)
            .filter_map(|r| r.areas.get(focus_area))
            .map(|a| a.consumed)
            .sum()
    }

    /// Date the focus area's backlog was finished, if it was.
    pub fn finish_date(&self, focus_area: &str) -> Option<NaiveDate> {
        let remaining = self.remaining.get(focus_area)?;
        if *remaining > 0.0 {
            return None;
        }
        self.completions
            .iter()
            .filter(|c| c.focus_area == focus_area)
            .map(|c| c.date)
            .max()
    }

    pub fn completion(&self, focus_area: &str, task_number: &str) -> Option<&TaskCompletion> {
        self.completions
            .iter()
            .find(|c| c.focus_area == focus_area && c.task_number == task_number)
    }

    /// Cumulative curve of `focus_area` as velocity input.
    pub fn velocity_curve(&self, focus_area: &str) -> Option<Vec<CurvePoint>> {
        self.curve(focus_area).map(|points| {
            points
                .iter()
                .map(|p| CurvePoint::new(p.effort, p.completed as f64))
                .collect()
        })
    }
}
