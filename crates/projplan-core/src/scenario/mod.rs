//! What-if plans.
//!
//! A [`Scenario`] is built in two phases: settings are collected on a
//! [`ScenarioBuilder`], and [`ScenarioBuilder::build`] validates them against
//! the focus-area registry and the backlog. Only a built scenario can be
//! scheduled, and scheduling never changes it.

mod config;

pub use config::{BacklogFormat, BacklogSource, ScenarioConfig};

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::backlog::Backlog;
use crate::error::{PlanError, Result};
use crate::focus_area::FocusAreaRegistry;
use crate::scheduler::{Roadmap, RoadmapScheduler, SchedulerConfig};
use crate::timeline::{build_timeline, Bucket, ConstraintSeries, Granularity, WorkCalendar};

/// How allocation series values are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationUnit {
    /// Headcount (FTE) dedicated to the focus area.
    #[default]
    Absolute,
    /// Share of the total capacity in effect at the bucket.
    Fraction,
}

/// Collects scenario settings before validation.
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    name: String,
    ftes: ConstraintSeries,
    registry: FocusAreaRegistry,
    timeline_start: NaiveDate,
    timeline_end: NaiveDate,
    granularity: Granularity,
    calendar: WorkCalendar,
    work_per_task: f64,
    allocation_unit: AllocationUnit,
    allocations: BTreeMap<String, ConstraintSeries>,
    scheduler: SchedulerConfig,
    backlog: Arc<Backlog>,
}

impl ScenarioBuilder {
    /// Starts a scenario with quarterly buckets, calendar-day counting,
    /// `work_per_task = 1.0`, no allocations and an empty backlog.
    pub fn new(
        name: impl Into<String>,
        ftes: impl Into<ConstraintSeries>,
        registry: FocusAreaRegistry,
        timeline_start: NaiveDate,
        timeline_end: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            ftes: ftes.into(),
            registry,
            timeline_start,
            timeline_end,
            granularity: Granularity::default(),
            calendar: WorkCalendar::default(),
            work_per_task: 1.0,
            allocation_unit: AllocationUnit::default(),
            allocations: BTreeMap::new(),
            scheduler: SchedulerConfig::default(),
            backlog: Arc::new(Backlog::default()),
        }
    }

    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn calendar(mut self, calendar: WorkCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// Effort units one FTE-day advances.
    pub fn work_per_task(mut self, work_per_task: f64) -> Self {
        self.work_per_task = work_per_task;
        self
    }

    pub fn allocation_unit(mut self, unit: AllocationUnit) -> Self {
        self.allocation_unit = unit;
        self
    }

    /// Sets the allocation series of one focus area.
    pub fn allocation(mut self, focus_area: impl Into<String>, series: impl Into<ConstraintSeries>) -> Self {
        self.allocations.insert(focus_area.into(), series.into());
        self
    }

    /// Replaces the whole allocation map.
    pub fn work_distribution(mut self, distribution: BTreeMap<String, ConstraintSeries>) -> Self {
        self.allocations = distribution;
        self
    }

    pub fn scheduler_config(mut self, config: SchedulerConfig) -> Self {
        self.scheduler = config;
        self
    }

    /// Caps the FTEs a single task can absorb per bucket.
    pub fn max_task_parallelism(mut self, ftes: f64) -> Self {
        self.scheduler.max_task_parallelism = Some(ftes);
        self
    }

    pub fn backlog(mut self, backlog: impl Into<Arc<Backlog>>) -> Self {
        self.backlog = backlog.into();
        self
    }

    /// Validates the settings and lays out the timeline.
    ///
    /// # Errors
    /// - [`PlanError::InvalidConfiguration`]: `work_per_task` not a positive
    ///   finite number, non-positive task parallelism, a negative or
    ///   non-finite scheduler tolerance, negative capacity or
    ///   allocation values, timeline start after end.
    /// - [`PlanError::UnknownFocusArea`]: an allocation or backlog entry names
    ///   a focus area missing from the registry.
    pub fn build(self) -> Result<Scenario> {
        if !(self.work_per_task.is_finite() && self.work_per_task > 0.0) {
            return Err(PlanError::invalid(format!(
                "work per task must be a positive number, got {}",
                self.work_per_task
            )));
        }
        self.scheduler.validate()?;
        if self.ftes.min_value() < 0.0 {
            return Err(PlanError::invalid("total capacity must not be negative"));
        }
        for (name, series) in &self.allocations {
            self.registry.require(name, "work distribution")?;
            if series.min_value() < 0.0 {
                return Err(PlanError::invalid(format!(
                    "allocation of '{name}' must not be negative"
                )));
            }
        }
        self.backlog.validate_against(&self.registry)?;

        let timeline = build_timeline(
            self.timeline_start,
            self.timeline_end,
            self.granularity,
            &self.calendar,
        )?;

        tracing::debug!(
            scenario = %self.name,
            buckets = timeline.len(),
            tasks = self.backlog.len(),
            "scenario built"
        );

        Ok(Scenario {
            name: self.name,
            ftes: self.ftes,
            registry: self.registry,
            timeline_start: self.timeline_start,
            timeline_end: self.timeline_end,
            granularity: self.granularity,
            calendar: self.calendar,
            work_per_task: self.work_per_task,
            allocation_unit: self.allocation_unit,
            allocations: self.allocations,
            scheduler: self.scheduler,
            backlog: self.backlog,
            timeline,
        })
    }
}

/// A validated, immutable plan ready for scheduling.
#[derive(Debug, Clone)]
pub struct Scenario {
    name: String,
    ftes: ConstraintSeries,
    registry: FocusAreaRegistry,
    timeline_start: NaiveDate,
    timeline_end: NaiveDate,
    granularity: Granularity,
    calendar: WorkCalendar,
    work_per_task: f64,
    allocation_unit: AllocationUnit,
    allocations: BTreeMap<String, ConstraintSeries>,
    scheduler: SchedulerConfig,
    backlog: Arc<Backlog>,
    timeline: Vec<Bucket>,
}

impl Scenario {
    /// Runs the scheduler over the whole timeline.
    pub fn schedule(&self) -> Result<Roadmap> {
        RoadmapScheduler::with_config(self.scheduler.clone()).schedule(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ftes(&self) -> &ConstraintSeries {
        &self.ftes
    }

    pub fn registry(&self) -> &FocusAreaRegistry {
        &self.registry
    }

    pub fn timeline_start(&self) -> NaiveDate {
        self.timeline_start
    }

    pub fn timeline_end(&self) -> NaiveDate {
        self.timeline_end
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn calendar(&self) -> &WorkCalendar {
        &self.calendar
    }

    pub fn work_per_task(&self) -> f64 {
        self.work_per_task
    }

    pub fn allocation_unit(&self) -> AllocationUnit {
        self.allocation_unit
    }

    pub fn allocation(&self, focus_area: &str) -> Option<&ConstraintSeries> {
        self.allocations.get(focus_area)
    }

    pub fn allocations(&self) -> &BTreeMap<String, ConstraintSeries> {
        &self.allocations
    }

    pub fn scheduler_config(&self) -> &SchedulerConfig {
        &self.scheduler
    }

    pub fn backlog(&self) -> &Arc<Backlog> {
        &self.backlog
    }

    pub fn timeline(&self) -> &[Bucket] {
        &self.timeline
    }

    pub fn color_dict(&self) -> BTreeMap<String, String> {
        self.registry.color_dict()
    }

    pub fn weight_dict(&self) -> BTreeMap<String, f64> {
        self.registry.weight_dict()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backlog::BacklogTask;
    use crate::focus_area::FocusArea;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn registry() -> FocusAreaRegistry {
        FocusAreaRegistry::new(vec![
            FocusArea::new("Proj1"),
            FocusArea::new("Support").unschedulable(),
        ])
        .unwrap()
    }

    fn builder() -> ScenarioBuilder {
        ScenarioBuilder::new("base", 4.0, registry(), d(2024, 1, 1), d(2025, 12, 31))
    }

    #[test]
    fn test_build_defaults() {
        let scenario = builder().build().unwrap();
        assert_eq!(scenario.name(), "base");
        assert_eq!(scenario.granularity(), Granularity::Quarter);
        assert_eq!(scenario.timeline().len(), 8);
        assert_eq!(scenario.work_per_task(), 1.0);
        assert!(scenario.backlog().is_empty());
    }

    #[test]
    fn test_zero_work_per_task_rejected() {
        let err = builder().work_per_task(0.0).build().unwrap_err();
        assert!(matches!(err, PlanError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_negative_work_per_task_rejected() {
        assert!(builder().work_per_task(-0.5).build().is_err());
    }

    #[test]
    fn test_unknown_allocation_rejected() {
        let err = builder().allocation("Ghost", 1.0).build().unwrap_err();
        assert!(matches!(err, PlanError::UnknownFocusArea { ref name, .. } if name == "Ghost"));
    }

    #[test]
    fn test_unknown_backlog_area_rejected() {
        let backlog = Backlog::from_tasks(vec![BacklogTask::new("1.0.1", "x").with_effort("Proj9", 2.0)]);
        let err = builder().backlog(backlog).build().unwrap_err();
        assert!(matches!(err, PlanError::UnknownFocusArea { ref name, .. } if name == "Proj9"));
    }

    #[test]
    fn test_negative_allocation_rejected() {
        let err = builder().allocation("Proj1", -1.0).build().unwrap_err();
        assert!(matches!(err, PlanError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        assert!(builder().max_task_parallelism(0.0).build().is_err());
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        for tolerance in [f64::NAN, f64::INFINITY, -1e-9] {
            let config = SchedulerConfig {
                tolerance,
                ..SchedulerConfig::default()
            };
            let err = builder().scheduler_config(config).build().unwrap_err();
            assert!(matches!(err, PlanError::InvalidConfiguration(_)));
        }
    }

    #[test]
    fn test_inverted_timeline_rejected() {
        let result = ScenarioBuilder::new("x", 1.0, registry(), d(2025, 1, 1), d(2024, 1, 1)).build();
        assert!(matches!(result, Err(PlanError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_shared_backlog() {
        let backlog = Arc::new(Backlog::from_tasks(vec![
            BacklogTask::new("1.0.1", "x").with_effort("Proj1", 2.0),
        ]));
        let a = builder().backlog(Arc::clone(&backlog)).build().unwrap();
        let b = builder().backlog(Arc::clone(&backlog)).build().unwrap();
        assert!(Arc::ptr_eq(a.backlog(), b.backlog()));
    }
}
