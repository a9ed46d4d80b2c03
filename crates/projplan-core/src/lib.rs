//! # projplan Core Library
//!
//! Capacity-constrained roadmap scheduling. Given a time-varying headcount,
//! focus areas with their own time-varying allocations and a prioritized
//! backlog, it computes which task each focus area works on in every time
//! bucket and derives completion curves for velocity extrapolation.
//!
//! ## Architecture
//!
//! - **Timeline**: piecewise-constant constraint series, buckets and day counting
//! - **Backlog**: MRD and GitLab CSV loaders feeding a read-only task list
//! - **Scenario**: two-phase build of a what-if plan, from code or TOML
//! - **Scheduler**: bucket-by-bucket budget spending, producing a [`Roadmap`]
//! - **Velocity**: linear trend fitting, extrapolation and breakeven search
//!
//! ## Key Components
//!
//! - [`ConstraintSeries`]: value that changes at calendar dates
//! - [`ScenarioBuilder`] / [`Scenario`]: validated plan
//! - [`RoadmapScheduler`]: the scheduling engine
//! - [`extrapolate`]: long-range completion projection

pub mod backlog;
pub mod error;
pub mod focus_area;
pub mod scenario;
pub mod scheduler;
pub mod timeline;
pub mod velocity;

pub use backlog::{Backlog, BacklogTask, TaskGroup, TaskOrdering};
pub use error::{BacklogError, ConfigError, PlanError, Result};
pub use focus_area::{FocusArea, FocusAreaRegistry};
pub use scenario::{AllocationUnit, BacklogFormat, BacklogSource, Scenario, ScenarioBuilder, ScenarioConfig};
pub use scheduler::{BucketRecord, ProgressPoint, Roadmap, RoadmapScheduler, SchedulerConfig, TaskCompletion};
pub use timeline::{Bucket, ConstraintInterval, ConstraintSeries, DayCounting, Granularity, WorkCalendar};
pub use velocity::{breakeven, extrapolate, CurvePoint, Extrapolation, ExtrapolationParams};
