//! Capacity-constrained roadmap scheduler.
//!
//! Walks the scenario timeline bucket by bucket:
//! - Reads the total capacity and every focus-area allocation at the bucket start
//! - Fails with [`PlanError::OverAllocation`] when allocations exceed capacity
//! - Turns each schedulable allocation into an effort budget and spends it on
//!   the focus area's tasks in priority-then-backlog order
//! - Records consumption, completions and cumulative progress
//!
//! Free capacity is reported, never redistributed.

mod roadmap;

pub use roadmap::{AreaActivity, BucketRecord, GroupDeadline, ProgressPoint, Roadmap, TaskCompletion};

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::backlog::Backlog;
use crate::error::{PlanError, Result};
use crate::scenario::{AllocationUnit, Scenario};

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// FTE cap on what a single task absorbs per bucket (`None` = unlimited)
    #[serde(default)]
    pub max_task_parallelism: Option<f64>,
    /// Slack for floating-point comparisons
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_tolerance() -> f64 {
    1e-9
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_task_parallelism: None,
            tolerance: default_tolerance(),
        }
    }
}

impl SchedulerConfig {
    /// # Errors
    /// [`PlanError::InvalidConfiguration`] for a parallelism cap that is not a
    /// positive number or a tolerance that is negative or not finite.
    pub fn validate(&self) -> Result<()> {
        if let Some(cap) = self.max_task_parallelism {
            if !(cap.is_finite() && cap > 0.0) {
                return Err(PlanError::invalid(format!(
                    "max task parallelism must be positive, got {cap}"
                )));
            }
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(PlanError::invalid(format!(
                "scheduler tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Spends scenario budgets on the backlog.
#[derive(Debug, Clone, Default)]
pub struct RoadmapScheduler {
    config: SchedulerConfig,
}

impl RoadmapScheduler {
    /// Create a new scheduler with default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom config
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Schedules the whole timeline.
    ///
    /// Pure with respect to `scenario`: the same scenario always yields the
    /// same roadmap.
    ///
    /// # Errors
    /// - [`PlanError::OverAllocation`] if allocations exceed capacity in a bucket.
    /// - [`PlanError::OutOfRange`] if a series starts after a bucket start.
    /// - [`PlanError::InvalidConfiguration`] if the scheduler config is invalid.
    pub fn schedule(&self, scenario: &Scenario) -> Result<Roadmap> {
        self.config.validate()?;
        let tolerance = self.config.tolerance;
        let work_per_task = scenario.work_per_task();
        let backlog = scenario.backlog();

        let mut queues: Vec<AreaQueue> = scenario
            .registry()
            .schedulable()
            .map(|fa| AreaQueue::new(&fa.name, backlog))
            .collect();

        let mut open_work: HashMap<String, usize> = HashMap::new();
        for queue in &queues {
            for task in &queue.tasks {
                *open_work.entry(task.number.clone()).or_default() += 1;
            }
        }

        tracing::info!(
            scenario = scenario.name(),
            buckets = scenario.timeline().len(),
            focus_areas = queues.len(),
            tasks = backlog.len(),
            "scheduling"
        );

        let mut records = Vec::with_capacity(scenario.timeline().len());
        let mut curves: BTreeMap<String, Vec<ProgressPoint>> = queues
            .iter()
            .map(|q| (q.name.clone(), Vec::with_capacity(scenario.timeline().len())))
            .collect();
        let mut completions = Vec::new();

        for bucket in scenario.timeline() {
            let capacity = scenario.ftes().value_at(bucket.start)?;

            let mut allocations: HashMap<&str, f64> = HashMap::new();
            let mut allocated = 0.0;
            for (name, series) in scenario.allocations() {
                let mut fte = series.value_at(bucket.start)?;
                if scenario.allocation_unit() == AllocationUnit::Fraction {
                    fte *= capacity;
                }
                allocated += fte;
                allocations.insert(name.as_str(), fte);
            }
            if allocated > capacity + tolerance {
                return Err(PlanError::OverAllocation {
                    bucket_start: bucket.start,
                    allocated,
                    capacity,
                });
            }

            let days = f64::from(bucket.effective_days);
            let task_cap = self
                .config
                .max_task_parallelism
                .map(|p| p * days * work_per_task);

            let mut areas = BTreeMap::new();
            for queue in &mut queues {
                let fte = allocations.get(queue.name.as_str()).copied().unwrap_or(0.0);
                let budget = fte * days * work_per_task;
                let spent = queue.spend(budget, task_cap, tolerance, &mut open_work);

                for idx in spent.finished {
                    let task = &queue.tasks[idx];
                    tracing::debug!(
                        focus_area = %queue.name,
                        task = %task.number,
                        date = %bucket.end,
                        "task completed"
                    );
                    completions.push(TaskCompletion {
                        focus_area: queue.name.clone(),
                        task_number: task.number.clone(),
                        group: task.group,
                        bucket_index: bucket.index,
                        date: bucket.end,
                    });
                }

                let idle = (budget - spent.consumed).max(0.0);
                if spent.blocked && idle > tolerance && !queue.warned_blocked {
                    queue.warned_blocked = true;
                    tracing::warn!(
                        focus_area = %queue.name,
                        bucket_start = %bucket.start,
                        idle,
                        "budget idle: next task waits on an unfinished prerequisite"
                    );
                }

                if let Some(curve) = curves.get_mut(&queue.name) {
                    curve.push(ProgressPoint {
                        effort: queue.invested,
                        completed: queue.completed,
                    });
                }
                areas.insert(
                    queue.name.clone(),
                    AreaActivity {
                        allocation: fte,
                        budget,
                        consumed: spent.consumed,
                        idle,
                        active_task: spent.active,
                    },
                );
            }

            records.push(BucketRecord {
                bucket: bucket.clone(),
                capacity,
                allocated,
                unallocated: (capacity - allocated).max(0.0),
                areas,
            });
        }

        let group_deadlines = group_deadlines(&queues, &completions, backlog);
        let remaining: BTreeMap<String, f64> = queues
            .iter()
            .map(|q| (q.name.clone(), q.remaining()))
            .collect();

        tracing::info!(
            scenario = scenario.name(),
            completed = completions.len(),
            "schedule finished"
        );

        Ok(Roadmap {
            scenario: scenario.name().to_string(),
            focus_areas: queues.iter().map(|q| q.name.clone()).collect(),
            buckets: records,
            curves,
            completions,
            group_deadlines,
            remaining,
            colors: scenario.color_dict(),
            weights: scenario.weight_dict(),
        })
    }
}

/// Outcome of spending one bucket's budget.
struct Spent {
    consumed: f64,
    active: Option<String>,
    finished: Vec<usize>,
    blocked: bool,
}

struct TaskState {
    number: String,
    group: Option<usize>,
    remaining: f64,
    prerequisites: Vec<String>,
}

/// Work queue of one schedulable focus area.
struct AreaQueue {
    name: String,
    tasks: Vec<TaskState>,
    /// First unfinished task
    cursor: usize,
    invested: f64,
    completed: usize,
    warned_blocked: bool,
}

impl AreaQueue {
    fn new(name: &str, backlog: &Backlog) -> Self {
        let tasks = backlog
            .tasks_for(name)
            .into_iter()
            .map(|t| TaskState {
                number: t.number.clone(),
                group: t.group,
                remaining: t.effort_for(name),
                prerequisites: t
                    .prerequisites(name)
                    .iter()
                    .filter(|p| **p != t.number)
                    .cloned()
                    .collect(),
            })
            .collect();
        Self {
            name: name.to_string(),
            tasks,
            cursor: 0,
            invested: 0.0,
            completed: 0,
            warned_blocked: false,
        }
    }

    fn remaining(&self) -> f64 {
        self.tasks.iter().map(|t| t.remaining).sum()
    }

    /// Spends `budget` on tasks from the cursor on. A task absorbs at most
    /// `task_cap` per bucket; what it cannot absorb flows to the next task.
    /// Stops at the first task with an unfinished prerequisite.
    fn spend(
        &mut self,
        budget: f64,
        task_cap: Option<f64>,
        tolerance: f64,
        open_work: &mut HashMap<String, usize>,
    ) -> Spent {
        let mut spent = Spent {
            consumed: 0.0,
            active: None,
            finished: Vec::new(),
            blocked: false,
        };
        let mut left = budget;
        let mut idx = self.cursor;

        while left > tolerance && idx < self.tasks.len() {
            let task = &mut self.tasks[idx];
            if task.remaining <= 0.0 {
                idx += 1;
                continue;
            }
            let waiting = task
                .prerequisites
                .iter()
                .any(|p| open_work.get(p).is_some_and(|n| *n > 0));
            if waiting {
                spent.blocked = true;
                break;
            }

            let take = left.min(task.remaining).min(task_cap.unwrap_or(f64::INFINITY));
            if take > 0.0 {
                task.remaining -= take;
                left -= take;
                spent.consumed += take;
                spent.active = Some(task.number.clone());
            }
            if task.remaining <= tolerance {
                task.remaining = 0.0;
                if let Some(open) = open_work.get_mut(&task.number) {
                    *open = open.saturating_sub(1);
                }
                self.completed += 1;
                spent.finished.push(idx);
            }
            idx += 1;
        }

        while self.tasks.get(self.cursor).is_some_and(|t| t.remaining <= 0.0) {
            self.cursor += 1;
        }
        self.invested += spent.consumed;
        spent
    }
}

fn group_deadlines(
    queues: &[AreaQueue],
    completions: &[TaskCompletion],
    backlog: &Backlog,
) -> Vec<GroupDeadline> {
    let mut deadlines = Vec::new();
    for queue in queues {
        let mut by_group: BTreeMap<usize, Vec<&TaskState>> = BTreeMap::new();
        for task in &queue.tasks {
            if let Some(group) = task.group {
                by_group.entry(group).or_default().push(task);
            }
        }
        for (group, tasks) in by_group {
            let date = tasks
                .iter()
                .map(|t| {
                    completions
                        .iter()
                        .find(|c| c.focus_area == queue.name && c.task_number == t.number)
                        .map(|c| c.date)
                })
                .collect::<Option<Vec<_>>>()
                .and_then(|dates| dates.into_iter().max());
            deadlines.push(GroupDeadline {
                focus_area: queue.name.clone(),
                group,
                group_name: backlog
                    .group(group)
                    .map(|g| g.name.clone())
                    .unwrap_or_default(),
                date,
            });
        }
    }
    deadlines
}
