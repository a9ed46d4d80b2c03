//! Backlog model and file loaders.
//!
//! The backlog is the ordered task list of the MRD. Each task carries one
//! effort estimate (in days) per focus area; a zero estimate means the task
//! does not apply to that area.
//!
//! # Sequencing
//! Within a focus area tasks are consumed by descending priority tier, ties
//! broken by backlog order. Backlogs whose loader already fixed the order
//! (milestone exports) are consumed as listed, see [`TaskOrdering`].

pub mod gitlab;
pub mod mrd;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};
use crate::focus_area::FocusAreaRegistry;

/// A release or milestone grouping tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskGroup {
    pub index: usize,
    pub number: String,
    pub name: String,
}

/// A single backlog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogTask {
    pub number: String,
    pub name: String,
    /// Index into [`Backlog::groups`].
    #[serde(default)]
    pub group: Option<usize>,
    #[serde(default)]
    pub priority: i32,
    /// Effort in days, per focus area.
    #[serde(default)]
    pub effort: BTreeMap<String, f64>,
    /// Task numbers that must be finished before work in a focus area starts.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub blocked_by: BTreeMap<String, Vec<String>>,
}

impl BacklogTask {
    pub fn new(number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            name: name.into(),
            group: None,
            priority: 0,
            effort: BTreeMap::new(),
            blocked_by: BTreeMap::new(),
        }
    }

    pub fn with_group(mut self, group: usize) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_effort(mut self, focus_area: impl Into<String>, days: f64) -> Self {
        self.effort.insert(focus_area.into(), days);
        self
    }

    pub fn with_prerequisite(
        mut self,
        focus_area: impl Into<String>,
        task_number: impl Into<String>,
    ) -> Self {
        self.blocked_by
            .entry(focus_area.into())
            .or_default()
            .push(task_number.into());
        self
    }

    /// Effort for `focus_area`; zero when the task does not apply.
    pub fn effort_for(&self, focus_area: &str) -> f64 {
        self.effort.get(focus_area).copied().unwrap_or(0.0)
    }

    pub fn prerequisites(&self, focus_area: &str) -> &[String] {
        self.blocked_by
            .get(focus_area)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// How [`Backlog::tasks_for`] sequences tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskOrdering {
    /// Descending priority tier, ties by backlog order.
    #[default]
    Priority,
    /// Backlog order as loaded; priority is informational.
    Listed,
}

/// Ordered task groups and tasks, read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Backlog {
    groups: Vec<TaskGroup>,
    tasks: Vec<BacklogTask>,
    #[serde(default)]
    ordering: TaskOrdering,
}

impl Backlog {
    pub fn new(groups: Vec<TaskGroup>, tasks: Vec<BacklogTask>) -> Self {
        Self {
            groups,
            tasks,
            ordering: TaskOrdering::default(),
        }
    }

    pub fn with_ordering(mut self, ordering: TaskOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn ordering(&self) -> TaskOrdering {
        self.ordering
    }

    /// Backlog without task groups.
    pub fn from_tasks(tasks: Vec<BacklogTask>) -> Self {
        Self::new(Vec::new(), tasks)
    }

    pub fn groups(&self) -> &[TaskGroup] {
        &self.groups
    }

    pub fn tasks(&self) -> &[BacklogTask] {
        &self.tasks
    }

    pub fn group(&self, index: usize) -> Option<&TaskGroup> {
        self.groups.get(index)
    }

    pub fn task(&self, number: &str) -> Option<&BacklogTask> {
        self.tasks.iter().find(|t| t.number == number)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks with nonzero effort in `focus_area`, in consumption order.
    pub fn tasks_for(&self, focus_area: &str) -> Vec<&BacklogTask> {
        let mut tasks: Vec<&BacklogTask> = self
            .tasks
            .iter()
            .filter(|t| t.effort_for(focus_area) > 0.0)
            .collect();
        if self.ordering == TaskOrdering::Priority {
            // Stable sort keeps backlog order within a tier
            tasks.sort_by(|a, b| b.priority.cmp(&a.priority));
        }
        tasks
    }

    /// Sum of effort estimates for `focus_area`.
    pub fn total_effort(&self, focus_area: &str) -> f64 {
        self.tasks.iter().map(|t| t.effort_for(focus_area)).sum()
    }

    /// Every focus area named by an effort or dependency entry.
    pub fn focus_area_names(&self) -> BTreeSet<String> {
        self.tasks
            .iter()
            .flat_map(|t| t.effort.keys().chain(t.blocked_by.keys()))
            .cloned()
            .collect()
    }

    /// Checks that every referenced focus area exists and estimates are sane.
    ///
    /// # Errors
    /// [`PlanError::UnknownFocusArea`] for a name missing from `registry`,
    /// [`PlanError::InvalidConfiguration`] for a negative or non-finite effort.
    pub fn validate_against(&self, registry: &FocusAreaRegistry) -> Result<()> {
        for name in self.focus_area_names() {
            registry.require(&name, "backlog")?;
        }
        for task in &self.tasks {
            for (area, days) in &task.effort {
                if !(days.is_finite() && *days >= 0.0) {
                    return Err(PlanError::invalid(format!(
                        "task {} has invalid effort {days} for '{area}'",
                        task.number
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus_area::FocusArea;

    fn backlog() -> Backlog {
        Backlog::new(
            vec![TaskGroup {
                index: 0,
                number: "1.0".into(),
                name: "v1.0.0".into(),
            }],
            vec![
                BacklogTask::new("1.0.1", "Login")
                    .with_group(0)
                    .with_effort("Proj1", 5.0),
                BacklogTask::new("1.0.2", "Export")
                    .with_group(0)
                    .with_priority(2)
                    .with_effort("Proj1", 3.0)
                    .with_effort("Proj2", 4.0),
                BacklogTask::new("1.0.3", "Import")
                    .with_group(0)
                    .with_effort("Proj1", 0.0)
                    .with_effort("Proj2", 6.0),
                BacklogTask::new("1.0.4", "Audit")
                    .with_group(0)
                    .with_priority(2)
                    .with_effort("Proj1", 1.0),
            ],
        )
    }

    #[test]
    fn test_tasks_for_orders_by_priority_then_backlog_order() {
        let b = backlog();
        let numbers: Vec<_> = b.tasks_for("Proj1").iter().map(|t| t.number.as_str()).collect();
        assert_eq!(numbers, vec!["1.0.2", "1.0.4", "1.0.1"]);

        let numbers: Vec<_> = b.tasks_for("Proj2").iter().map(|t| t.number.as_str()).collect();
        assert_eq!(numbers, vec!["1.0.2", "1.0.3"]);
    }

    #[test]
    fn test_listed_ordering_ignores_priority() {
        let b = backlog().with_ordering(TaskOrdering::Listed);
        let numbers: Vec<_> = b.tasks_for("Proj1").iter().map(|t| t.number.as_str()).collect();
        assert_eq!(numbers, vec!["1.0.1", "1.0.2", "1.0.4"]);
    }

    #[test]
    fn test_zero_effort_not_assigned() {
        let b = backlog();
        assert!(b.tasks_for("Proj1").iter().all(|t| t.number != "1.0.3"));
        assert!(b.tasks_for("Proj3").is_empty());
    }

    #[test]
    fn test_total_effort() {
        let b = backlog();
        assert_eq!(b.total_effort("Proj1"), 9.0);
        assert_eq!(b.total_effort("Proj2"), 10.0);
        assert_eq!(b.total_effort("Nope"), 0.0);
    }

    #[test]
    fn test_validate_against_registry() {
        let b = backlog();
        let full = FocusAreaRegistry::new(vec![FocusArea::new("Proj1"), FocusArea::new("Proj2")]).unwrap();
        assert!(b.validate_against(&full).is_ok());

        let partial = FocusAreaRegistry::new(vec![FocusArea::new("Proj1")]).unwrap();
        let err = b.validate_against(&partial).unwrap_err();
        assert!(matches!(err, PlanError::UnknownFocusArea { ref name, .. } if name == "Proj2"));
    }

    #[test]
    fn test_validate_dependency_focus_area() {
        let b = Backlog::from_tasks(vec![BacklogTask::new("1.0.1", "A")
            .with_effort("Proj1", 1.0)
            .with_prerequisite("Ghost", "1.0.9")]);
        let reg = FocusAreaRegistry::new(vec![FocusArea::new("Proj1")]).unwrap();
        assert!(matches!(
            b.validate_against(&reg),
            Err(PlanError::UnknownFocusArea { .. })
        ));
    }

    #[test]
    fn test_negative_effort_rejected() {
        let b = Backlog::from_tasks(vec![BacklogTask::new("1.0.1", "A").with_effort("Proj1", -1.0)]);
        let reg = FocusAreaRegistry::new(vec![FocusArea::new("Proj1")]).unwrap();
        assert!(matches!(
            b.validate_against(&reg),
            Err(PlanError::InvalidConfiguration(_))
        ));
    }
}
