//! GitLab issue export loader.
//!
//! Reads the CSV produced by GitLab's "Export issues" and credits every
//! issue's time estimate to a single focus area. Milestones become task
//! groups, sorted by name, with the `undetermined` milestone last; issues
//! without a milestone land there.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::{Backlog, BacklogTask, TaskGroup, TaskOrdering};
use crate::error::BacklogError;

pub const MILESTONE_UNDETERMINED: &str = "undetermined";

/// Seconds in one eight-hour work day.
const SECONDS_PER_DAY: f64 = 8.0 * 3600.0;

#[derive(Debug, Deserialize)]
struct IssueRow {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Issue ID")]
    issue_id: String,
    #[serde(rename = "Milestone", default)]
    milestone: Option<String>,
    #[serde(rename = "Labels", default)]
    labels: Option<String>,
    #[serde(rename = "Time Estimate", default)]
    time_estimate: Option<f64>,
}

/// Reads an issue export from disk.
pub fn load(path: &Path, focus_area: &str) -> Result<Backlog, BacklogError> {
    let file = File::open(path).map_err(|source| BacklogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(file, focus_area)
}

/// Parses an issue export, crediting effort to `focus_area`.
pub fn parse<R: Read>(reader: R, focus_area: &str) -> Result<Backlog, BacklogError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for row in rdr.deserialize::<IssueRow>() {
        rows.push(row?);
    }

    let mut names: BTreeSet<String> = rows
        .iter()
        .filter_map(|r| r.milestone.clone())
        .filter(|m| !m.is_empty())
        .collect();
    names.remove(MILESTONE_UNDETERMINED);
    let groups: Vec<TaskGroup> = names
        .into_iter()
        .chain(std::iter::once(MILESTONE_UNDETERMINED.to_string()))
        .enumerate()
        .map(|(index, name)| TaskGroup {
            index,
            number: index.to_string(),
            name,
        })
        .collect();
    let undetermined = groups.len() - 1;

    let mut tasks: Vec<BacklogTask> = rows
        .into_iter()
        .map(|row| {
            let group = row
                .milestone
                .as_deref()
                .and_then(|m| groups.iter().position(|g| g.name == m))
                .unwrap_or(undetermined);
            let days = row.time_estimate.unwrap_or(0.0).max(0.0) / SECONDS_PER_DAY;
            let mut task = BacklogTask::new(row.issue_id, row.title)
                .with_group(group)
                .with_priority(priority_from_labels(row.labels.as_deref().unwrap_or("")));
            if days > 0.0 {
                task.effort.insert(focus_area.to_string(), days);
            }
            task
        })
        .collect();

    // Stable: issue order is kept within a (group, priority) bucket
    tasks.sort_by(|a, b| a.group.cmp(&b.group).then(b.priority.cmp(&a.priority)));

    // Milestone order wins over label priority when scheduling
    Ok(Backlog::new(groups, tasks).with_ordering(TaskOrdering::Listed))
}

fn priority_from_labels(labels: &str) -> i32 {
    if labels.contains("priority::high") {
        3
    } else if labels.contains("priority::medium") {
        2
    } else if labels.contains("priority::low") {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
Title,Issue ID,Milestone,Labels,Time Estimate
Fix crash,11,v1.1.0,\"bug,priority::low\",28800
Dark mode,12,,feature,57600
Login,13,v1.0.0,priority::medium,14400
Search,14,v1.1.0,priority::high,0
";

    #[test]
    fn test_groups_sorted_with_undetermined_last() {
        let backlog = parse(EXPORT.as_bytes(), "App").unwrap();
        let names: Vec<_> = backlog.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["v1.0.0", "v1.1.0", "undetermined"]);
    }

    #[test]
    fn test_tasks_ordered_by_group_then_priority() {
        let backlog = parse(EXPORT.as_bytes(), "App").unwrap();
        let ids: Vec<_> = backlog.tasks().iter().map(|t| t.number.as_str()).collect();
        assert_eq!(ids, vec!["13", "14", "11", "12"]);
    }

    #[test]
    fn test_high_priority_does_not_jump_milestones() {
        let backlog = parse(EXPORT.as_bytes(), "App").unwrap();
        assert_eq!(backlog.ordering(), TaskOrdering::Listed);
        let ids: Vec<_> = backlog.tasks_for("App").iter().map(|t| t.number.as_str()).collect();
        assert_eq!(ids, vec!["13", "11", "12"]);
    }

    #[test]
    fn test_effort_in_work_days() {
        let backlog = parse(EXPORT.as_bytes(), "App").unwrap();
        assert_eq!(backlog.task("11").unwrap().effort_for("App"), 1.0);
        assert_eq!(backlog.task("12").unwrap().effort_for("App"), 2.0);
        assert_eq!(backlog.task("13").unwrap().effort_for("App"), 0.5);
        // No estimate: not assigned to the focus area
        assert!(backlog.tasks_for("App").iter().all(|t| t.number != "14"));
    }

    #[test]
    fn test_priority_labels() {
        assert_eq!(priority_from_labels("priority::high,ux"), 3);
        assert_eq!(priority_from_labels("priority::medium"), 2);
        assert_eq!(priority_from_labels("bug,priority::low"), 1);
        assert_eq!(priority_from_labels(""), 0);
    }

    #[test]
    fn test_explicit_undetermined_milestone_kept_last() {
        let csv = "Title,Issue ID,Milestone,Labels,Time Estimate\nA,1,undetermined,,3600\nB,2,v2,,3600\n";
        let backlog = parse(csv.as_bytes(), "App").unwrap();
        assert_eq!(backlog.groups().len(), 2);
        assert_eq!(backlog.task("1").unwrap().group, Some(1));
    }
}
