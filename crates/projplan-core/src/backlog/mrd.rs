//! MRD CSV loader.
//!
//! # Format
//!
//! ```text
//! Number, Name,            Priority, Proj1-Effort, Proj2-Effort, Proj2-Constraint
//! 1.0,    v1.0.0,          ,         ,             ,
//! 1.0.1,  Login,           2,        5,            0,
//! 1.0.2,  Export,          ,         3,            4,            1.0.1
//! ```
//!
//! - `Number` `d.d` opens a task group, `d.d.d` is a task of the current group.
//!   Any other row is ignored.
//! - `<FocusArea>-Effort` holds days of effort; empty means zero.
//! - `<FocusArea>-Constraint` lists prerequisite task numbers separated by
//!   `;` or whitespace. `NONE` or empty means no prerequisite.
//! - `Priority` is an integer tier (higher first) or `high`/`medium`/`low`.
//! - Whitespace around separators is ignored.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use super::{Backlog, BacklogTask, TaskGroup};
use crate::error::BacklogError;

pub const NUMBER_COLUMN: &str = "Number";
pub const NAME_COLUMN: &str = "Name";
pub const PRIORITY_COLUMN: &str = "Priority";
pub const EFFORT_SUFFIX: &str = "-effort";
pub const CONSTRAINT_SUFFIX: &str = "-constraint";

/// Reads an MRD file from disk.
pub fn load(path: &Path) -> Result<Backlog, BacklogError> {
    let file = File::open(path).map_err(|source| BacklogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(file)
}

/// Parses MRD rows from any reader.
pub fn parse<R: Read>(reader: R) -> Result<Backlog, BacklogError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let layout = ColumnLayout::from_headers(rdr.headers()?)?;

    let mut groups: Vec<TaskGroup> = Vec::new();
    let mut tasks: Vec<BacklogTask> = Vec::new();

    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let field = |idx: usize| record.get(idx).unwrap_or("");
        let number = field(layout.number);

        match RowKind::classify(number) {
            RowKind::Group => groups.push(TaskGroup {
                index: groups.len(),
                number: number.to_string(),
                name: field(layout.name).to_string(),
            }),
            RowKind::Task => {
                let mut task = BacklogTask::new(number, field(layout.name));
                task.group = groups.len().checked_sub(1);
                if let Some(idx) = layout.priority {
                    task.priority = parse_priority(field(idx), line)?;
                }
                for (area, idx) in &layout.efforts {
                    let days = parse_effort(field(*idx), area, line)?;
                    if days > 0.0 {
                        task.effort.insert(area.clone(), days);
                    }
                }
                for (area, idx) in &layout.constraints {
                    let prerequisites = parse_prerequisites(field(*idx));
                    if !prerequisites.is_empty() {
                        task.blocked_by.insert(area.clone(), prerequisites);
                    }
                }
                tasks.push(task);
            }
            RowKind::Other => {
                tracing::debug!(line, number, "skipping MRD row that is neither group nor task");
            }
        }
    }

    tracing::debug!(groups = groups.len(), tasks = tasks.len(), "parsed MRD");
    Ok(Backlog::new(groups, tasks))
}

/// Column positions discovered from the header row.
struct ColumnLayout {
    number: usize,
    name: usize,
    priority: Option<usize>,
    efforts: Vec<(String, usize)>,
    constraints: Vec<(String, usize)>,
}

impl ColumnLayout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, BacklogError> {
        let find = |wanted: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(wanted));
        let number = find(NUMBER_COLUMN)
            .ok_or_else(|| BacklogError::MissingColumn(NUMBER_COLUMN.into()))?;
        let name =
            find(NAME_COLUMN).ok_or_else(|| BacklogError::MissingColumn(NAME_COLUMN.into()))?;

        let mut efforts = Vec::new();
        let mut constraints = Vec::new();
        for (idx, header) in headers.iter().enumerate() {
            if let Some(area) = strip_suffix_ignore_case(header, EFFORT_SUFFIX) {
                efforts.push((area.to_string(), idx));
            } else if let Some(area) = strip_suffix_ignore_case(header, CONSTRAINT_SUFFIX) {
                constraints.push((area.to_string(), idx));
            }
        }

        Ok(Self {
            number,
            name,
            priority: find(PRIORITY_COLUMN),
            efforts,
            constraints,
        })
    }
}

fn strip_suffix_ignore_case<'a>(header: &'a str, suffix: &str) -> Option<&'a str> {
    let split = header.len().checked_sub(suffix.len())?;
    if !header.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = header.split_at(split);
    (tail.eq_ignore_ascii_case(suffix) && !head.is_empty()).then_some(head.trim())
}

enum RowKind {
    Group,
    Task,
    Other,
}

impl RowKind {
    fn classify(number: &str) -> Self {
        static GROUP: OnceLock<Regex> = OnceLock::new();
        static TASK: OnceLock<Regex> = OnceLock::new();
        let group = GROUP.get_or_init(|| Regex::new(r"^\d+\.\d+$").expect("valid regex"));
        let task = TASK.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("valid regex"));

        if group.is_match(number) {
            Self::Group
        } else if task.is_match(number) {
            Self::Task
        } else {
            Self::Other
        }
    }
}

fn parse_effort(raw: &str, area: &str, line: u64) -> Result<f64, BacklogError> {
    if raw.is_empty() {
        return Ok(0.0);
    }
    let days: f64 = raw.parse().map_err(|_| BacklogError::InvalidRow {
        line,
        message: format!("effort '{raw}' for '{area}' is not a number"),
    })?;
    if !days.is_finite() || days < 0.0 {
        return Err(BacklogError::InvalidRow {
            line,
            message: format!("effort {days} for '{area}' must be a non-negative number"),
        });
    }
    Ok(days)
}

fn parse_priority(raw: &str, line: u64) -> Result<i32, BacklogError> {
    match raw.to_ascii_lowercase().as_str() {
        "" => Ok(0),
        "high" => Ok(3),
        "medium" => Ok(2),
        "low" => Ok(1),
        other => other.parse().map_err(|_| BacklogError::InvalidRow {
            line,
            message: format!("priority '{raw}' is not a tier"),
        }),
    }
}

fn parse_prerequisites(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ';' || c.is_whitespace())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("none"))
        .map(str::to_string)
        .collect()
}
