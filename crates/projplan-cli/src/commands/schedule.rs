use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Subcommand;
use serde::Serialize;

use super::schedule_file;

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Schedule a scenario and summarize each focus area
    Run {
        /// Scenario TOML file
        #[arg(long)]
        config: PathBuf,
        /// Print the full roadmap as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show buckets with capacity and allocations
    Timeline {
        /// Scenario TOML file
        #[arg(long)]
        config: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct TimelineRow {
    index: usize,
    start: NaiveDate,
    end: NaiveDate,
    effective_days: u32,
    capacity: f64,
    unallocated: f64,
    allocations: BTreeMap<String, f64>,
    active: BTreeMap<String, Option<String>>,
}

pub fn run(action: ScheduleAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ScheduleAction::Run { config, json } => {
            let (scenario, roadmap) = schedule_file(&config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&roadmap)?);
                return Ok(());
            }

            println!("Scenario: {}", roadmap.scenario);
            for name in &roadmap.focus_areas {
                let total = scenario.backlog().total_effort(name);
                let tasks = scenario.backlog().tasks_for(name).len();
                let done = roadmap.curve(name).and_then(|c| c.last()).map_or(0, |p| p.completed);
                let status = match roadmap.finish_date(name) {
                    Some(date) => format!("finished {date}"),
                    None if tasks == 0 => "no backlog".to_string(),
                    None => format!("{:.2} remaining", roadmap.remaining.get(name).copied().unwrap_or(0.0)),
                };
                println!(
                    "  {name}: {:.2}/{total:.2} effort, {done}/{tasks} tasks, {status}",
                    roadmap.consumed_total(name)
                );
            }

            let reached: Vec<_> = roadmap.group_deadlines.iter().filter(|g| g.date.is_some()).collect();
            if !reached.is_empty() {
                println!("Group deadlines:");
                for g in reached {
                    if let Some(date) = g.date {
                        println!("  {} / {}: {date}", g.focus_area, g.group_name);
                    }
                }
            }

            let idle: f64 = roadmap.buckets.iter().map(|b| b.unallocated).sum();
            if idle > 0.0 {
                println!("Unallocated capacity: {idle:.2} FTE-buckets");
            }
        }
        ScheduleAction::Timeline { config, json } => {
            let (_, roadmap) = schedule_file(&config)?;
            let rows: Vec<TimelineRow> = roadmap
                .buckets
                .iter()
                .map(|r| TimelineRow {
                    index: r.bucket.index,
                    start: r.bucket.start,
                    end: r.bucket.end,
                    effective_days: r.bucket.effective_days,
                    capacity: r.capacity,
                    unallocated: r.unallocated,
                    allocations: r.areas.iter().map(|(n, a)| (n.clone(), a.allocation)).collect(),
                    active: r.areas.iter().map(|(n, a)| (n.clone(), a.active_task.clone())).collect(),
                })
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in &rows {
                    let allocations: Vec<String> = row
                        .allocations
                        .iter()
                        .map(|(name, fte)| {
                            let task = row.active.get(name).cloned().flatten().unwrap_or_else(|| "-".into());
                            format!("{name}={fte:.2} ({task})")
                        })
                        .collect();
                    println!(
                        "{:>3}  {} .. {}  {:>3}d  capacity {:.2}  free {:.2}  {}",
                        row.index,
                        row.start,
                        row.end,
                        row.effective_days,
                        row.capacity,
                        row.unallocated,
                        allocations.join("  ")
                    );
                }
            }
        }
    }
    Ok(())
}
