use std::path::PathBuf;

use clap::{Subcommand, ValueEnum};
use projplan_core::backlog::{gitlab, mrd};

#[derive(Clone, Copy, ValueEnum)]
pub enum Format {
    Mrd,
    Gitlab,
}

#[derive(Subcommand)]
pub enum BacklogAction {
    /// Parse a backlog file and list its tasks
    List {
        /// Backlog CSV file
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_enum, default_value = "mrd")]
        format: Format,
        /// Focus area credited with issue estimates (gitlab format)
        #[arg(long)]
        focus_area: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: BacklogAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        BacklogAction::List {
            file,
            format,
            focus_area,
            json,
        } => {
            let backlog = match format {
                Format::Mrd => mrd::load(&file)?,
                Format::Gitlab => {
                    let area = focus_area.ok_or("--focus-area is required for the gitlab format")?;
                    gitlab::load(&file, &area)?
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&backlog)?);
                return Ok(());
            }

            if backlog.is_empty() {
                println!("No tasks.");
                return Ok(());
            }
            for task in backlog.tasks() {
                let group = task
                    .group
                    .and_then(|g| backlog.group(g))
                    .map_or("-", |g| g.name.as_str());
                let efforts: Vec<String> = task
                    .effort
                    .iter()
                    .map(|(area, days)| format!("{area}={days}"))
                    .collect();
                println!(
                    "{:<10} [{group}] p{} {}  {}",
                    task.number,
                    task.priority,
                    task.name,
                    efforts.join(" ")
                );
            }
            for area in backlog.focus_area_names() {
                println!("total {area}: {:.2}", backlog.total_effort(&area));
            }
        }
    }
    Ok(())
}
