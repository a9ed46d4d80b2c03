pub mod backlog;
pub mod schedule;
pub mod velocity;

use std::path::Path;

use projplan_core::{Roadmap, Scenario, ScenarioConfig};

/// Loads, builds and schedules a scenario file.
pub(crate) fn schedule_file(path: &Path) -> Result<(Scenario, Roadmap), Box<dyn std::error::Error>> {
    tracing::debug!(path = %path.display(), "loading scenario");
    let scenario = ScenarioConfig::load(path)?.build()?;
    let roadmap = scenario.schedule()?;
    Ok((scenario, roadmap))
}
