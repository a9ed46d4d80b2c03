//! TOML scenario files.
//!
//! ```toml
//! name = "Base 2024"
//! timeline_start = "2024-01-01"
//! timeline_end = "2026-12-31"
//! granularity = "quarter"
//! ftes = 6
//! work_per_task = 0.75
//! max_task_parallelism = 2
//!
//! [backlog]
//! path = "mrd.csv"
//!
//! [[focus_areas]]
//! name = "Proj1"
//! color = "#1f77b4"
//!
//! [work_distribution]
//! Proj1 = [
//!     { start = "2024-01-01", end = "2024-12-31", value = 2 },
//!     { start = "2025-01-01", value = 4 },
//! ]
//! ```
//!
//! Dates are quoted ISO strings. A relative backlog path is resolved against
//! the directory of the scenario file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{AllocationUnit, Scenario, ScenarioBuilder};
use crate::backlog::{gitlab, mrd, Backlog};
use crate::error::{ConfigError, PlanError, Result};
use crate::focus_area::FocusAreaRegistry;
use crate::timeline::{ConstraintSeries, Granularity, WorkCalendar};

/// Backlog file layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BacklogFormat {
    #[default]
    Mrd,
    Gitlab,
}

/// Where the backlog comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogSource {
    pub path: PathBuf,
    #[serde(default)]
    pub format: BacklogFormat,
    /// Focus area credited with issue estimates (gitlab format only).
    #[serde(default)]
    pub focus_area: Option<String>,
}

impl BacklogSource {
    /// Reads and parses the backlog file.
    pub fn load(&self) -> Result<Backlog> {
        let backlog = match self.format {
            BacklogFormat::Mrd => mrd::load(&self.path)?,
            BacklogFormat::Gitlab => {
                let area = self.focus_area.as_deref().ok_or_else(|| {
                    PlanError::invalid("gitlab backlog needs a `focus_area` to credit estimates to")
                })?;
                gitlab::load(&self.path, area)?
            }
        };
        tracing::info!(path = %self.path.display(), tasks = backlog.len(), "backlog loaded");
        Ok(backlog)
    }
}

/// Scenario file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub timeline_start: NaiveDate,
    pub timeline_end: NaiveDate,
    #[serde(default)]
    pub granularity: Granularity,
    /// Total capacity in FTE.
    pub ftes: ConstraintSeries,
    #[serde(default = "default_work_per_task")]
    pub work_per_task: f64,
    #[serde(default)]
    pub allocation_unit: AllocationUnit,
    #[serde(default)]
    pub calendar: WorkCalendar,
    /// FTE cap on what a single task absorbs per bucket.
    #[serde(default)]
    pub max_task_parallelism: Option<f64>,
    pub focus_areas: FocusAreaRegistry,
    #[serde(default)]
    pub work_distribution: BTreeMap<String, ConstraintSeries>,
    pub backlog: BacklogSource,
}

fn default_name() -> String {
    "unknown-scenario".into()
}
fn default_work_per_task() -> f64 {
    1.0
}

impl ScenarioConfig {
    /// Loads a scenario file and resolves its backlog path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut config = Self::from_toml_str(&content)?;
        if config.backlog.path.is_relative() {
            if let Some(dir) = path.parent() {
                config.backlog.path = dir.join(&config.backlog.path);
            }
        }
        Ok(config)
    }

    /// Parses scenario TOML without touching the filesystem.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PlanError::Config(e.into()))
    }

    /// Loads the backlog and turns the file into a builder.
    pub fn into_builder(self) -> Result<ScenarioBuilder> {
        let backlog = self.backlog.load()?;
        Ok(self.into_builder_with(backlog))
    }

    /// Turns the file into a builder around an already loaded backlog.
    pub fn into_builder_with(self, backlog: impl Into<std::sync::Arc<Backlog>>) -> ScenarioBuilder {
        let builder = ScenarioBuilder::new(
            self.name,
            self.ftes,
            self.focus_areas,
            self.timeline_start,
            self.timeline_end,
        )
        .granularity(self.granularity)
        .calendar(self.calendar)
        .work_per_task(self.work_per_task)
        .allocation_unit(self.allocation_unit)
        .work_distribution(self.work_distribution)
        .backlog(backlog);
        match self.max_task_parallelism {
            Some(cap) => builder.max_task_parallelism(cap),
            None => builder,
        }
    }

    /// Loads the backlog and validates everything.
    pub fn build(self) -> Result<Scenario> {
        self.into_builder()?.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCENARIO: &str = r##"
name = "Base"
timeline_start = "2024-01-01"
timeline_end = "2025-12-31"
ftes = 4
work_per_task = 0.75

[backlog]
path = "mrd.csv"

[[focus_areas]]
name = "Proj1"
color = "#1f77b4"

[[focus_areas]]
name = "Support"
schedulable = false

[work_distribution]
Proj1 = [
    { start = "2024-01-01", end = "2024-12-31", value = 2 },
    { start = "2025-01-01", value = 3 },
]
Support = 1
"##;

    const MRD: &str = "Number,Name,Proj1-Effort\n1.0,v1,\n1.0.1,Login,5\n1.0.2,Export,3\n";

    #[test]
    fn test_parse_defaults() {
        let config = ScenarioConfig::from_toml_str(SCENARIO).unwrap();
        assert_eq!(config.name, "Base");
        assert_eq!(config.granularity, Granularity::Quarter);
        assert_eq!(config.allocation_unit, AllocationUnit::Absolute);
        assert_eq!(config.backlog.format, BacklogFormat::Mrd);
        assert_eq!(config.max_task_parallelism, None);
        assert_eq!(config.work_distribution.len(), 2);
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let err = ScenarioConfig::from_toml_str("name = 3").unwrap_err();
        assert!(matches!(err, PlanError::Config(ConfigError::ParseFailed(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = ScenarioConfig::load(Path::new("/nope/scenario.toml")).unwrap_err();
        assert!(matches!(err, PlanError::Config(ConfigError::LoadFailed { .. })));
    }

    #[test]
    fn test_load_resolves_backlog_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mrd.csv"), MRD).unwrap();
        let config_path = dir.path().join("scenario.toml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        file.write_all(SCENARIO.as_bytes()).unwrap();

        let config = ScenarioConfig::load(&config_path).unwrap();
        assert_eq!(config.backlog.path, dir.path().join("mrd.csv"));

        let scenario = config.build().unwrap();
        assert_eq!(scenario.backlog().len(), 2);
        assert_eq!(scenario.timeline().len(), 8);
        assert!(scenario.allocation("Support").is_some());
    }

    #[test]
    fn test_gitlab_source_requires_focus_area() {
        let source = BacklogSource {
            path: PathBuf::from("issues.csv"),
            format: BacklogFormat::Gitlab,
            focus_area: None,
        };
        assert!(matches!(source.load(), Err(PlanError::InvalidConfiguration(_))));
    }
}
