//! Focus areas and their registry.
//!
//! A focus area is a task group a team spends capacity on: a named project
//! with its own backlog, or a shared responsibility such as support that
//! only occupies headcount.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};

/// A task group with its own allocation and display color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusArea {
    pub name: String,
    #[serde(default = "default_weight")]
    pub relative_weight: f64,
    /// Whether backlog tasks are scheduled into this area.
    #[serde(default = "default_true")]
    pub schedulable: bool,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_weight() -> f64 {
    1.0
}
fn default_true() -> bool {
    true
}
fn default_color() -> String {
    "#000000".into()
}

impl FocusArea {
    /// Creates a schedulable focus area with weight 1 and black color.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relative_weight: default_weight(),
            schedulable: true,
            color: default_color(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.relative_weight = weight;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Marks the area as capacity-only (no backlog is scheduled into it).
    pub fn unschedulable(mut self) -> Self {
        self.schedulable = false;
        self
    }
}

/// Ordered, name-unique set of focus areas.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FocusAreaRegistry {
    areas: Vec<FocusArea>,
}

impl FocusAreaRegistry {
    /// Validates and wraps `areas`, keeping their order.
    ///
    /// # Errors
    /// [`PlanError::InvalidConfiguration`] for an empty or duplicate name, or a
    /// weight that is not a positive finite number.
    pub fn new(areas: Vec<FocusArea>) -> Result<Self> {
        let mut seen = HashSet::new();
        for area in &areas {
            if area.name.trim().is_empty() {
                return Err(PlanError::invalid("focus area name must not be empty"));
            }
            if !seen.insert(area.name.as_str()) {
                return Err(PlanError::invalid(format!(
                    "duplicate focus area name '{}'",
                    area.name
                )));
            }
            if !(area.relative_weight.is_finite() && area.relative_weight > 0.0) {
                return Err(PlanError::invalid(format!(
                    "focus area '{}' has non-positive weight {}",
                    area.name, area.relative_weight
                )));
            }
        }
        Ok(Self { areas })
    }

    pub fn get(&self, name: &str) -> Option<&FocusArea> {
        self.areas.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Looks up `name`, failing with [`PlanError::UnknownFocusArea`].
    pub fn require(&self, name: &str, context: &str) -> Result<&FocusArea> {
        self.get(name)
            .ok_or_else(|| PlanError::unknown_focus_area(name, context))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FocusArea> {
        self.areas.iter()
    }

    /// Areas that receive backlog tasks, in registry order.
    pub fn schedulable(&self) -> impl Iterator<Item = &FocusArea> {
        self.areas.iter().filter(|a| a.schedulable)
    }

    pub fn names(&self) -> Vec<String> {
        self.areas.iter().map(|a| a.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Focus area name to display color, for the plotting side.
    pub fn color_dict(&self) -> BTreeMap<String, String> {
        self.areas
            .iter()
            .map(|a| (a.name.clone(), a.color.clone()))
            .collect()
    }

    /// Display weight per focus area.
    pub fn weight_dict(&self) -> BTreeMap<String, f64> {
        self.areas
            .iter()
            .map(|a| (a.name.clone(), a.relative_weight))
            .collect()
    }
}

impl<'de> Deserialize<'de> for FocusAreaRegistry {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let areas = Vec::<FocusArea>::deserialize(deserializer)?;
        Self::new(areas).map_err(serde::de::Error::custom)
    }
}
