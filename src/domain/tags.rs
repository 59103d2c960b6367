// Copyright (c) 2025 - Cowboy AI, Inc.
//! Standard Resource Tags
//!
//! Every resource carries the five mandatory keys below. Tags drive cost
//! allocation and compliance grouping, so the values come from one place.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const TAG_PROJECT: &str = "project";
pub const TAG_PHASE: &str = "phase";
pub const TAG_ENVIRONMENT: &str = "environment";
pub const TAG_MANAGED_BY: &str = "managed_by";
pub const TAG_COST_CENTER: &str = "cost_center";
pub const TAG_COMPONENT: &str = "component";

/// Keys every resource must carry with a non-empty value
pub const MANDATORY_TAGS: [&str; 5] = [
    TAG_PROJECT,
    TAG_PHASE,
    TAG_ENVIRONMENT,
    TAG_MANAGED_BY,
    TAG_COST_CENTER,
];

/// Values for the mandatory tag set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardTags {
    pub project: String,
    pub phase: String,
    pub environment: String,
    pub managed_by: String,
    pub cost_center: String,
}

impl StandardTags {
    pub fn new(project: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            environment: environment.into(),
            ..Self::default()
        }
    }

    pub fn phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = phase.into();
        self
    }

    pub fn cost_center(mut self, cost_center: impl Into<String>) -> Self {
        self.cost_center = cost_center.into();
        self
    }

    /// Mandatory tags
    pub fn to_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (TAG_PROJECT.to_string(), self.project.clone()),
            (TAG_PHASE.to_string(), self.phase.clone()),
            (TAG_ENVIRONMENT.to_string(), self.environment.clone()),
            (TAG_MANAGED_BY.to_string(), self.managed_by.clone()),
            (TAG_COST_CENTER.to_string(), self.cost_center.clone()),
        ])
    }

    /// Mandatory tags plus a `component` tag
    pub fn for_component(&self, component: impl Into<String>) -> BTreeMap<String, String> {
        let mut tags = self.to_map();
        tags.insert(TAG_COMPONENT.to_string(), component.into());
        tags
    }
}

impl Default for StandardTags {
    fn default() -> Self {
        Self {
            project: "cim".to_string(),
            phase: "phase1".to_string(),
            environment: "production".to_string(),
            managed_by: "cim-provisioning".to_string(),
            cost_center: "engineering".to_string(),
        }
    }
}

/// Mandatory keys that are absent or blank in `tags`
pub fn missing_mandatory_tags(tags: &BTreeMap<String, String>) -> Vec<&'static str> {
    MANDATORY_TAGS
        .iter()
        .copied()
        .filter(|key| tags.get(*key).map_or(true, |v| v.trim().is_empty()))
        .collect()
}
