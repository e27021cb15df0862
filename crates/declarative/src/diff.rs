//! Diff computation for resources

use crate::planner::ExecutionPlan;
use crate::resource::Resource;
use crate::types::ResourceState;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A resource whose current state differs from its declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Unique identifier of the resource
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// Current state
    pub current: ResourceState,
}

impl ResourceDiff {
    /// Create a diff from a resource, returning None if no changes needed
    pub fn from_resource(resource: &dyn Resource) -> Result<Option<Self>> {
        let current = resource.current_state()?;

        if current.is_in_sync() {
            return Ok(None);
        }

        Ok(Some(Self {
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            current,
        }))
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        self.current.is_absent()
    }

    /// Check if this diff only needs a start
    pub fn is_start(&self) -> bool {
        matches!(self.current, ResourceState::Stopped)
    }

    /// Check if this diff represents a replacement
    pub fn is_modification(&self) -> bool {
        matches!(self.current, ResourceState::Drifted { .. })
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        matches!(self.current, ResourceState::Unwanted { .. })
    }
}

/// Compute diffs for every resource in a plan, in execution order
///
/// Returns only resources that are not in sync. Detection errors
/// (e.g. an ambiguous match) are propagated.
pub fn compute_diffs(plan: &ExecutionPlan) -> Result<Vec<ResourceDiff>> {
    let mut diffs = Vec::new();
    for resource in plan.resources() {
        if let Some(diff) = ResourceDiff::from_resource(resource)? {
            diffs.push(diff);
        }
    }
    Ok(diffs)
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to create
    pub additions: usize,
    /// Number of resources to start
    pub starts: usize,
    /// Number of resources to recreate
    pub modifications: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources whose state can't be known before applying
    pub unknown: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_start() {
                summary.starts += 1;
            } else if diff.is_modification() {
                summary.modifications += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else {
                summary.unknown += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.starts + self.modifications + self.removals + self.unknown
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type(diffs: &[ResourceDiff]) -> BTreeMap<String, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<String, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}
