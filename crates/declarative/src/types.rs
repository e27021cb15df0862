//! Core types for declarative resource management

use serde::{Deserialize, Serialize};

/// Observed state of a resource relative to its declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    /// Resource does not exist yet
    Absent,
    /// Resource exists and matches its declaration
    InSync { details: Option<String> },
    /// Resource matches but is not running
    Stopped,
    /// Resource exists but differs from its declaration
    Drifted { reason: String },
    /// Resource exists but is no longer declared
    Unwanted { reason: String },
    /// State cannot be determined without applying (e.g. remote pushes)
    Unknown,
}

impl ResourceState {
    /// Check if state needs no work
    pub fn is_in_sync(&self) -> bool {
        matches!(self, Self::InSync { .. })
    }

    /// Check if state represents absence
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The result an apply would most likely produce from this state
    pub fn planned_result(&self) -> ApplyResult {
        match self {
            Self::Absent => ApplyResult::Created,
            Self::InSync { .. } => ApplyResult::NoChange,
            Self::Stopped => ApplyResult::Started,
            Self::Drifted { reason } => ApplyResult::Recreated {
                reason: reason.clone(),
            },
            Self::Unwanted { .. } => ApplyResult::Removed,
            Self::Unknown => ApplyResult::Synced,
        }
    }
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource existed and matched, but had to be started
    Started,
    /// Resource drifted and was replaced
    Recreated { reason: String },
    /// Resource was removed
    Removed,
    /// State was pushed to an external component
    Synced,
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Started | Self::Recreated { .. } | Self::Removed | Self::Synced
        )
    }
}

/// What happened to one resource during execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOutcome {
    pub resource_type: String,
    pub resource_id: String,
    pub result: ApplyResult,
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    /// Per-resource results in execution order
    pub outcomes: Vec<ResourceOutcome>,
    pub created: usize,
    pub started: usize,
    pub recreated: usize,
    pub removed: usize,
    pub synced: usize,
    pub skipped: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.started + self.recreated + self.removed + self.synced
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.no_change
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Started => self.started += 1,
            ApplyResult::Recreated { .. } => self.recreated += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Synced => self.synced += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }

    /// Count a result and remember which resource produced it
    pub fn record(&mut self, resource_type: &str, resource_id: &str, result: ApplyResult) {
        self.add_result(&result);
        self.outcomes.push(ResourceOutcome {
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            result,
        });
    }

    /// Result recorded for a resource, if it ran
    pub fn result_for(&self, resource_type: &str, resource_id: &str) -> Option<&ApplyResult> {
        self.outcomes
            .iter()
            .find(|o| o.resource_type == resource_type && o.resource_id == resource_id)
            .map(|o| &o.result)
    }
}

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just report what would happen
    pub dry_run: bool,
}
