//! Execution planner - builds ordered resource execution plans

use crate::resource::{BoxedResource, Resource};

/// A named group of resources applied together
pub struct Stage {
    pub name: String,
    pub resources: Vec<BoxedResource>,
}

/// An execution plan: stages applied strictly in order
pub struct ExecutionPlan {
    stages: Vec<Stage>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage. Empty stages are dropped.
    pub fn add_stage(&mut self, name: impl Into<String>, resources: Vec<BoxedResource>) {
        if resources.is_empty() {
            return;
        }
        self.stages.push(Stage {
            name: name.into(),
            resources,
        });
    }

    /// Append a single-resource stage
    pub fn add_resource(&mut self, name: impl Into<String>, resource: BoxedResource) {
        self.add_stage(name, vec![resource]);
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// All resources in execution order
    pub fn resources(&self) -> impl Iterator<Item = &dyn Resource> {
        self.stages
            .iter()
            .flat_map(|stage| stage.resources.iter().map(AsRef::as_ref))
    }

    /// Filter plan to only include resources matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource) -> bool,
    {
        let mut plan = Self::new();
        for stage in self.stages {
            let resources = stage
                .resources
                .into_iter()
                .filter(|r| predicate(r.as_ref()))
                .collect();
            plan.add_stage(stage.name, resources);
        }
        plan
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type" or "type:id". Ids may contain dots
    /// (hostnames), so the separator is a colon.
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, id) = parse_target(t);
                self.filter(|r| matches_filter(r, resource_type, id))
            }
        }
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.stages.iter().map(|s| s.resources.len()).sum()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Default for ExecutionPlan {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a target string like "type:id" into (type, id)
fn parse_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once(':') {
        Some((resource_type, id)) => (resource_type, Some(id)),
        None => (target, None),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(resource: &dyn Resource, resource_type: &str, id: Option<&str>) -> bool {
    // Allow plural aliases
    let matches_type = resource.resource_type() == resource_type
        || resource_type.strip_suffix('s') == Some(resource.resource_type());
    if !matches_type {
        return false;
    }

    if let Some(id) = id
        && resource.id() != id
    {
        return false;
    }

    true
}
