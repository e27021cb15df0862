//! Lifecycle operator: idempotent create-or-recreate-or-start per unit.
//!
//! ```text
//! Absent              --create-->                    Running
//! Present & Match     --start if stopped-->          Running
//! Present & Mismatch  --stop--> --remove--> --create--> Running
//! ```
//!
//! Runtime state is listed and inspected fresh on every call; nothing read
//! from the runtime outlives the call that read it.

use crate::config::EngineConfig;
use crate::drift::Drift;
use crate::error::{Error, Result};
use crate::identity::{self, Kind, Selector, managed_labels};
use crate::units::Unit;
use dockerkit::{ContainerRuntime, ContainerSummary, ImageSource, Labels, RuntimeContainer};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// What reconciling a unit did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    Started,
    Created,
    Recreated { reason: String },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => f.write_str("unchanged"),
            Self::Started => f.write_str("started"),
            Self::Created => f.write_str("created"),
            Self::Recreated { reason } => write!(f, "recreated ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// Runtime container id
    pub id: String,
    pub outcome: Outcome,
}

/// Read-only view of a unit's runtime counterpart
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Absent,
    Present {
        container: RuntimeContainer,
        drift: Drift,
    },
}

/// A managed container whose identity is no longer declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orphan {
    pub id: String,
    pub name: String,
    pub identity: String,
}

pub struct Operator {
    runtime: Arc<dyn ContainerRuntime>,
    images: Arc<dyn ImageSource>,
    config: EngineConfig,
}

impl Operator {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        images: Arc<dyn ImageSource>,
        config: EngineConfig,
    ) -> Self {
        Self {
            runtime,
            images,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn runtime(&self) -> &dyn ContainerRuntime {
        self.runtime.as_ref()
    }

    /// The single container carrying `selector`, if any.
    pub fn find(&self, selector: &Selector, identity: &str) -> Result<Option<ContainerSummary>> {
        let mut found = self.runtime.list_containers(selector.labels())?;
        log::debug!("{selector}: {} container(s)", found.len());
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            count => Err(Error::AmbiguousResource {
                kind: selector.kind().to_string(),
                identity: identity.to_string(),
                count,
            }),
        }
    }

    /// Detect without mutating anything.
    pub fn observe(&self, unit: &dyn Unit) -> Result<Observation> {
        let Some(summary) = self.find(&unit.selector(), &unit.identity())? else {
            return Ok(Observation::Absent);
        };
        let container = self.runtime.inspect_container(&summary.id)?;
        let drift = unit.matches(&container);
        Ok(Observation::Present { container, drift })
    }

    /// Converge one unit.
    pub fn reconcile(&self, unit: &dyn Unit) -> Result<Reconciled> {
        match self.observe(unit)? {
            Observation::Absent => {
                let id = self.create(unit)?;
                Ok(Reconciled {
                    id,
                    outcome: Outcome::Created,
                })
            }
            Observation::Present {
                container,
                drift: Drift::Match,
            } => {
                if container.running {
                    return Ok(Reconciled {
                        id: container.id,
                        outcome: Outcome::Unchanged,
                    });
                }
                log::info!("Starting {} '{}'", unit.kind(), unit.identity());
                self.runtime.start_container(&container.id)?;
                Ok(Reconciled {
                    id: container.id,
                    outcome: Outcome::Started,
                })
            }
            Observation::Present {
                container,
                drift: Drift::Mismatch(reason),
            } => {
                log::info!(
                    "Recreating {} '{}': {reason}",
                    unit.kind(),
                    unit.identity()
                );
                self.stop_and_remove(&container.id, container.running)?;
                let id = self.create(unit)?;
                Ok(Reconciled {
                    id,
                    outcome: Outcome::Recreated { reason },
                })
            }
        }
    }

    /// Pull, create, start, provision.
    fn create(&self, unit: &dyn Unit) -> Result<String> {
        if let Some(selector) = unit.displaces() {
            self.remove_displaced(&selector, unit)?;
        }
        for volume in unit.volumes() {
            self.ensure_volume(&volume, &managed_labels())?;
        }

        let blueprint = unit.blueprint(&self.config.network);
        log::info!("Creating {} '{}' from {}", unit.kind(), blueprint.name, blueprint.image);
        self.images.pull(&blueprint.image)?;
        let id = self.runtime.create_container(&blueprint)?;
        self.runtime.start_container(&id)?;
        self.provision(&id, &blueprint.name, unit)?;
        Ok(id)
    }

    /// Run post-create commands in order; the first failure stops the rest.
    fn provision(&self, id: &str, name: &str, unit: &dyn Unit) -> Result<()> {
        for command in unit.provisioning() {
            log::info!("Provisioning '{name}': {command}");
            let output = self.runtime.exec(id, &command)?;
            if !output.success() {
                let detail = if output.stderr.trim().is_empty() {
                    output.stdout
                } else {
                    output.stderr
                };
                return Err(Error::Provisioning {
                    container: name.to_string(),
                    command: command.to_string(),
                    exit_code: output.exit_code,
                    output: detail.trim().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Remove containers matched by `selector` that belong to another identity.
    fn remove_displaced(&self, selector: &Selector, unit: &dyn Unit) -> Result<()> {
        let own = unit.identity();
        for summary in self.runtime.list_containers(selector.labels())? {
            let container = self.runtime.inspect_container(&summary.id)?;
            let owner = identity::identity_from_labels(selector.kind(), &container.labels);
            if owner.as_deref() == Some(own.as_str()) {
                continue;
            }
            log::info!(
                "Removing '{}' to make room for {} '{own}'",
                container.name,
                unit.kind()
            );
            self.stop_and_remove(&container.id, container.running)?;
        }
        Ok(())
    }

    fn stop_and_remove(&self, id: &str, running: bool) -> Result<()> {
        if running {
            self.runtime.stop_container(id, self.config.stop_timeout)?;
        }
        self.runtime.remove_container(id, true)?;
        Ok(())
    }

    /// Create the engine network if it doesn't exist. Returns true if created.
    pub fn ensure_network(&self) -> Result<bool> {
        let name = &self.config.network;
        let existing = self.runtime.list_networks(&managed_labels())?;
        if existing.iter().any(|n| n == name) {
            return Ok(false);
        }
        log::info!("Creating network '{name}'");
        self.runtime.create_network(name, &managed_labels())?;
        Ok(true)
    }

    /// Whether the engine network exists.
    pub fn network_exists(&self) -> Result<bool> {
        let existing = self.runtime.list_networks(&managed_labels())?;
        Ok(existing.iter().any(|n| *n == self.config.network))
    }

    /// Create a volume if no volume with that name carries `labels`.
    pub fn ensure_volume(&self, name: &str, labels: &Labels) -> Result<bool> {
        let existing = self.runtime.list_volumes(labels)?;
        if existing.iter().any(|v| v == name) {
            return Ok(false);
        }
        log::info!("Creating volume '{name}'");
        self.runtime.create_volume(name, labels)?;
        Ok(true)
    }

    /// Stop and remove the container behind `selector`. Returns true if one existed.
    pub fn remove_if_present(&self, selector: &Selector, identity: &str) -> Result<bool> {
        let Some(summary) = self.find(selector, identity)? else {
            return Ok(false);
        };
        let container = self.runtime.inspect_container(&summary.id)?;
        log::info!("Removing {} '{identity}'", selector.kind());
        self.stop_and_remove(&container.id, container.running)?;
        Ok(true)
    }

    /// Managed containers of `kind` whose identity is not in `declared`.
    pub fn orphans(&self, kind: Kind, declared: &BTreeSet<String>) -> Result<Vec<Orphan>> {
        let mut orphans = Vec::new();
        for summary in self.runtime.list_containers(Selector::all_of(kind).labels())? {
            let container = self.runtime.inspect_container(&summary.id)?;
            let Some(identity) = identity::identity_from_labels(kind, &container.labels) else {
                log::debug!("{} has no identity labels; leaving it alone", container.name);
                continue;
            };
            if !declared.contains(&identity) {
                orphans.push(Orphan {
                    id: container.id,
                    name: container.name,
                    identity,
                });
            }
        }
        Ok(orphans)
    }

    /// Stop and remove one orphan.
    pub fn remove_orphan(&self, orphan: &Orphan) -> Result<()> {
        let container = self.runtime.inspect_container(&orphan.id)?;
        log::info!("Pruning '{}'", orphan.name);
        self.stop_and_remove(&container.id, container.running)
    }
}
