//! Environment graph: the fixed order in which resource kinds converge.
//!
//! ```text
//! network → proxy → databases → services → containers → sites → mounts
//!         → prune (opt-in) → proxy_sync → hosts
//! ```
//!
//! Each node is a [`declarative::Resource`]; the whole graph is an
//! [`ExecutionPlan`] the declarative executor walks one resource at a time.

use crate::hosts::HostResolver;
use crate::identity::{Kind, Selector};
use crate::lifecycle::{Observation, Operator, Outcome};
use crate::proxy::{ProxySync, RoutingClient, RoutingTable};
use crate::spec::{EnvironmentSpec, Service};
use crate::units::Declared;
use anyhow::Result;
use declarative::{
    ApplyContext, ApplyResult, BoxedResource, ExecutionPlan, Resource, ResourceState,
};
use dockerkit::RetryConfig;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Stage names, in execution order
pub const STAGES: [&str; 10] = [
    "network",
    "proxy",
    "databases",
    "services",
    "containers",
    "sites",
    "mounts",
    "prune",
    "proxy_sync",
    "hosts",
];

/// The engine network
pub struct NetworkResource {
    operator: Arc<Operator>,
}

impl fmt::Debug for NetworkResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkResource")
            .field("name", &self.operator.config().network)
            .finish()
    }
}

impl Resource for NetworkResource {
    fn id(&self) -> String {
        self.operator.config().network.clone()
    }

    fn description(&self) -> String {
        format!("Network '{}'", self.operator.config().network)
    }

    fn resource_type(&self) -> &'static str {
        "network"
    }

    fn current_state(&self) -> Result<ResourceState> {
        Ok(if self.operator.network_exists()? {
            ResourceState::InSync { details: None }
        } else {
            ResourceState::Absent
        })
    }

    fn apply(&self, _ctx: &ApplyContext) -> Result<ApplyResult> {
        Ok(if self.operator.ensure_network()? {
            ApplyResult::Created
        } else {
            ApplyResult::NoChange
        })
    }
}

/// One declared container, converged by the lifecycle operator
pub struct ContainerResource {
    operator: Arc<Operator>,
    declared: Declared,
}

impl ContainerResource {
    pub fn new(operator: Arc<Operator>, declared: Declared) -> Self {
        Self { operator, declared }
    }
}

impl fmt::Debug for ContainerResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerResource")
            .field("declared", &self.declared)
            .finish_non_exhaustive()
    }
}

impl Resource for ContainerResource {
    fn id(&self) -> String {
        self.declared.identity()
    }

    fn description(&self) -> String {
        match &self.declared {
            Declared::Proxy(_) => "Routing proxy".to_string(),
            Declared::Database(db) => format!("{} {} on port {}", db.engine, db.version, db.port),
            Declared::Service { service, .. } => format!("Service {service}"),
            Declared::Custom(spec) => format!("Container {} ({})", spec.name, spec.image_ref()),
            Declared::Site { site, .. } => {
                format!("Site {} (PHP {})", site.hostname, site.php_version)
            }
            Declared::Mount(mount) => format!("Mount {}", mount.path.display()),
        }
    }

    fn resource_type(&self) -> &'static str {
        self.declared.kind().as_str()
    }

    fn current_state(&self) -> Result<ResourceState> {
        let unit = self.declared.prepare(self.operator.config())?;
        Ok(match self.operator.observe(unit.as_ref())? {
            Observation::Absent => ResourceState::Absent,
            Observation::Present { container, drift } => match drift.reason() {
                Some(reason) => ResourceState::Drifted {
                    reason: reason.to_string(),
                },
                None if container.running => ResourceState::InSync {
                    details: Some(container.name),
                },
                None => ResourceState::Stopped,
            },
        })
    }

    fn apply(&self, _ctx: &ApplyContext) -> Result<ApplyResult> {
        let unit = self.declared.prepare(self.operator.config())?;
        let reconciled = self.operator.reconcile(unit.as_ref())?;
        Ok(match reconciled.outcome {
            Outcome::Unchanged => ApplyResult::NoChange,
            Outcome::Started => ApplyResult::Started,
            Outcome::Created => ApplyResult::Created,
            Outcome::Recreated { reason } => ApplyResult::Recreated { reason },
        })
    }
}

/// A service switched off in the spec; its container goes away
pub struct ServiceRemovalResource {
    operator: Arc<Operator>,
    service: Service,
}

impl fmt::Debug for ServiceRemovalResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRemovalResource")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl Resource for ServiceRemovalResource {
    fn id(&self) -> String {
        self.service.name().to_string()
    }

    fn description(&self) -> String {
        format!("Service {} (disabled)", self.service)
    }

    fn resource_type(&self) -> &'static str {
        Kind::Service.as_str()
    }

    fn current_state(&self) -> Result<ResourceState> {
        let found = self
            .operator
            .find(&Selector::service(self.service), self.service.name())?;
        Ok(match found {
            Some(_) => ResourceState::Unwanted {
                reason: "disabled".to_string(),
            },
            None => ResourceState::InSync {
                details: Some("disabled".to_string()),
            },
        })
    }

    fn apply(&self, _ctx: &ApplyContext) -> Result<ApplyResult> {
        let removed = self
            .operator
            .remove_if_present(&Selector::service(self.service), self.service.name())?;
        Ok(if removed {
            ApplyResult::Removed
        } else {
            ApplyResult::NoChange
        })
    }
}

/// Managed containers of one kind that nothing declares any more
pub struct PruneResource {
    operator: Arc<Operator>,
    kind: Kind,
    declared: BTreeSet<String>,
}

impl fmt::Debug for PruneResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PruneResource")
            .field("kind", &self.kind)
            .field("declared", &self.declared)
            .finish_non_exhaustive()
    }
}

impl Resource for PruneResource {
    fn id(&self) -> String {
        self.kind.as_str().to_string()
    }

    fn description(&self) -> String {
        format!("Undeclared {} containers", self.kind)
    }

    fn resource_type(&self) -> &'static str {
        "prune"
    }

    fn current_state(&self) -> Result<ResourceState> {
        let orphans = self.operator.orphans(self.kind, &self.declared)?;
        if orphans.is_empty() {
            return Ok(ResourceState::InSync { details: None });
        }
        let names: Vec<_> = orphans.iter().map(|o| o.identity.as_str()).collect();
        Ok(ResourceState::Unwanted {
            reason: names.join(", "),
        })
    }

    fn apply(&self, _ctx: &ApplyContext) -> Result<ApplyResult> {
        let orphans = self.operator.orphans(self.kind, &self.declared)?;
        for orphan in &orphans {
            self.operator.remove_orphan(orphan)?;
        }
        Ok(if orphans.is_empty() {
            ApplyResult::NoChange
        } else {
            ApplyResult::Removed
        })
    }
}

/// Pushes the routing table once every site is up
pub struct ProxySyncResource {
    router: Arc<dyn RoutingClient>,
    retry: RetryConfig,
    table: RoutingTable,
}

impl fmt::Debug for ProxySyncResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySyncResource")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl Resource for ProxySyncResource {
    fn id(&self) -> String {
        "routes".to_string()
    }

    fn description(&self) -> String {
        format!("Push {} route(s) to the proxy", self.table.len())
    }

    fn resource_type(&self) -> &'static str {
        "proxy_sync"
    }

    /// The component's table can't be read back, so it is always pushed.
    fn current_state(&self) -> Result<ResourceState> {
        Ok(ResourceState::Unknown)
    }

    fn apply(&self, ctx: &ApplyContext) -> Result<ApplyResult> {
        ProxySync::new(self.router.as_ref(), &self.retry).sync(&self.table, ctx.cancel)?;
        Ok(ApplyResult::Synced)
    }
}

/// Site hostnames resolve to loopback
pub struct HostsResource {
    resolver: Arc<dyn HostResolver>,
    hostnames: Vec<String>,
}

impl fmt::Debug for HostsResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostsResource")
            .field("hostnames", &self.hostnames)
            .finish_non_exhaustive()
    }
}

impl Resource for HostsResource {
    fn id(&self) -> String {
        "hosts".to_string()
    }

    fn description(&self) -> String {
        format!("Resolve {} hostname(s) to 127.0.0.1", self.hostnames.len())
    }

    fn resource_type(&self) -> &'static str {
        "hosts"
    }

    fn current_state(&self) -> Result<ResourceState> {
        Ok(if self.resolver.plan(&self.hostnames)?.needs_update {
            ResourceState::Drifted {
                reason: "hosts file out of date".to_string(),
            }
        } else {
            ResourceState::InSync { details: None }
        })
    }

    fn apply(&self, _ctx: &ApplyContext) -> Result<ApplyResult> {
        let update = self.resolver.plan(&self.hostnames)?;
        if !update.needs_update {
            return Ok(ApplyResult::NoChange);
        }
        self.resolver.write(&update)?;
        Ok(ApplyResult::Synced)
    }
}

/// Collaborators the graph's resources talk to
pub struct GraphInputs {
    pub operator: Arc<Operator>,
    pub router: Arc<dyn RoutingClient>,
    /// `None` skips the hosts stage
    pub hosts: Option<Arc<dyn HostResolver>>,
    pub prune: bool,
}

/// Declared containers per stage, in order. Disabled sites are left out.
pub fn declared(spec: &EnvironmentSpec) -> Vec<(&'static str, Vec<Declared>)> {
    let profiler = spec.profiler().cloned();
    vec![
        ("proxy", vec![Declared::Proxy(spec.proxy.clone())]),
        (
            "databases",
            spec.databases.iter().cloned().map(Declared::Database).collect(),
        ),
        (
            "services",
            Service::ALL
                .into_iter()
                .filter(|s| spec.services.is_enabled(*s))
                .map(|service| Declared::Service {
                    service,
                    blackfire: spec.blackfire.clone(),
                })
                .collect(),
        ),
        (
            "containers",
            spec.containers.iter().cloned().map(Declared::Custom).collect(),
        ),
        (
            "sites",
            spec.enabled_sites()
                .map(|site| Declared::Site {
                    site: site.clone(),
                    profiler: profiler.clone(),
                })
                .collect(),
        ),
        (
            "mounts",
            spec.mounts.iter().cloned().map(Declared::Mount).collect(),
        ),
    ]
}

/// Identities of `kind` that prune must leave alone.
///
/// Disabled sites count as declared: they are never touched.
pub fn declared_identities(spec: &EnvironmentSpec, kind: Kind) -> BTreeSet<String> {
    match kind {
        Kind::Site => spec.sites.iter().map(|s| s.hostname.clone()).collect(),
        Kind::Database => spec.databases.iter().map(|d| d.identity()).collect(),
        Kind::Custom => spec.containers.iter().map(|c| c.name.clone()).collect(),
        Kind::Mount => spec
            .mounts
            .iter()
            .map(|m| m.path.display().to_string())
            .collect(),
        Kind::Proxy => BTreeSet::from(["proxy".to_string()]),
        Kind::Service => Service::ALL
            .into_iter()
            .filter(|s| spec.services.is_enabled(*s))
            .map(|s| s.name().to_string())
            .collect(),
    }
}

/// Hostnames (primary + aliases) of enabled sites
pub fn site_hostnames(spec: &EnvironmentSpec) -> Vec<String> {
    spec.enabled_sites()
        .flat_map(|s| s.hostnames())
        .map(str::to_string)
        .collect()
}

/// Build the full plan for `spec`.
pub fn build(spec: &EnvironmentSpec, inputs: &GraphInputs) -> ExecutionPlan {
    let operator = &inputs.operator;
    let mut plan = ExecutionPlan::new();

    plan.add_resource(
        "network",
        Box::new(NetworkResource {
            operator: operator.clone(),
        }),
    );

    for (stage, declared) in declared(spec) {
        let mut resources: Vec<BoxedResource> = declared
            .into_iter()
            .map(|d| Box::new(ContainerResource::new(operator.clone(), d)) as BoxedResource)
            .collect();
        if stage == "services" {
            resources.extend(
                Service::ALL
                    .into_iter()
                    .filter(|s| !spec.services.is_enabled(*s))
                    .map(|service| {
                        Box::new(ServiceRemovalResource {
                            operator: operator.clone(),
                            service,
                        }) as BoxedResource
                    }),
            );
        }
        plan.add_stage(stage, resources);
    }

    if inputs.prune {
        let resources = [Kind::Database, Kind::Custom, Kind::Site, Kind::Mount]
            .into_iter()
            .map(|kind| {
                Box::new(PruneResource {
                    operator: operator.clone(),
                    kind,
                    declared: declared_identities(spec, kind),
                }) as BoxedResource
            })
            .collect();
        plan.add_stage("prune", resources);
    }

    plan.add_resource(
        "proxy_sync",
        Box::new(ProxySyncResource {
            router: inputs.router.clone(),
            retry: operator.config().proxy_retry.clone(),
            table: RoutingTable::from_spec(spec),
        }),
    );

    if let Some(resolver) = &inputs.hosts {
        plan.add_resource(
            "hosts",
            Box::new(HostsResource {
                resolver: resolver.clone(),
                hostnames: site_hostnames(spec),
            }),
        );
    }

    plan
}
