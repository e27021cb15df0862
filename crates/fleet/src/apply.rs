//! Apply orchestrator: validate, build the graph, walk it.

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::graph::{self, GraphInputs};
use crate::hosts::HostResolver;
use crate::lifecycle::Operator;
use crate::proxy::RoutingClient;
use crate::spec::EnvironmentSpec;
use declarative::{
    CancelToken, ExecuteOptions, ExecuteSummary, ExecutionPlan, ProgressCallback, ResourceDiff,
    ResourceState,
};
use dockerkit::{ContainerRuntime, ImageSource};
use std::sync::Arc;

/// Knobs for one run
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Detect only; record what apply would do
    pub dry_run: bool,
    /// Remove managed containers that are no longer declared
    pub prune: bool,
    /// `kind` or `kind:id`
    pub only: Option<String>,
    /// Skip the hosts-file stage
    pub skip_hosts: bool,
}

/// What a finished run did
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    pub summary: ExecuteSummary,
    pub dry_run: bool,
}

impl ApplyReport {
    pub fn changed(&self) -> bool {
        self.summary.total_changes() > 0
    }
}

/// Detected state of one planned resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceStatus {
    pub resource_type: &'static str,
    pub resource_id: String,
    pub description: String,
    pub state: ResourceState,
}

/// Converges the runtime to an [`EnvironmentSpec`].
pub struct Engine {
    operator: Arc<Operator>,
    router: Arc<dyn RoutingClient>,
    hosts: Option<Arc<dyn HostResolver>>,
}

impl Engine {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        images: Arc<dyn ImageSource>,
        router: Arc<dyn RoutingClient>,
        config: EngineConfig,
    ) -> Self {
        Self {
            operator: Arc::new(Operator::new(runtime, images, config)),
            router,
            hosts: None,
        }
    }

    /// Attach the collaborator that patches host-name resolution.
    #[must_use]
    pub fn with_hosts(mut self, hosts: Arc<dyn HostResolver>) -> Self {
        self.hosts = Some(hosts);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        self.operator.config()
    }

    /// The ordered graph for `spec`, narrowed by `opts`.
    pub fn plan(&self, spec: &EnvironmentSpec, opts: &PlanOptions) -> ExecutionPlan {
        let inputs = GraphInputs {
            operator: self.operator.clone(),
            router: self.router.clone(),
            hosts: if opts.skip_hosts {
                None
            } else {
                self.hosts.clone()
            },
            prune: opts.prune,
        };
        graph::build(spec, &inputs).filter_by_target(opts.only.as_deref())
    }

    /// Converge the runtime to `spec`.
    ///
    /// Stops at the first failing resource; resources already reconciled in
    /// this run are left as they are.
    pub fn apply<P: ProgressCallback>(
        &self,
        spec: &EnvironmentSpec,
        opts: &PlanOptions,
        cancel: &CancelToken,
        progress: &mut P,
    ) -> Result<ApplyReport> {
        spec.validate()?;
        self.operator.runtime().ping()?;

        let plan = self.plan(spec, opts);
        log::info!(
            "{} {} resource(s) in {} stage(s)",
            if opts.dry_run { "Checking" } else { "Applying" },
            plan.total_resources(),
            plan.stages().len()
        );

        let exec = ExecuteOptions {
            dry_run: opts.dry_run,
        };
        let summary = declarative::execute(&plan, &exec, cancel, progress)?;
        Ok(ApplyReport {
            summary,
            dry_run: opts.dry_run,
        })
    }

    /// Detected state of every planned resource, in execution order.
    pub fn status(
        &self,
        spec: &EnvironmentSpec,
        opts: &PlanOptions,
    ) -> Result<Vec<ResourceStatus>> {
        spec.validate()?;
        self.operator.runtime().ping()?;

        let plan = self.plan(spec, opts);
        let mut statuses = Vec::with_capacity(plan.total_resources());
        for resource in plan.resources() {
            let state = resource
                .current_state()
                .map_err(|source| Error::Detect {
                    resource_type: resource.resource_type().to_string(),
                    resource_id: resource.id(),
                    source,
                })?;
            statuses.push(ResourceStatus {
                resource_type: resource.resource_type(),
                resource_id: resource.id(),
                description: resource.description(),
                state,
            });
        }
        Ok(statuses)
    }

    /// Resources an apply would touch.
    pub fn diff(&self, spec: &EnvironmentSpec, opts: &PlanOptions) -> Result<Vec<ResourceDiff>> {
        Ok(self
            .status(spec, opts)?
            .into_iter()
            .filter(|s| !s.state.is_in_sync())
            .map(|s| ResourceDiff {
                resource_id: s.resource_id,
                resource_type: s.resource_type.to_string(),
                description: s.description,
                current: s.state,
            })
            .collect())
    }
}
