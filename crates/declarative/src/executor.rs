//! Execution engine - applies resources strictly in plan order
//!
//! Resources run one at a time. The first failure stops the run so later
//! stages never see a half-converged dependency.

use crate::context::{ApplyContext, CancelToken, ProgressCallback};
use crate::planner::ExecutionPlan;
use crate::resource::Resource;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use thiserror::Error;

/// Why execution stopped early
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// A resource failed to detect or apply
    #[error("{resource_type} '{resource_id}' failed: {source:#}")]
    Resource {
        resource_type: String,
        resource_id: String,
        #[source]
        source: anyhow::Error,
        /// What completed before the failure
        completed: ExecuteSummary,
    },

    /// Cancellation was requested
    #[error("cancelled")]
    Cancelled {
        /// What completed before cancellation
        completed: ExecuteSummary,
    },
}

impl ExecuteError {
    /// Results recorded before execution stopped
    pub fn completed(&self) -> &ExecuteSummary {
        match self {
            Self::Resource { completed, .. } | Self::Cancelled { completed } => completed,
        }
    }
}

/// Execute a plan with the given options and callbacks
///
/// # Arguments
/// * `plan` - The execution plan to run
/// * `opts` - Execution options (dry_run)
/// * `cancel` - Checked before every resource
/// * `progress` - Progress callback
///
/// In a dry run nothing is applied; each resource's detected state is
/// recorded as the result an apply would produce.
pub fn execute<P: ProgressCallback>(
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    cancel: &CancelToken,
    progress: &mut P,
) -> Result<ExecuteSummary, ExecuteError> {
    let mut summary = ExecuteSummary::default();
    let ctx = ApplyContext::new(opts.dry_run, cancel);

    for stage in plan.stages() {
        progress.on_stage_start(&stage.name, stage.resources.len());

        for resource in &stage.resources {
            if cancel.is_cancelled() {
                return Err(ExecuteError::Cancelled { completed: summary });
            }

            let id = resource.id();
            progress.on_resource_start(&id, &resource.description());
            log::debug!("Applying {} '{}'", resource.resource_type(), id);

            match run_resource(resource.as_ref(), &ctx) {
                Ok(result) => {
                    progress.on_resource_complete(&id, &result);
                    summary.record(resource.resource_type(), &id, result);
                }
                Err(e) => {
                    progress.on_resource_failed(&id, &format!("{e:#}"));
                    if cancel.is_cancelled() {
                        return Err(ExecuteError::Cancelled { completed: summary });
                    }
                    return Err(ExecuteError::Resource {
                        resource_type: resource.resource_type().to_string(),
                        resource_id: id,
                        source: e,
                        completed: summary,
                    });
                }
            }
        }

        progress.on_stage_complete(&stage.name);
    }

    Ok(summary)
}

/// Apply (or in a dry run, detect) a single resource
fn run_resource(resource: &dyn Resource, ctx: &ApplyContext) -> anyhow::Result<ApplyResult> {
    if ctx.dry_run {
        return Ok(resource.current_state()?.planned_result());
    }
    resource.apply(ctx)
}
