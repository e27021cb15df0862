//! # fleet
//!
//! Reconciliation engine for a local development container fleet.
//!
//! Given an [`EnvironmentSpec`], the engine converges the container runtime
//! to it with the least mutating work:
//!
//! - [`identity`] turns each declared resource into a label [`Selector`]
//! - [`drift`] decides whether a running container still matches
//! - [`lifecycle`] creates, starts, or recreates one container at a time
//! - [`graph`] orders everything into a [`declarative::ExecutionPlan`]
//! - [`proxy`] pushes the hostname table to the routing component
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use declarative::{CancelToken, NoProgress};
//! use dockerkit::DockerCli;
//! use fleet::{Engine, EngineConfig, EnvironmentSpec, HttpRoutingClient, PlanOptions};
//!
//! # fn main() -> fleet::Result<()> {
//! let config = EngineConfig::default();
//! let docker = Arc::new(DockerCli::new()?);
//! let router = Arc::new(HttpRoutingClient::new(config.proxy_endpoint.clone()));
//! let engine = Engine::new(docker.clone(), docker, router, config);
//!
//! let spec = EnvironmentSpec::default();
//! let opts = PlanOptions::default();
//! let report = engine.apply(&spec, &opts, &CancelToken::new(), &mut NoProgress)?;
//! println!("{} change(s)", report.summary.total_changes());
//! # Ok(())
//! # }
//! ```

pub mod apply;
pub mod config;
pub mod drift;
pub mod envfile;
pub mod error;
pub mod graph;
pub mod hosts;
pub mod identity;
pub mod lifecycle;
pub mod proxy;
pub mod spec;
pub mod units;

#[cfg(test)]
pub(crate) mod testing;

pub use apply::{ApplyReport, Engine, PlanOptions, ResourceStatus};
pub use config::{EngineConfig, ImageSet};
pub use error::{Error, Result};
pub use hosts::{HostResolver, HostsUpdate, patch_hosts};
pub use identity::{Kind, Selector};
pub use lifecycle::{Operator, Outcome};
pub use proxy::{HttpRoutingClient, RoutingClient, RoutingTable};
pub use spec::{
    BlackfireSpec, CustomContainerSpec, DatabaseEngine, DatabaseSpec, EnvironmentSpec, MountSpec,
    PhpSettings, ProxySpec, Service, ServicesSpec, SiteSpec,
};
