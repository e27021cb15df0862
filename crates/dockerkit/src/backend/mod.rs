//! Backend abstraction for container runtime operations.
//!
//! [`ContainerRuntime`] covers everything the reconciler needs from the
//! runtime; [`ImageSource`] is split out so tests can observe pulls without
//! touching a registry.

pub mod docker;

use crate::error::Result;
use crate::types::{
    ContainerBlueprint, ContainerSummary, ExecCommand, ExecOutput, Labels, RuntimeContainer,
};
use std::time::Duration;

/// Container runtime operations.
///
/// Implementations:
/// - [`docker::DockerCli`] drives the `docker` executable
/// - in-memory fakes in downstream tests
pub trait ContainerRuntime: Send + Sync {
    /// Check that the daemon answers.
    fn ping(&self) -> Result<()>;

    /// List containers (running or not) carrying every label in `filters`.
    fn list_containers(&self, filters: &Labels) -> Result<Vec<ContainerSummary>>;

    /// Inspect a single container.
    fn inspect_container(&self, id: &str) -> Result<RuntimeContainer>;

    /// Create a container and return its id. Does not start it.
    fn create_container(&self, blueprint: &ContainerBlueprint) -> Result<String>;

    fn start_container(&self, id: &str) -> Result<()>;

    /// Stop with a grace period before the runtime kills the process.
    fn stop_container(&self, id: &str, timeout: Duration) -> Result<()>;

    fn remove_container(&self, id: &str, force: bool) -> Result<()>;

    /// Run a command inside a running container and wait for it to exit.
    ///
    /// A non-zero exit is reported in [`ExecOutput`], not as an error.
    fn exec(&self, id: &str, command: &ExecCommand) -> Result<ExecOutput>;

    /// Names of networks carrying every label in `filters`.
    fn list_networks(&self, filters: &Labels) -> Result<Vec<String>>;

    fn create_network(&self, name: &str, labels: &Labels) -> Result<String>;

    /// Names of volumes carrying every label in `filters`.
    fn list_volumes(&self, filters: &Labels) -> Result<Vec<String>>;

    fn create_volume(&self, name: &str, labels: &Labels) -> Result<String>;
}

/// Where images come from.
pub trait ImageSource: Send + Sync {
    /// Make `image` available locally.
    fn pull(&self, image: &str) -> Result<()>;
}
