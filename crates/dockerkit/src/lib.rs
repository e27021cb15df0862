//! # dockerkit
//!
//! Blocking Rust interface to the Docker CLI.
//!
//! This crate provides:
//! - The [`ContainerRuntime`] and [`ImageSource`] traits the reconciler is
//!   written against
//! - [`DockerCli`], a backend that shells out to `docker` and parses its JSON
//! - Categorized errors and retry with exponential backoff for flaky pulls
//!
//! ## Example
//!
//! ```no_run
//! use dockerkit::{ContainerRuntime, DockerCli, Labels};
//!
//! let docker = DockerCli::new().expect("docker not available");
//! let mut filters = Labels::new();
//! filters.insert("berth.managed".into(), "true".into());
//!
//! for row in docker.list_containers(&filters).expect("list failed") {
//!     println!("{} {}", row.name, row.state);
//! }
//! ```

#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod retry;
pub mod types;

pub use backend::docker::DockerCli;
pub use backend::{ContainerRuntime, ImageSource};
pub use error::{Error, ErrorCategory, Result};
pub use types::{
    ContainerBlueprint, ContainerSummary, ExecCommand, ExecOutput, Labels, MountKind, MountPoint,
    PortBinding, RetryConfig, RuntimeContainer,
};
