//! # Declarative
//!
//! A framework for declarative resource management.
//!
//! This crate provides the core abstractions for declaring desired state,
//! detecting current state, and converging systems to match the desired state.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something with state that can be managed (containers, networks, files)
//! - **ResourceState**: What detection found, relative to the declaration
//! - **ExecutionPlan**: Named stages of resources, applied strictly in order
//! - **Executor**: Applies resources one at a time, stopping at the first failure
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{CancelToken, ExecutionPlan, ExecuteOptions, NoProgress, execute};
//!
//! let mut plan = ExecutionPlan::new();
//! plan.add_resource("files", Box::new(FileResource {
//!     path: "/tmp/test.txt".into(),
//!     content: "hello".into(),
//! }));
//!
//! let cancel = CancelToken::new();
//! let summary = execute(&plan, &ExecuteOptions::default(), &cancel, &mut NoProgress)?;
//! ```
//!
//! ## Callbacks
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`CancelToken`]: Stops execution between resources
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks or signal handling.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{ApplyContext, CancelToken, NoProgress, ProgressCallback};
pub use diff::{DiffSummary, ResourceDiff, compute_diffs, group_by_type};
pub use executor::{ExecuteError, execute};
pub use planner::{ExecutionPlan, Stage};
pub use resource::{BoxedResource, Resource};
pub use types::{
    ApplyResult, ExecuteOptions, ExecuteSummary, ResourceOutcome, ResourceState,
};
