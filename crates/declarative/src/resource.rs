//! Resource trait for declarative state management
//!
//! A Resource represents something that can be in a certain state,
//! and can be changed to reach a desired state.

use crate::context::ApplyContext;
use crate::types::{ApplyResult, ResourceState};
use anyhow::Result;
use std::fmt;

/// Core trait for declarative resources
///
/// Every resource in the system implements this trait, which provides:
/// - Identity (id, description, type)
/// - State detection against the resource's own declaration
/// - State convergence (apply)
///
/// # Example
///
/// ```ignore
/// use declarative::{Resource, ResourceState, ApplyResult, ApplyContext};
///
/// #[derive(Debug)]
/// struct FileResource {
///     path: String,
///     content: String,
/// }
///
/// impl Resource for FileResource {
///     fn id(&self) -> String {
///         self.path.clone()
///     }
///
///     fn description(&self) -> String {
///         format!("Ensure file exists at {}", self.path)
///     }
///
///     fn resource_type(&self) -> &'static str {
///         "file"
///     }
///
///     fn current_state(&self) -> Result<ResourceState> {
///         match std::fs::read_to_string(&self.path) {
///             Ok(c) if c == self.content => Ok(ResourceState::InSync { details: None }),
///             Ok(_) => Ok(ResourceState::Drifted { reason: "content".into() }),
///             Err(_) => Ok(ResourceState::Absent),
///         }
///     }
///
///     fn apply(&self, _ctx: &ApplyContext) -> Result<ApplyResult> {
///         std::fs::write(&self.path, &self.content)?;
///         Ok(ApplyResult::Created)
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Unique identifier for this resource within its type
    ///
    /// Examples:
    /// - "demo.test" for a site
    /// - "mysql-8.0-3306" for a database
    fn id(&self) -> String;

    /// Human-readable description of what this resource does
    fn description(&self) -> String;

    /// Resource type category
    ///
    /// Used for grouping and filtering (e.g. "site", "database", "network").
    fn resource_type(&self) -> &'static str;

    /// Detect the current state of this resource
    ///
    /// Always queries the system; nothing is cached between calls.
    fn current_state(&self) -> Result<ResourceState>;

    /// Apply changes to reach the desired state
    ///
    /// Must be idempotent: applying an in-sync resource returns
    /// [`ApplyResult::NoChange`] without mutating anything.
    fn apply(&self, ctx: &ApplyContext) -> Result<ApplyResult>;
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;
