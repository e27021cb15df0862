//! Apply context and callback traits
//!
//! These traits keep the executor independent of any particular UI.

use crate::types::ApplyResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback: Send {
    /// Called when a stage of the plan starts
    fn on_stage_start(&mut self, stage: &str, count: usize);

    /// Called when starting to apply a single resource
    fn on_resource_start(&mut self, id: &str, description: &str);

    /// Called when a resource application completes
    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult);

    /// Called when a resource fails; execution stops afterwards
    fn on_resource_failed(&mut self, id: &str, error: &str);

    /// Called when a stage completes
    fn on_stage_complete(&mut self, stage: &str);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_stage_start(&mut self, _stage: &str, _count: usize) {}
    fn on_resource_start(&mut self, _id: &str, _description: &str) {}
    fn on_resource_complete(&mut self, _id: &str, _result: &ApplyResult) {}
    fn on_resource_failed(&mut self, _id: &str, _error: &str) {}
    fn on_stage_complete(&mut self, _stage: &str) {}
}

/// Shared cancellation flag.
///
/// Cloning shares the flag; setting it from a signal handler stops the
/// executor before the next resource and aborts pending retries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Context passed to resource apply operations
pub struct ApplyContext<'a> {
    /// Whether this is a dry run (no actual changes)
    pub dry_run: bool,
    /// Cancellation flag for long-running applies
    pub cancel: &'a CancelToken,
}

impl<'a> ApplyContext<'a> {
    /// Create a new apply context
    pub fn new(dry_run: bool, cancel: &'a CancelToken) -> Self {
        Self { dry_run, cancel }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
