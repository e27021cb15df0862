//! Error types for the reconciliation engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while validating or reconciling an environment.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or contradictory specification
    #[error("invalid specification: {message}")]
    InvalidSpec { message: String },

    #[error("duplicate site hostname '{hostname}'")]
    DuplicateSite { hostname: String },

    #[error("duplicate database '{identity}'")]
    DuplicateDatabase { identity: String },

    #[error("duplicate container name '{name}'")]
    DuplicateContainer { name: String },

    #[error("duplicate mount path '{}'", path.display())]
    DuplicateMount { path: PathBuf },

    #[error("host port {port} is used by more than one database")]
    DuplicatePort { port: u16 },

    /// Container runtime call failed
    #[error(transparent)]
    Runtime(#[from] dockerkit::Error),

    /// A custom container references an env file that doesn't exist
    #[error("env file '{}' not found", path.display())]
    EnvFileMissing { path: PathBuf },

    /// A site directory could not be listed for exclude handling
    #[error("failed to read site directory '{}': {source}", path.display())]
    ReadSiteDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A post-create command exited non-zero
    #[error("provisioning '{container}' failed: `{command}` exited with {exit_code}: {output}")]
    Provisioning {
        container: String,
        command: String,
        exit_code: i32,
        output: String,
    },

    /// More than one runtime container carries the same identity
    #[error("{kind} '{identity}' matches {count} containers; remove the duplicates")]
    AmbiguousResource {
        kind: String,
        identity: String,
        count: usize,
    },

    /// Routing component never answered the readiness poll
    #[error("proxy not ready after {attempts} attempts")]
    ProxyUnavailable { attempts: u32 },

    /// Routing component refused the table
    #[error("proxy rejected routes: {message}")]
    ProxyRejected { message: String },

    /// Routing component is older than this client
    #[error("proxy does not implement {operation}; update the proxy image")]
    ProxyNotImplemented { operation: String },

    #[error("proxy request failed: {message}")]
    ProxyTransport { message: String },

    /// State detection failed for a planned resource
    #[error("{resource_type} '{resource_id}': {source:#}")]
    Detect {
        resource_type: String,
        resource_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("operation cancelled")]
    Cancelled,

    /// Plan execution stopped at a failing resource
    #[error(transparent)]
    Execute(#[from] declarative::ExecuteError),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            message: message.into(),
        }
    }

    /// Whether the proxy readiness poll should try again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProxyTransport { .. })
    }
}

impl dockerkit::retry::Retryable for Error {
    fn is_retryable(&self) -> bool {
        Error::is_retryable(self)
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
