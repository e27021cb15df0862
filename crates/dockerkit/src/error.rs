//! Error types for container runtime operations.
//!
//! Errors are categorized so callers can decide whether an operation is
//! worth retrying (a flaky registry during `docker pull`) or should fail the
//! run immediately (a missing daemon, a name conflict).

use thiserror::Error;

/// Categories of Docker errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Registry or network trouble (transient, retryable)
    Network,
    /// Container, image, network or volume does not exist
    NotFound,
    /// Name or port already taken
    Conflict,
    /// Permission denied talking to the daemon
    Permission,
    /// Docker daemon not running or unreachable
    DaemonUnavailable,
    /// Docker CLI not installed
    DockerNotFound,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Registry or network issue",
            Self::NotFound => "Object not found",
            Self::Conflict => "Name or port conflict",
            Self::Permission => "Permission denied",
            Self::DaemonUnavailable => "Docker daemon unavailable",
            Self::DockerNotFound => "Docker not installed",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your internet connection and try again",
            Self::NotFound => "Verify the image name and tag exist",
            Self::Conflict => "Stop the container or process holding the name or port",
            Self::Permission => "Add your user to the docker group or check socket permissions",
            Self::DaemonUnavailable => "Start Docker Desktop or the docker service",
            Self::DockerNotFound => "Install Docker from https://docs.docker.com/get-docker/",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while driving the Docker CLI.
#[derive(Debug, Error)]
pub enum Error {
    /// Registry/network error (pull timeouts, TLS handshakes, DNS)
    #[error("network error: {message}")]
    Network {
        /// Message reported by docker
        message: String,
    },

    /// Referenced object does not exist
    #[error("not found: {name}")]
    NotFound {
        /// Name or id of the missing object
        name: String,
    },

    /// Name or port already in use
    #[error("conflict: {message}")]
    Conflict {
        /// Message reported by docker
        message: String,
    },

    /// Permission denied
    #[error("permission denied: {message}")]
    Permission {
        /// Message reported by docker
        message: String,
    },

    /// Daemon is not running
    #[error("docker daemon unavailable: {message}")]
    DaemonUnavailable {
        /// Message reported by docker
        message: String,
    },

    /// Docker CLI not found in PATH
    #[error("docker not found. Install it from https://docs.docker.com/get-docker/")]
    DockerNotFound,

    /// Command execution failed
    #[error("command failed: {message}: {stderr}")]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// Output could not be understood
    #[error("unexpected docker output: {0}")]
    UnexpectedOutput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Network { .. } => ErrorCategory::Network,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Conflict { .. } => ErrorCategory::Conflict,
            Error::Permission { .. } => ErrorCategory::Permission,
            Error::DaemonUnavailable { .. } => ErrorCategory::DaemonUnavailable,
            Error::DockerNotFound => ErrorCategory::DockerNotFound,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Create an error from docker command stderr.
    ///
    /// `subject` names the container/image the command was about and is used
    /// for not-found errors.
    pub fn from_docker_output(stderr: &str, subject: Option<&str>) -> Self {
        let stderr_lower = stderr.to_lowercase();

        if stderr_lower.contains("cannot connect to the docker daemon")
            || stderr_lower.contains("is the docker daemon running")
            || stderr_lower.contains("error during connect")
        {
            return Error::DaemonUnavailable {
                message: stderr.trim().to_string(),
            };
        }

        if stderr_lower.contains("permission denied") {
            return Error::Permission {
                message: stderr.trim().to_string(),
            };
        }

        if stderr_lower.contains("tls handshake timeout")
            || stderr_lower.contains("i/o timeout")
            || stderr_lower.contains("connection reset")
            || stderr_lower.contains("connection refused")
            || stderr_lower.contains("temporary failure in name resolution")
            || stderr_lower.contains("net/http: request canceled")
            || stderr_lower.contains("unexpected eof")
        {
            return Error::Network {
                message: stderr.trim().to_string(),
            };
        }

        if stderr_lower.contains("no such container")
            || stderr_lower.contains("no such object")
            || stderr_lower.contains("no such image")
            || stderr_lower.contains("manifest unknown")
            || stderr_lower.contains("pull access denied")
            || (stderr_lower.contains("network") && stderr_lower.contains("not found"))
        {
            return Error::NotFound {
                name: subject.unwrap_or("unknown").to_string(),
            };
        }

        if stderr_lower.contains("conflict")
            || stderr_lower.contains("is already in use")
            || stderr_lower.contains("port is already allocated")
            || stderr_lower.contains("address already in use")
        {
            return Error::Conflict {
                message: stderr.trim().to_string(),
            };
        }

        Error::CommandFailed {
            message: format!(
                "docker command failed{}",
                subject.map(|s| format!(" for {s}")).unwrap_or_default()
            ),
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Result type for container runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(!ErrorCategory::NotFound.is_retryable());
        assert!(!ErrorCategory::DaemonUnavailable.is_retryable());
    }

    #[test]
    fn test_from_docker_output_daemon() {
        let err = Error::from_docker_output(
            "Cannot connect to the Docker daemon at unix:///var/run/docker.sock. Is the docker daemon running?",
            None,
        );
        assert_eq!(err.category(), ErrorCategory::DaemonUnavailable);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_from_docker_output_network() {
        let err = Error::from_docker_output(
            "Error response from daemon: Get \"https://registry-1.docker.io/v2/\": net/http: TLS handshake timeout",
            Some("mysql:8.0"),
        );
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_from_docker_output_not_found() {
        let err = Error::from_docker_output(
            "Error response from daemon: manifest for mysql:99 not found: manifest unknown",
            Some("mysql:99"),
        );
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert_eq!(err.to_string(), "not found: mysql:99");
    }

    #[test]
    fn test_from_docker_output_conflict() {
        let err = Error::from_docker_output(
            "Error response from daemon: Conflict. The container name \"/demo.test\" is already in use",
            Some("demo.test"),
        );
        assert_eq!(err.category(), ErrorCategory::Conflict);
    }

    #[test]
    fn test_from_docker_output_fallback() {
        let err = Error::from_docker_output("something odd", Some("abc"));
        assert_eq!(err.category(), ErrorCategory::Other);
        assert!(err.to_string().contains("for abc"));
    }
}
