//! Core types for container runtime operations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Label map used both for filtering and for attaching labels on create.
pub type Labels = BTreeMap<String, String>;

/// How a path is attached to a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountKind {
    /// Host directory bind mount
    Bind,
    /// Named docker volume
    Volume,
    /// Anything else docker reports (tmpfs, npipe, ...)
    #[serde(other)]
    Other,
}

impl fmt::Display for MountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind => write!(f, "bind"),
            Self::Volume => write!(f, "volume"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A mount, either requested on create or reported by inspect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPoint {
    pub kind: MountKind,
    /// Host path for binds, volume name for volumes
    pub source: String,
    /// Path inside the container
    pub destination: String,
}

impl MountPoint {
    /// A host directory bind mount.
    pub fn bind(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            kind: MountKind::Bind,
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// A named volume mount.
    pub fn volume(name: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            kind: MountKind::Volume,
            source: name.into(),
            destination: destination.into(),
        }
    }
}

/// A published port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortBinding {
    pub host_port: u16,
    pub container_port: u16,
}

impl PortBinding {
    pub fn new(host_port: u16, container_port: u16) -> Self {
        Self {
            host_port,
            container_port,
        }
    }

    /// Parse `host:container` or a bare `port` (published on the same number).
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().trim_end_matches("/tcp");
        match value.split_once(':') {
            Some((host, container)) => Some(Self::new(
                host.trim().parse().ok()?,
                container.trim().parse().ok()?,
            )),
            None => {
                let port = value.parse().ok()?;
                Some(Self::new(port, port))
            }
        }
    }
}

impl fmt::Display for PortBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host_port, self.container_port)
    }
}

/// Row returned by `docker ps`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: String,
}

/// Read-only projection of `docker container inspect`.
///
/// Always fetched fresh; callers never hold on to one across mutating calls.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuntimeContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub labels: Labels,
    /// Raw `KEY=VALUE` entries
    pub env: Vec<String>,
    pub mounts: Vec<MountPoint>,
    pub ports: Vec<PortBinding>,
    pub running: bool,
}

impl RuntimeContainer {
    /// Look up a label value.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Look up an environment variable.
    ///
    /// Later entries win, matching how docker resolves duplicates.
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .filter_map(|entry| entry.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Bind mounts only.
    pub fn bind_mounts(&self) -> impl Iterator<Item = &MountPoint> {
        self.mounts.iter().filter(|m| m.kind == MountKind::Bind)
    }

    /// Tag portion of the image reference (`latest` when untagged).
    pub fn image_tag(&self) -> &str {
        image_tag(&self.image)
    }
}

/// Tag portion of an image reference, ignoring registry ports.
pub fn image_tag(image: &str) -> &str {
    let last_segment = image.rsplit('/').next().unwrap_or(image);
    match last_segment.rsplit_once(':') {
        Some((_, tag)) => tag,
        None => "latest",
    }
}

/// Everything needed to create a container.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContainerBlueprint {
    pub name: String,
    pub image: String,
    pub labels: Labels,
    pub env: Vec<(String, String)>,
    pub mounts: Vec<MountPoint>,
    pub ports: Vec<PortBinding>,
    pub network: Option<String>,
    pub network_aliases: Vec<String>,
    /// Overrides the image's default command when non-empty
    pub command: Vec<String>,
}

/// A one-shot command run inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecCommand {
    pub argv: Vec<String>,
    pub user: Option<String>,
}

impl ExecCommand {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            user: None,
        }
    }

    /// Run as root regardless of the image's default user.
    pub fn as_root(mut self) -> Self {
        self.user = Some("root".to_string());
        self
    }
}

impl fmt::Display for ExecCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv.join(" "))
    }
}

/// Result of an exec.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Retry configuration with exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings.
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_factor,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}
