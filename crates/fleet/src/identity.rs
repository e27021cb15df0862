//! Runtime identity: the label vocabulary and typed selectors.
//!
//! Labels are the only record of what the engine manages. A [`Selector`]
//! is the minimal label set that finds one declared resource's container.

use crate::spec::{DatabaseSpec, Service};
use dockerkit::Labels;
use std::fmt;
use std::path::Path;

pub const PREFIX: &str = "berth.";
pub const MANAGED: &str = "berth.managed";
pub const KIND: &str = "berth.kind";
pub const HOST: &str = "berth.host";
pub const CONTAINER: &str = "berth.container";
/// Env-file keys a custom container was created with
pub const ENV_KEYS: &str = "berth.env-keys";
pub const DATABASE_ENGINE: &str = "berth.database.engine";
pub const DATABASE_VERSION: &str = "berth.database.version";
pub const DATABASE_COMPATIBILITY: &str = "berth.database.compatibility";
pub const DATABASE_PORT: &str = "berth.database.port";
pub const WEBROOT: &str = "berth.webroot";
pub const EXTENSIONS: &str = "berth.extensions";
pub const PATH: &str = "berth.path";
pub const SERVICE: &str = "berth.service";

/// Category of managed resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Site,
    Database,
    Custom,
    Mount,
    Proxy,
    Service,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Site => "site",
            Self::Database => "database",
            Self::Custom => "custom",
            Self::Mount => "mount",
            Self::Proxy => "proxy",
            Self::Service => "service",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labels every managed object carries
pub fn managed_labels() -> Labels {
    Labels::from([(MANAGED.to_string(), "true".to_string())])
}

/// Label filter that locates one resource's runtime counterpart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    kind: Kind,
    labels: Labels,
}

impl Selector {
    fn new<const N: usize>(kind: Kind, pairs: [(&str, String); N]) -> Self {
        let mut labels = managed_labels();
        labels.insert(KIND.to_string(), kind.as_str().to_string());
        for (key, value) in pairs {
            labels.insert(key.to_string(), value);
        }
        Self { kind, labels }
    }

    pub fn site(hostname: &str) -> Self {
        Self::new(Kind::Site, [(HOST, hostname.to_string())])
    }

    pub fn database(db: &DatabaseSpec) -> Self {
        Self::new(
            Kind::Database,
            [
                (DATABASE_ENGINE, db.engine.to_string()),
                (DATABASE_VERSION, db.version.clone()),
                (DATABASE_PORT, db.port.to_string()),
            ],
        )
    }

    /// Any managed database publishing host port `port`
    pub fn database_port(port: u16) -> Self {
        Self::new(Kind::Database, [(DATABASE_PORT, port.to_string())])
    }

    pub fn custom(name: &str) -> Self {
        Self::new(Kind::Custom, [(CONTAINER, name.to_string())])
    }

    pub fn mount(path: &Path) -> Self {
        Self::new(Kind::Mount, [(PATH, path.to_string_lossy().into_owned())])
    }

    pub fn proxy() -> Self {
        Self::new(Kind::Proxy, [])
    }

    pub fn service(service: Service) -> Self {
        Self::new(Kind::Service, [(SERVICE, service.name().to_string())])
    }

    /// Every managed container of one kind
    pub fn all_of(kind: Kind) -> Self {
        Self::new(kind, [])
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .labels
            .iter()
            .filter(|(k, _)| k.as_str() != MANAGED && k.as_str() != KIND)
            .map(|(k, v)| format!("{}={v}", k.trim_start_matches(PREFIX)))
            .collect();
        write!(f, "{}[{}]", self.kind, pairs.join(","))
    }
}

/// Recover a resource's identity from its container labels.
///
/// Returns the same string the declared resource reports as its id, so
/// declared and running sets can be compared.
pub fn identity_from_labels(kind: Kind, labels: &Labels) -> Option<String> {
    let get = |key: &str| labels.get(key).cloned();
    match kind {
        Kind::Site => get(HOST),
        Kind::Custom => get(CONTAINER),
        Kind::Mount => get(PATH),
        Kind::Service => get(SERVICE),
        Kind::Proxy => Some("proxy".to_string()),
        Kind::Database => Some(format!(
            "{}-{}-{}",
            get(DATABASE_ENGINE)?,
            get(DATABASE_VERSION)?,
            get(DATABASE_PORT)?
        )),
    }
}
