//! Declared resources, resolved into what the lifecycle operator needs:
//! a selector, a container blueprint, a drift check and provisioning steps.

mod custom;
mod database;
mod mount;
mod proxy;
mod service;
mod site;

pub use custom::CustomUnit;
pub use database::DatabaseUnit;
pub use mount::MountUnit;
pub use proxy::ProxyUnit;
pub use service::ServiceUnit;
pub use site::{SiteUnit, nginx_config};

use crate::config::EngineConfig;
use crate::drift::Drift;
use crate::error::Result;
use crate::identity::{Kind, Selector};
use crate::spec::{
    BlackfireSpec, CustomContainerSpec, DatabaseSpec, MountSpec, ProxySpec, Service, SiteSpec,
};
use dockerkit::{ContainerBlueprint, ExecCommand, PortBinding, RuntimeContainer};
use std::fmt;

/// One container the engine keeps converged.
pub trait Unit: fmt::Debug {
    fn kind(&self) -> Kind;

    /// Natural key, as reported in progress and errors
    fn identity(&self) -> String;

    fn selector(&self) -> Selector;

    /// Everything needed to create the container on `network`
    fn blueprint(&self, network: &str) -> ContainerBlueprint;

    /// Pure drift check against a freshly inspected container
    fn matches(&self, container: &RuntimeContainer) -> Drift;

    /// Managed containers under another identity that must be gone before
    /// create, e.g. the previous engine still publishing a database port
    fn displaces(&self) -> Option<Selector> {
        None
    }

    /// Named volumes that must exist before create
    fn volumes(&self) -> Vec<String> {
        Vec::new()
    }

    /// One-shot commands run after the first start
    fn provisioning(&self) -> Vec<ExecCommand> {
        Vec::new()
    }
}

/// A declared resource before any filesystem input has been read.
///
/// [`Declared::prepare`] is called on every detect/apply so env files and
/// site directories are always read fresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declared {
    Proxy(ProxySpec),
    Database(DatabaseSpec),
    Service {
        service: Service,
        blackfire: BlackfireSpec,
    },
    Custom(CustomContainerSpec),
    Site {
        site: SiteSpec,
        profiler: Option<BlackfireSpec>,
    },
    Mount(MountSpec),
}

impl Declared {
    pub fn kind(&self) -> Kind {
        match self {
            Self::Proxy(_) => Kind::Proxy,
            Self::Database(_) => Kind::Database,
            Self::Service { .. } => Kind::Service,
            Self::Custom(_) => Kind::Custom,
            Self::Site { .. } => Kind::Site,
            Self::Mount(_) => Kind::Mount,
        }
    }

    pub fn identity(&self) -> String {
        match self {
            Self::Proxy(_) => "proxy".to_string(),
            Self::Database(db) => db.identity(),
            Self::Service { service, .. } => service.name().to_string(),
            Self::Custom(spec) => spec.name.clone(),
            Self::Site { site, .. } => site.hostname.clone(),
            Self::Mount(mount) => mount.path.display().to_string(),
        }
    }

    /// Read any filesystem input and resolve images.
    pub fn prepare(&self, config: &EngineConfig) -> Result<Box<dyn Unit>> {
        Ok(match self {
            Self::Proxy(spec) => Box::new(ProxyUnit::new(spec, config)),
            Self::Database(db) => Box::new(DatabaseUnit::new(db.clone())),
            Self::Service { service, blackfire } => {
                Box::new(ServiceUnit::new(*service, blackfire.clone()))
            }
            Self::Custom(spec) => Box::new(CustomUnit::prepare(spec.clone())?),
            Self::Site { site, profiler } => {
                Box::new(SiteUnit::prepare(site.clone(), profiler.clone(), config)?)
            }
            Self::Mount(mount) => Box::new(MountUnit::new(mount.clone(), config)),
        })
    }
}

/// Parse `host:container` strings already checked by validation.
fn parse_ports(ports: &[String]) -> Vec<PortBinding> {
    let mut parsed: Vec<PortBinding> = ports.iter().filter_map(|p| PortBinding::parse(p)).collect();
    parsed.sort();
    parsed
}

fn env_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, String)>) -> Vec<(String, String)> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
