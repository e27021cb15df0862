use super::{Unit, parse_ports};
use crate::config::EngineConfig;
use crate::drift::{self, Drift};
use crate::identity::{Kind, Selector};
use crate::spec::ProxySpec;
use dockerkit::{ContainerBlueprint, PortBinding, RuntimeContainer};

pub const PROXY_CONTAINER: &str = "berth-proxy";

#[derive(Debug)]
pub struct ProxyUnit {
    image: String,
    ports: Vec<PortBinding>,
}

impl ProxyUnit {
    pub fn new(spec: &ProxySpec, config: &EngineConfig) -> Self {
        Self {
            image: spec.image.clone().unwrap_or_else(|| config.images.proxy.clone()),
            ports: parse_ports(&spec.ports),
        }
    }
}

impl Unit for ProxyUnit {
    fn kind(&self) -> Kind {
        Kind::Proxy
    }

    fn identity(&self) -> String {
        "proxy".to_string()
    }

    fn selector(&self) -> Selector {
        Selector::proxy()
    }

    fn blueprint(&self, network: &str) -> ContainerBlueprint {
        ContainerBlueprint {
            name: PROXY_CONTAINER.to_string(),
            image: self.image.clone(),
            labels: self.selector().labels().clone(),
            env: Vec::new(),
            mounts: Vec::new(),
            ports: self.ports.clone(),
            network: Some(network.to_string()),
            network_aliases: vec![PROXY_CONTAINER.to_string()],
            command: Vec::new(),
        }
    }

    fn matches(&self, container: &RuntimeContainer) -> Drift {
        drift::infra::proxy_matches(&self.image, &self.ports, container)
    }
}
