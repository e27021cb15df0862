use super::{Unit, parse_ports};
use crate::drift::{self, Drift};
use crate::envfile;
use crate::error::Result;
use crate::identity::{ENV_KEYS, Kind, Selector};
use crate::spec::{CustomContainerSpec, VolumeSource, parse_volume};
use dockerkit::{ContainerBlueprint, MountPoint, RuntimeContainer};

#[derive(Debug)]
pub struct CustomUnit {
    spec: CustomContainerSpec,
    /// Env file contents at preparation time
    env: Vec<(String, String)>,
}

impl CustomUnit {
    /// Reads the env file, if one is referenced.
    pub fn prepare(spec: CustomContainerSpec) -> Result<Self> {
        let env = match &spec.env_file {
            Some(path) => envfile::read(path)?,
            None => Vec::new(),
        };
        Ok(Self { spec, env })
    }

    fn parsed_volumes(&self) -> impl Iterator<Item = (VolumeSource, String)> + '_ {
        self.spec
            .volumes
            .iter()
            .filter_map(|raw| parse_volume(raw).ok())
    }
}

impl Unit for CustomUnit {
    fn kind(&self) -> Kind {
        Kind::Custom
    }

    fn identity(&self) -> String {
        self.spec.name.clone()
    }

    fn selector(&self) -> Selector {
        Selector::custom(&self.spec.name)
    }

    fn blueprint(&self, network: &str) -> ContainerBlueprint {
        let mounts = self
            .parsed_volumes()
            .map(|(source, target)| match source {
                VolumeSource::Named(name) => MountPoint::volume(name, target),
                VolumeSource::Host(path) => MountPoint::bind(path.to_string_lossy(), target),
            })
            .collect();

        let mut labels = self.selector().labels().clone();
        labels.insert(ENV_KEYS.to_string(), drift::custom::env_keys(&self.env));

        ContainerBlueprint {
            name: self.spec.name.clone(),
            image: self.spec.image_ref(),
            labels,
            env: self.env.clone(),
            mounts,
            ports: parse_ports(&self.spec.ports),
            network: Some(network.to_string()),
            network_aliases: vec![self.spec.name.clone()],
            command: Vec::new(),
        }
    }

    fn matches(&self, container: &RuntimeContainer) -> Drift {
        drift::custom::matches(&self.spec, &self.env, container)
    }

    fn volumes(&self) -> Vec<String> {
        self.parsed_volumes()
            .filter_map(|(source, _)| match source {
                VolumeSource::Named(name) => Some(name),
                VolumeSource::Host(_) => None,
            })
            .collect()
    }
}
