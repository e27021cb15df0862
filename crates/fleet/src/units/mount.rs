use super::Unit;
use crate::config::EngineConfig;
use crate::drift::{self, Drift};
use crate::identity::{Kind, Selector};
use crate::spec::MountSpec;
use dockerkit::{ContainerBlueprint, MountPoint, RuntimeContainer};

#[derive(Debug)]
pub struct MountUnit {
    mount: MountSpec,
    image: String,
}

impl MountUnit {
    pub fn new(mount: MountSpec, config: &EngineConfig) -> Self {
        let image = config.images.site_image(&mount.php_version);
        Self { mount, image }
    }

    /// `mount-<readable slug>-<hash of the full path>`
    ///
    /// The slug alone is lossy (`/a-b/c` and `/a/b-c` share one), so the
    /// hash keeps names unique per path.
    fn container_name(&self) -> String {
        let slug: Vec<String> = self
            .mount
            .path
            .iter()
            .filter_map(|part| {
                let part = part.to_string_lossy();
                let cleaned: String = part
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '_' { c } else { '-' })
                    .collect();
                let cleaned = cleaned.trim_matches('-').to_string();
                (!cleaned.is_empty()).then_some(cleaned)
            })
            .collect();
        let path = self.mount.path.to_string_lossy();
        let hash = blake3::hash(path.as_bytes()).to_hex();
        format!("mount-{}-{}", slug.join("-"), &hash.as_str()[..8])
    }
}

impl Unit for MountUnit {
    fn kind(&self) -> Kind {
        Kind::Mount
    }

    fn identity(&self) -> String {
        self.mount.path.display().to_string()
    }

    fn selector(&self) -> Selector {
        Selector::mount(&self.mount.path)
    }

    fn blueprint(&self, network: &str) -> ContainerBlueprint {
        let name = self.container_name();
        ContainerBlueprint {
            image: self.image.clone(),
            labels: self.selector().labels().clone(),
            env: Vec::new(),
            mounts: vec![MountPoint::bind(self.mount.path.to_string_lossy(), "/app")],
            ports: Vec::new(),
            network: Some(network.to_string()),
            network_aliases: vec![name.clone()],
            command: Vec::new(),
            name,
        }
    }

    fn matches(&self, container: &RuntimeContainer) -> Drift {
        drift::mount::matches(&self.mount, container)
    }
}
