use super::Unit;
use crate::drift::{self, Drift};
use crate::identity::{Kind, Selector};
use crate::spec::{BlackfireSpec, Service};
use dockerkit::{ContainerBlueprint, MountPoint, PortBinding, RuntimeContainer};

#[derive(Debug)]
pub struct ServiceUnit {
    service: Service,
    blackfire: BlackfireSpec,
}

impl ServiceUnit {
    pub fn new(service: Service, blackfire: BlackfireSpec) -> Self {
        Self { service, blackfire }
    }

    pub fn container_name(service: Service) -> String {
        format!("berth-{service}")
    }

    fn image(&self) -> &'static str {
        match self.service {
            Service::Blackfire => "docker.io/blackfire/blackfire:2",
            Service::Dynamodb => "docker.io/amazon/dynamodb-local:latest",
            Service::Mailhog => "docker.io/mailhog/mailhog:latest",
            Service::Minio => "docker.io/minio/minio:latest",
            Service::Redis => "docker.io/library/redis:latest",
        }
    }

    fn ports(&self) -> Vec<PortBinding> {
        let ports: &[u16] = match self.service {
            Service::Blackfire => &[8707],
            Service::Dynamodb => &[8000],
            Service::Mailhog => &[1025, 8025],
            Service::Minio => &[9000, 9001],
            Service::Redis => &[6379],
        };
        ports.iter().map(|p| PortBinding::new(*p, *p)).collect()
    }

    /// Variables whose values are part of the declaration
    fn required_env(&self) -> Vec<(String, String)> {
        match self.service {
            Service::Blackfire => vec![
                ("BLACKFIRE_SERVER_ID".to_string(), self.blackfire.server_id.clone()),
                (
                    "BLACKFIRE_SERVER_TOKEN".to_string(),
                    self.blackfire.server_token.clone(),
                ),
            ],
            _ => Vec::new(),
        }
    }
}

impl Unit for ServiceUnit {
    fn kind(&self) -> Kind {
        Kind::Service
    }

    fn identity(&self) -> String {
        self.service.name().to_string()
    }

    fn selector(&self) -> Selector {
        Selector::service(self.service)
    }

    fn blueprint(&self, network: &str) -> ContainerBlueprint {
        let mut env = self.required_env();
        let mut mounts = Vec::new();
        let mut command = Vec::new();
        if self.service == Service::Minio {
            env.push(("MINIO_ROOT_USER".to_string(), "berth".to_string()));
            env.push(("MINIO_ROOT_PASSWORD".to_string(), "berthsecret".to_string()));
            mounts.push(MountPoint::volume("berth-minio", "/data"));
            command = ["server", "/data", "--console-address", ":9001"]
                .map(str::to_string)
                .to_vec();
        }

        ContainerBlueprint {
            name: Self::container_name(self.service),
            image: self.image().to_string(),
            labels: self.selector().labels().clone(),
            env,
            mounts,
            ports: self.ports(),
            network: Some(network.to_string()),
            network_aliases: vec![self.service.name().to_string()],
            command,
        }
    }

    fn matches(&self, container: &RuntimeContainer) -> Drift {
        drift::infra::service_matches(self.image(), &self.required_env(), container)
    }

    fn volumes(&self) -> Vec<String> {
        match self.service {
            Service::Minio => vec!["berth-minio".to_string()],
            _ => Vec::new(),
        }
    }
}
