use super::Unit;
use crate::drift::{self, Drift};
use crate::identity::{DATABASE_COMPATIBILITY, Kind, Selector};
use crate::spec::{DatabaseEngine, DatabaseSpec};
use dockerkit::{ContainerBlueprint, ExecCommand, MountPoint, RuntimeContainer};

/// Credentials every local database is created with
pub const DB_USER: &str = "berth";
pub const DB_PASSWORD: &str = "berth";
pub const DB_NAME: &str = "berth";

#[derive(Debug)]
pub struct DatabaseUnit {
    db: DatabaseSpec,
}

impl DatabaseUnit {
    pub fn new(db: DatabaseSpec) -> Self {
        Self { db }
    }

    fn env(&self) -> Vec<(String, String)> {
        let pairs: &[(&str, &str)] = match self.db.engine {
            DatabaseEngine::Mysql | DatabaseEngine::Mariadb => &[
                ("MYSQL_ROOT_PASSWORD", DB_PASSWORD),
                ("MYSQL_DATABASE", DB_NAME),
                ("MYSQL_USER", DB_USER),
                ("MYSQL_PASSWORD", DB_PASSWORD),
            ],
            DatabaseEngine::Postgres => &[
                ("POSTGRES_USER", DB_USER),
                ("POSTGRES_PASSWORD", DB_PASSWORD),
                ("POSTGRES_DB", DB_NAME),
            ],
        };
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }
}

impl Unit for DatabaseUnit {
    fn kind(&self) -> Kind {
        Kind::Database
    }

    fn identity(&self) -> String {
        self.db.identity()
    }

    fn selector(&self) -> Selector {
        Selector::database(&self.db)
    }

    fn blueprint(&self, network: &str) -> ContainerBlueprint {
        let mut labels = self.selector().labels().clone();
        labels.insert(
            DATABASE_COMPATIBILITY.to_string(),
            self.db.engine.compatibility().to_string(),
        );

        let name = self.db.identity();
        ContainerBlueprint {
            image: drift::database::image(&self.db),
            labels,
            env: self.env(),
            mounts: vec![MountPoint::volume(name.clone(), self.db.engine.data_dir())],
            ports: vec![drift::database::port_binding(&self.db)],
            network: Some(network.to_string()),
            network_aliases: vec![name.clone()],
            command: Vec::new(),
            name,
        }
    }

    fn matches(&self, container: &RuntimeContainer) -> Drift {
        drift::database::matches(&self.db, container)
    }

    fn displaces(&self) -> Option<Selector> {
        Some(Selector::database_port(self.db.port))
    }

    fn volumes(&self) -> Vec<String> {
        vec![self.db.identity()]
    }

    fn provisioning(&self) -> Vec<ExecCommand> {
        match self.db.engine {
            DatabaseEngine::Postgres => Vec::new(),
            DatabaseEngine::Mysql | DatabaseEngine::Mariadb => {
                let password = format!("-p{DB_PASSWORD}");
                vec![
                    ExecCommand::new([
                        "mysqladmin",
                        "ping",
                        "-h",
                        "127.0.0.1",
                        "-uroot",
                        password.as_str(),
                        "--wait=30",
                        "--silent",
                    ]),
                    ExecCommand::new([
                        "mysql".to_string(),
                        "-h".to_string(),
                        "127.0.0.1".to_string(),
                        "-uroot".to_string(),
                        password,
                        "-e".to_string(),
                        format!(
                            "GRANT ALL PRIVILEGES ON *.* TO '{DB_USER}'@'%' WITH GRANT OPTION; FLUSH PRIVILEGES;"
                        ),
                    ]),
                ]
            }
        }
    }
}
