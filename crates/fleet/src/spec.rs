//! Declarative environment specification.
//!
//! An [`EnvironmentSpec`] is loaded once per invocation, path-resolved and
//! validated, then treated as immutable input by the engine.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_PHP_VERSION: &str = "8.2";
pub const DEFAULT_WEBROOT: &str = "web";

/// Root of the declared environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSpec {
    /// Overrides the engine's network name
    pub network: Option<String>,
    pub proxy: ProxySpec,
    pub databases: Vec<DatabaseSpec>,
    pub sites: Vec<SiteSpec>,
    pub containers: Vec<CustomContainerSpec>,
    pub mounts: Vec<MountSpec>,
    pub services: ServicesSpec,
    pub blackfire: BlackfireSpec,
}

/// The shared reverse proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySpec {
    /// Image override; the engine's default is used when unset
    pub image: Option<String>,
    /// Published ports as `host:container`
    pub ports: Vec<String>,
}

impl Default for ProxySpec {
    fn default() -> Self {
        Self {
            image: None,
            ports: vec!["80:80".into(), "443:443".into(), "5000:5000".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSpec {
    pub hostname: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub path: PathBuf,
    #[serde(default = "default_php_version")]
    pub php_version: String,
    #[serde(default = "default_webroot")]
    pub webroot: String,
    #[serde(default)]
    pub php: PhpSettings,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub xdebug: bool,
    #[serde(default)]
    pub disabled: bool,
    /// Top-level entries of `path` that are not mounted
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl SiteSpec {
    pub fn new(hostname: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            hostname: hostname.into(),
            aliases: Vec::new(),
            path: path.into(),
            php_version: default_php_version(),
            webroot: default_webroot(),
            php: PhpSettings::default(),
            extensions: Vec::new(),
            xdebug: false,
            disabled: false,
            excludes: Vec::new(),
        }
    }

    /// Hostname followed by aliases
    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.hostname.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// PHP runtime settings. Unset fields fall back to the image defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhpSettings {
    pub memory_limit: Option<String>,
    pub max_execution_time: Option<u32>,
    pub upload_max_file_size: Option<String>,
    pub max_input_vars: Option<u32>,
    pub post_max_size: Option<String>,
    pub display_errors: Option<bool>,
    pub opcache_enable: Option<bool>,
    pub opcache_revalidate_freq: Option<u32>,
    pub opcache_validate_timestamps: Option<bool>,
}

impl PhpSettings {
    /// Environment variables the site image reads, with defaults filled in.
    pub fn environment(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "PHP_DISPLAY_ERRORS",
                on_off(self.display_errors.unwrap_or(true)).to_string(),
            ),
            (
                "PHP_MEMORY_LIMIT",
                self.memory_limit.clone().unwrap_or_else(|| "512M".into()),
            ),
            (
                "PHP_MAX_EXECUTION_TIME",
                self.max_execution_time.unwrap_or(5000).to_string(),
            ),
            (
                "PHP_UPLOAD_MAX_FILESIZE",
                self.upload_max_file_size
                    .clone()
                    .unwrap_or_else(|| "512M".into()),
            ),
            (
                "PHP_MAX_INPUT_VARS",
                self.max_input_vars.unwrap_or(5000).to_string(),
            ),
            (
                "PHP_POST_MAX_SIZE",
                self.post_max_size.clone().unwrap_or_else(|| "512M".into()),
            ),
            (
                "PHP_OPCACHE_ENABLE",
                flag(self.opcache_enable.unwrap_or(false)).to_string(),
            ),
            (
                "PHP_OPCACHE_REVALIDATE_FREQ",
                self.opcache_revalidate_freq.unwrap_or(0).to_string(),
            ),
            (
                "PHP_OPCACHE_VALIDATE_TIMESTAMPS",
                flag(self.opcache_validate_timestamps.unwrap_or(false)).to_string(),
            ),
        ]
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    Mysql,
    Mariadb,
    Postgres,
}

impl DatabaseEngine {
    /// Client-compatibility class; mariadb speaks the mysql protocol.
    pub fn compatibility(self) -> &'static str {
        match self {
            Self::Mysql | Self::Mariadb => "mysql",
            Self::Postgres => "postgres",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Mariadb => "mariadb",
            Self::Postgres => "postgres",
        }
    }

    /// Port the server listens on inside the container
    pub fn container_port(self) -> u16 {
        match self {
            Self::Mysql | Self::Mariadb => 3306,
            Self::Postgres => 5432,
        }
    }

    /// Where the server keeps its data
    pub fn data_dir(self) -> &'static str {
        match self {
            Self::Mysql | Self::Mariadb => "/var/lib/mysql",
            Self::Postgres => "/var/lib/postgresql/data",
        }
    }
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSpec {
    pub engine: DatabaseEngine,
    pub version: String,
    pub port: u16,
}

impl DatabaseSpec {
    pub fn new(engine: DatabaseEngine, version: impl Into<String>, port: u16) -> Self {
        Self {
            engine,
            version: version.into(),
            port,
        }
    }

    /// `<engine>-<version>-<port>`, also used as the container name
    pub fn identity(&self) -> String {
        format!("{}-{}-{}", self.engine, self.version, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomContainerSpec {
    pub name: String,
    pub image: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    /// `host:container`
    #[serde(default)]
    pub ports: Vec<String>,
    /// `source:target`, where source is a volume name or a host path
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub env_file: Option<PathBuf>,
}

impl CustomContainerSpec {
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }
}

/// Where a custom container volume comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeSource {
    Named(String),
    Host(PathBuf),
}

/// Split `source:target` into its parts.
pub fn parse_volume(raw: &str) -> Result<(VolumeSource, String)> {
    let (source, target) = raw
        .split_once(':')
        .ok_or_else(|| Error::invalid(format!("volume '{raw}' must be source:target")))?;
    if source.is_empty() || !target.starts_with('/') {
        return Err(Error::invalid(format!(
            "volume '{raw}' needs a source and an absolute target"
        )));
    }
    let source = if is_host_path(source) {
        VolumeSource::Host(PathBuf::from(source))
    } else {
        VolumeSource::Named(source.to_string())
    };
    Ok((source, target.to_string()))
}

fn is_host_path(source: &str) -> bool {
    source.starts_with('/') || source.starts_with('~') || source.starts_with('.')
}

/// A webroot is a relative path under the app root that is safe to embed
/// in the generated server config.
fn valid_webroot(webroot: &str) -> bool {
    !webroot.is_empty()
        && !webroot.starts_with('/')
        && webroot.split('/').all(|part| !part.is_empty() && part != "..")
        && webroot
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/'))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    pub path: PathBuf,
    #[serde(default = "default_php_version")]
    pub php_version: String,
}

/// Optional auxiliary services
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesSpec {
    pub blackfire: bool,
    pub dynamodb: bool,
    pub mailhog: bool,
    pub minio: bool,
    pub redis: bool,
}

impl ServicesSpec {
    pub fn is_enabled(&self, service: Service) -> bool {
        match service {
            Service::Blackfire => self.blackfire,
            Service::Dynamodb => self.dynamodb,
            Service::Mailhog => self.mailhog,
            Service::Minio => self.minio,
            Service::Redis => self.redis,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Service {
    Blackfire,
    Dynamodb,
    Mailhog,
    Minio,
    Redis,
}

impl Service {
    pub const ALL: [Service; 5] = [
        Service::Blackfire,
        Service::Dynamodb,
        Service::Mailhog,
        Service::Minio,
        Service::Redis,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Blackfire => "blackfire",
            Self::Dynamodb => "dynamodb",
            Self::Mailhog => "mailhog",
            Self::Minio => "minio",
            Self::Redis => "redis",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Profiler credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackfireSpec {
    pub server_id: String,
    pub server_token: String,
}

fn default_php_version() -> String {
    DEFAULT_PHP_VERSION.to_string()
}

fn default_webroot() -> String {
    DEFAULT_WEBROOT.to_string()
}

fn default_tag() -> String {
    "latest".to_string()
}

impl EnvironmentSpec {
    /// Sites that take part in reconciliation and routing
    pub fn enabled_sites(&self) -> impl Iterator<Item = &SiteSpec> {
        self.sites.iter().filter(|s| !s.disabled)
    }

    /// Blackfire credentials when the profiler is enabled
    pub fn profiler(&self) -> Option<&BlackfireSpec> {
        self.services.blackfire.then_some(&self.blackfire)
    }

    /// Expand `~`/`$VARS` and make every host path absolute and normalized.
    ///
    /// Relative paths are resolved against `base` (the directory the
    /// specification was loaded from).
    pub fn resolve_paths(&mut self, base: &Path) -> Result<()> {
        for site in &mut self.sites {
            site.path = normalize_path(&site.path.to_string_lossy(), base)?;
        }
        for mount in &mut self.mounts {
            mount.path = normalize_path(&mount.path.to_string_lossy(), base)?;
        }
        for container in &mut self.containers {
            if let Some(env_file) = &container.env_file {
                container.env_file = Some(normalize_path(&env_file.to_string_lossy(), base)?);
            }
            for volume in &mut container.volumes {
                if let (VolumeSource::Host(source), target) = parse_volume(volume)? {
                    let source = normalize_path(&source.to_string_lossy(), base)?;
                    *volume = format!("{}:{target}", source.display());
                }
            }
        }
        Ok(())
    }

    /// Check the invariants the engine relies on.
    pub fn validate(&self) -> Result<()> {
        let mut hostnames = BTreeSet::new();
        for site in &self.sites {
            if site.hostname.trim().is_empty() {
                return Err(Error::invalid("site hostname must not be empty"));
            }
            if site.php_version.trim().is_empty() {
                return Err(Error::invalid(format!(
                    "site '{}' has an empty php_version",
                    site.hostname
                )));
            }
            if !valid_webroot(&site.webroot) {
                return Err(Error::invalid(format!(
                    "site '{}' has an invalid webroot '{}'",
                    site.hostname, site.webroot
                )));
            }
            if site.excludes.iter().any(|e| e.contains('/')) {
                return Err(Error::invalid(format!(
                    "site '{}' excludes must be top-level entries",
                    site.hostname
                )));
            }
            if !hostnames.insert(site.hostname.as_str()) {
                return Err(Error::DuplicateSite {
                    hostname: site.hostname.clone(),
                });
            }
        }

        let mut databases = BTreeSet::new();
        let mut ports = BTreeSet::new();
        for db in &self.databases {
            if db.version.trim().is_empty() || db.port == 0 {
                return Err(Error::invalid(format!(
                    "database '{}' needs a version and a port",
                    db.identity()
                )));
            }
            if !databases.insert((db.engine, db.version.as_str(), db.port)) {
                return Err(Error::DuplicateDatabase {
                    identity: db.identity(),
                });
            }
            if !ports.insert(db.port) {
                return Err(Error::DuplicatePort { port: db.port });
            }
        }

        let mut names = BTreeSet::new();
        for container in &self.containers {
            if container.name.trim().is_empty() || container.image.trim().is_empty() {
                return Err(Error::invalid("custom containers need a name and an image"));
            }
            for port in &container.ports {
                if dockerkit::PortBinding::parse(port).is_none() {
                    return Err(Error::invalid(format!(
                        "container '{}' has an invalid port '{port}'",
                        container.name
                    )));
                }
            }
            for volume in &container.volumes {
                parse_volume(volume)?;
            }
            if !names.insert(container.name.as_str()) {
                return Err(Error::DuplicateContainer {
                    name: container.name.clone(),
                });
            }
        }

        let mut paths = BTreeSet::new();
        for mount in &self.mounts {
            if !paths.insert(mount.path.as_path()) {
                return Err(Error::DuplicateMount {
                    path: mount.path.clone(),
                });
            }
        }

        for port in &self.proxy.ports {
            if dockerkit::PortBinding::parse(port).is_none() {
                return Err(Error::invalid(format!("proxy has an invalid port '{port}'")));
            }
        }

        Ok(())
    }
}

/// Expand a path string and normalize it lexically against `base`.
pub fn normalize_path(raw: &str, base: &Path) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| Error::invalid(format!("cannot expand path '{raw}': {e}")))?;
    let path = Path::new(expanded.as_ref());
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_with_sites(hostnames: &[&str]) -> EnvironmentSpec {
        EnvironmentSpec {
            sites: hostnames
                .iter()
                .map(|h| SiteSpec::new(*h, "/srv/app"))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_ok() {
        let mut spec = spec_with_sites(&["a.test", "b.test"]);
        spec.databases = vec![
            DatabaseSpec::new(DatabaseEngine::Mysql, "8.0", 3306),
            DatabaseSpec::new(DatabaseEngine::Postgres, "15", 5432),
        ];
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_validate_duplicate_hostname() {
        let spec = spec_with_sites(&["a.test", "a.test"]);
        assert!(matches!(
            spec.validate(),
            Err(Error::DuplicateSite { hostname }) if hostname == "a.test"
        ));
    }

    #[test]
    fn test_validate_duplicate_database() {
        let spec = EnvironmentSpec {
            databases: vec![
                DatabaseSpec::new(DatabaseEngine::Mysql, "8.0", 3306),
                DatabaseSpec::new(DatabaseEngine::Mysql, "8.0", 3306),
            ],
            ..Default::default()
        };
        assert!(matches!(spec.validate(), Err(Error::DuplicateDatabase { .. })));
    }

    #[test]
    fn test_validate_duplicate_port() {
        let spec = EnvironmentSpec {
            databases: vec![
                DatabaseSpec::new(DatabaseEngine::Mysql, "8.0", 3306),
                DatabaseSpec::new(DatabaseEngine::Mariadb, "10.11", 3306),
            ],
            ..Default::default()
        };
        assert!(matches!(
            spec.validate(),
            Err(Error::DuplicatePort { port: 3306 })
        ));
    }

    #[test]
    fn test_validate_bad_custom_port() {
        let spec = EnvironmentSpec {
            containers: vec![CustomContainerSpec {
                name: "search".into(),
                image: "elasticsearch".into(),
                tag: "8".into(),
                ports: vec!["nine:9200".into()],
                volumes: Vec::new(),
                env_file: None,
            }],
            ..Default::default()
        };
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec { .. })));
    }

    #[test]
    fn test_validate_webroot() {
        let with_webroot = |webroot: &str| {
            let mut spec = spec_with_sites(&["a.test"]);
            spec.sites[0].webroot = webroot.into();
            spec.validate()
        };

        assert!(with_webroot("web").is_ok());
        assert!(with_webroot("public/dist").is_ok());
        assert!(with_webroot("it's").is_err());
        assert!(with_webroot("../etc").is_err());
        assert!(with_webroot("docs/../..").is_err());
        assert!(with_webroot("/var/www").is_err());
        assert!(with_webroot("web;").is_err());
        assert!(with_webroot("").is_err());
        assert!(matches!(with_webroot("it's"), Err(Error::InvalidSpec { .. })));
    }

    #[test]
    fn test_compatibility() {
        assert_eq!(DatabaseEngine::Mysql.compatibility(), "mysql");
        assert_eq!(DatabaseEngine::Mariadb.compatibility(), "mysql");
        assert_eq!(DatabaseEngine::Postgres.compatibility(), "postgres");
    }

    #[test]
    fn test_php_environment_defaults() {
        let env = PhpSettings::default().environment();
        assert!(env.contains(&("PHP_MEMORY_LIMIT", "512M".to_string())));
        assert!(env.contains(&("PHP_DISPLAY_ERRORS", "on".to_string())));
        assert!(env.contains(&("PHP_OPCACHE_ENABLE", "0".to_string())));

        let settings = PhpSettings {
            memory_limit: Some("1G".into()),
            opcache_enable: Some(true),
            ..Default::default()
        };
        let env = settings.environment();
        assert!(env.contains(&("PHP_MEMORY_LIMIT", "1G".to_string())));
        assert!(env.contains(&("PHP_OPCACHE_ENABLE", "1".to_string())));
    }

    #[test]
    fn test_parse_volume() {
        assert_eq!(
            parse_volume("esdata:/usr/share/elasticsearch/data").unwrap(),
            (
                VolumeSource::Named("esdata".into()),
                "/usr/share/elasticsearch/data".into()
            )
        );
        assert_eq!(
            parse_volume("/srv/conf:/etc/app").unwrap().0,
            VolumeSource::Host("/srv/conf".into())
        );
        assert!(parse_volume("nocolon").is_err());
        assert!(parse_volume("data:relative").is_err());
    }

    #[test]
    fn test_normalize_path() {
        let base = Path::new("/home/dev/.berth");
        assert_eq!(
            normalize_path("../code/site/", base).unwrap(),
            PathBuf::from("/home/dev/code/site")
        );
        assert_eq!(
            normalize_path("/srv/./app", base).unwrap(),
            PathBuf::from("/srv/app")
        );
    }

    #[test]
    fn test_resolve_paths() {
        let mut spec = EnvironmentSpec {
            sites: vec![SiteSpec::new("a.test", "sites/a")],
            containers: vec![CustomContainerSpec {
                name: "search".into(),
                image: "elasticsearch".into(),
                tag: "8".into(),
                ports: Vec::new(),
                volumes: vec!["./conf:/etc/es".into(), "esdata:/data".into()],
                env_file: Some("search.env".into()),
            }],
            ..Default::default()
        };
        spec.resolve_paths(Path::new("/cfg")).unwrap();

        assert_eq!(spec.sites[0].path, PathBuf::from("/cfg/sites/a"));
        assert_eq!(spec.containers[0].volumes[0], "/cfg/conf:/etc/es");
        assert_eq!(spec.containers[0].volumes[1], "esdata:/data");
        assert_eq!(
            spec.containers[0].env_file.as_deref(),
            Some(Path::new("/cfg/search.env"))
        );
    }
}
