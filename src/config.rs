//! Specification loading: `berth.toml` → validated [`EnvironmentSpec`].

use anyhow::{Context, Result};
use fleet::EnvironmentSpec;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

/// Where the specification comes from: `--file` or the default location.
pub fn spec_path(file: Option<&Path>) -> Result<PathBuf> {
    match file {
        Some(path) => Ok(paths::expand(&path.to_string_lossy())),
        None => paths::spec_file(),
    }
}

/// Read, path-resolve and validate the specification at `path`.
///
/// Relative paths inside the file are resolved against the file's directory.
pub fn load_spec(path: &Path) -> Result<EnvironmentSpec> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read specification: {}", path.display()))?;
    let mut spec: EnvironmentSpec = toml::from_str(&content)
        .with_context(|| format!("Invalid TOML in {}", path.display()))?;

    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    spec.resolve_paths(&base)
        .with_context(|| format!("Invalid path in {}", path.display()))?;
    spec.validate()
        .with_context(|| format!("Invalid specification: {}", path.display()))?;

    log::debug!(
        "Loaded {} site(s), {} database(s), {} container(s) from {}",
        spec.sites.len(),
        spec.databases.len(),
        spec.containers.len(),
        path.display()
    );
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet::DatabaseEngine;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
network = "devnet"

[[sites]]
hostname = "demo.test"
aliases = ["www.demo.test"]
path = "demo"
php_version = "7.4"
extensions = ["gd"]

[sites.php]
memory_limit = "1G"

[[sites]]
hostname = "old.test"
path = "/srv/old"
disabled = true

[[databases]]
engine = "mariadb"
version = "10.11"
port = 3306

[[containers]]
name = "elastic"
image = "elasticsearch"
tag = "8.11.0"
ports = ["9200:9200"]
volumes = ["esdata:/usr/share/elasticsearch/data"]

[services]
mailhog = true
"#;

    fn write(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("berth.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_sample() {
        let dir = TempDir::new().unwrap();
        let spec = load_spec(&write(&dir, SAMPLE)).unwrap();

        assert_eq!(spec.network.as_deref(), Some("devnet"));
        assert_eq!(spec.sites.len(), 2);
        assert_eq!(spec.sites[0].php_version, "7.4");
        assert_eq!(spec.sites[0].webroot, "web");
        assert_eq!(spec.sites[0].php.memory_limit.as_deref(), Some("1G"));
        assert!(spec.sites[1].disabled);
        assert_eq!(spec.databases[0].engine, DatabaseEngine::Mariadb);
        assert_eq!(spec.containers[0].image_ref(), "elasticsearch:8.11.0");
        assert!(spec.services.mailhog);
        assert!(!spec.services.redis);
    }

    #[test]
    fn test_relative_site_path_resolves_against_file() {
        let dir = TempDir::new().unwrap();
        let spec = load_spec(&write(&dir, SAMPLE)).unwrap();
        assert_eq!(spec.sites[0].path, dir.path().join("demo"));
    }

    #[test]
    fn test_duplicate_hostname_rejected() {
        let dir = TempDir::new().unwrap();
        let content = r#"
[[sites]]
hostname = "demo.test"
path = "/srv/a"

[[sites]]
hostname = "demo.test"
path = "/srv/b"
"#;
        let err = load_spec(&write(&dir, content)).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate site hostname 'demo.test'"));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_spec(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("Could not read specification"));
    }

    #[test]
    fn test_unknown_engine_rejected() {
        let dir = TempDir::new().unwrap();
        let content = r#"
[[databases]]
engine = "oracle"
version = "23"
port = 1521
"#;
        assert!(load_spec(&write(&dir, content)).is_err());
    }

    #[test]
    fn test_explicit_file_wins() {
        let path = spec_path(Some(Path::new("/etc/berth/dev.toml"))).unwrap();
        assert_eq!(path, PathBuf::from("/etc/berth/dev.toml"));
    }
}
