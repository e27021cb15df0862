//! Real Docker backend using `docker` CLI commands.

use crate::backend::{ContainerRuntime, ImageSource};
use crate::error::{Error, Result};
use crate::retry::{self, LogCallback, RetryError};
use crate::types::{
    ContainerBlueprint, ContainerSummary, ExecCommand, ExecOutput, Labels, MountKind, MountPoint,
    PortBinding, RetryConfig, RuntimeContainer,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::process::{Command, Output};
use std::time::Duration;

/// Backend that executes real `docker` commands.
pub struct DockerCli {
    /// Path to the docker executable
    docker_path: String,
    /// Retry policy for image pulls
    pull_retry: RetryConfig,
}

impl DockerCli {
    /// Create a new DockerCli.
    ///
    /// Returns an error if docker is not installed.
    pub fn new() -> Result<Self> {
        let docker_path = find_docker()?;
        Ok(Self {
            docker_path,
            pull_retry: RetryConfig::default(),
        })
    }

    /// Run a docker command and return output.
    fn run_docker<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<Output> {
        log::trace!(
            "docker {}",
            args.iter()
                .map(|a| a.as_ref().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(" ")
        );
        Command::new(&self.docker_path)
            .args(args)
            .output()
            .map_err(|e| Error::CommandFailed {
                message: format!("failed to execute docker: {e}"),
                stderr: String::new(),
            })
    }

    /// Run a docker command and check for success.
    fn run_docker_checked<S: AsRef<OsStr>>(
        &self,
        args: &[S],
        subject: Option<&str>,
    ) -> Result<String> {
        let output = self.run_docker(args)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::from_docker_output(&stderr, subject));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl ContainerRuntime for DockerCli {
    fn ping(&self) -> Result<()> {
        self.run_docker_checked(&["version", "--format", "{{.Server.Version}}"], None)?;
        Ok(())
    }

    fn list_containers(&self, filters: &Labels) -> Result<Vec<ContainerSummary>> {
        let mut args = vec![
            "ps".to_string(),
            "--all".to_string(),
            "--no-trunc".to_string(),
            "--format".to_string(),
            "{{json .}}".to_string(),
        ];
        args.extend(filter_args(filters));

        let stdout = self.run_docker_checked(&args, None)?;
        parse_ps_output(&stdout)
    }

    fn inspect_container(&self, id: &str) -> Result<RuntimeContainer> {
        let stdout = self.run_docker_checked(&["container", "inspect", id], Some(id))?;
        parse_inspect_output(&stdout, id)
    }

    fn create_container(&self, blueprint: &ContainerBlueprint) -> Result<String> {
        let args = create_args(blueprint);
        let stdout = self.run_docker_checked(&args, Some(&blueprint.name))?;
        first_line(&stdout)
    }

    fn start_container(&self, id: &str) -> Result<()> {
        self.run_docker_checked(&["start", id], Some(id))?;
        Ok(())
    }

    fn stop_container(&self, id: &str, timeout: Duration) -> Result<()> {
        let secs = timeout.as_secs().to_string();
        self.run_docker_checked(&["stop", "--time", secs.as_str(), id], Some(id))?;
        Ok(())
    }

    fn remove_container(&self, id: &str, force: bool) -> Result<()> {
        let mut args = vec!["rm"];
        if force {
            args.push("--force");
        }
        args.push(id);
        self.run_docker_checked(&args, Some(id))?;
        Ok(())
    }

    fn exec(&self, id: &str, command: &ExecCommand) -> Result<ExecOutput> {
        let args = exec_args(id, command);
        let output = self.run_docker(&args)?;

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = match output.status.code() {
            Some(code) => code,
            None => return Err(Error::Other(format!("exec in {id} terminated by signal"))),
        };

        // 125 means docker itself failed before running the command
        if exit_code == 125 {
            return Err(Error::from_docker_output(&stderr, Some(id)));
        }

        Ok(ExecOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr,
        })
    }

    fn list_networks(&self, filters: &Labels) -> Result<Vec<String>> {
        let mut args = vec![
            "network".to_string(),
            "ls".to_string(),
            "--format".to_string(),
            "{{.Name}}".to_string(),
        ];
        args.extend(filter_args(filters));
        let stdout = self.run_docker_checked(&args, None)?;
        Ok(non_empty_lines(&stdout))
    }

    fn create_network(&self, name: &str, labels: &Labels) -> Result<String> {
        let mut args = vec!["network".to_string(), "create".to_string()];
        args.extend(label_args(labels));
        args.push(name.to_string());
        let stdout = self.run_docker_checked(&args, Some(name))?;
        first_line(&stdout)
    }

    fn list_volumes(&self, filters: &Labels) -> Result<Vec<String>> {
        let mut args = vec![
            "volume".to_string(),
            "ls".to_string(),
            "--format".to_string(),
            "{{.Name}}".to_string(),
        ];
        args.extend(filter_args(filters));
        let stdout = self.run_docker_checked(&args, None)?;
        Ok(non_empty_lines(&stdout))
    }

    fn create_volume(&self, name: &str, labels: &Labels) -> Result<String> {
        let mut args = vec!["volume".to_string(), "create".to_string()];
        args.extend(label_args(labels));
        args.push(name.to_string());
        let stdout = self.run_docker_checked(&args, Some(name))?;
        first_line(&stdout)
    }
}

impl ImageSource for DockerCli {
    fn pull(&self, image: &str) -> Result<()> {
        log::info!("Pulling image {image}");
        retry::with_retry(&self.pull_retry, Some(&LogCallback), || {
            self.run_docker_checked(&["pull", "--quiet", image], Some(image))
        })
        .map(|_| ())
        .map_err(|e| match e {
            RetryError::Failed { error, .. } => error,
            RetryError::Aborted { attempts } => {
                Error::Other(format!("pull of {image} aborted after {attempts} attempts"))
            }
        })
    }
}

/// Find the docker executable path.
fn find_docker() -> Result<String> {
    let paths = [
        "/usr/local/bin/docker",
        "/usr/bin/docker",
        "/opt/homebrew/bin/docker",
        "/Applications/Docker.app/Contents/Resources/bin/docker",
    ];

    for path in &paths {
        if std::path::Path::new(path).exists() {
            return Ok((*path).to_string());
        }
    }

    let output = Command::new("which")
        .arg("docker")
        .output()
        .map_err(|_| Error::DockerNotFound)?;

    if output.status.success() {
        let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !path.is_empty() {
            return Ok(path);
        }
    }

    Err(Error::DockerNotFound)
}

fn filter_args(filters: &Labels) -> Vec<String> {
    filters
        .iter()
        .flat_map(|(k, v)| ["--filter".to_string(), format!("label={k}={v}")])
        .collect()
}

fn label_args(labels: &Labels) -> Vec<String> {
    labels
        .iter()
        .flat_map(|(k, v)| ["--label".to_string(), format!("{k}={v}")])
        .collect()
}

/// Build `docker create` arguments for a blueprint.
fn create_args(blueprint: &ContainerBlueprint) -> Vec<String> {
    let mut args = vec![
        "create".to_string(),
        "--name".to_string(),
        blueprint.name.clone(),
    ];

    args.extend(label_args(&blueprint.labels));

    for (key, value) in &blueprint.env {
        args.push("--env".to_string());
        args.push(format!("{key}={value}"));
    }

    for mount in &blueprint.mounts {
        let kind = match mount.kind {
            MountKind::Volume => "volume",
            _ => "bind",
        };
        args.push("--mount".to_string());
        args.push(format!(
            "type={kind},{},{}",
            mount_field("source", &mount.source),
            mount_field("target", &mount.destination)
        ));
    }

    for port in &blueprint.ports {
        args.push("--publish".to_string());
        args.push(port.to_string());
    }

    if let Some(network) = &blueprint.network {
        args.push("--network".to_string());
        args.push(network.clone());
        for alias in &blueprint.network_aliases {
            args.push("--network-alias".to_string());
            args.push(alias.clone());
        }
    }

    args.push(blueprint.image.clone());
    args.extend(blueprint.command.iter().cloned());
    args
}

/// One `key=value` field of the CSV-encoded `--mount` value.
///
/// Fields holding a comma or a quote are quoted with inner quotes doubled.
fn mount_field(key: &str, value: &str) -> String {
    let field = format!("{key}={value}");
    if field.contains([',', '"']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field
    }
}

fn exec_args(id: &str, command: &ExecCommand) -> Vec<String> {
    let mut args = vec!["exec".to_string()];
    if let Some(user) = &command.user {
        args.push("--user".to_string());
        args.push(user.clone());
    }
    args.push(id.to_string());
    args.extend(command.argv.iter().cloned());
    args
}

fn first_line(stdout: &str) -> Result<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::UnexpectedOutput("empty output".to_string()))
}

fn non_empty_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Output parsing
// =============================================================================

#[derive(Deserialize)]
struct PsRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names", default)]
    names: String,
    #[serde(rename = "Image", default)]
    image: String,
    #[serde(rename = "State", default)]
    state: String,
}

/// Parse `docker ps --format '{{json .}}'` output (one JSON object per line).
fn parse_ps_output(stdout: &str) -> Result<Vec<ContainerSummary>> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| {
            let row: PsRow = serde_json::from_str(line)?;
            Ok(ContainerSummary {
                id: row.id,
                name: row.names,
                image: row.image,
                state: row.state,
            })
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectDoc {
    id: String,
    #[serde(default)]
    name: String,
    config: InspectConfig,
    state: InspectState,
    #[serde(default)]
    mounts: Vec<InspectMount>,
    #[serde(default)]
    host_config: InspectHostConfig,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectConfig {
    #[serde(default)]
    image: String,
    #[serde(default)]
    labels: Option<HashMap<String, String>>,
    #[serde(default)]
    env: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectState {
    #[serde(default)]
    running: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectMount {
    #[serde(rename = "Type")]
    kind: MountKind,
    #[serde(default)]
    source: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    destination: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct InspectHostConfig {
    #[serde(default)]
    port_bindings: Option<HashMap<String, Option<Vec<InspectPortBinding>>>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectPortBinding {
    #[serde(default)]
    host_port: String,
}

/// Parse `docker container inspect` output (a JSON array with one element).
fn parse_inspect_output(stdout: &str, id: &str) -> Result<RuntimeContainer> {
    let docs: Vec<InspectDoc> = serde_json::from_str(stdout)?;
    let doc = docs.into_iter().next().ok_or_else(|| Error::NotFound {
        name: id.to_string(),
    })?;

    let mounts = doc
        .mounts
        .into_iter()
        .map(|m| MountPoint {
            kind: m.kind,
            source: match m.kind {
                MountKind::Volume => m.name.unwrap_or(m.source),
                _ => m.source,
            },
            destination: m.destination,
        })
        .collect();

    let mut ports: Vec<PortBinding> = doc
        .host_config
        .port_bindings
        .unwrap_or_default()
        .into_iter()
        .flat_map(|(container_port, bindings)| {
            let container_port = container_port
                .split('/')
                .next()
                .and_then(|p| p.parse::<u16>().ok());
            bindings
                .unwrap_or_default()
                .into_iter()
                .filter_map(move |b| {
                    Some(PortBinding::new(b.host_port.parse().ok()?, container_port?))
                })
        })
        .collect();
    ports.sort();

    Ok(RuntimeContainer {
        id: doc.id,
        name: doc.name.trim_start_matches('/').to_string(),
        image: doc.config.image,
        labels: doc.config.labels.unwrap_or_default().into_iter().collect(),
        env: doc.config.env.unwrap_or_default(),
        mounts,
        ports,
        running: doc.state.running,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSPECT_FIXTURE: &str = r#"[
      {
        "Id": "4f1c2a",
        "Name": "/demo.test",
        "State": { "Status": "running", "Running": true },
        "Config": {
          "Image": "berth/nginx-php:8.0",
          "Labels": { "berth.kind": "site", "berth.host": "demo.test" },
          "Env": ["PHP_MEMORY_LIMIT=512M", "PATH=/usr/bin"]
        },
        "Mounts": [
          { "Type": "bind", "Source": "/home/me/demo", "Destination": "/app", "RW": true },
          { "Type": "volume", "Name": "demo_data", "Source": "/var/lib/docker/volumes/demo_data/_data", "Destination": "/data" },
          { "Type": "tmpfs", "Source": "", "Destination": "/tmp" }
        ],
        "HostConfig": {
          "PortBindings": {
            "3306/tcp": [ { "HostIp": "", "HostPort": "33060" } ],
            "80/tcp": null
          }
        }
      }
    ]"#;

    #[test]
    fn test_parse_inspect_output() {
        let container = parse_inspect_output(INSPECT_FIXTURE, "4f1c2a").unwrap();

        assert_eq!(container.id, "4f1c2a");
        assert_eq!(container.name, "demo.test");
        assert_eq!(container.image, "berth/nginx-php:8.0");
        assert!(container.running);
        assert_eq!(container.label("berth.host"), Some("demo.test"));
        assert_eq!(container.env_var("PHP_MEMORY_LIMIT"), Some("512M"));
        assert_eq!(container.bind_mounts().count(), 1);
        assert_eq!(container.mounts[1], MountPoint::volume("demo_data", "/data"));
        assert_eq!(container.mounts[2].kind, MountKind::Other);
        assert_eq!(container.ports, vec![PortBinding::new(33060, 3306)]);
    }

    #[test]
    fn test_parse_inspect_output_nulls() {
        let stdout = r#"[{"Id":"x","Name":"/x","State":{"Running":false},
            "Config":{"Image":"redis","Labels":null,"Env":null},"Mounts":[],"HostConfig":{"PortBindings":null}}]"#;
        let container = parse_inspect_output(stdout, "x").unwrap();

        assert!(!container.running);
        assert!(container.labels.is_empty());
        assert!(container.env.is_empty());
        assert!(container.ports.is_empty());
    }

    #[test]
    fn test_parse_inspect_output_empty_array() {
        let err = parse_inspect_output("[]", "gone").unwrap_err();
        assert!(matches!(err, Error::NotFound { name } if name == "gone"));
    }

    #[test]
    fn test_parse_ps_output() {
        let stdout = concat!(
            r#"{"ID":"abc","Names":"demo.test","Image":"berth/nginx-php:8.0","State":"running","Labels":"berth.kind=site"}"#,
            "\n\n",
            r#"{"ID":"def","Names":"mysql-8.0-3306","Image":"mysql:8.0","State":"exited"}"#,
            "\n"
        );
        let rows = parse_ps_output(stdout).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "abc");
        assert_eq!(rows[1].name, "mysql-8.0-3306");
        assert_eq!(rows[1].state, "exited");
    }

    #[test]
    fn test_create_args() {
        let mut labels = Labels::new();
        labels.insert("berth.kind".to_string(), "database".to_string());

        let blueprint = ContainerBlueprint {
            name: "mysql-8.0-3306".to_string(),
            image: "mysql:8.0".to_string(),
            labels,
            env: vec![("MYSQL_ROOT_PASSWORD".to_string(), "berth".to_string())],
            mounts: vec![MountPoint::volume("mysql-8.0-3306", "/var/lib/mysql")],
            ports: vec![PortBinding::new(3306, 3306)],
            network: Some("berth-network".to_string()),
            network_aliases: vec!["mysql-8.0-3306.database.berth".to_string()],
            command: vec![],
        };

        let args = create_args(&blueprint);
        assert_eq!(
            args,
            vec![
                "create",
                "--name",
                "mysql-8.0-3306",
                "--label",
                "berth.kind=database",
                "--env",
                "MYSQL_ROOT_PASSWORD=berth",
                "--mount",
                "type=volume,source=mysql-8.0-3306,target=/var/lib/mysql",
                "--publish",
                "3306:3306",
                "--network",
                "berth-network",
                "--network-alias",
                "mysql-8.0-3306.database.berth",
                "mysql:8.0",
            ]
        );
    }

    #[test]
    fn test_mount_with_comma_is_quoted() {
        let blueprint = ContainerBlueprint {
            name: "a-b.test".to_string(),
            image: "nginx".to_string(),
            mounts: vec![MountPoint::bind("/srv/a,b", "/app")],
            ..Default::default()
        };

        let args = create_args(&blueprint);
        let mount = args
            .iter()
            .position(|a| a == "--mount")
            .map(|i| args[i + 1].as_str());
        assert_eq!(mount, Some(r#"type=bind,"source=/srv/a,b",target=/app"#));
        assert_eq!(mount_field("source", r#"/srv/"x""#), r#""source=/srv/""x""""#);
    }

    #[test]
    fn test_exec_args_with_user() {
        let command = ExecCommand::new(["install-php-extensions", "gd"]).as_root();
        assert_eq!(
            exec_args("abc", &command),
            vec!["exec", "--user", "root", "abc", "install-php-extensions", "gd"]
        );
    }

    #[test]
    fn test_filter_args() {
        let mut filters = Labels::new();
        filters.insert("berth.managed".to_string(), "true".to_string());
        filters.insert("berth.kind".to_string(), "site".to_string());

        assert_eq!(
            filter_args(&filters),
            vec![
                "--filter",
                "label=berth.kind=site",
                "--filter",
                "label=berth.managed=true"
            ]
        );
    }
}
