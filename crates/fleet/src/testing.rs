//! In-memory runtime and routing fakes that record every call.

use crate::error::{Error, Result};
use crate::proxy::{ApplyReply, RoutingClient, RoutingTable};
use dockerkit::{
    ContainerBlueprint, ContainerRuntime, ContainerSummary, ExecCommand, ExecOutput, ImageSource,
    Labels, RuntimeContainer,
};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Ping,
    List(Labels),
    Inspect(String),
    Pull(String),
    Create {
        name: String,
        image: String,
        labels: Labels,
    },
    Start(String),
    Stop(String),
    Remove(String),
    Exec {
        id: String,
        argv: Vec<String>,
    },
    ListNetworks,
    CreateNetwork(String),
    ListVolumes,
    CreateVolume(String),
}

impl Call {
    /// Calls that change runtime state (pulls and execs included)
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Self::Ping | Self::List(_) | Self::Inspect(_) | Self::ListNetworks | Self::ListVolumes
        )
    }

    /// Container name or id the call targets, for trace assertions
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Create { name, .. } => Some(name),
            Self::Start(id) | Self::Stop(id) | Self::Remove(id) | Self::Inspect(id) => Some(id),
            Self::Exec { id, .. } => Some(id),
            _ => None,
        }
    }
}

#[derive(Default)]
struct State {
    containers: Vec<RuntimeContainer>,
    networks: Vec<(String, Labels)>,
    volumes: Vec<(String, Labels)>,
    calls: Vec<Call>,
    next_id: u32,
    exec_failures: Vec<(String, i32, String)>,
}

/// Recording in-memory [`ContainerRuntime`] + [`ImageSource`].
#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<State>,
}

fn has_labels(labels: &Labels, filters: &Labels) -> bool {
    filters.iter().all(|(k, v)| labels.get(k) == Some(v))
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }

    /// Add a container without recording a call.
    pub fn insert(&self, blueprint: ContainerBlueprint, running: bool) -> String {
        let mut state = self.state();
        state.next_id += 1;
        let id = format!("c{}", state.next_id);
        let mut ports = blueprint.ports;
        ports.sort();
        state.containers.push(RuntimeContainer {
            id: id.clone(),
            name: blueprint.name,
            image: blueprint.image,
            labels: blueprint.labels,
            env: blueprint
                .env
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect(),
            mounts: blueprint.mounts,
            ports,
            running,
        });
        id
    }

    /// Make execs whose program is `program` exit with `code`.
    pub fn fail_exec(&self, program: &str, code: i32, stderr: &str) {
        self.state()
            .exec_failures
            .push((program.to_string(), code, stderr.to_string()));
    }

    pub fn set_running(&self, id: &str, running: bool) {
        if let Some(c) = self.state().containers.iter_mut().find(|c| c.id == id) {
            c.running = running;
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutating).collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn container_count(&self) -> usize {
        self.state().containers.len()
    }

    pub fn container_named(&self, name: &str) -> Option<RuntimeContainer> {
        self.state()
            .containers
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }

    /// Index of the first call matching `predicate`
    pub fn position(&self, predicate: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls().iter().position(predicate)
    }
}

impl ContainerRuntime for FakeRuntime {
    fn ping(&self) -> dockerkit::Result<()> {
        self.record(Call::Ping);
        Ok(())
    }

    fn list_containers(&self, filters: &Labels) -> dockerkit::Result<Vec<ContainerSummary>> {
        self.record(Call::List(filters.clone()));
        Ok(self
            .state()
            .containers
            .iter()
            .filter(|c| has_labels(&c.labels, filters))
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                name: c.name.clone(),
                image: c.image.clone(),
                state: if c.running { "running" } else { "exited" }.to_string(),
            })
            .collect())
    }

    fn inspect_container(&self, id: &str) -> dockerkit::Result<RuntimeContainer> {
        self.record(Call::Inspect(id.to_string()));
        self.state()
            .containers
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| dockerkit::Error::NotFound {
                name: id.to_string(),
            })
    }

    fn create_container(&self, blueprint: &ContainerBlueprint) -> dockerkit::Result<String> {
        self.record(Call::Create {
            name: blueprint.name.clone(),
            image: blueprint.image.clone(),
            labels: blueprint.labels.clone(),
        });
        if self.state().containers.iter().any(|c| c.name == blueprint.name) {
            return Err(dockerkit::Error::Conflict {
                message: format!("name {} is already in use", blueprint.name),
            });
        }
        Ok(self.insert(blueprint.clone(), false))
    }

    fn start_container(&self, id: &str) -> dockerkit::Result<()> {
        self.record(Call::Start(id.to_string()));
        let mut state = self.state();
        let ports: Vec<u16> = state
            .containers
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.ports.iter().map(|p| p.host_port).collect())
            .unwrap_or_default();
        let taken = state
            .containers
            .iter()
            .filter(|c| c.running && c.id != id)
            .flat_map(|c| c.ports.iter().map(|p| p.host_port))
            .find(|port| ports.contains(port));
        if let Some(port) = taken {
            return Err(dockerkit::Error::Conflict {
                message: format!("Bind for 0.0.0.0:{port} failed: port is already allocated"),
            });
        }
        if let Some(c) = state.containers.iter_mut().find(|c| c.id == id) {
            c.running = true;
        }
        Ok(())
    }

    fn stop_container(&self, id: &str, _timeout: Duration) -> dockerkit::Result<()> {
        self.record(Call::Stop(id.to_string()));
        self.set_running(id, false);
        Ok(())
    }

    fn remove_container(&self, id: &str, _force: bool) -> dockerkit::Result<()> {
        self.record(Call::Remove(id.to_string()));
        self.state().containers.retain(|c| c.id != id);
        Ok(())
    }

    fn exec(&self, id: &str, command: &ExecCommand) -> dockerkit::Result<ExecOutput> {
        self.record(Call::Exec {
            id: id.to_string(),
            argv: command.argv.clone(),
        });
        let program = command.argv.first().cloned().unwrap_or_default();
        let failure = self
            .state()
            .exec_failures
            .iter()
            .find(|(p, _, _)| *p == program)
            .cloned();
        Ok(match failure {
            Some((_, exit_code, stderr)) => ExecOutput {
                exit_code,
                stdout: String::new(),
                stderr,
            },
            None => ExecOutput::default(),
        })
    }

    fn list_networks(&self, filters: &Labels) -> dockerkit::Result<Vec<String>> {
        self.record(Call::ListNetworks);
        Ok(self
            .state()
            .networks
            .iter()
            .filter(|(_, labels)| has_labels(labels, filters))
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn create_network(&self, name: &str, labels: &Labels) -> dockerkit::Result<String> {
        self.record(Call::CreateNetwork(name.to_string()));
        self.state()
            .networks
            .push((name.to_string(), labels.clone()));
        Ok(format!("net-{name}"))
    }

    fn list_volumes(&self, filters: &Labels) -> dockerkit::Result<Vec<String>> {
        self.record(Call::ListVolumes);
        Ok(self
            .state()
            .volumes
            .iter()
            .filter(|(_, labels)| has_labels(labels, filters))
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn create_volume(&self, name: &str, labels: &Labels) -> dockerkit::Result<String> {
        self.record(Call::CreateVolume(name.to_string()));
        self.state().volumes.push((name.to_string(), labels.clone()));
        Ok(name.to_string())
    }
}

impl ImageSource for FakeRuntime {
    fn pull(&self, image: &str) -> dockerkit::Result<()> {
        self.record(Call::Pull(image.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PingScript {
    Ok,
    /// Fail this many times, then succeed
    FailTimes(u32),
    Unreachable,
    NotImplemented,
}

struct RouterState {
    ping: PingScript,
    reply: ApplyReply,
    pings: u32,
    applied: Vec<RoutingTable>,
}

/// Scripted [`RoutingClient`].
pub struct FakeRouter {
    state: Mutex<RouterState>,
}

impl FakeRouter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RouterState {
                ping: PingScript::Ok,
                reply: ApplyReply {
                    ok: true,
                    message: String::new(),
                },
                pings: 0,
                applied: Vec::new(),
            }),
        }
    }

    pub fn failing_pings(self, times: u32) -> Self {
        self.state.lock().unwrap().ping = PingScript::FailTimes(times);
        self
    }

    pub fn unreachable(self) -> Self {
        self.state.lock().unwrap().ping = PingScript::Unreachable;
        self
    }

    pub fn not_implemented(self) -> Self {
        self.state.lock().unwrap().ping = PingScript::NotImplemented;
        self
    }

    pub fn rejecting(self, message: &str) -> Self {
        self.state.lock().unwrap().reply = ApplyReply {
            ok: false,
            message: message.to_string(),
        };
        self
    }

    pub fn pings(&self) -> u32 {
        self.state.lock().unwrap().pings
    }

    pub fn applied(&self) -> Vec<RoutingTable> {
        self.state.lock().unwrap().applied.clone()
    }
}

impl RoutingClient for FakeRouter {
    fn ping(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.pings += 1;
        let refused = || Error::ProxyTransport {
            message: "connection refused".to_string(),
        };
        match state.ping {
            PingScript::Ok => Ok(()),
            PingScript::FailTimes(n) if state.pings <= n => Err(refused()),
            PingScript::FailTimes(_) => Ok(()),
            PingScript::Unreachable => Err(refused()),
            PingScript::NotImplemented => Err(Error::ProxyNotImplemented {
                operation: "ping".to_string(),
            }),
        }
    }

    fn apply(&self, table: &RoutingTable) -> Result<ApplyReply> {
        let mut state = self.state.lock().unwrap();
        state.applied.push(table.clone());
        Ok(state.reply.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockerkit::PortBinding;

    #[test]
    fn test_start_rejects_allocated_host_port() {
        let fake = FakeRuntime::new();
        let blueprint = |name: &str| ContainerBlueprint {
            name: name.to_string(),
            image: "mysql:8.0".to_string(),
            ports: vec![PortBinding::new(3306, 3306)],
            ..Default::default()
        };
        let first = fake.create_container(&blueprint("first")).unwrap();
        let second = fake.create_container(&blueprint("second")).unwrap();
        fake.start_container(&first).unwrap();

        let err = fake.start_container(&second).unwrap_err();
        assert!(err.to_string().contains("port is already allocated"));

        fake.stop_container(&first, Duration::from_secs(1)).unwrap();
        fake.start_container(&second).unwrap();
    }
}
