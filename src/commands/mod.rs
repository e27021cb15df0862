//! Command implementations

pub mod apply;
pub mod diff;
pub mod status;

use anyhow::{Context as AnyhowContext, Result};
use dockerkit::DockerCli;
use fleet::{Engine, EngineConfig, EnvironmentSpec, HttpRoutingClient};
use std::sync::Arc;

use crate::Context;
use crate::config;
use crate::hosts::FileHosts;
use crate::paths;

/// Engine settings for this invocation: flags first, then the spec file.
pub fn engine_config(ctx: &Context, spec: &EnvironmentSpec) -> EngineConfig {
    let mut config = EngineConfig::new(ctx.development);
    if let Some(network) = &spec.network {
        config = config.with_network(network.clone());
    }
    if let Some(endpoint) = &ctx.proxy_endpoint {
        config = config.with_proxy_endpoint(endpoint.clone());
    }
    config
}

/// Load the specification and wire an engine against the local docker.
pub fn load(ctx: &Context) -> Result<(EnvironmentSpec, Engine)> {
    let path = config::spec_path(ctx.file.as_deref())?;
    let spec = config::load_spec(&path)?;
    let config = engine_config(ctx, &spec);
    log::debug!(
        "Network '{}', proxy at {}{}",
        config.network,
        config.proxy_endpoint,
        if config.development { " (development images)" } else { "" }
    );

    let docker = Arc::new(DockerCli::new().context("Docker is not available")?);
    let router = Arc::new(HttpRoutingClient::new(config.proxy_endpoint.clone()));
    let engine = Engine::new(docker.clone(), docker, router, config)
        .with_hosts(Arc::new(FileHosts::new(paths::hosts_file())));
    Ok((spec, engine))
}
