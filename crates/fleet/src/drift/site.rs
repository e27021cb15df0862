//! Site drift rules.

use super::{Drift, ensure_eq, ensure_label};
use crate::identity::{EXTENSIONS, HOST, WEBROOT};
use crate::spec::{BlackfireSpec, PhpSettings, SiteSpec};
use dockerkit::RuntimeContainer;
use std::path::Path;

/// Values a site's container is derived from besides the [`SiteSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteInputs {
    /// `<site family>:<php_version>`
    pub image: String,
    /// Profiler credentials when the profiler service is enabled
    pub profiler: Option<BlackfireSpec>,
    /// Non-excluded top-level entries of the site path, when excludes are set
    pub mounted_entries: Option<Vec<String>>,
}

pub fn xdebug_mode(enabled: bool) -> &'static str {
    if enabled { "develop,debug" } else { "off" }
}

/// Profiler credential variables, empty when the profiler is off
pub fn profiler_env(profiler: Option<&BlackfireSpec>) -> [(&'static str, String); 2] {
    match profiler {
        Some(bf) => [
            ("BLACKFIRE_SERVER_ID", bf.server_id.clone()),
            ("BLACKFIRE_SERVER_TOKEN", bf.server_token.clone()),
        ],
        None => [
            ("BLACKFIRE_SERVER_ID", String::new()),
            ("BLACKFIRE_SERVER_TOKEN", String::new()),
        ],
    }
}

pub fn matches(site: &SiteSpec, inputs: &SiteInputs, container: &RuntimeContainer) -> Drift {
    check(site, inputs, container).into()
}

fn check(site: &SiteSpec, inputs: &SiteInputs, container: &RuntimeContainer) -> Result<(), String> {
    ensure_eq("image", &container.image, &inputs.image)?;
    ensure_label(container, HOST, &site.hostname)?;
    ensure_label(container, WEBROOT, &site.webroot)?;
    ensure_label(container, EXTENSIONS, &site.extensions.join(","))?;

    match &inputs.mounted_entries {
        None => {
            if !container
                .bind_mounts()
                .any(|m| Path::new(&m.source) == site.path)
            {
                return Err(format!("{} is not mounted", site.path.display()));
            }
        }
        Some(entries) => {
            let count = container.bind_mounts().count();
            if count != entries.len() {
                return Err(format!(
                    "{count} bind mounts, want {} (excludes changed?)",
                    entries.len()
                ));
            }
        }
    }

    let defaults = PhpSettings::default().environment();
    for ((key, expected), (_, default)) in site.php.environment().iter().zip(&defaults) {
        let actual = container
            .env_var(key)
            .filter(|v| !v.is_empty())
            .unwrap_or(default);
        ensure_eq(key, actual, expected)?;
    }

    let actual = container
        .env_var("XDEBUG_MODE")
        .filter(|v| !v.is_empty())
        .unwrap_or(xdebug_mode(false));
    ensure_eq("XDEBUG_MODE", actual, xdebug_mode(site.xdebug))?;

    for (key, expected) in profiler_env(inputs.profiler.as_ref()) {
        ensure_eq(key, container.env_var(key).unwrap_or_default(), &expected)?;
    }

    Ok(())
}
