use super::{Unit, env_pairs};
use crate::config::{EngineConfig, SITE_UPSTREAM_PORT};
use crate::drift::Drift;
use crate::drift::site::{self as site_drift, SiteInputs};
use crate::error::{Error, Result};
use crate::identity::{EXTENSIONS, Kind, Selector, WEBROOT};
use crate::spec::{BlackfireSpec, DEFAULT_WEBROOT, SiteSpec};
use dockerkit::{ContainerBlueprint, ExecCommand, MountPoint, RuntimeContainer};
use std::fs;

const APP_ROOT: &str = "/app";
const NGINX_CONF: &str = "/etc/nginx/conf.d/default.conf";

#[derive(Debug)]
pub struct SiteUnit {
    site: SiteSpec,
    inputs: SiteInputs,
}

impl SiteUnit {
    /// Lists the site directory when excludes are configured.
    pub fn prepare(
        site: SiteSpec,
        profiler: Option<BlackfireSpec>,
        config: &EngineConfig,
    ) -> Result<Self> {
        let mounted_entries = if site.excludes.is_empty() {
            None
        } else {
            Some(mounted_entries(&site)?)
        };
        let inputs = SiteInputs {
            image: config.images.site_image(&site.php_version),
            profiler,
            mounted_entries,
        };
        Ok(Self { site, inputs })
    }
}

fn mounted_entries(site: &SiteSpec) -> Result<Vec<String>> {
    let read_error = |source| Error::ReadSiteDir {
        path: site.path.clone(),
        source,
    };
    let mut entries = Vec::new();
    for entry in fs::read_dir(&site.path).map_err(read_error)? {
        let name = entry.map_err(read_error)?.file_name().to_string_lossy().into_owned();
        if !site.excludes.contains(&name) {
            entries.push(name);
        }
    }
    entries.sort();
    Ok(entries)
}

impl Unit for SiteUnit {
    fn kind(&self) -> Kind {
        Kind::Site
    }

    fn identity(&self) -> String {
        self.site.hostname.clone()
    }

    fn selector(&self) -> Selector {
        Selector::site(&self.site.hostname)
    }

    fn blueprint(&self, network: &str) -> ContainerBlueprint {
        let mut labels = self.selector().labels().clone();
        labels.insert(WEBROOT.to_string(), self.site.webroot.clone());
        labels.insert(EXTENSIONS.to_string(), self.site.extensions.join(","));

        let mut env = env_pairs(self.site.php.environment());
        env.push((
            "XDEBUG_MODE".to_string(),
            site_drift::xdebug_mode(self.site.xdebug).to_string(),
        ));
        env.extend(env_pairs(site_drift::profiler_env(self.inputs.profiler.as_ref())));

        let mounts = match &self.inputs.mounted_entries {
            None => vec![MountPoint::bind(
                self.site.path.to_string_lossy(),
                APP_ROOT,
            )],
            Some(entries) => entries
                .iter()
                .map(|entry| {
                    MountPoint::bind(
                        self.site.path.join(entry).to_string_lossy(),
                        format!("{APP_ROOT}/{entry}"),
                    )
                })
                .collect(),
        };

        ContainerBlueprint {
            name: self.site.hostname.clone(),
            image: self.inputs.image.clone(),
            labels,
            env,
            mounts,
            ports: Vec::new(),
            network: Some(network.to_string()),
            network_aliases: self.site.hostnames().map(str::to_string).collect(),
            command: Vec::new(),
        }
    }

    fn matches(&self, container: &RuntimeContainer) -> Drift {
        site_drift::matches(&self.site, &self.inputs, container)
    }

    fn provisioning(&self) -> Vec<ExecCommand> {
        let mut commands = Vec::new();
        if self.site.webroot != DEFAULT_WEBROOT {
            let conf = nginx_config(&self.site.webroot);
            // `$1` carries the config; the script text is fixed
            commands.push(
                ExecCommand::new([
                    "sh".to_string(),
                    "-c".to_string(),
                    format!("printf '%s\\n' \"$1\" > {NGINX_CONF}"),
                    "sh".to_string(),
                    conf,
                ])
                .as_root(),
            );
            commands.push(ExecCommand::new(["nginx", "-s", "reload"]).as_root());
        }
        for extension in &self.site.extensions {
            commands.push(ExecCommand::new(["install-php-extensions", extension.as_str()]).as_root());
        }
        commands
    }
}

/// Server block serving `/app/<webroot>` through php-fpm.
pub fn nginx_config(webroot: &str) -> String {
    format!(
        r#"server {{
    listen {SITE_UPSTREAM_PORT} default_server;
    root {APP_ROOT}/{webroot};
    index index.php index.html;
    charset utf-8;
    client_max_body_size 0;

    location / {{
        try_files $uri/index.html $uri $uri/ /index.php?$query_string;
    }}

    location ~ \.php$ {{
        try_files $uri =404;
        fastcgi_split_path_info ^(.+\.php)(/.+)$;
        fastcgi_pass 127.0.0.1:9000;
        fastcgi_index index.php;
        include fastcgi_params;
        fastcgi_param SCRIPT_FILENAME $realpath_root$fastcgi_script_name;
        fastcgi_param DOCUMENT_ROOT $realpath_root;
        fastcgi_param HTTP_PROXY "";
    }}
}}"#
    )
}
