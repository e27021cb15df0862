//! Engine configuration.
//!
//! Everything that used to be a process-wide default (image names, network,
//! timeouts, proxy endpoint) is an explicit field here so independent engines
//! never share mutable state.

use dockerkit::RetryConfig;
use std::time::Duration;

/// Environment variable that switches to locally built images
pub const ENV_DEVELOPMENT: &str = "BERTH_DEVELOPMENT";

/// Port the site image serves HTTP on; the proxy routes to it
pub const SITE_UPSTREAM_PORT: u16 = 8080;

/// Image references the engine creates containers from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSet {
    /// Site and mount image family, tagged with the PHP version
    pub site: String,
    /// Default proxy image
    pub proxy: String,
}

impl ImageSet {
    /// Published images
    pub fn release() -> Self {
        Self {
            site: "docker.io/berthdev/nginx-php".to_string(),
            proxy: "docker.io/berthdev/proxy:latest".to_string(),
        }
    }

    /// Images built locally from the image sources
    pub fn development() -> Self {
        Self {
            site: "berthdev/nginx-php".to_string(),
            proxy: "berthdev/proxy:latest".to_string(),
        }
    }

    /// `<family>:<php_version>`
    pub fn site_image(&self, php_version: &str) -> String {
        format!("{}:{php_version}", self.site)
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub images: ImageSet,
    pub development: bool,
    /// Network every managed container joins
    pub network: String,
    /// Grace period before a stopped container is killed
    pub stop_timeout: Duration,
    /// Base URL of the proxy control API
    pub proxy_endpoint: String,
    /// Readiness poll budget for the proxy
    pub proxy_retry: RetryConfig,
}

impl EngineConfig {
    pub fn new(development: bool) -> Self {
        Self {
            images: if development {
                ImageSet::development()
            } else {
                ImageSet::release()
            },
            development,
            network: "berth".to_string(),
            stop_timeout: Duration::from_secs(10),
            proxy_endpoint: "http://127.0.0.1:5000".to_string(),
            proxy_retry: RetryConfig {
                max_attempts: 10,
                base_delay: Duration::from_millis(500),
                backoff_factor: 2.0,
                max_delay: Duration::from_secs(5),
            },
        }
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    pub fn with_proxy_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.proxy_endpoint = endpoint.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_images() {
        let release = EngineConfig::new(false);
        let dev = EngineConfig::new(true);

        assert_eq!(release.images.site_image("8.0"), "docker.io/berthdev/nginx-php:8.0");
        assert_eq!(dev.images.site_image("8.0"), "berthdev/nginx-php:8.0");
        assert_eq!(release.stop_timeout, Duration::from_secs(10));
    }
}
