//! Proxy sync: keep the routing component's hostname table in step with
//! the enabled sites.
//!
//! The table is rebuilt from scratch on every apply and pushed whole; the
//! component replaces its previous table (last write wins).

mod http;

pub use http::HttpRoutingClient;

use crate::config::SITE_UPSTREAM_PORT;
use crate::error::{Error, Result};
use crate::spec::EnvironmentSpec;
use declarative::CancelToken;
use dockerkit::RetryConfig;
use dockerkit::retry::{RetryCallback, RetryError, with_retry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Upstream for one hostname
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub aliases: Vec<String>,
    pub port: u16,
}

/// hostname → route
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    pub routes: BTreeMap<String, Route>,
}

impl RoutingTable {
    /// Routes for every enabled site. Disabled sites are not routed.
    pub fn from_spec(spec: &EnvironmentSpec) -> Self {
        let routes = spec
            .enabled_sites()
            .map(|site| {
                (
                    site.hostname.clone(),
                    Route {
                        aliases: site.aliases.clone(),
                        port: SITE_UPSTREAM_PORT,
                    },
                )
            })
            .collect();
        Self { routes }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// The component's answer to a table push
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApplyReply {
    pub ok: bool,
    #[serde(default)]
    pub message: String,
}

/// Control connection to the routing component.
pub trait RoutingClient: Send + Sync {
    /// Liveness check
    fn ping(&self) -> Result<()>;

    /// Replace the component's entire table.
    fn apply(&self, table: &RoutingTable) -> Result<ApplyReply>;
}

/// Stops the readiness poll when the run is cancelled.
struct CancelAware<'a>(&'a CancelToken);

impl RetryCallback for CancelAware<'_> {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &str, delay: Duration) {
        log::debug!(
            "Proxy not ready ({attempt}/{max_attempts}): {error}; retrying in {:.1}s",
            delay.as_secs_f64()
        );
    }

    fn should_abort(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// Waits for the routing component, then pushes the table.
pub struct ProxySync<'a> {
    client: &'a dyn RoutingClient,
    retry: &'a RetryConfig,
}

impl<'a> ProxySync<'a> {
    pub fn new(client: &'a dyn RoutingClient, retry: &'a RetryConfig) -> Self {
        Self { client, retry }
    }

    /// Poll `ping` with bounded exponential backoff.
    ///
    /// Transport failures are retried; anything else (e.g. an older proxy
    /// that doesn't implement the call) fails immediately.
    pub fn wait_ready(&self, cancel: &CancelToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        with_retry(self.retry, Some(&CancelAware(cancel)), || self.client.ping()).map_err(
            |e| match e {
                RetryError::Aborted { .. } => Error::Cancelled,
                RetryError::Failed { error, attempts } if error.is_retryable() => {
                    log::debug!("Last proxy error: {error}");
                    Error::ProxyUnavailable { attempts }
                }
                RetryError::Failed { error, .. } => error,
            },
        )
    }

    /// Wait for readiness and push `table`.
    pub fn sync(&self, table: &RoutingTable, cancel: &CancelToken) -> Result<()> {
        self.wait_ready(cancel)?;
        log::info!("Pushing {} route(s) to the proxy", table.len());
        let reply = self.client.apply(table)?;
        if !reply.ok {
            return Err(Error::ProxyRejected {
                message: reply.message,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::SiteSpec;
    use crate::testing::FakeRouter;

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay: Duration::from_millis(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_millis(4),
        }
    }

    fn table() -> RoutingTable {
        let mut site = SiteSpec::new("demo.test", "/srv/demo");
        site.aliases = vec!["www.demo.test".into()];
        let mut off = SiteSpec::new("off.test", "/srv/off");
        off.disabled = true;
        RoutingTable::from_spec(&EnvironmentSpec {
            sites: vec![site, off],
            ..Default::default()
        })
    }

    #[test]
    fn test_table_skips_disabled_sites() {
        let table = table();
        assert_eq!(table.len(), 1);
        assert_eq!(table.routes["demo.test"].aliases, vec!["www.demo.test"]);
        assert_eq!(table.routes["demo.test"].port, SITE_UPSTREAM_PORT);
    }

    #[test]
    fn test_sync_pushes_table() {
        let router = FakeRouter::new().failing_pings(2);
        let retry = fast_retry(5);

        ProxySync::new(&router, &retry)
            .sync(&table(), &CancelToken::new())
            .unwrap();

        assert_eq!(router.pings(), 3);
        assert_eq!(router.applied(), vec![table()]);
    }

    #[test]
    fn test_readiness_gives_up() {
        let router = FakeRouter::new().unreachable();
        let retry = fast_retry(4);

        let err = ProxySync::new(&router, &retry)
            .sync(&table(), &CancelToken::new())
            .unwrap_err();

        assert!(matches!(err, Error::ProxyUnavailable { attempts: 4 }));
        assert_eq!(router.pings(), 4);
        assert!(router.applied().is_empty());
    }

    #[test]
    fn test_rejection_surfaces_message() {
        let router = FakeRouter::new().rejecting("bad hostname");
        let retry = fast_retry(1);

        let err = ProxySync::new(&router, &retry)
            .sync(&table(), &CancelToken::new())
            .unwrap_err();

        assert_eq!(err.to_string(), "proxy rejected routes: bad hostname");
    }

    #[test]
    fn test_not_implemented_is_not_retried() {
        let router = FakeRouter::new().not_implemented();
        let retry = fast_retry(5);

        let err = ProxySync::new(&router, &retry)
            .sync(&table(), &CancelToken::new())
            .unwrap_err();

        assert!(matches!(err, Error::ProxyNotImplemented { .. }));
        assert_eq!(router.pings(), 1);
    }

    #[test]
    fn test_cancelled_poll() {
        let router = FakeRouter::new().unreachable();
        let retry = fast_retry(50);
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = ProxySync::new(&router, &retry)
            .sync(&table(), &cancel)
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(router.pings(), 0);
    }
}
