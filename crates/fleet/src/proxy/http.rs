//! JSON-over-HTTP client for the proxy control API.

use super::{ApplyReply, RoutingClient, RoutingTable};
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Talks to `POST /v1/ping` and `POST /v1/apply` on the proxy.
pub struct HttpRoutingClient {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// Base URL, e.g. `http://127.0.0.1:5000`
    endpoint: String,
}

#[derive(Serialize)]
struct ApplyRequest<'a> {
    sites: BTreeMap<&'a str, SiteRoute<'a>>,
}

#[derive(Serialize)]
struct SiteRoute<'a> {
    hostname: &'a str,
    /// Comma-joined
    aliases: String,
    port: u16,
}

impl<'a> From<&'a RoutingTable> for ApplyRequest<'a> {
    fn from(table: &'a RoutingTable) -> Self {
        let sites = table
            .routes
            .iter()
            .map(|(hostname, route)| {
                (
                    hostname.as_str(),
                    SiteRoute {
                        hostname,
                        aliases: route.aliases.join(","),
                        port: route.port,
                    },
                )
            })
            .collect();
        Self { sites }
    }
}

impl HttpRoutingClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }

    fn post<T: Serialize>(
        &self,
        operation: &str,
        path: &str,
        body: &T,
    ) -> Result<ureq::http::Response<ureq::Body>> {
        self.agent
            .post(&self.url(path))
            .header("User-Agent", "berth")
            .send_json(body)
            .map_err(|e| classify(operation, e))
    }
}

/// 404/501 mean the proxy predates the call; everything else is transport.
fn classify(operation: &str, err: ureq::Error) -> Error {
    match err {
        ureq::Error::StatusCode(404 | 501) => Error::ProxyNotImplemented {
            operation: operation.to_string(),
        },
        ureq::Error::StatusCode(code) => Error::ProxyTransport {
            message: format!("{operation}: HTTP {code}"),
        },
        other => Error::ProxyTransport {
            message: format!("{operation}: {other}"),
        },
    }
}

impl RoutingClient for HttpRoutingClient {
    fn ping(&self) -> Result<()> {
        self.post("ping", "/v1/ping", &serde_json::json!({}))?;
        Ok(())
    }

    fn apply(&self, table: &RoutingTable) -> Result<ApplyReply> {
        let mut response = self.post("apply", "/v1/apply", &ApplyRequest::from(table))?;
        response
            .body_mut()
            .read_json()
            .map_err(|e| classify("apply", e))
    }
}
