//! Ordered adapter chains.
//!
//! Every capability family with more than one backend (lead sources,
//! scrapers, mail transports, CRM backends) holds an [`AdapterChain`]. The
//! chain tries each adapter in configured order and returns the first
//! success, or a single [`AdapterError::Exhausted`] listing every failure.

use async_trait::async_trait;
use prospector_core::error::AdapterError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One backend for a capability family.
#[async_trait]
pub trait Adapter<Req, Resp>: Send + Sync
where
    Req: Send + Sync,
    Resp: Send,
{
    /// Short name used in results and logs (e.g., "apollo").
    fn name(&self) -> &str;

    async fn call(&self, request: &Req) -> Result<Resp, AdapterError>;
}

/// A success from a chain, tagged with the adapter that produced it.
#[derive(Debug, Clone)]
pub struct Handled<Resp> {
    pub adapter: String,
    pub value: Resp,
}

pub struct AdapterChain<Req, Resp>
where
    Req: Send + Sync,
    Resp: Send,
{
    family: &'static str,
    adapters: Vec<Arc<dyn Adapter<Req, Resp>>>,
}

impl<Req, Resp> AdapterChain<Req, Resp>
where
    Req: Send + Sync,
    Resp: Send,
{
    pub fn new(family: &'static str) -> Self {
        Self {
            family,
            adapters: Vec::new(),
        }
    }

    /// Append an adapter to the end of the chain.
    pub fn with(mut self, adapter: Arc<dyn Adapter<Req, Resp>>) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn family(&self) -> &str {
        self.family
    }

    pub fn names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// First success in order, or every failure aggregated.
    pub async fn try_in_order(&self, request: &Req) -> Result<Handled<Resp>, AdapterError> {
        let mut failures = Vec::new();

        for (i, adapter) in self.adapters.iter().enumerate() {
            debug!(
                family = self.family,
                adapter = adapter.name(),
                attempt = i + 1,
                total = self.adapters.len(),
                "Trying adapter"
            );
            match adapter.call(request).await {
                Ok(value) => {
                    info!(family = self.family, adapter = adapter.name(), "Adapter succeeded");
                    return Ok(Handled {
                        adapter: adapter.name().to_string(),
                        value,
                    });
                }
                Err(e) => {
                    warn!(
                        family = self.family,
                        adapter = adapter.name(),
                        error = %e,
                        "Adapter failed, trying next"
                    );
                    failures.push(format!("{}: {e}", adapter.name()));
                }
            }
        }

        if failures.is_empty() {
            failures.push("no adapters configured".to_string());
        }

        Err(AdapterError::Exhausted {
            family: self.family.to_string(),
            failures: failures.join("; "),
        })
    }
}

/// Read an adapter secret from the environment.
pub(crate) fn env_secret(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve a secret captured at construction, or report which one is missing.
pub(crate) fn require<'a>(secret: &'a Option<String>, var: &str) -> Result<&'a str, AdapterError> {
    secret
        .as_deref()
        .ok_or_else(|| AdapterError::NotConfigured(var.to_string()))
}

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

/// Map a non-success HTTP response to `AdapterError::Api`.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, AdapterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(AdapterError::Api {
        status: status.as_u16(),
        message,
    })
}

pub(crate) fn request_error(e: reqwest::Error) -> AdapterError {
    AdapterError::Request(e.to_string())
}
