//! Typed client surface.
//!
//! [`Client`] wraps a [`RequestExecutor`] with one method per server
//! endpoint. Every method returns a [`Deferred`] immediately; arguments
//! that can be checked locally are rejected with `InvalidInput` before any
//! request is issued.
//!
//! # Example
//!
//! ```text
//! use quiver::{Client, ClientConfig, EmbeddingRecord};
//!
//! let client = Client::new(ClientConfig::new().endpoint("localhost", 8000))?;
//! let docs = client.get_or_create_collection("docs", None).wait()?;
//!
//! client.add(&docs.id, vec![EmbeddingRecord::new("a", vec![0.1, 0.2])]).wait()?;
//! let hits = client.query_one(&docs.id, vec![0.1, 0.2], 3).wait()?;
//! ```
//!
//! `Client` is cheap to clone; clones share the executor, its I/O pool
//! and its configuration.

mod admin;
mod collections;
mod records;

use std::sync::Arc;

use quiver_concurrency::{paginate, Deferred, Page, PageRequest, Resolvable};
use quiver_core::{ClientConfig, Error, Result};

use crate::executor::RequestExecutor;
use crate::transport::Transport;

/// Prefix of every endpoint path.
pub const API_PREFIX: &str = "/api/v1";

/// Handle to a remote vector database.
#[derive(Debug, Clone)]
pub struct Client {
    executor: Arc<RequestExecutor>,
}

impl Client {
    /// Connect over HTTP with the default `ureq` transport.
    ///
    /// No request is made; the first call reveals whether the server is up.
    #[cfg(feature = "http")]
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_transport(config, Arc::new(crate::transport::UreqTransport::new()))
    }

    /// Build the configuration from `QUIVER_*` environment variables over defaults.
    #[cfg(feature = "http")]
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::default().apply_env()?)
    }

    /// Use a caller-supplied transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        Ok(Self {
            executor: Arc::new(RequestExecutor::new(config, transport)?),
        })
    }

    /// The underlying executor, for endpoints this client does not wrap.
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> ClientConfig {
        self.executor.config()
    }

    /// Change configuration for every later call (host, tenant, key, timeout...).
    ///
    /// Calls already dispatched keep the snapshot they started with.
    pub fn reconfigure(&self, edit: impl FnOnce(&mut ClientConfig)) -> Result<()> {
        self.executor.reconfigure(edit)
    }
}

fn endpoint(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

fn to_body<T: serde::Serialize>(body: &T) -> Result<serde_json::Value> {
    serde_json::to_value(body)
        .map_err(|e| Error::internal(format!("failed to serialize request body: {}", e)))
}

/// `/collections/{segment}{suffix}` with `segment` checked for URL safety.
fn collection_endpoint(segment: &str, suffix: &str) -> Result<String> {
    if segment.is_empty() {
        return Err(Error::invalid_input("collection id or name must not be empty"));
    }
    if let Some(c) = segment
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '%'))
    {
        return Err(Error::invalid_input(format!(
            "collection id or name '{}' contains '{}'",
            segment, c
        )));
    }
    Ok(endpoint(&format!("/collections/{}{}", segment, suffix)))
}

/// Collection names: 3-63 characters of `[A-Za-z0-9._-]`, starting and
/// ending with an alphanumeric, no `..`.
fn validate_collection_name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if !(3..=63).contains(&len) {
        return Err(Error::invalid_input(format!(
            "collection name '{}' must be 3-63 characters, got {}",
            name, len
        )));
    }
    let bad_char = name
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')));
    let bad_edge = !name.starts_with(|c: char| c.is_ascii_alphanumeric())
        || !name.ends_with(|c: char| c.is_ascii_alphanumeric());
    if bad_char || bad_edge || name.contains("..") {
        return Err(Error::invalid_input(format!(
            "collection name '{}' must use [A-Za-z0-9._-] and start and end with a letter or digit",
            name
        )));
    }
    Ok(())
}

/// One page when `limit` is set, otherwise a single final page.
fn paged<T, F>(window: Option<PageRequest>, fetch: F) -> Deferred<Page<T>>
where
    T: Resolvable,
    F: Fn(Option<PageRequest>) -> Deferred<Vec<T>> + Send + Sync + 'static,
{
    match window {
        Some(request) => paginate(move |w| fetch(Some(w)), request),
        None => fetch(None).map(Page::last),
    }
}
