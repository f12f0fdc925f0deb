//! Request executor
//!
//! [`RequestExecutor`] turns `(method, path, query, body)` into a
//! [`Deferred`] JSON value. Each call reads a fresh snapshot of the shared
//! configuration, so [`RequestExecutor::reconfigure`] takes effect on the
//! next call without disturbing requests already in flight.
//!
//! ## Error mapping
//!
//! | Outcome | Error |
//! |---------|-------|
//! | transport failure | `Error::Transport { context, reason }` |
//! | status outside 200..=299 | `Error::Status { code, body, context }` |
//! | body is not JSON | `Error::Protocol` |
//!
//! `context` is [`HttpRequest::describe`], which never contains the API
//! key; the key is also scrubbed from any body text the server echoes.
//! Nothing is retried.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use quiver_concurrency::{Deferred, IoPool, PoolStats, Resolvable};
use quiver_core::{ClientConfig, Error, Result};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::transport::{HttpRequest, Method, Transport, REDACTED};

/// Query parameters in insertion order.
pub type QueryParams = Vec<(String, String)>;

/// Dispatches requests on the I/O pool.
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    config: Arc<RwLock<ClientConfig>>,
    pool: IoPool,
}

impl RequestExecutor {
    /// Create an executor with its own I/O pool of `config.io_threads` threads.
    ///
    /// # Errors
    ///
    /// `Configuration` if `config` does not validate, `Internal` if the pool
    /// threads cannot be spawned.
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let pool = IoPool::new(config.io_threads)?;
        Ok(Self {
            transport,
            config: Arc::new(RwLock::new(config)),
            pool,
        })
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> ClientConfig {
        self.config.read().clone()
    }

    /// Edit the configuration for subsequent calls.
    ///
    /// The edit is applied to a copy and only installed if it validates.
    /// `io_threads` is fixed at construction; changing it has no effect on
    /// the running pool.
    pub fn reconfigure(&self, edit: impl FnOnce(&mut ClientConfig)) -> Result<()> {
        let mut guard = self.config.write();
        let mut next = guard.clone();
        edit(&mut next);
        next.validate()?;
        *guard = next;
        Ok(())
    }

    /// Pool statistics, for diagnostics.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Issue one request; the deferred resolves with the decoded JSON body.
    ///
    /// `path` is appended to the configured base URL. `tenant` and
    /// `database` are added to `query`, and `Authorization: Bearer <key>`
    /// when an API key is configured. An empty success body is `null`.
    pub fn execute(
        &self,
        method: Method,
        path: &str,
        query: QueryParams,
        body: Option<JsonValue>,
    ) -> Deferred<JsonValue> {
        let snapshot = self.config();
        let body = match body.map(|b| serde_json::to_vec(&b)).transpose() {
            Ok(body) => body,
            Err(e) => {
                return Deferred::failed(Error::internal(format!(
                    "failed to serialize request body: {}",
                    e
                )))
            }
        };
        let request = build_request(&snapshot, method, path, query, body);
        let secret = snapshot.api_key;
        let transport = Arc::clone(&self.transport);
        Deferred::spawn(&self.pool, move || {
            dispatch(transport.as_ref(), &request, secret.as_deref())
        })
    }

    /// [`execute`](Self::execute) followed by a pure `shape` applied to the body.
    ///
    /// `shape` runs at most once, on first await; the request is never re-sent.
    pub fn execute_as<T, F>(
        &self,
        method: Method,
        path: &str,
        query: QueryParams,
        body: Option<JsonValue>,
        shape: F,
    ) -> Deferred<T>
    where
        T: Resolvable,
        F: Fn(JsonValue) -> Result<T> + Send + Sync + 'static,
    {
        self.execute(method, path, query, body).and_then(shape)
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("base_url", &self.config.read().base_url())
            .field("pool", &self.pool.stats())
            .finish()
    }
}

fn build_request(
    config: &ClientConfig,
    method: Method,
    path: &str,
    mut query: QueryParams,
    body: Option<Vec<u8>>,
) -> HttpRequest {
    query.push(("tenant".to_string(), config.tenant.clone()));
    query.push(("database".to_string(), config.database.clone()));

    let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
    if body.is_some() {
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
    }
    if let Some(key) = &config.api_key {
        headers.push(("Authorization".to_string(), format!("Bearer {}", key)));
    }

    HttpRequest {
        method,
        url: format!("{}{}", config.base_url(), path),
        headers,
        query,
        body,
        timeout: config.timeout(),
    }
}

fn scrub(text: &str, secret: Option<&str>) -> String {
    match secret {
        Some(secret) if !secret.is_empty() => text.replace(secret, REDACTED),
        _ => text.to_string(),
    }
}

fn dispatch(
    transport: &dyn Transport,
    request: &HttpRequest,
    secret: Option<&str>,
) -> Result<JsonValue> {
    let started = Instant::now();
    let context = request.describe();

    let response = match transport.send(request) {
        Ok(response) => response,
        Err(e) => {
            let reason = scrub(&e.to_string(), secret);
            warn!(
                target: "quiver::executor",
                method = %request.method,
                url = %request.url,
                error = %reason,
                "Transport failure"
            );
            return Err(Error::Transport { context, reason });
        }
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    if !response.is_success() {
        let body = scrub(&response.body, secret);
        warn!(
            target: "quiver::executor",
            method = %request.method,
            url = %request.url,
            status = response.status,
            elapsed_ms,
            "Request failed"
        );
        return Err(Error::Status {
            code: response.status,
            body,
            context,
        });
    }

    debug!(
        target: "quiver::executor",
        method = %request.method,
        url = %request.url,
        status = response.status,
        elapsed_ms,
        bytes = response.body.len(),
        "Request completed"
    );
    decode_body(&response.body)
}

fn decode_body(body: &str) -> Result<JsonValue> {
    if body.trim().is_empty() {
        return Ok(JsonValue::Null);
    }
    serde_json::from_str(body)
        .map_err(|e| Error::protocol(format!("response body is not valid JSON: {}", e)))
}
