//! HTTP transport seam
//!
//! The executor never talks to the network directly; it hands an
//! [`HttpRequest`] to a [`Transport`]. Production code uses
//! [`UreqTransport`] (feature `http`), tests plug in an in-memory server.
//!
//! A transport reports every HTTP status as a value. Only failures that
//! produce no response at all (refused connection, DNS, timeout) are
//! [`TransportError`]s.

use std::fmt;
use std::time::Duration;

/// Header names whose values never appear in logs or errors.
const SENSITIVE_HEADERS: [&str; 2] = ["authorization", "x-chroma-token"];

/// Placeholder written in place of secrets.
pub const REDACTED: &str = "<redacted>";

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper-case method name
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved request, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Method
    pub method: Method,
    /// Absolute URL without the query string
    pub url: String,
    /// Headers in insertion order
    pub headers: Vec<(String, String)>,
    /// Query parameters in insertion order
    pub query: Vec<(String, String)>,
    /// Serialized JSON body
    pub body: Option<Vec<u8>>,
    /// Deadline for the whole exchange
    pub timeout: Duration,
}

impl HttpRequest {
    /// First header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// First query parameter named `name`.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Body parsed as JSON, if any.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
    }

    /// One-line description safe to log: sensitive header values are
    /// replaced with [`REDACTED`].
    pub fn describe(&self) -> String {
        let mut out = format!("{} {}", self.method, self.url);
        if !self.query.is_empty() {
            let query: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            out.push('?');
            out.push_str(&query.join("&"));
        }
        let headers: Vec<String> = self
            .headers
            .iter()
            .map(|(k, v)| {
                if SENSITIVE_HEADERS.contains(&k.to_ascii_lowercase().as_str()) {
                    format!("{}: {}", k, REDACTED)
                } else {
                    format!("{}: {}", k, v)
                }
            })
            .collect();
        if !headers.is_empty() {
            out.push_str(" [");
            out.push_str(&headers.join(", "));
            out.push(']');
        }
        out
    }
}

/// A response with any status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Body text
    pub body: String,
}

impl HttpResponse {
    /// Response with `status` and `body`.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `200` with a JSON body.
    pub fn json(value: &serde_json::Value) -> Self {
        Self::new(200, value.to_string())
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request produced no HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection refused, DNS failure, reset
    #[error("network error: {0}")]
    Network(String),
    /// Request did not complete within its timeout
    #[error("request timed out")]
    Timeout,
    /// Response arrived but its body could not be read
    #[error("failed to read response: {0}")]
    Body(String),
}

/// Sends one request and returns the response, whatever its status.
pub trait Transport: Send + Sync {
    /// Perform the exchange. Blocks the calling (pool) thread.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Largest response body read into memory.
#[cfg(feature = "http")]
const MAX_RESPONSE_BYTES: u64 = 256 * 1024 * 1024;

/// Blocking transport backed by `ureq`.
///
/// An agent is built per call so the timeout of the current configuration
/// snapshot always applies.
#[cfg(feature = "http")]
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

#[cfg(feature = "http")]
impl UreqTransport {
    /// Create the transport.
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "http")]
fn with_parts<B>(
    mut builder: ureq::RequestBuilder<B>,
    request: &HttpRequest,
) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    for (name, value) in &request.query {
        builder = builder.query(name, value);
    }
    builder
}

#[cfg(feature = "http")]
fn map_ureq_error(e: ureq::Error) -> TransportError {
    match e {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        other => TransportError::Network(other.to_string()),
    }
}

#[cfg(feature = "http")]
impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(request.timeout))
            .http_status_as_error(false)
            .build();
        let agent = ureq::Agent::new_with_config(config);
        let url = request.url.as_str();

        let sent = match (request.method, request.body.as_deref()) {
            (Method::Get, None) => with_parts(agent.get(url), request).call(),
            (Method::Get, Some(body)) => with_parts(agent.get(url), request)
                .force_send_body()
                .send(body),
            (Method::Delete, None) => with_parts(agent.delete(url), request).call(),
            (Method::Delete, Some(body)) => with_parts(agent.delete(url), request)
                .force_send_body()
                .send(body),
            (Method::Post, body) => {
                with_parts(agent.post(url), request).send(body.unwrap_or_default())
            }
            (Method::Put, body) => {
                with_parts(agent.put(url), request).send(body.unwrap_or_default())
            }
        };

        let mut response = sent.map_err(map_ureq_error)?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_to_string()
            .map_err(|e| match e {
                ureq::Error::Timeout(_) => TransportError::Timeout,
                other => TransportError::Body(other.to_string()),
            })?;
        Ok(HttpResponse { status, body })
    }
}
