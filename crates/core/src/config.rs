//! Client configuration
//!
//! A [`ClientConfig`] is an explicit value handed to the executor at
//! construction time. It can be built in code, parsed from a TOML file, and
//! overlaid with `QUIVER_*` environment variables. The executor keeps it
//! behind a lock and reads a fresh snapshot on every call, so changes made
//! through `Client::reconfigure` apply to the next request.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Conventional config file name.
pub const CONFIG_FILE_NAME: &str = "quiver.toml";

/// Tenant used when none is configured.
pub const DEFAULT_TENANT: &str = "default_tenant";
/// Database used when none is configured.
pub const DEFAULT_DATABASE: &str = "default_database";

/// Environment variable names read by [`ClientConfig::apply_env`].
pub mod env {
    /// `http` or `https`
    pub const PROTOCOL: &str = "QUIVER_PROTOCOL";
    /// Server host name
    pub const HOST: &str = "QUIVER_HOST";
    /// Server port
    pub const PORT: &str = "QUIVER_PORT";
    /// Request timeout in milliseconds
    pub const TIMEOUT_MS: &str = "QUIVER_TIMEOUT_MS";
    /// Bearer token
    pub const API_KEY: &str = "QUIVER_API_KEY";
    /// Tenant
    pub const TENANT: &str = "QUIVER_TENANT";
    /// Database
    pub const DATABASE: &str = "QUIVER_DATABASE";
    /// `true` to permit `reset`
    pub const ALLOW_RESET: &str = "QUIVER_ALLOW_RESET";
}

/// Connection and routing settings.
///
/// # Example
///
/// ```toml
/// protocol = "http"
/// host = "localhost"
/// port = 8000
/// timeout_ms = 30000
/// # api_key = "secret"
/// tenant = "default_tenant"
/// database = "default_database"
/// allow_reset = false
/// io_threads = 8
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// `"http"` or `"https"`
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Server host
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Bearer token attached as `Authorization` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Tenant routing parameter
    #[serde(default = "default_tenant")]
    pub tenant: String,
    /// Database routing parameter
    #[serde(default = "default_database")]
    pub database: String,
    /// Permit the destructive `reset` operation
    #[serde(default)]
    pub allow_reset: bool,
    /// Worker threads in the I/O pool
    #[serde(default = "default_io_threads")]
    pub io_threads: usize,
}

fn default_protocol() -> String {
    "http".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_tenant() -> String {
    DEFAULT_TENANT.to_string()
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_io_threads() -> usize {
    8
}

// The API key is never printed, so configs can be logged as-is.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("timeout_ms", &self.timeout_ms)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("tenant", &self.tenant)
            .field("database", &self.database)
            .field("allow_reset", &self.allow_reset)
            .field("io_threads", &self.io_threads)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            host: default_host(),
            port: default_port(),
            timeout_ms: default_timeout_ms(),
            api_key: None,
            tenant: default_tenant(),
            database: default_database(),
            allow_reset: false,
            io_threads: default_io_threads(),
        }
    }
}

impl ClientConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set host and port.
    pub fn endpoint(mut self, host: &str, port: u16) -> Self {
        self.host = host.to_string();
        self.port = port;
        self
    }

    /// Set the protocol (`"http"` or `"https"`).
    pub fn protocol(mut self, protocol: &str) -> Self {
        self.protocol = protocol.to_string();
        self
    }

    /// Set the bearer token.
    pub fn api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    /// Set tenant and database.
    pub fn route(mut self, tenant: &str, database: &str) -> Self {
        self.tenant = tenant.to_string();
        self.database = database.to_string();
        self
    }

    /// Set the request timeout in milliseconds.
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Permit or forbid `reset`.
    pub fn allow_reset(mut self, allow: bool) -> Self {
        self.allow_reset = allow;
        self
    }

    /// Set the number of I/O worker threads.
    pub fn io_threads(mut self, n: usize) -> Self {
        self.io_threads = n;
        self
    }

    /// Request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// `{protocol}://{host}:{port}`
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    /// Check that the settings can produce a request.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` naming the first offending option.
    pub fn validate(&self) -> Result<()> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(Error::configuration(format!(
                "protocol must be \"http\" or \"https\", got \"{}\"",
                self.protocol
            )));
        }
        if self.host.is_empty() {
            return Err(Error::configuration("host must not be empty"));
        }
        if self.port == 0 {
            return Err(Error::configuration("port must not be 0"));
        }
        if self.timeout_ms == 0 {
            return Err(Error::configuration("timeout_ms must be at least 1"));
        }
        if self.tenant.is_empty() || self.database.is_empty() {
            return Err(Error::configuration("tenant and database must not be empty"));
        }
        if self.io_threads == 0 {
            return Err(Error::configuration("io_threads must be at least 1"));
        }
        Ok(())
    }

    /// Parse a config from TOML text; missing fields take defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ClientConfig = toml::from_str(content)
            .map_err(|e| Error::configuration(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::internal(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::configuration(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Overlay `QUIVER_*` variables from the process environment.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Overlay variables from an arbitrary lookup (used by `apply_env`).
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(v) = lookup(env::PROTOCOL) {
            self.protocol = v;
        }
        if let Some(v) = lookup(env::HOST) {
            self.host = v;
        }
        if let Some(v) = lookup(env::PORT) {
            self.port = v
                .parse()
                .map_err(|_| Error::configuration(format!("{}: invalid port '{}'", env::PORT, v)))?;
        }
        if let Some(v) = lookup(env::TIMEOUT_MS) {
            self.timeout_ms = v.parse().map_err(|_| {
                Error::configuration(format!("{}: invalid timeout '{}'", env::TIMEOUT_MS, v))
            })?;
        }
        if let Some(v) = lookup(env::API_KEY) {
            self.api_key = if v.is_empty() { None } else { Some(v) };
        }
        if let Some(v) = lookup(env::TENANT) {
            self.tenant = v;
        }
        if let Some(v) = lookup(env::DATABASE) {
            self.database = v;
        }
        if let Some(v) = lookup(env::ALLOW_RESET) {
            self.allow_reset = match v.to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                other => {
                    return Err(Error::configuration(format!(
                        "{}: expected true/false, got '{}'",
                        env::ALLOW_RESET,
                        other
                    )))
                }
            };
        }
        self.validate()?;
        Ok(self)
    }
}
