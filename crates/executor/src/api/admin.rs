//! Server-level operations: heartbeat, version, reset.

use quiver_concurrency::Deferred;
use quiver_core::Error;
use quiver_wire::{decode_ack, decode_heartbeat, decode_version};
use tracing::warn;

use super::{endpoint, Client};
use crate::transport::Method;

impl Client {
    /// Server clock in nanoseconds; doubles as a liveness probe.
    pub fn heartbeat(&self) -> Deferred<u64> {
        self.executor.execute_as(
            Method::Get,
            &endpoint("/heartbeat"),
            Vec::new(),
            None,
            decode_heartbeat,
        )
    }

    /// Server version string.
    pub fn version(&self) -> Deferred<String> {
        self.executor.execute_as(
            Method::Get,
            &endpoint("/version"),
            Vec::new(),
            None,
            decode_version,
        )
    }

    /// Delete every collection on the server.
    ///
    /// Refused with `Configuration`, without contacting the server, unless
    /// `allow_reset` is set in the current configuration.
    pub fn reset(&self) -> Deferred<()> {
        if !self.config().allow_reset {
            return Deferred::failed(Error::configuration(
                "reset is disabled; set allow_reset to enable it",
            ));
        }
        warn!(target: "quiver::executor", "Resetting server state");
        self.executor
            .execute_as(Method::Post, &endpoint("/reset"), Vec::new(), None, decode_ack)
    }
}
