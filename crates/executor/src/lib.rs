//! # Quiver Executor
//!
//! Request execution and the typed client surface for a remote vector
//! database.
//!
//! - [`Client`] - one method per endpoint, each returning a [`Deferred`]
//! - [`RequestExecutor`] - builds requests from the live configuration and
//!   runs them on the I/O pool
//! - [`Transport`] - the HTTP seam; [`UreqTransport`] with feature `http`
//!
//! ## Quick Start
//!
//! ```text
//! use quiver_executor::Client;
//! use quiver_core::ClientConfig;
//!
//! let client = Client::new(ClientConfig::new().endpoint("localhost", 8000))?;
//! let beat = client.heartbeat();      // dispatched
//! println!("{}", beat.wait()?);       // suspended only here
//! ```
//!
//! ## Operations
//!
//! | Area | Methods |
//! |------|---------|
//! | Server | `heartbeat`, `version`, `reset` |
//! | Collections | `list_collections`, `count_collections`, `create_collection`, `get_collection`, `get_or_create_collection`, `update_collection`, `delete_collection` |
//! | Records | `add`, `upsert`, `update`, `delete`, `get`, `get_pages`, `count`, `query`, `query_one`, `ingest` |

#![warn(missing_docs)]
#![warn(clippy::all)]

mod api;
mod executor;
pub mod transport;

#[cfg(test)]
mod tests;

pub use api::{Client, API_PREFIX};
pub use executor::{QueryParams, RequestExecutor};
pub use transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};

#[cfg(feature = "http")]
pub use transport::UreqTransport;

pub use quiver_concurrency::{Deferred, IngestReport, Page, PageIter, PageRequest};
pub use quiver_core::{Error, Result};
