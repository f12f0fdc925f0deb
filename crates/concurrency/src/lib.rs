//! Concurrency layer for Quiver
//!
//! This crate holds the asynchronous machinery the client is built on:
//! - `Deferred`: write-once result handle with lazy `map`/`and_then`
//! - `IoPool`: fixed pool of named threads that runs network calls
//! - `paginate`: offset/limit pages expanded lazily on demand
//! - `ingest`: batch partitioning driven by a bounded set of workers
//!
//! Nothing here knows about HTTP; the executor crate plugs requests in.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod deferred;
pub mod ingest;
pub mod paginate;
pub mod pool;

pub use deferred::{Deferred, Resolvable, Resolver};
pub use ingest::{ingest, partition, IngestReport};
pub use paginate::{collect_all, expand, paginate, Page, PageIter, PageRequest};
pub use pool::{IoPool, PoolStats};
