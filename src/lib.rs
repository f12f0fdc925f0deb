//! Quiver - client access layer for a remote vector database
//!
//! Every operation returns a [`Deferred`] immediately and runs on a
//! fixed I/O pool; callers block only when they [`Deferred::wait`].
//!
//! # Quick Start
//!
//! ```ignore
//! use quiver::{Client, ClientConfig, EmbeddingRecord, GetRecords};
//!
//! let client = Client::new(ClientConfig::new().endpoint("localhost", 8000))?;
//! let docs = client.get_or_create_collection("docs", None).wait()?;
//!
//! // Bulk load in batches of 100, 4 at a time
//! let records: Vec<EmbeddingRecord> = load_records();
//! let report = client.ingest(&docs.id, records, 100, 4).wait()?;
//!
//! // Read everything back lazily, 50 records per request
//! for record in client.get_pages(&docs.id, GetRecords::default(), 50).wait()?.expand() {
//!     println!("{}", record?.id);
//! }
//! ```
//!
//! # Architecture
//!
//! | Crate | Role |
//! |-------|------|
//! | `quiver-core` | errors, configuration, records, filters |
//! | `quiver-concurrency` | `Deferred`, I/O pool, pagination, batch ingestion |
//! | `quiver-wire` | row/column transcoding and endpoint payloads |
//! | `quiver-executor` | transport seam, request executor, `Client` |

pub use quiver_executor::*;

pub use quiver_concurrency::{collect_all, expand, ingest, paginate, partition, IoPool, PoolStats, Resolvable, Resolver};
pub use quiver_core::{
    ClientConfig, Collection, Comparison, DistanceMetric, EmbeddingRecord, Include, Metadata,
    MetadataValue, QueryMatch, Where, WhereDocument, DEFAULT_DATABASE, DEFAULT_TENANT,
};
pub use quiver_wire::{
    to_columns, to_rows, Columns, DeleteRecords, Field, GetRecords, QueryRecords,
    UpdateCollection, ALL_FIELDS,
};
