//! Core types for the Quiver client
//!
//! This crate defines the foundational types used throughout the client:
//! - Error: the uniform error taxonomy every deferred result reports
//! - ClientConfig: explicit connection/routing configuration
//! - Collection, EmbeddingRecord, MetadataValue: domain payloads
//! - Where, WhereDocument: filter expression trees

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod filter;
pub mod types;

pub use config::{ClientConfig, CONFIG_FILE_NAME, DEFAULT_DATABASE, DEFAULT_TENANT};
pub use error::{Error, Result};
pub use filter::{Comparison, Where, WhereDocument};
pub use types::{
    Collection, DistanceMetric, EmbeddingRecord, Include, Metadata, MetadataValue, QueryMatch,
    DISTANCE_METADATA_KEY,
};
