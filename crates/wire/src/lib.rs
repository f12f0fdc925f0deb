//! Wire layer for Quiver
//!
//! - `columnar`: row ⇄ column transcoding of embedding records
//! - `payload`: request bodies and pure response decoders per endpoint

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod columnar;
pub mod payload;

pub use columnar::{columns_from_json, columns_to_json, to_columns, to_rows, Columns, Field, ALL_FIELDS};
pub use payload::{
    decode_ack, decode_collection, decode_collections, decode_count, decode_heartbeat,
    decode_query, decode_records, decode_version, encode_records, CreateCollection,
    DeleteRecords, GetRecords, QueryRecords, UpdateCollection,
};
