//! Endpoint payloads
//!
//! Request bodies are plain `Serialize` structs; response decoders turn the
//! raw JSON body into typed results and are the shaping functions the
//! executor chains onto each deferred. Decoders are pure.

use quiver_core::{
    Collection, EmbeddingRecord, Error, Include, Metadata, QueryMatch, Result, Where,
    WhereDocument,
};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::columnar::{columns_from_json, columns_to_json, to_columns, to_rows, Columns, Field, ALL_FIELDS};

/// Body of `POST /collections`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCollection {
    /// Collection name
    pub name: String,
    /// Optional metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Return the existing collection instead of failing
    pub get_or_create: bool,
}

/// Body of `PUT /collections/{id}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateCollection {
    /// Rename to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    /// Replace metadata with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_metadata: Option<Metadata>,
}

/// Body of `POST /collections/{id}/get`.
#[derive(Debug, Clone, Serialize)]
pub struct GetRecords {
    /// Restrict to these ids
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    /// Metadata filter
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_: Option<Where>,
    /// Document filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub where_document: Option<WhereDocument>,
    /// Page size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Page start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    /// Columns to return
    pub include: Vec<Include>,
}

impl Default for GetRecords {
    fn default() -> Self {
        Self {
            ids: None,
            where_: None,
            where_document: None,
            limit: None,
            offset: None,
            include: Include::get_default(),
        }
    }
}

/// Body of `POST /collections/{id}/query`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRecords {
    /// One embedding per query
    pub query_embeddings: Vec<Vec<f32>>,
    /// Neighbours per query
    pub n_results: usize,
    /// Metadata filter
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_: Option<Where>,
    /// Document filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub where_document: Option<WhereDocument>,
    /// Columns to return
    pub include: Vec<Include>,
}

/// Body of `POST /collections/{id}/delete`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteRecords {
    /// Delete these ids
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    /// Metadata filter
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_: Option<Where>,
    /// Document filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub where_document: Option<WhereDocument>,
}

/// Body for add/upsert/update: records as columns, all-absent columns omitted.
pub fn encode_records(records: &[EmbeddingRecord]) -> Result<JsonValue> {
    let columns = to_columns(records, &ALL_FIELDS)?;
    Ok(JsonValue::Object(columns_to_json(&columns)))
}

fn expect_object<'a>(body: &'a JsonValue, what: &str) -> Result<&'a Map<String, JsonValue>> {
    body.as_object()
        .ok_or_else(|| Error::protocol(format!("{}: expected a JSON object, got {}", what, body)))
}

/// Decode one collection.
pub fn decode_collection(body: JsonValue) -> Result<Collection> {
    serde_json::from_value(body).map_err(|e| Error::protocol(format!("invalid collection: {}", e)))
}

/// Decode a list of collections.
pub fn decode_collections(body: JsonValue) -> Result<Vec<Collection>> {
    serde_json::from_value(body)
        .map_err(|e| Error::protocol(format!("invalid collection list: {}", e)))
}

/// Decode a bare count.
pub fn decode_count(body: JsonValue) -> Result<u64> {
    body.as_u64()
        .ok_or_else(|| Error::protocol(format!("expected a non-negative count, got {}", body)))
}

/// Decode the heartbeat (server clock in nanoseconds).
pub fn decode_heartbeat(body: JsonValue) -> Result<u64> {
    expect_object(&body, "heartbeat")?
        .values()
        .next()
        .and_then(JsonValue::as_u64)
        .ok_or_else(|| Error::protocol(format!("invalid heartbeat: {}", body)))
}

/// Decode the server version string.
pub fn decode_version(body: JsonValue) -> Result<String> {
    body.as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::protocol(format!("expected a version string, got {}", body)))
}

/// Decode an acknowledgement; any body (including `null`) is accepted.
pub fn decode_ack(_body: JsonValue) -> Result<()> {
    Ok(())
}

/// Decode a `get` response into records.
pub fn decode_records(body: JsonValue) -> Result<Vec<EmbeddingRecord>> {
    let object = expect_object(&body, "get")?;
    let columns = columns_from_json(object)?;
    if !columns.contains_key(&Field::Ids) {
        return Err(Error::protocol("get: response has no 'ids' column"));
    }
    to_rows(&columns, &ALL_FIELDS)
}

/// Decode a `query` response: one list of matches per query embedding.
///
/// Every column in a query response is nested one level deeper than in a
/// `get` response (outer index = query).
pub fn decode_query(body: JsonValue) -> Result<Vec<Vec<QueryMatch>>> {
    let object = expect_object(&body, "query")?;
    let nested = columns_from_json(object)?;
    let ids = nested
        .get(&Field::Ids)
        .ok_or_else(|| Error::protocol("query: response has no 'ids' column"))?;
    let distances = match object.get("distances") {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::Array(d)) => Some(d),
        Some(other) => {
            return Err(Error::protocol(format!(
                "query: 'distances' must be an array, got {}",
                other
            )))
        }
    };

    let queries = ids.len();
    if let Some((field, col)) = nested.iter().find(|(_, col)| col.len() != queries) {
        return Err(Error::protocol(format!(
            "query: column '{}' covers {} queries, expected {}",
            field.wire_name(),
            col.len(),
            queries
        )));
    }
    if let Some(d) = distances {
        if d.len() != queries {
            return Err(Error::protocol(format!(
                "query: 'distances' covers {} queries, expected {}",
                d.len(),
                queries
            )));
        }
    }

    (0..queries)
        .map(|q| -> Result<Vec<QueryMatch>> {
            let mut columns = Columns::new();
            for (field, col) in &nested {
                match &col[q] {
                    JsonValue::Array(inner) => {
                        columns.insert(*field, inner.clone());
                    }
                    JsonValue::Null => {}
                    other => {
                        return Err(Error::protocol(format!(
                            "query: '{}' row must be an array, got {}",
                            field.wire_name(),
                            other
                        )))
                    }
                }
            }
            let records = to_rows(&columns, &ALL_FIELDS)?;
            let dists = match distances {
                Some(d) => decode_distances(d.get(q), records.len())?,
                None => vec![None; records.len()],
            };
            Ok(records
                .into_iter()
                .zip(dists)
                .map(|(record, distance)| QueryMatch { record, distance })
                .collect())
        })
        .collect()
}

fn decode_distances(row: Option<&JsonValue>, expected: usize) -> Result<Vec<Option<f32>>> {
    let row = match row {
        None | Some(JsonValue::Null) => return Ok(vec![None; expected]),
        Some(JsonValue::Array(row)) => row,
        Some(other) => {
            return Err(Error::protocol(format!(
                "query: distance row must be an array, got {}",
                other
            )))
        }
    };
    if row.len() != expected {
        return Err(Error::protocol(format!(
            "query: {} distances for {} results",
            row.len(),
            expected
        )));
    }
    Ok(row.iter().map(|d| d.as_f64().map(|d| d as f32)).collect())
}
