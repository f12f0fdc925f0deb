//! Domain types shared by every layer of the client
//!
//! - [`Collection`]: a named, server-identified group of embeddings
//! - [`EmbeddingRecord`]: one row (id, embedding, metadata, document)
//! - [`MetadataValue`]: scalar metadata value
//! - [`Include`]: which columns a read returns
//! - [`QueryMatch`]: a record returned by a nearest-neighbour query

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata attached to a collection or a record.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Scalar metadata value.
///
/// The server only accepts scalars in metadata maps, so nested objects and
/// arrays are not representable here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// String
    Str(String),
}

impl MetadataValue {
    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            MetadataValue::Bool(_) => "bool",
            MetadataValue::Int(_) => "int",
            MetadataValue::Float(_) => "float",
            MetadataValue::Str(_) => "string",
        }
    }

    /// Returns the string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Int(i)
    }
}

impl From<i32> for MetadataValue {
    fn from(i: i32) -> Self {
        MetadataValue::Int(i64::from(i))
    }
}

impl From<f64> for MetadataValue {
    fn from(f: f64) -> Self {
        MetadataValue::Float(f)
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Str(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Str(s)
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Int(i) => write!(f, "{}", i),
            MetadataValue::Float(x) => write!(f, "{}", x),
            MetadataValue::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Metadata key the server reads the index distance function from.
pub const DISTANCE_METADATA_KEY: &str = "hnsw:space";

/// Distance function of a collection's index.
///
/// Lower distance = more similar for every metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Squared euclidean distance (server default)
    #[default]
    L2,
    /// 1 - cosine similarity
    Cosine,
    /// 1 - inner product
    Ip,
}

impl DistanceMetric {
    /// Wire name
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::L2 => "l2",
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Ip => "ip",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "l2" | "euclidean" => Some(DistanceMetric::L2),
            "cosine" => Some(DistanceMetric::Cosine),
            "ip" | "inner_product" | "dot" => Some(DistanceMetric::Ip),
            _ => None,
        }
    }
}

/// A collection as reported by the server.
///
/// `id` is assigned by the server and never changes; `name` and `metadata`
/// change only through an explicit update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Server-assigned identifier
    pub id: String,
    /// Unique name within the database
    pub name: String,
    /// Optional metadata
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl Collection {
    /// Distance function configured through metadata, if any.
    pub fn distance_metric(&self) -> Option<DistanceMetric> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(DISTANCE_METADATA_KEY))
            .and_then(MetadataValue::as_str)
            .and_then(DistanceMetric::parse)
    }
}

/// One embedding record.
///
/// Identity is `id`, unique within a collection. On reads, fields excluded
/// via [`Include`] come back as `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Record identifier
    pub id: String,
    /// Embedding vector
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    /// Scalar metadata
    #[serde(default)]
    pub metadata: Option<Metadata>,
    /// Source document text
    #[serde(default)]
    pub document: Option<String>,
}

impl EmbeddingRecord {
    /// Create a record with an id and an embedding.
    pub fn new(id: impl Into<String>, embedding: Vec<f32>) -> Self {
        EmbeddingRecord {
            id: id.into(),
            embedding: Some(embedding),
            metadata: None,
            document: None,
        }
    }

    /// Attach a document.
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    /// Attach one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value.into());
        self
    }

    /// Embedding dimension, if an embedding is present.
    pub fn dimension(&self) -> Option<usize> {
        self.embedding.as_ref().map(Vec::len)
    }
}

/// A record returned by a nearest-neighbour query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    /// The matched record (fields per [`Include`])
    pub record: EmbeddingRecord,
    /// Distance to the query embedding, when requested
    pub distance: Option<f32>,
}

/// Columns a read operation asks the server to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Include {
    /// Embedding vectors
    Embeddings,
    /// Metadata maps
    Metadatas,
    /// Document texts
    Documents,
    /// Query distances (query only)
    Distances,
}

impl Include {
    /// Server default for `get`.
    pub fn get_default() -> Vec<Include> {
        vec![Include::Metadatas, Include::Documents]
    }

    /// Server default for `query`.
    pub fn query_default() -> Vec<Include> {
        vec![Include::Metadatas, Include::Documents, Include::Distances]
    }
}
