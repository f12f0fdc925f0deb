//! Row/column transcoding
//!
//! Records travel column-oriented on the wire:
//! `{"ids": [...], "embeddings": [...], "metadatas": [...], "documents": [...]}`.
//! Every column is aligned by index. [`to_columns`] omits a column whose
//! values are absent for every record; [`to_rows`] zips columns back into
//! records and rejects columns of unequal length.

use std::collections::BTreeMap;

use quiver_core::{EmbeddingRecord, Error, Metadata, Result};
use serde_json::{Map, Value as JsonValue};

/// Columns keyed by field.
pub type Columns = BTreeMap<Field, Vec<JsonValue>>;

/// A record field as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    /// `ids`
    Ids,
    /// `embeddings`
    Embeddings,
    /// `metadatas`
    Metadatas,
    /// `documents`
    Documents,
}

/// Every record field, in wire order.
pub const ALL_FIELDS: [Field; 4] = [
    Field::Ids,
    Field::Embeddings,
    Field::Metadatas,
    Field::Documents,
];

impl Field {
    /// Column name on the wire
    pub fn wire_name(&self) -> &'static str {
        match self {
            Field::Ids => "ids",
            Field::Embeddings => "embeddings",
            Field::Metadatas => "metadatas",
            Field::Documents => "documents",
        }
    }

    /// Parse a column name
    pub fn from_wire_name(name: &str) -> Option<Self> {
        ALL_FIELDS.iter().copied().find(|f| f.wire_name() == name)
    }

    /// This field of `record` as JSON; `Null` when absent.
    fn extract(&self, record: &EmbeddingRecord) -> Result<JsonValue> {
        let value = match self {
            Field::Ids => JsonValue::String(record.id.clone()),
            Field::Embeddings => serde_json::to_value(&record.embedding)?,
            Field::Metadatas => serde_json::to_value(&record.metadata)?,
            Field::Documents => serde_json::to_value(&record.document)?,
        };
        Ok(value)
    }

    /// Store `value` into this field of `record`.
    fn assign(&self, record: &mut EmbeddingRecord, value: &JsonValue) -> Result<()> {
        match self {
            Field::Ids => {
                record.id = value
                    .as_str()
                    .ok_or_else(|| Error::protocol(format!("id must be a string, got {}", value)))?
                    .to_string();
            }
            Field::Embeddings => {
                record.embedding = Option::<Vec<f32>>::deserialize_from(value, "embedding")?;
            }
            Field::Metadatas => {
                record.metadata = Option::<Metadata>::deserialize_from(value, "metadata")?;
            }
            Field::Documents => {
                record.document = Option::<String>::deserialize_from(value, "document")?;
            }
        }
        Ok(())
    }
}

trait DeserializeFrom: Sized {
    fn deserialize_from(value: &JsonValue, what: &str) -> Result<Self>;
}

impl<T: serde::de::DeserializeOwned> DeserializeFrom for T {
    fn deserialize_from(value: &JsonValue, what: &str) -> Result<Self> {
        T::deserialize(value).map_err(|e| Error::protocol(format!("invalid {}: {}", what, e)))
    }
}

/// Build aligned columns for `fields`, omitting any all-absent column.
///
/// An empty record slice therefore produces no columns.
pub fn to_columns(records: &[EmbeddingRecord], fields: &[Field]) -> Result<Columns> {
    let mut columns = Columns::new();
    for field in fields {
        let values = records
            .iter()
            .map(|r| field.extract(r))
            .collect::<Result<Vec<_>>>()?;
        if values.iter().all(JsonValue::is_null) {
            continue;
        }
        columns.insert(*field, values);
    }
    Ok(columns)
}

/// Zip columns back into records.
///
/// Fields not present in `columns` stay absent on every record.
///
/// # Errors
///
/// `Protocol` if the included columns differ in length or a value has the
/// wrong shape.
pub fn to_rows(columns: &Columns, fields: &[Field]) -> Result<Vec<EmbeddingRecord>> {
    let included: Vec<(Field, &Vec<JsonValue>)> = fields
        .iter()
        .filter_map(|f| columns.get(f).map(|col| (*f, col)))
        .collect();

    let len = match included.first() {
        Some((_, col)) => col.len(),
        None => return Ok(Vec::new()),
    };
    if let Some((field, col)) = included.iter().find(|(_, col)| col.len() != len) {
        return Err(Error::protocol(format!(
            "column '{}' has {} values, expected {}",
            field.wire_name(),
            col.len(),
            len
        )));
    }

    (0..len)
        .map(|i| {
            let mut record = EmbeddingRecord::default();
            for (field, col) in &included {
                field.assign(&mut record, &col[i])?;
            }
            Ok(record)
        })
        .collect()
}

/// Render columns as a JSON object keyed by wire name.
pub fn columns_to_json(columns: &Columns) -> Map<String, JsonValue> {
    columns
        .iter()
        .map(|(field, values)| (field.wire_name().to_string(), JsonValue::Array(values.clone())))
        .collect()
}

/// Read the record columns out of a response object.
///
/// Unknown keys are ignored; `null` columns count as absent.
pub fn columns_from_json(object: &Map<String, JsonValue>) -> Result<Columns> {
    let mut columns = Columns::new();
    for field in ALL_FIELDS {
        match object.get(field.wire_name()) {
            None | Some(JsonValue::Null) => {}
            Some(JsonValue::Array(values)) => {
                columns.insert(field, values.clone());
            }
            Some(other) => {
                return Err(Error::protocol(format!(
                    "column '{}' must be an array, got {}",
                    field.wire_name(),
                    other
                )))
            }
        }
    }
    Ok(columns)
}
