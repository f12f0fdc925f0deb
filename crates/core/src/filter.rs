//! Filter expressions for `get`, `query` and `delete`
//!
//! [`Where`] filters on record metadata, [`WhereDocument`] on document text.
//! Both render to the server's operator form (`{"field": {"$gt": 3}}`,
//! `{"$and": [...]}`). The client never evaluates them.

use crate::error::{Error, Result};
use crate::types::MetadataValue;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value as JsonValue};

/// Comparison applied to a single metadata field.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    /// `$eq`
    Eq(MetadataValue),
    /// `$ne`
    Ne(MetadataValue),
    /// `$gt`
    Gt(MetadataValue),
    /// `$gte`
    Gte(MetadataValue),
    /// `$lt`
    Lt(MetadataValue),
    /// `$lte`
    Lte(MetadataValue),
    /// `$in`
    In(Vec<MetadataValue>),
    /// `$nin`
    Nin(Vec<MetadataValue>),
}

impl Comparison {
    fn operator(&self) -> &'static str {
        match self {
            Comparison::Eq(_) => "$eq",
            Comparison::Ne(_) => "$ne",
            Comparison::Gt(_) => "$gt",
            Comparison::Gte(_) => "$gte",
            Comparison::Lt(_) => "$lt",
            Comparison::Lte(_) => "$lte",
            Comparison::In(_) => "$in",
            Comparison::Nin(_) => "$nin",
        }
    }

    fn operand(&self) -> JsonValue {
        match self {
            Comparison::Eq(v)
            | Comparison::Ne(v)
            | Comparison::Gt(v)
            | Comparison::Gte(v)
            | Comparison::Lt(v)
            | Comparison::Lte(v) => json!(v),
            Comparison::In(vs) | Comparison::Nin(vs) => json!(vs),
        }
    }
}

/// Metadata filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    /// Compare one field
    Field {
        /// Metadata key
        key: String,
        /// Comparison
        cmp: Comparison,
    },
    /// All children match
    And(Vec<Where>),
    /// Any child matches
    Or(Vec<Where>),
}

impl Where {
    /// `key == value`
    pub fn eq(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::field(key, Comparison::Eq(value.into()))
    }

    /// `key != value`
    pub fn ne(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::field(key, Comparison::Ne(value.into()))
    }

    /// `key > value`
    pub fn gt(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::field(key, Comparison::Gt(value.into()))
    }

    /// `key >= value`
    pub fn gte(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::field(key, Comparison::Gte(value.into()))
    }

    /// `key < value`
    pub fn lt(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::field(key, Comparison::Lt(value.into()))
    }

    /// `key <= value`
    pub fn lte(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::field(key, Comparison::Lte(value.into()))
    }

    /// `key in values`
    pub fn is_in<V: Into<MetadataValue>>(key: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::field(key, Comparison::In(values.into_iter().map(Into::into).collect()))
    }

    /// `key not in values`
    pub fn not_in<V: Into<MetadataValue>>(key: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::field(key, Comparison::Nin(values.into_iter().map(Into::into).collect()))
    }

    /// Conjunction
    pub fn and(children: Vec<Where>) -> Self {
        Where::And(children)
    }

    /// Disjunction
    pub fn or(children: Vec<Where>) -> Self {
        Where::Or(children)
    }

    fn field(key: impl Into<String>, cmp: Comparison) -> Self {
        Where::Field {
            key: key.into(),
            cmp,
        }
    }

    /// Reject trees the server would refuse: empty keys and combinators
    /// with fewer than two children.
    pub fn validate(&self) -> Result<()> {
        match self {
            Where::Field { key, .. } if key.is_empty() => {
                Err(Error::invalid_input("where: empty metadata key"))
            }
            Where::Field { .. } => Ok(()),
            Where::And(children) | Where::Or(children) => {
                if children.len() < 2 {
                    return Err(Error::invalid_input(
                        "where: $and/$or need at least two children",
                    ));
                }
                children.iter().try_for_each(Where::validate)
            }
        }
    }

    /// Server JSON form
    pub fn to_json(&self) -> JsonValue {
        match self {
            Where::Field { key, cmp } => {
                let mut inner = Map::new();
                inner.insert(cmp.operator().to_string(), cmp.operand());
                let mut outer = Map::new();
                outer.insert(key.clone(), JsonValue::Object(inner));
                JsonValue::Object(outer)
            }
            Where::And(children) => {
                json!({ "$and": children.iter().map(Where::to_json).collect::<Vec<_>>() })
            }
            Where::Or(children) => {
                json!({ "$or": children.iter().map(Where::to_json).collect::<Vec<_>>() })
            }
        }
    }
}

/// Document full-text filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereDocument {
    /// Document contains the substring
    Contains(String),
    /// Document does not contain the substring
    NotContains(String),
    /// All children match
    And(Vec<WhereDocument>),
    /// Any child matches
    Or(Vec<WhereDocument>),
}

impl WhereDocument {
    /// `$contains`
    pub fn contains(text: impl Into<String>) -> Self {
        WhereDocument::Contains(text.into())
    }

    /// `$not_contains`
    pub fn not_contains(text: impl Into<String>) -> Self {
        WhereDocument::NotContains(text.into())
    }

    /// Reject combinators with fewer than two children.
    pub fn validate(&self) -> Result<()> {
        match self {
            WhereDocument::Contains(_) | WhereDocument::NotContains(_) => Ok(()),
            WhereDocument::And(children) | WhereDocument::Or(children) => {
                if children.len() < 2 {
                    return Err(Error::invalid_input(
                        "where_document: $and/$or need at least two children",
                    ));
                }
                children.iter().try_for_each(WhereDocument::validate)
            }
        }
    }

    /// Server JSON form
    pub fn to_json(&self) -> JsonValue {
        match self {
            WhereDocument::Contains(t) => json!({ "$contains": t }),
            WhereDocument::NotContains(t) => json!({ "$not_contains": t }),
            WhereDocument::And(children) => {
                json!({ "$and": children.iter().map(WhereDocument::to_json).collect::<Vec<_>>() })
            }
            WhereDocument::Or(children) => {
                json!({ "$or": children.iter().map(WhereDocument::to_json).collect::<Vec<_>>() })
            }
        }
    }
}

impl Serialize for Where {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl Serialize for WhereDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
