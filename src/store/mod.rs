//! Document-store boundary.
//!
//! [`DocumentStore`] is the only way the pipeline touches persisted data:
//! get by `collection/id`, equality-filtered ordered queries, and atomic
//! multi-document commits. [`MemoryStore`] backs tests and dry runs;
//! [`FileStore`] keeps one JSON file per document on disk.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::cmp::Ordering;
use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::StoreError;

pub const LOCATION_MAPPINGS: &str = "location-mappings";
pub const COST_OF_LIVING: &str = "cost-of-living";
pub const COST_OF_LIVING_ANALYTICS: &str = "cost-of-living-analytics";
pub const CITY_SAFETY: &str = "city-safety";
pub const COUNTRY_SAFETY: &str = "country-safety";
pub const INTERNET_SPEED_CACHE: &str = "internet-speed-cache";
pub const TOP_DESTINATIONS: &str = "top-destinations";

/// Address of a single document, rendered as `collection/id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    pub collection: String,
    pub id: String,
}

impl DocumentPath {
    pub fn new(collection: &str, id: &str) -> Self {
        Self {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    /// Parses `collection/id`; both halves must be non-empty and the id may
    /// not contain another `/`.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        match raw.split_once('/') {
            Some((collection, id))
                if !collection.is_empty() && !id.is_empty() && !id.contains('/') =>
            {
                Ok(Self::new(collection, id))
            }
            _ => Err(StoreError::InvalidPath(raw.to_string())),
        }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

impl Serialize for DocumentPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DocumentPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DocumentPath::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A document returned by a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn decode<T: DeserializeOwned>(&self, collection: &str) -> Result<T, StoreError> {
        decode(&DocumentPath::new(collection, &self.id), self.data.clone())
    }
}

/// One mutation inside an atomic commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Set { path: DocumentPath, data: Value },
    Delete { path: DocumentPath },
}

impl Write {
    pub fn path(&self) -> &DocumentPath {
        match self {
            Write::Set { path, .. } | Write::Delete { path } => path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality filters, optional ordering, offset and limit.
///
/// Field names are dotted paths into the document (`scores.overall`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Applies this query to documents already held in id order.
    ///
    /// Documents lacking the ordering field are left out.
    pub fn apply(&self, documents: Vec<Document>) -> Vec<Document> {
        let mut matched: Vec<Document> = documents
            .into_iter()
            .filter(|doc| {
                self.filters
                    .iter()
                    .all(|(field, expected)| field_value(&doc.data, field) == Some(expected))
            })
            .collect();

        if let Some((field, direction)) = &self.order_by {
            matched.retain(|doc| field_value(&doc.data, field).is_some_and(|v| !v.is_null()));
            matched.sort_by(|a, b| {
                let ordering = compare_values(
                    field_value(&a.data, field).unwrap_or(&Value::Null),
                    field_value(&b.data, field).unwrap_or(&Value::Null),
                );
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        let limit = self.limit.unwrap_or(usize::MAX);
        matched.into_iter().skip(self.offset).take(limit).collect()
    }
}

/// Abstraction over the key-value document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the document at `path`, or `None` if it does not exist.
    async fn get(&self, path: &DocumentPath) -> Result<Option<Value>, StoreError>;

    /// Runs `query` over every document in `collection`.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Applies every write or none of them.
    async fn commit(&self, writes: &[Write]) -> Result<(), StoreError>;

    /// Replaces the whole document at `path`.
    async fn set(&self, path: &DocumentPath, data: Value) -> Result<(), StoreError> {
        self.commit(&[Write::Set {
            path: path.clone(),
            data,
        }])
        .await
    }
}

/// Deserializes a stored document, tagging failures with its path.
pub fn decode<T: DeserializeOwned>(path: &DocumentPath, data: Value) -> Result<T, StoreError> {
    serde_json::from_value(data).map_err(|source| StoreError::Decode {
        path: path.to_string(),
        source,
    })
}

/// Serializes a value for storage.
pub fn encode<T: Serialize>(path: &DocumentPath, value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|source| StoreError::Encode {
        path: path.to_string(),
        source,
    })
}

fn field_value<'a>(data: &'a Value, field: &str) -> Option<&'a Value> {
    field
        .split('.')
        .try_fold(data, |current, segment| current.get(segment))
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

// Mixed-type ordering: null < bool < number < string < everything else.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
