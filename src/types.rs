//! Core types for the sync layer.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// JSON object used as a document's field map.
pub type Fields = Map<String, Value>;

/// The database id used when none is configured.
pub const DEFAULT_DATABASE: &str = "(default)";

/// Fully qualified resource name for a raw store path.
///
/// This is the form security-policy diagnostics use:
/// `/databases/(default)/documents/users/u1/chatSessions`.
pub fn qualified_resource(database: &str, raw: &str) -> String {
    format!("/databases/{}/documents/{}", database, raw)
}

fn parse_segments(raw: &str) -> Result<Vec<String>> {
    if raw.is_empty() {
        return Err(SyncError::InvalidPath("empty path".to_string()));
    }
    let segments: Vec<String> = raw.split('/').map(str::to_string).collect();
    if segments.iter().any(String::is_empty) {
        return Err(SyncError::InvalidPath(format!("empty segment in {:?}", raw)));
    }
    Ok(segments)
}

/// Path to a single document: alternating collection/id segments,
/// so always an even count (`users/u1`, `users/u1/chatSessions/s1`).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl DocumentPath {
    /// Build from segments known to satisfy the parity invariant.
    pub(crate) fn from_segments(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Parse from a slash-separated string.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self> {
        let segments = parse_segments(raw.as_ref())?;
        if segments.len() % 2 != 0 {
            return Err(SyncError::InvalidPath(format!(
                "document path needs an even number of segments: {:?}",
                raw.as_ref()
            )));
        }
        Ok(Self { segments })
    }

    /// The document id (last segment).
    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// The collection this document lives in.
    pub fn parent(&self) -> CollectionPath {
        CollectionPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    /// A subcollection under this document.
    pub fn collection(&self, name: impl Into<String>) -> CollectionPath {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        CollectionPath { segments }
    }

    /// Slash-separated store path.
    pub fn raw(&self) -> String {
        self.segments.join("/")
    }

    /// Fully qualified resource name.
    pub fn qualified(&self, database: &str) -> String {
        qualified_resource(database, &self.raw())
    }
}

impl fmt::Debug for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentPath({})", self.raw())
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}

/// Path to a collection: odd segment count (`users`, `users/u1/chatSessions`).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    /// Build from segments known to satisfy the parity invariant.
    pub(crate) fn from_segments(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Parse from a slash-separated string.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self> {
        let segments = parse_segments(raw.as_ref())?;
        if segments.len() % 2 != 1 {
            return Err(SyncError::InvalidPath(format!(
                "collection path needs an odd number of segments: {:?}",
                raw.as_ref()
            )));
        }
        Ok(Self { segments })
    }

    /// A document inside this collection.
    pub fn doc(&self, id: impl Into<String>) -> DocumentPath {
        let mut segments = self.segments.clone();
        segments.push(id.into());
        DocumentPath { segments }
    }

    /// Slash-separated store path.
    pub fn raw(&self) -> String {
        self.segments.join("/")
    }

    /// Fully qualified resource name.
    pub fn qualified(&self, database: &str) -> String {
        qualified_resource(database, &self.raw())
    }
}

impl fmt::Debug for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionPath({})", self.raw())
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}

/// Comparison operator for a field filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A single field predicate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

/// Sort direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordering clause.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// What to watch: a collection plus predicates, ordering, and a limit.
///
/// Descriptors are plain values; the live layer compares them structurally,
/// so two independently built but equal descriptors refer to the same watch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub collection: CollectionPath,
    pub filters: Vec<FieldFilter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
}

impl QueryDescriptor {
    /// Watch every document in a collection.
    pub fn collection(collection: CollectionPath) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Add a field predicate.
    pub fn where_field(
        mut self,
        field: impl Into<String>,
        op: FilterOp,
        value: impl Into<Value>,
    ) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Add an ordering clause.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Cap the result set.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A loosely-typed record: the document's fields plus its store key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocRecord {
    pub id: String,
    pub fields: Fields,
}

impl DocRecord {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Fields with the id merged in under `"id"`.
    pub fn merged_value(&self) -> Value {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(fields)
    }

    /// Deserialize into a typed struct; the id is merged in first,
    /// so target types may carry an `id` field.
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.merged_value())?)
    }
}

/// Point-in-time contents of a watched collection.
#[derive(Clone, Debug, PartialEq)]
pub struct QuerySnapshot {
    pub docs: Vec<DocRecord>,
}

/// Point-in-time state of a watched document.
///
/// `data: None` means the document does not exist, which is distinct from
/// "no snapshot received yet".
#[derive(Clone, Debug, PartialEq)]
pub struct DocSnapshot {
    pub id: String,
    pub data: Option<Fields>,
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards");
        Timestamp(duration.as_micros() as i64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Kind of store operation, as tagged in permission diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Fetch a single document.
    Get,
    /// Fetch a collection.
    List,
    Create,
    Update,
    Delete,
    /// A write whose exact kind is unknown.
    Write,
}

impl Operation {
    /// The verb used in security-policy evaluation requests.
    pub fn method(self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::List => "list",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Write => "write",
        }
    }

    /// Whether the request carries a payload worth reporting.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Operation::Create | Operation::Update | Operation::Write
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.method())
    }
}
