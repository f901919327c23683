//! In-memory reference implementation of [`StoreClient`].
//!
//! Documents live in an ordered map keyed by raw path. Every successful
//! mutation re-evaluates the affected watches and pushes fresh, complete
//! snapshots; watchers never see partial merges. A deny-rule policy stands
//! in for the managed store's security rules so the failure paths can be
//! exercised in-process.

use super::client::{
    DeniedRequest, StoreClient, WatchEvent, WatchHandle, WatchId, WriteOutcome, WriteTicket,
};
use crate::types::{
    CollectionPath, Direction, DocRecord, DocSnapshot, DocumentPath, FieldFilter, Fields,
    FilterOp, Operation, QueryDescriptor, QuerySnapshot,
};
use crossbeam_channel::{bounded, Sender};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Default per-watch event buffer.
const DEFAULT_WATCH_BUFFER: usize = 64;

struct QueryWatch {
    id: u64,
    query: QueryDescriptor,
    sender: Sender<WatchEvent<QuerySnapshot>>,
}

struct DocWatch {
    id: u64,
    path: DocumentPath,
    sender: Sender<WatchEvent<DocSnapshot>>,
}

/// Deny requests whose raw path starts with `prefix`.
struct DenyRule {
    prefix: String,
    /// Restrict to these operations; `None` denies every operation.
    ops: Option<Vec<Operation>>,
}

struct StoreInner {
    /// Documents keyed by raw path. BTreeMap keeps collection scans ordered.
    docs: RwLock<BTreeMap<String, Fields>>,
    query_watches: RwLock<Vec<QueryWatch>>,
    doc_watches: RwLock<Vec<DocWatch>>,
    rules: RwLock<Vec<DenyRule>>,
    next_watch: AtomicU64,
    next_doc: AtomicU64,
    watch_buffer: usize,
    /// Serializes mutate-then-broadcast so watchers observe a monotonic
    /// snapshot sequence.
    write_lock: Mutex<()>,
}

/// In-memory document store with live watches.
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_watch_buffer(DEFAULT_WATCH_BUFFER)
    }

    /// Create a store with a custom per-watch buffer size.
    pub fn with_watch_buffer(watch_buffer: usize) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                docs: RwLock::new(BTreeMap::new()),
                query_watches: RwLock::new(Vec::new()),
                doc_watches: RwLock::new(Vec::new()),
                rules: RwLock::new(Vec::new()),
                next_watch: AtomicU64::new(1),
                next_doc: AtomicU64::new(1),
                watch_buffer,
                write_lock: Mutex::new(()),
            }),
        }
    }

    // --- Security Policy ---

    /// Deny `ops` under `prefix`.
    pub fn deny(&self, prefix: impl Into<String>, ops: &[Operation]) {
        self.inner.rules.write().push(DenyRule {
            prefix: prefix.into(),
            ops: Some(ops.to_vec()),
        });
    }

    /// Deny every operation under `prefix`.
    pub fn deny_all(&self, prefix: impl Into<String>) {
        self.inner.rules.write().push(DenyRule {
            prefix: prefix.into(),
            ops: None,
        });
    }

    /// Drop all deny rules.
    pub fn clear_rules(&self) {
        self.inner.rules.write().clear();
    }

    // --- Introspection ---

    /// Number of open watches.
    pub fn watch_count(&self) -> usize {
        self.inner.query_watches.read().len() + self.inner.doc_watches.read().len()
    }

    /// Read a document directly (tests and fixtures).
    pub fn get(&self, path: &DocumentPath) -> Option<Fields> {
        self.inner.docs.read().get(&path.raw()).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreInner {
    fn is_denied(&self, op: Operation, raw: &str) -> bool {
        self.rules.read().iter().any(|rule| {
            raw.starts_with(&rule.prefix)
                && rule.ops.as_ref().map_or(true, |ops| ops.contains(&op))
        })
    }

    /// Current snapshot for a query: direct children of the collection,
    /// filtered, ordered, limited.
    fn evaluate(&self, query: &QueryDescriptor) -> QuerySnapshot {
        let prefix = format!("{}/", query.collection.raw());
        let docs = self.docs.read();

        let mut matched: Vec<DocRecord> = docs
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter(|(key, _)| !key[prefix.len()..].contains('/'))
            .filter(|(_, fields)| query.filters.iter().all(|f| filter_matches(fields, f)))
            .map(|(key, fields)| DocRecord::new(&key[prefix.len()..], fields.clone()))
            .collect();

        matched.sort_by(|a, b| {
            for clause in &query.order_by {
                let av = a.fields.get(&clause.field);
                let bv = b.fields.get(&clause.field);
                let mut ord = option_value_cmp(av, bv);
                if clause.direction == Direction::Descending {
                    ord = ord.reverse();
                }
                if ord != CmpOrdering::Equal {
                    return ord;
                }
            }
            a.id.cmp(&b.id)
        });

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        QuerySnapshot { docs: matched }
    }

    /// Push fresh snapshots to every watch affected by a change at `path`.
    /// Watchers whose buffer is full are dropped.
    fn broadcast_change(&self, path: &DocumentPath) {
        let raw = path.raw();

        let mut dead = Vec::new();
        {
            let watches = self.doc_watches.read();
            for watch in watches.iter().filter(|w| w.path == *path) {
                let snapshot = DocSnapshot {
                    id: path.id().to_string(),
                    data: self.docs.read().get(&raw).cloned(),
                };
                if watch.sender.try_send(WatchEvent::Snapshot(snapshot)).is_err() {
                    dead.push(watch.id);
                }
            }
        }
        if !dead.is_empty() {
            tracing::warn!(count = dead.len(), "dropping slow document watchers");
            self.doc_watches.write().retain(|w| !dead.contains(&w.id));
        }

        let parent = path.parent();
        let mut dead = Vec::new();
        {
            let watches = self.query_watches.read();
            for watch in watches.iter().filter(|w| w.query.collection == parent) {
                let snapshot = self.evaluate(&watch.query);
                if watch.sender.try_send(WatchEvent::Snapshot(snapshot)).is_err() {
                    dead.push(watch.id);
                }
            }
        }
        if !dead.is_empty() {
            tracing::warn!(count = dead.len(), "dropping slow query watchers");
            self.query_watches.write().retain(|w| !dead.contains(&w.id));
        }
    }
}

/// A write ticket that already carries its outcome.
fn resolved(outcome: WriteOutcome) -> WriteTicket {
    let (sender, receiver) = bounded(1);
    let _ = sender.try_send(outcome);
    WriteTicket::new(receiver)
}

impl MemoryStore {
    fn apply_write(
        &self,
        op: Operation,
        path: &DocumentPath,
        fields: Option<Fields>,
    ) -> WriteTicket {
        let inner = &self.inner;
        let _guard = inner.write_lock.lock();

        let raw = path.raw();
        if inner.is_denied(op, &raw) {
            return resolved(Err(DeniedRequest { op, path: raw }));
        }

        {
            let mut docs = inner.docs.write();
            match op {
                Operation::Create => {
                    docs.insert(raw, fields.unwrap_or_default());
                }
                Operation::Write => {
                    // set: upsert wholesale
                    docs.insert(raw, fields.unwrap_or_default());
                }
                Operation::Update => match docs.get_mut(&raw) {
                    Some(existing) => {
                        for (key, value) in fields.unwrap_or_default() {
                            existing.insert(key, value);
                        }
                    }
                    None => {
                        return resolved(Err(DeniedRequest { op, path: raw }));
                    }
                },
                Operation::Delete => {
                    // Deleting a missing document succeeds
                    docs.remove(&raw);
                }
                Operation::Get | Operation::List => unreachable!("not a write"),
            }
        }

        inner.broadcast_change(path);
        resolved(Ok(()))
    }
}

impl StoreClient for MemoryStore {
    fn watch_query(&self, query: &QueryDescriptor) -> WatchHandle<QuerySnapshot> {
        let inner = &self.inner;
        let id = inner.next_watch.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = bounded(inner.watch_buffer);

        let raw = query.collection.raw();
        if inner.is_denied(Operation::List, &raw) {
            let _ = sender.try_send(WatchEvent::Denied(DeniedRequest {
                op: Operation::List,
                path: raw,
            }));
            return WatchHandle::new(WatchId(id), receiver, || {});
        }

        // Initial snapshot is delivered immediately
        let _ = sender.try_send(WatchEvent::Snapshot(inner.evaluate(query)));
        inner.query_watches.write().push(QueryWatch {
            id,
            query: query.clone(),
            sender,
        });

        let weak: Weak<StoreInner> = Arc::downgrade(inner);
        WatchHandle::new(WatchId(id), receiver, move || {
            if let Some(inner) = weak.upgrade() {
                inner.query_watches.write().retain(|w| w.id != id);
            }
        })
    }

    fn watch_document(&self, path: &DocumentPath) -> WatchHandle<DocSnapshot> {
        let inner = &self.inner;
        let id = inner.next_watch.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = bounded(inner.watch_buffer);

        let raw = path.raw();
        if inner.is_denied(Operation::Get, &raw) {
            let _ = sender.try_send(WatchEvent::Denied(DeniedRequest {
                op: Operation::Get,
                path: raw,
            }));
            return WatchHandle::new(WatchId(id), receiver, || {});
        }

        let snapshot = DocSnapshot {
            id: path.id().to_string(),
            data: inner.docs.read().get(&raw).cloned(),
        };
        let _ = sender.try_send(WatchEvent::Snapshot(snapshot));
        inner.doc_watches.write().push(DocWatch {
            id,
            path: path.clone(),
            sender,
        });

        let weak: Weak<StoreInner> = Arc::downgrade(inner);
        WatchHandle::new(WatchId(id), receiver, move || {
            if let Some(inner) = weak.upgrade() {
                inner.doc_watches.write().retain(|w| w.id != id);
            }
        })
    }

    fn create(&self, collection: &CollectionPath, fields: Fields) -> (DocumentPath, WriteTicket) {
        let n = self.inner.next_doc.fetch_add(1, Ordering::SeqCst);
        let path = collection.doc(format!("d{:08}", n));
        let ticket = self.apply_write(Operation::Create, &path, Some(fields));
        (path, ticket)
    }

    fn set(&self, path: &DocumentPath, fields: Fields) -> WriteTicket {
        self.apply_write(Operation::Write, path, Some(fields))
    }

    fn update(&self, path: &DocumentPath, fields: Fields) -> WriteTicket {
        self.apply_write(Operation::Update, path, Some(fields))
    }

    fn delete(&self, path: &DocumentPath) -> WriteTicket {
        self.apply_write(Operation::Delete, path, None)
    }
}

fn filter_matches(fields: &Fields, filter: &FieldFilter) -> bool {
    let Some(value) = fields.get(&filter.field) else {
        return false;
    };
    match filter.op {
        FilterOp::Eq => value == &filter.value,
        FilterOp::Ne => value != &filter.value,
        FilterOp::Lt => value_cmp(value, &filter.value) == Some(CmpOrdering::Less),
        FilterOp::Le => matches!(
            value_cmp(value, &filter.value),
            Some(CmpOrdering::Less) | Some(CmpOrdering::Equal)
        ),
        FilterOp::Gt => value_cmp(value, &filter.value) == Some(CmpOrdering::Greater),
        FilterOp::Ge => matches!(
            value_cmp(value, &filter.value),
            Some(CmpOrdering::Greater) | Some(CmpOrdering::Equal)
        ),
    }
}

/// Order two JSON scalars of the same kind. Mixed kinds do not compare.
fn value_cmp(a: &Value, b: &Value) -> Option<CmpOrdering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(CmpOrdering::Equal),
        _ => None,
    }
}

/// Sort comparator treating missing fields as least and incomparable
/// values as equal.
fn option_value_cmp(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (a, b) {
        (Some(a), Some(b)) => value_cmp(a, b).unwrap_or(CmpOrdering::Equal),
        (Some(_), None) => CmpOrdering::Greater,
        (None, Some(_)) => CmpOrdering::Less,
        (None, None) => CmpOrdering::Equal,
    }
}
