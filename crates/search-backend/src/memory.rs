//! In-process backend for tests and local development.
//!
//! Stores documents as JSON in memory, evaluates [`Filter`] trees and applies
//! [`UpdateScript`] statements directly, so engine behavior can be checked
//! without a running cluster. Every call is recorded and any operation can be
//! made to fail on demand.
//!
//! Writes are visible immediately; the `refresh` flag of each request is only
//! recorded. Writing to a missing index creates it with an empty mapping, the
//! way a cluster with automatic index creation does.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use search_types::{
    FieldPath, Filter, IndexMapping, ScriptStatement, SortField, SortOrder, UpdateScript,
};

use crate::backend::SearchBackend;
use crate::error::BackendError;
use crate::requests::{
    BulkItemFailure, BulkRequest, BulkResponse, DeleteByQueryRequest, DeleteRequest,
    IndexRequest, SearchHit, SearchRequest, SearchResponse, UpdateBody, UpdateByQueryRequest,
    UpdateRequest,
};
use crate::schema::IndexDefinition;

/// Page size used when a search does not ask for one.
pub const DEFAULT_SEARCH_SIZE: usize = 10;

/// Backend operations, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    IndexExists,
    CreateIndex,
    DeleteIndex,
    BulkIndex,
    IndexDocument,
    UpdateDocument,
    UpdateByQuery,
    DeleteDocument,
    DeleteByQuery,
    Flush,
    Refresh,
    Search,
}

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    IndexExists {
        index: String,
    },
    CreateIndex {
        index: String,
        analyzers: Vec<String>,
    },
    DeleteIndex {
        index: String,
    },
    BulkIndex {
        ids: Vec<String>,
        pipelines: Vec<Option<String>>,
        refresh: bool,
    },
    IndexDocument {
        index: String,
        id: String,
        pipeline: Option<String>,
        refresh: bool,
    },
    UpdateDocument {
        index: String,
        id: String,
        scripted: bool,
        refresh: bool,
    },
    UpdateByQuery {
        index: String,
        refresh: bool,
    },
    DeleteDocument {
        index: String,
        id: String,
        refresh: bool,
    },
    DeleteByQuery {
        index: String,
        refresh: bool,
    },
    Flush {
        index: String,
    },
    Refresh {
        index: String,
    },
    Search {
        index: String,
        only_ids: bool,
    },
}

#[derive(Debug, Default)]
struct MemoryIndex {
    definition: Option<IndexDefinition>,
    docs: Vec<(String, Value)>,
}

impl MemoryIndex {
    fn position(&self, id: &str) -> Option<usize> {
        self.docs.iter().position(|(doc_id, _)| doc_id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Value> {
        self.docs
            .iter_mut()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(_, source)| source)
    }

    fn put(&mut self, id: String, source: Value) {
        match self.position(&id) {
            Some(pos) => self.docs[pos].1 = source,
            None => self.docs.push((id, source)),
        }
    }
}

/// [`SearchBackend`] holding everything in process memory.
pub struct MemoryBackend {
    indexes: RwLock<HashMap<String, MemoryIndex>>,
    pipelines: HashSet<String>,
    calls: Mutex<Vec<BackendCall>>,
    failing: Mutex<HashSet<BackendOp>>,
    rejected_ids: Mutex<HashSet<String>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Backend that knows the `attachments` ingest pipeline.
    pub fn new() -> Self {
        Self {
            indexes: RwLock::new(HashMap::new()),
            pipelines: HashSet::from(["attachments".to_string()]),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            rejected_ids: Mutex::new(HashSet::new()),
        }
    }

    /// Register another ingest pipeline name.
    pub fn with_pipeline(mut self, name: impl Into<String>) -> Self {
        self.pipelines.insert(name.into());
        self
    }

    /// Make every subsequent call of `op` fail with [`BackendError::Unavailable`].
    pub fn fail_on(&self, op: BackendOp) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(op);
        }
    }

    /// Stop injecting failures.
    pub fn clear_failures(&self) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.clear();
        }
        if let Ok(mut rejected) = self.rejected_ids.lock() {
            rejected.clear();
        }
    }

    /// Reject the given document id inside bulk requests (item-level failure).
    pub fn reject_id(&self, id: impl Into<String>) {
        if let Ok(mut rejected) = self.rejected_ids.lock() {
            rejected.insert(id.into());
        }
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of recorded calls matching the predicate.
    pub fn count_calls(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls
            .lock()
            .map(|c| c.iter().filter(|call| predicate(call)).count())
            .unwrap_or(0)
    }

    /// Forget recorded calls.
    pub fn reset_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    /// Stored source of a document.
    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        let indexes = self.indexes.read().ok()?;
        let idx = indexes.get(index)?;
        idx.docs
            .iter()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(_, source)| source.clone())
    }

    /// Number of documents in an index (0 if it does not exist).
    pub fn document_count(&self, index: &str) -> usize {
        self.indexes
            .read()
            .ok()
            .and_then(|indexes| indexes.get(index).map(|idx| idx.docs.len()))
            .unwrap_or(0)
    }

    /// Mapping the index was created with, if created explicitly.
    pub fn mapping(&self, index: &str) -> Option<IndexMapping> {
        let indexes = self.indexes.read().ok()?;
        indexes
            .get(index)?
            .definition
            .as_ref()
            .map(|d| d.mapping().clone())
    }

    fn record(&self, call: BackendCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn check_failure(&self, op: BackendOp) -> Result<(), BackendError> {
        let failing = self
            .failing
            .lock()
            .map(|f| f.contains(&op))
            .unwrap_or(false);
        if failing {
            return Err(BackendError::Unavailable(format!("injected failure: {:?}", op)));
        }
        Ok(())
    }

    fn is_rejected(&self, id: &str) -> bool {
        self.rejected_ids
            .lock()
            .map(|r| r.contains(id))
            .unwrap_or(false)
    }

    fn check_pipeline(&self, pipeline: &Option<String>) -> Result<(), String> {
        match pipeline {
            Some(name) if !self.pipelines.contains(name) => {
                Err(format!("pipeline with id [{}] does not exist", name))
            }
            _ => Ok(()),
        }
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, MemoryIndex>>, BackendError> {
        self.indexes
            .write()
            .map_err(|e| BackendError::Unavailable(e.to_string()))
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, MemoryIndex>>, BackendError> {
        self.indexes
            .read()
            .map_err(|e| BackendError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl SearchBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn index_exists(&self, index: &str) -> Result<bool, BackendError> {
        self.record(BackendCall::IndexExists {
            index: index.to_string(),
        });
        self.check_failure(BackendOp::IndexExists)?;
        Ok(self.read()?.contains_key(index))
    }

    async fn create_index(&self, definition: &IndexDefinition) -> Result<(), BackendError> {
        self.record(BackendCall::CreateIndex {
            index: definition.name().to_string(),
            analyzers: definition.analyzer_names(),
        });
        self.check_failure(BackendOp::CreateIndex)?;
        definition.validate()?;

        let mut indexes = self.write()?;
        if indexes.contains_key(definition.name()) {
            return Err(BackendError::Status {
                status: 400,
                body: format!("resource_already_exists_exception: {}", definition.name()),
            });
        }
        indexes.insert(
            definition.name().to_string(),
            MemoryIndex {
                definition: Some(definition.clone()),
                docs: Vec::new(),
            },
        );
        debug!(index = %definition.name(), "Created in-memory index");
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), BackendError> {
        self.record(BackendCall::DeleteIndex {
            index: index.to_string(),
        });
        self.check_failure(BackendOp::DeleteIndex)?;
        self.write()?.remove(index);
        Ok(())
    }

    async fn bulk_index(&self, request: BulkRequest) -> Result<BulkResponse, BackendError> {
        self.record(BackendCall::BulkIndex {
            ids: request.operations.iter().map(|op| op.id.to_string()).collect(),
            pipelines: request.operations.iter().map(|op| op.pipeline.clone()).collect(),
            refresh: request.refresh,
        });
        self.check_failure(BackendOp::BulkIndex)?;

        let mut response = BulkResponse::default();
        let mut indexes = self.write()?;
        for op in request.operations {
            let id = op.id.to_string();
            if self.is_rejected(&id) {
                response.failures.push(BulkItemFailure {
                    id,
                    status: 400,
                    reason: "rejected".to_string(),
                });
                continue;
            }
            if let Err(reason) = self.check_pipeline(&op.pipeline) {
                response.failures.push(BulkItemFailure {
                    id,
                    status: 400,
                    reason,
                });
                continue;
            }
            indexes.entry(op.index).or_default().put(id, op.source);
            response.indexed += 1;
        }
        Ok(response)
    }

    async fn index_document(&self, request: IndexRequest) -> Result<(), BackendError> {
        let id = request.id.to_string();
        self.record(BackendCall::IndexDocument {
            index: request.index.clone(),
            id: id.clone(),
            pipeline: request.pipeline.clone(),
            refresh: request.refresh,
        });
        self.check_failure(BackendOp::IndexDocument)?;
        self.check_pipeline(&request.pipeline)
            .map_err(|body| BackendError::Status { status: 400, body })?;

        self.write()?
            .entry(request.index)
            .or_default()
            .put(id, request.source);
        Ok(())
    }

    async fn update_document(&self, request: UpdateRequest) -> Result<(), BackendError> {
        let id = request.id.to_string();
        self.record(BackendCall::UpdateDocument {
            index: request.index.clone(),
            id: id.clone(),
            scripted: matches!(request.body, UpdateBody::Script(_)),
            refresh: request.refresh,
        });
        self.check_failure(BackendOp::UpdateDocument)?;

        let mut indexes = self.write()?;
        let index = indexes.entry(request.index.clone()).or_default();
        match request.body {
            UpdateBody::Script(script) => {
                let doc = index.get_mut(&id).ok_or_else(|| {
                    BackendError::DocumentNotFound(format!("{}/{}", request.index, id))
                })?;
                apply_script(&script, doc)
            }
            UpdateBody::Doc { doc, upsert } => match index.get_mut(&id) {
                Some(existing) => {
                    merge(existing, &doc);
                    Ok(())
                }
                None if upsert => {
                    index.put(id, doc);
                    Ok(())
                }
                None => Err(BackendError::DocumentNotFound(format!(
                    "{}/{}",
                    request.index, id
                ))),
            },
        }
    }

    async fn update_by_query(&self, request: UpdateByQueryRequest) -> Result<u64, BackendError> {
        self.record(BackendCall::UpdateByQuery {
            index: request.index.clone(),
            refresh: request.refresh,
        });
        self.check_failure(BackendOp::UpdateByQuery)?;

        let mut indexes = self.write()?;
        let index = indexes
            .get_mut(&request.index)
            .ok_or_else(|| BackendError::IndexNotFound(request.index.clone()))?;
        let mut updated = 0;
        for (_, source) in index.docs.iter_mut() {
            if matches(&request.query, source) {
                apply_script(&request.script, source)?;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete_document(&self, request: DeleteRequest) -> Result<(), BackendError> {
        let id = request.id.to_string();
        self.record(BackendCall::DeleteDocument {
            index: request.index.clone(),
            id: id.clone(),
            refresh: request.refresh,
        });
        self.check_failure(BackendOp::DeleteDocument)?;

        if let Some(index) = self.write()?.get_mut(&request.index) {
            index.docs.retain(|(doc_id, _)| *doc_id != id);
        }
        Ok(())
    }

    async fn delete_by_query(&self, request: DeleteByQueryRequest) -> Result<u64, BackendError> {
        self.record(BackendCall::DeleteByQuery {
            index: request.index.clone(),
            refresh: request.refresh,
        });
        self.check_failure(BackendOp::DeleteByQuery)?;

        let mut indexes = self.write()?;
        let index = indexes
            .get_mut(&request.index)
            .ok_or_else(|| BackendError::IndexNotFound(request.index.clone()))?;
        let before = index.docs.len();
        index
            .docs
            .retain(|(_, source)| !matches(&request.query, source));
        Ok((before - index.docs.len()) as u64)
    }

    async fn flush(&self, index: &str) -> Result<(), BackendError> {
        self.record(BackendCall::Flush {
            index: index.to_string(),
        });
        self.check_failure(BackendOp::Flush)?;
        if !self.read()?.contains_key(index) {
            return Err(BackendError::IndexNotFound(index.to_string()));
        }
        Ok(())
    }

    async fn refresh(&self, index: &str) -> Result<(), BackendError> {
        self.record(BackendCall::Refresh {
            index: index.to_string(),
        });
        self.check_failure(BackendOp::Refresh)?;
        if !self.read()?.contains_key(index) {
            return Err(BackendError::IndexNotFound(index.to_string()));
        }
        Ok(())
    }

    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, BackendError> {
        self.record(BackendCall::Search {
            index: request.index.clone(),
            only_ids: request.only_ids,
        });
        self.check_failure(BackendOp::Search)?;

        let indexes = self.read()?;
        let index = indexes
            .get(&request.index)
            .ok_or_else(|| BackendError::IndexNotFound(request.index.clone()))?;

        let mut matched: Vec<&(String, Value)> = index
            .docs
            .iter()
            .filter(|(_, source)| matches(&request.query, source))
            .collect();
        if !request.sort.is_empty() {
            matched.sort_by(|a, b| compare_by(&request.sort, &a.1, &b.1));
        }

        let total = matched.len() as u64;
        let hits = matched
            .into_iter()
            .skip(request.from.unwrap_or(0))
            .take(request.size.unwrap_or(DEFAULT_SEARCH_SIZE))
            .map(|(id, source)| SearchHit {
                id: id.clone(),
                source: if request.only_ids {
                    None
                } else {
                    Some(source.clone())
                },
            })
            .collect();
        Ok(SearchResponse { total, hits })
    }
}

/// Leaf values at a path, flattening arrays along the way.
fn field_values<'a>(doc: &'a Value, path: &FieldPath) -> Vec<&'a Value> {
    let mut current = vec![doc];
    for segment in path.segments() {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => {
                    if let Some(v) = map.get(segment) {
                        next.push(v);
                    }
                }
                Value::Array(items) => {
                    next.extend(items.iter().filter_map(|item| item.get(segment)));
                }
                _ => {}
            }
        }
        current = next;
    }
    current
        .into_iter()
        .flat_map(|v| match v {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .collect()
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
            *s == n.to_string()
        }
        _ => a == b,
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Evaluate a filter against a stored document.
pub fn matches(filter: &Filter, doc: &Value) -> bool {
    match filter {
        Filter::MatchAll => true,
        Filter::Term { field, value } => field_values(doc, field)
            .iter()
            .any(|v| values_equal(v, value)),
        Filter::Terms { field, values } => field_values(doc, field)
            .iter()
            .any(|v| values.iter().any(|candidate| values_equal(v, candidate))),
        Filter::Match { field, text } => {
            let wanted = tokens(text);
            field_values(doc, field).iter().any(|v| match v {
                Value::String(s) => {
                    let have = tokens(s);
                    wanted.iter().any(|w| have.contains(w))
                }
                other => wanted.iter().any(|w| *w == other.to_string()),
            })
        }
        Filter::Range { field, gte, lte } => field_values(doc, field).iter().any(|v| {
            let above = gte.as_ref().map_or(true, |lower| {
                matches!(
                    compare_values(v, lower),
                    Some(Ordering::Greater | Ordering::Equal)
                )
            });
            let below = lte.as_ref().map_or(true, |upper| {
                matches!(
                    compare_values(v, upper),
                    Some(Ordering::Less | Ordering::Equal)
                )
            });
            above && below
        }),
        Filter::Exists { field } => field_values(doc, field).iter().any(|v| !v.is_null()),
        Filter::All(parts) => parts.iter().all(|p| matches(p, doc)),
        Filter::Any(parts) => parts.iter().any(|p| matches(p, doc)),
        Filter::Not(inner) => !matches(inner, doc),
    }
}

fn compare_by(sort: &[SortField], a: &Value, b: &Value) -> Ordering {
    for key in sort {
        let left = field_values(a, &key.field).into_iter().next();
        let right = field_values(b, &key.field).into_iter().next();
        // Missing values sort last in both directions.
        let ordering = match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => return Ordering::Greater,
            (Some(_), None) => return Ordering::Less,
            (Some(l), Some(r)) => compare_values(l, r).unwrap_or(Ordering::Equal),
        };
        let ordering = match key.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn value_at_mut<'a>(doc: &'a mut Value, segments: &[String]) -> Option<&'a mut Value> {
    let mut current = doc;
    for segment in segments {
        current = current.as_object_mut()?.get_mut(segment)?;
    }
    Some(current)
}

/// Containing object of `path`, creating intermediate objects.
fn parent_object<'a>(
    doc: &'a mut Value,
    path: &FieldPath,
) -> Result<(&'a mut Map<String, Value>, String), BackendError> {
    let (leaf, parents) = path
        .segments()
        .split_last()
        .ok_or_else(|| BackendError::Script("empty field path".to_string()))?;
    let mut current = doc;
    for segment in parents {
        let map = current
            .as_object_mut()
            .ok_or_else(|| BackendError::Script(format!("{} is not an object", segment)))?;
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    let map = current
        .as_object_mut()
        .ok_or_else(|| BackendError::Script(format!("parent of {} is not an object", path)))?;
    Ok((map, leaf.clone()))
}

fn param<'a>(script: &'a UpdateScript, key: &str) -> Result<&'a Value, BackendError> {
    script
        .param(key)
        .ok_or_else(|| BackendError::Script(format!("missing parameter {}", key)))
}

fn list_at<'a>(doc: &'a mut Value, path: &FieldPath) -> Result<&'a mut Vec<Value>, BackendError> {
    let (parent, leaf) = parent_object(doc, path)?;
    let slot = parent.entry(leaf).or_insert(Value::Null);
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    slot.as_array_mut()
        .ok_or_else(|| BackendError::Script(format!("{} is not a list", path)))
}

fn identity_equal(item: &Value, target: &Value, identity: &str) -> bool {
    match (item.get(identity), target.get(identity)) {
        (Some(a), Some(b)) => values_equal(a, b),
        _ => values_equal(item, target),
    }
}

/// Apply a compiled update script to a stored document.
///
/// A missing list counts as empty for `AddIfAbsent`.
pub fn apply_script(script: &UpdateScript, doc: &mut Value) -> Result<(), BackendError> {
    for statement in script.statements() {
        match statement {
            ScriptStatement::Set { path, param: key } => {
                let value = param(script, key)?.clone();
                let (parent, leaf) = parent_object(doc, path)?;
                parent.insert(leaf, value);
            }
            ScriptStatement::RemoveField { path } => {
                let Some((leaf, parents)) = path.segments().split_last() else {
                    continue;
                };
                if let Some(Value::Object(parent)) = value_at_mut(doc, parents) {
                    parent.remove(leaf);
                }
            }
            ScriptStatement::AddIfAbsent { path, param: key } => {
                let value = param(script, key)?.clone();
                let list = list_at(doc, path)?;
                if !list.contains(&value) {
                    list.push(value);
                }
            }
            ScriptStatement::RemoveMatching {
                path,
                param: key,
                identity,
            } => {
                let target = param(script, key)?.clone();
                if let Some(Value::Array(list)) = value_at_mut(doc, path.segments()) {
                    list.retain(|item| !identity_equal(item, &target, identity));
                }
            }
        }
    }
    Ok(())
}

fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(changes)) => {
            for (key, value) in changes {
                merge(existing.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}
