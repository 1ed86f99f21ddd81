//! In-memory search transport.
//!
//! Stores documents per collection and interprets the subset of query DSL
//! produced by [`SearchQueryCompiler`](super::SearchQueryCompiler). Every
//! request is recorded, and failures can be injected per call or per
//! collection, which makes the transport suitable for embedded use and
//! for exercising backend behavior in tests.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value as Json};
use tracing::debug;

use super::transport::{SearchHit, SearchRequest, SearchResponse, SearchTransport};
use crate::error::Error;
use crate::query::{full_match_regex, PredicateEvaluator};
use fathom_proto::{OrderDirection, Value};

type Document = Map<String, Json>;

/// A document store held in memory.
#[derive(Default)]
pub struct MemoryTransport {
    collections: RwLock<BTreeMap<String, BTreeMap<String, Document>>>,
    requests: Mutex<Vec<SearchRequest>>,
    calls: AtomicUsize,
    call_failure: Mutex<Option<String>>,
    failing_collections: Mutex<BTreeSet<String>>,
    over_return: AtomicBool,
}

impl MemoryTransport {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document. Non-object JSON is stored as an empty
    /// document.
    pub fn insert(&self, collection: &str, id: impl Into<String>, document: Json) {
        let document = match document {
            Json::Object(map) => map,
            _ => Map::new(),
        };
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.into(), document);
    }

    /// Number of documents in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Whether `collection` holds no documents.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received against `collection`.
    pub fn request_count(&self, collection: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.collection == collection)
            .count()
    }

    /// Number of `multi_search` round trips.
    pub fn call_count(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    /// Forget recorded requests and round trips.
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
        self.calls.store(0, AtomicOrdering::SeqCst);
    }

    /// Fail every following call with `reason`, or stop failing with `None`.
    pub fn fail_calls(&self, reason: Option<&str>) {
        *self.call_failure.lock() = reason.map(str::to_string);
    }

    /// Fail sub-requests against `collection` while leaving others intact.
    pub fn fail_collection(&self, collection: &str) {
        self.failing_collections.lock().insert(collection.to_string());
    }

    /// Return every document of the searched collection, ignoring filters.
    ///
    /// Models a backend whose translation of predicates is looser than their
    /// meaning.
    pub fn set_over_return(&self, enabled: bool) {
        self.over_return.store(enabled, AtomicOrdering::SeqCst);
    }

    fn execute(&self, request: &SearchRequest) -> Result<SearchResponse, Error> {
        if self.failing_collections.lock().contains(&request.collection) {
            return Ok(SearchResponse::Failed(format!(
                "collection '{}' is unavailable",
                request.collection
            )));
        }

        let over_return = self.over_return.load(AtomicOrdering::SeqCst);
        let collections = self.collections.read();
        let mut hits = Vec::new();
        if let Some(documents) = collections.get(&request.collection) {
            for (id, document) in documents {
                if over_return || matches(&request.query, id, document)? {
                    hits.push(SearchHit {
                        id: id.clone(),
                        source: project(document, &request.fields),
                    });
                }
            }
        }

        if !request.sort.is_empty() {
            hits.sort_by(|a, b| compare_hits(a, b, &request.sort));
        }
        hits.truncate(request.size);

        Ok(SearchResponse::Hits(hits))
    }
}

impl SearchTransport for MemoryTransport {
    fn multi_search(&self, requests: &[SearchRequest]) -> Result<Vec<SearchResponse>, Error> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.requests.lock().extend(requests.iter().cloned());

        if let Some(reason) = self.call_failure.lock().clone() {
            return Err(Error::Transport(reason));
        }

        debug!(requests = requests.len(), "executing in-memory multi-search");
        requests.iter().map(|r| self.execute(r)).collect()
    }
}

fn project(document: &Document, fields: &BTreeSet<String>) -> Document {
    if fields.is_empty() {
        return document.clone();
    }
    document
        .iter()
        .filter(|(name, _)| fields.contains(*name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

fn compare_hits(a: &SearchHit, b: &SearchHit, sort: &[(String, OrderDirection)]) -> Ordering {
    for (field, direction) in sort {
        let left = a.source.get(field).map(Value::from_json);
        let right = b.source.get(field).map(Value::from_json);
        let ordering = match (left, right) {
            (Some(l), Some(r)) => l.compare(&r).unwrap_or(Ordering::Equal),
            // Missing values sort last
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        let ordering = match direction {
            OrderDirection::Desc => ordering.reverse(),
            _ => ordering,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn unsupported(clause: &Json) -> Error {
    Error::Transport(format!("unsupported query clause: {}", clause))
}

/// The single `field: operand` entry of a leaf clause.
fn leaf(clause: &Json) -> Result<(&str, &Json), Error> {
    clause
        .as_object()
        .filter(|o| o.len() == 1)
        .and_then(|o| o.iter().next())
        .map(|(k, v)| (k.as_str(), v))
        .ok_or_else(|| unsupported(clause))
}

/// Field values of a document, one per entry for array fields.
fn field_values(document: &Document, field: &str) -> Vec<Value> {
    match document.get(field).map(Value::from_json) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::List(items)) => items,
        Some(single) => vec![single],
    }
}

fn all(document: &Document, id: &str, clauses: Option<&Json>) -> Result<Vec<bool>, Error> {
    let clauses = match clauses {
        None => return Ok(Vec::new()),
        Some(Json::Array(items)) => items.iter().collect::<Vec<_>>(),
        Some(single) => vec![single],
    };
    clauses.into_iter().map(|c| matches(c, id, document)).collect()
}

fn matches(query: &Json, id: &str, document: &Document) -> Result<bool, Error> {
    let (kind, body) = leaf(query)?;

    match kind {
        "match_all" => Ok(true),
        "constant_score" => {
            let filter = body.get("filter").ok_or_else(|| unsupported(query))?;
            matches(filter, id, document)
        }
        "bool" => {
            let must = all(document, id, body.get("must"))?;
            let filter = all(document, id, body.get("filter"))?;
            let should = all(document, id, body.get("should"))?;
            let must_not = all(document, id, body.get("must_not"))?;
            Ok(must.iter().all(|m| *m)
                && filter.iter().all(|m| *m)
                && (should.is_empty() || should.iter().any(|m| *m))
                && !must_not.iter().any(|m| *m))
        }
        "ids" => {
            let values = body
                .get("values")
                .and_then(Json::as_array)
                .ok_or_else(|| unsupported(query))?;
            Ok(values.iter().any(|v| v.as_str() == Some(id)))
        }
        "exists" => {
            let field = body
                .get("field")
                .and_then(Json::as_str)
                .ok_or_else(|| unsupported(query))?;
            Ok(!field_values(document, field).is_empty())
        }
        "term" => {
            let (field, operand) = leaf(body)?;
            let operand = Value::from_json(operand);
            Ok(field_values(document, field)
                .iter()
                .any(|v| v.loosely_equals(&operand)))
        }
        "terms" => {
            let (field, operand) = leaf(body)?;
            let members = operand.as_array().ok_or_else(|| unsupported(query))?;
            let members: Vec<Value> = members.iter().map(Value::from_json).collect();
            Ok(field_values(document, field)
                .iter()
                .any(|v| members.iter().any(|m| v.loosely_equals(m))))
        }
        "range" => {
            let (field, bounds) = leaf(body)?;
            let bounds = bounds.as_object().ok_or_else(|| unsupported(query))?;
            let values = field_values(document, field);
            let mut matched = false;
            for value in &values {
                let mut ok = true;
                for (bound, operand) in bounds {
                    let ordering = value.compare(&Value::from_json(operand));
                    ok &= match (bound.as_str(), ordering) {
                        ("gt", Some(o)) => o.is_gt(),
                        ("gte", Some(o)) => o.is_ge(),
                        ("lt", Some(o)) => o.is_lt(),
                        ("lte", Some(o)) => o.is_le(),
                        (_, None) => false,
                        _ => return Err(unsupported(query)),
                    };
                }
                matched |= ok;
            }
            Ok(matched)
        }
        "prefix" | "wildcard" | "regexp" => {
            let (field, operand) = leaf(body)?;
            let pattern = operand.as_str().ok_or_else(|| unsupported(query))?;
            let regex = if kind == "regexp" {
                Some(
                    full_match_regex(pattern)
                        .map_err(|e| Error::Transport(format!("invalid regexp: {}", e)))?,
                )
            } else {
                None
            };
            Ok(field_values(document, field).iter().any(|v| {
                let Some(text) = v.as_str() else {
                    return false;
                };
                match kind {
                    "prefix" => text.starts_with(pattern),
                    "wildcard" => PredicateEvaluator::wildcard_match(text, pattern),
                    _ => regex.as_ref().map(|r| r.is_match(text)).unwrap_or(false),
                }
            }))
        }
        _ => Err(unsupported(query)),
    }
}
