//! Transport port for executing search requests against a document store.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};

use crate::error::Error;
use fathom_proto::OrderDirection;

/// One search against a named collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Collection (index) searched.
    pub collection: String,
    /// Compiled filter expression.
    pub query: Json,
    /// Maximum number of hits.
    pub size: usize,
    /// Sort directives; only ascending and descending are sent.
    pub sort: Vec<(String, OrderDirection)>,
    /// Source fields to return; empty means all.
    pub fields: BTreeSet<String>,
}

impl SearchRequest {
    /// Create a request with no sorting and full sources.
    pub fn new(collection: impl Into<String>, query: Json, size: usize) -> Self {
        Self {
            collection: collection.into(),
            query,
            size,
            sort: Vec::new(),
            fields: BTreeSet::new(),
        }
    }

    /// Add a sort directive. `OrderDirection::None` is ignored.
    pub fn with_sort(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        if direction != OrderDirection::None {
            self.sort.push((field.into(), direction));
        }
        self
    }

    /// Restrict returned source fields.
    pub fn with_fields(mut self, fields: BTreeSet<String>) -> Self {
        self.fields = fields;
        self
    }

    /// The request body in search-engine JSON form.
    pub fn to_body(&self) -> Json {
        let mut body = Map::new();
        body.insert("query".to_string(), self.query.clone());
        body.insert("size".to_string(), json!(self.size));
        if !self.sort.is_empty() {
            let sort: Vec<Json> = self
                .sort
                .iter()
                .map(|(field, direction)| {
                    let order = match direction {
                        OrderDirection::Desc => "desc",
                        _ => "asc",
                    };
                    json!({ field.as_str(): { "order": order } })
                })
                .collect();
            body.insert("sort".to_string(), Json::Array(sort));
        }
        if self.fields.is_empty() {
            body.insert("_source".to_string(), Json::Bool(true));
        } else {
            body.insert("_source".to_string(), json!(self.fields));
        }
        Json::Object(body)
    }
}

/// A document returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Document id.
    pub id: String,
    /// Document source fields.
    pub source: Map<String, Json>,
}

/// Outcome of one sub-request in a multi-search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResponse {
    /// The sub-request succeeded.
    Hits(Vec<SearchHit>),
    /// The sub-request failed; other sub-requests may still have succeeded.
    Failed(String),
}

/// Executes search requests against a document store.
pub trait SearchTransport: Send + Sync {
    /// Run several searches in one round trip.
    ///
    /// Returns one response per request, in request order. An `Err` means the
    /// whole call failed; a failed sub-request is reported as
    /// [`SearchResponse::Failed`].
    fn multi_search(&self, requests: &[SearchRequest]) -> Result<Vec<SearchResponse>, Error>;
}
