//! Backend implementation over a search-engine document store.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use super::compiler::{QueryCompiler, SearchQueryCompiler};
use super::factory::{DefaultElementFactory, ElementFactory};
use super::transport::{SearchRequest, SearchResponse, SearchTransport};
use crate::backend::{Backend, Results};
use crate::config::GraphConfig;
use crate::deferred::{DeferredLoader, DeferredVertex};
use crate::error::Error;
use crate::query::PredicateEvaluator;
use fathom_proto::{
    Direction, Edge, Element, ElementId, ElementKind, FieldMap, Predicate, PredicateTree, Query,
    Value, VertexQuery,
};

struct Inner<T> {
    transport: T,
    compiler: Arc<dyn QueryCompiler>,
    factory: Arc<dyn ElementFactory>,
    config: GraphConfig,
}

/// A read-only graph backed by vertex and edge collections in a search
/// engine.
///
/// Cloning is cheap; clones share the transport.
pub struct SearchBackend<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SearchBackend<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for SearchBackend<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchBackend")
            .field("config", &self.inner.config)
            .finish()
    }
}

impl<T: SearchTransport + 'static> SearchBackend<T> {
    /// Create a backend with the default compiler and element factory.
    pub fn new(transport: T, config: GraphConfig) -> Self {
        let compiler = Arc::new(SearchQueryCompiler::new(config.label_field.clone()));
        let factory = Arc::new(DefaultElementFactory::new(&config));
        Self::with_parts(transport, config, compiler, factory)
    }

    /// Create a backend with a custom compiler and element factory.
    pub fn with_parts(
        transport: T,
        config: GraphConfig,
        compiler: Arc<dyn QueryCompiler>,
        factory: Arc<dyn ElementFactory>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                compiler,
                factory,
                config,
            }),
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Backend configuration.
    pub fn config(&self) -> &GraphConfig {
        &self.inner.config
    }

    /// Run several queries in a single multi-search round trip.
    ///
    /// A failed sub-query contributes no results and is logged; the others
    /// are still returned. A failure of the whole call surfaces as an error.
    pub fn query_many(&self, queries: &[Query]) -> Results<Element> {
        let mut requests = Vec::with_capacity(queries.len());
        for query in queries {
            match self.inner.request(query, &query.predicates) {
                Ok(request) => requests.push(request),
                Err(e) => return Results::lazy(move || Err(e)),
            }
        }

        let inner = self.inner.clone();
        let queries = queries.to_vec();
        Results::lazy(move || {
            let responses = inner.execute(&requests)?;
            let mut out = Vec::new();
            for (query, response) in queries.iter().zip(responses) {
                let mut matched = Vec::new();
                for element in inner.elements(query.kind, response)? {
                    if PredicateEvaluator::evaluate(&query.predicates, &element)? {
                        matched.push(element);
                    }
                }
                truncate(&mut matched, query.limit);
                out.extend(matched);
            }
            Ok(out)
        })
    }
}

impl<T: SearchTransport> Inner<T> {
    /// Build the search for `shape`, filtering on `predicates`.
    fn request(&self, shape: &Query, predicates: &PredicateTree) -> Result<SearchRequest, Error> {
        let kind = shape.kind;
        let compiled = self.compiler.compile(predicates)?;
        let mut request = SearchRequest::new(
            self.config.collection(kind),
            compiled,
            self.config.effective_limit(shape.limit),
        );
        for order in &shape.order {
            request = request.with_sort(order.field.clone(), order.direction);
        }
        if !shape.fields.is_empty() {
            let mut fields = shape.fields.clone();
            fields.insert(self.config.label_field.clone());
            if kind == ElementKind::Edge {
                fields.insert(self.config.out_id_field.clone());
                fields.insert(self.config.in_id_field.clone());
            }
            request = request.with_fields(fields);
        }
        Ok(request)
    }

    /// Run a multi-search, dropping failed sub-responses.
    fn execute(&self, requests: &[SearchRequest]) -> Result<Vec<SearchResponse>, Error> {
        for request in requests {
            debug!(
                collection = %request.collection,
                size = request.size,
                query = %request.query,
                "running search"
            );
        }

        let responses = self.transport.multi_search(requests)?;
        Ok(responses
            .into_iter()
            .zip(requests)
            .map(|(response, request)| match response {
                SearchResponse::Failed(reason) => {
                    warn!(
                        collection = %request.collection,
                        %reason,
                        "search sub-query failed; skipping its results"
                    );
                    SearchResponse::Hits(Vec::new())
                }
                hits => hits,
            })
            .collect())
    }

    fn elements(&self, kind: ElementKind, response: SearchResponse) -> Result<Vec<Element>, Error> {
        let hits = match response {
            SearchResponse::Hits(hits) => hits,
            SearchResponse::Failed(_) => return Ok(Vec::new()),
        };
        hits.into_iter()
            .map(|hit| {
                let fields: FieldMap = hit
                    .source
                    .iter()
                    .map(|(name, value)| {
                        if value.is_object() {
                            debug!(id = %hit.id, field = %name, "nested object field read as null");
                        }
                        (name.clone(), Value::from_json(value))
                    })
                    .collect();
                self.factory.create(kind, ElementId::new(hit.id), fields)
            })
            .collect()
    }

    /// Edge predicate selecting edges incident to `ids` on `direction`.
    fn incidence_predicates(&self, ids: &BTreeSet<ElementId>, direction: Direction) -> PredicateTree {
        let side = |field: &str| {
            let values: Vec<Value> = ids.iter().map(Value::from).collect();
            PredicateTree::single(Predicate::within(field, values))
        };
        match direction {
            Direction::Out => side(&self.config.out_id_field),
            Direction::In => side(&self.config.in_id_field),
            Direction::Both => PredicateTree::or([
                side(&self.config.in_id_field),
                side(&self.config.out_id_field),
            ]),
        }
    }
}

fn truncate<E>(items: &mut Vec<E>, limit: Option<usize>) {
    if let Some(limit) = limit {
        items.truncate(limit);
    }
}

impl<T: SearchTransport + 'static> Backend for SearchBackend<T> {
    fn query(&self, query: &Query) -> Results<Element> {
        debug!(kind = %query.kind, predicates = %query.predicates, limit = ?query.limit, "query");

        // Compiled eagerly; a failure is held until the first pull.
        let request = match self.inner.request(query, &query.predicates) {
            Ok(request) => request,
            Err(e) => return Results::lazy(move || Err(e)),
        };

        let inner = self.inner.clone();
        let query = query.clone();
        Results::lazy(move || {
            let mut out = Vec::new();
            for response in inner.execute(&[request])? {
                for element in inner.elements(query.kind, response)? {
                    if PredicateEvaluator::evaluate(&query.predicates, &element)? {
                        out.push(element);
                    }
                }
            }
            truncate(&mut out, query.limit);
            Ok(out)
        })
    }

    fn query_from_vertices(&self, query: &VertexQuery) -> Results<Edge> {
        debug!(
            sources = query.source_ids.len(),
            direction = %query.direction,
            predicates = %query.predicates,
            limit = ?query.limit,
            "vertex query"
        );

        // Incidence first: translators pick their primary lookup from it.
        let incidence = self.inner.incidence_predicates(&query.source_ids, query.direction);
        let merged = PredicateTree::and([incidence, query.predicates.clone()]);
        let shape = Query::edges()
            .with_fields(query.fields.iter().cloned())
            .with_optional_limit(query.limit);
        let shape = query.order.iter().cloned().fold(shape, Query::with_order);

        let request = match self.inner.request(&shape, &merged) {
            Ok(request) => request,
            Err(e) => return Results::lazy(move || Err(e)),
        };

        let inner = self.inner.clone();
        let query = query.clone();
        Results::lazy(move || {
            let mut out = Vec::new();
            for response in inner.execute(&[request])? {
                for element in inner.elements(ElementKind::Edge, response)? {
                    let Element::Edge(edge) = element else {
                        continue;
                    };
                    if query.is_incident(&edge)
                        && PredicateEvaluator::evaluate(&query.predicates, &edge)?
                    {
                        out.push(edge);
                    }
                }
            }
            truncate(&mut out, query.limit);
            Ok(out)
        })
    }

    fn load_deferred(&self, ids: &BTreeSet<ElementId>) -> Vec<DeferredVertex> {
        debug!(ids = ids.len(), "creating deferred vertices");
        let backend: Arc<dyn Backend> = Arc::new(self.clone());
        DeferredLoader::placeholders(backend, ids, self.inner.config.default_vertex_label.clone())
    }
}
