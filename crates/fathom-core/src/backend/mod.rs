//! The backend port: the contract traversal code queries against.
//!
//! Implementations run a query remotely, then re-test every returned element
//! against the query's predicate tree before yielding it. Translation of
//! predicates into the backend's own language may be lossy; the residual
//! filter is what guarantees correct results.

mod results;

pub use results::Results;

use std::collections::BTreeSet;

use crate::deferred::DeferredVertex;
use fathom_proto::{Edge, Element, ElementId, Query, VertexQuery};

/// A read-only graph store.
pub trait Backend: Send + Sync {
    /// Run a query. Execution is deferred until the results are first pulled.
    ///
    /// A query the backend cannot translate still returns results; the
    /// translation error is yielded by the first pull, before any I/O.
    fn query(&self, query: &Query) -> Results<Element>;

    /// Fetch the edges incident to a set of vertices. Every returned edge
    /// touches a source vertex on the requested side and satisfies the
    /// query's predicates. Translation errors surface on the first pull, as
    /// for [`Backend::query`].
    fn query_from_vertices(&self, query: &VertexQuery) -> Results<Edge>;

    /// Create one placeholder vertex per id without performing any I/O.
    ///
    /// The first property read on any placeholder loads all of them in a
    /// single query. Placeholders are returned in no particular order.
    fn load_deferred(&self, ids: &BTreeSet<ElementId>) -> Vec<DeferredVertex>;
}
