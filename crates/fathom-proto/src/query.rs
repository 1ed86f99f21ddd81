//! Query descriptors sent to a backend.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::element::{Direction, Edge, ElementId, ElementKind};
use crate::error::Error;
use crate::predicate::Predicate;
use crate::tree::PredicateTree;

/// Order specification for sorting results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Field to order by.
    pub field: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl OrderSpec {
    /// Create an ascending order spec.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Create a descending order spec.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
    /// Keep the backend's order; never sent to the backend.
    None,
}

/// An immutable query over one element kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Kind of element returned.
    pub kind: ElementKind,
    /// Filter every returned element must satisfy.
    pub predicates: PredicateTree,
    /// Maximum number of results; `None` means unbounded (the backend may
    /// still apply its own cap).
    pub limit: Option<usize>,
    /// Fields to load; empty means all fields.
    pub fields: BTreeSet<String>,
    /// Ordering directives, applied in sequence.
    pub order: Vec<OrderSpec>,
}

impl Query {
    /// Create an unfiltered, unbounded query for `kind`.
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            predicates: PredicateTree::empty(),
            limit: None,
            fields: BTreeSet::new(),
            order: Vec::new(),
        }
    }

    /// Query vertices.
    pub fn vertices() -> Self {
        Self::new(ElementKind::Vertex)
    }

    /// Query edges.
    pub fn edges() -> Self {
        Self::new(ElementKind::Edge)
    }

    /// Set the predicate tree.
    pub fn with_predicates(mut self, predicates: PredicateTree) -> Self {
        self.predicates = predicates;
        self
    }

    /// AND a predicate onto the existing tree.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        let current = std::mem::take(&mut self.predicates);
        self.predicates = PredicateTree::and([current, PredicateTree::single(predicate)]);
        self
    }

    /// Set the result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set an optional result limit.
    pub fn with_optional_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Set the fields to load.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Add ordering for this query.
    pub fn with_order(mut self, order: OrderSpec) -> Self {
        self.order.push(order);
        self
    }

    /// True when the query has no predicates, no limit and no ordering.
    pub fn is_plain(&self) -> bool {
        self.predicates.is_empty() && self.limit.is_none() && self.order.is_empty()
    }

    /// Encode the query as JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Decode a query from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// A query for the edges incident to a set of vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexQuery {
    /// Vertices whose edges are wanted.
    pub source_ids: BTreeSet<ElementId>,
    /// Side of the edge the source vertex must sit on.
    pub direction: Direction,
    /// Filter every returned edge must satisfy.
    pub predicates: PredicateTree,
    /// Maximum number of edges; `None` means unbounded.
    pub limit: Option<usize>,
    /// Fields to load; empty means all fields.
    pub fields: BTreeSet<String>,
    /// Ordering directives.
    pub order: Vec<OrderSpec>,
}

impl VertexQuery {
    /// Create an unfiltered query for edges incident to `source_ids`.
    pub fn new(source_ids: impl IntoIterator<Item = ElementId>, direction: Direction) -> Self {
        Self {
            source_ids: source_ids.into_iter().collect(),
            direction,
            predicates: PredicateTree::empty(),
            limit: None,
            fields: BTreeSet::new(),
            order: Vec::new(),
        }
    }

    /// Set the predicate tree.
    pub fn with_predicates(mut self, predicates: PredicateTree) -> Self {
        self.predicates = predicates;
        self
    }

    /// Set an optional result limit.
    pub fn with_optional_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Set the result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the ordering directives.
    pub fn with_order(mut self, order: Vec<OrderSpec>) -> Self {
        self.order = order;
        self
    }

    /// Whether `edge` touches a source vertex on the requested side.
    pub fn is_incident(&self, edge: &Edge) -> bool {
        edge.endpoints(self.direction)
            .iter()
            .any(|(side, _)| self.source_ids.contains(*side))
    }
}
