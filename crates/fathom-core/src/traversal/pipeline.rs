//! Pipeline model handed over by a traversal engine.
//!
//! A [`Pipeline`] is a sequence of [`Step`]s. Native steps (`FetchRoots`,
//! `Navigate`, `Has`, `Limit`) describe what the engine asked for; the
//! rewrite pass replaces fetches and navigations with planned steps
//! (`Fetch`, `BatchedNavigate`) that the runtime can execute in batches.
//! Engine-specific steps travel as [`Step::Host`] and may hold nested
//! pipelines of their own.

use std::collections::BTreeSet;

use fathom_proto::{
    Direction, ElementId, ElementKind, Predicate, PredicateTree, Query, VertexQuery,
};

/// A step whose nested pipelines the rewrite pass must visit.
pub trait HostStep: Sized {
    /// Pipelines run once over the whole stream (e.g. union branches).
    fn global_children_mut(&mut self) -> Vec<&mut Pipeline<Self>>;

    /// Pipelines run per traverser (e.g. filter predicates).
    fn local_children_mut(&mut self) -> Vec<&mut Pipeline<Self>>;
}

/// Host step type for pipelines without engine-specific steps.
#[derive(Debug, Clone, PartialEq)]
pub enum NoHost {}

impl HostStep for NoHost {
    fn global_children_mut(&mut self) -> Vec<&mut Pipeline<Self>> {
        match *self {}
    }

    fn local_children_mut(&mut self) -> Vec<&mut Pipeline<Self>> {
        match *self {}
    }
}

/// How a root fetch is executed.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchPlan {
    /// Create placeholders for the ids without querying; properties load
    /// in one batch on first access.
    Deferred {
        /// Requested vertex ids, in request order.
        ids: Vec<ElementId>,
    },
    /// Run a single query.
    Query(Query),
}

/// A compiled navigation step executed in batches.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationPlan {
    /// Side of the edge the current vertex sits on.
    pub direction: Direction,
    /// Whether the step yields edges or neighbor vertices.
    pub returns: ElementKind,
    /// Filter pushed into the edge query.
    pub edge_predicates: PredicateTree,
    /// Filter on neighbor vertices; only used when returning vertices.
    pub vertex_predicates: PredicateTree,
    /// Per-batch bound pushed into the edge query.
    pub limit: Option<usize>,
    /// Traversal contexts grouped per edge query.
    pub batch_size: usize,
}

impl NavigationPlan {
    /// The edge query for one batch of source vertices.
    pub fn vertex_query(&self, source_ids: impl IntoIterator<Item = ElementId>) -> VertexQuery {
        VertexQuery::new(source_ids, self.direction)
            .with_predicates(self.edge_predicates.clone())
            .with_optional_limit(self.limit)
    }

    /// The query loading filtered neighbor vertices.
    pub fn neighbor_query(&self, ids: &BTreeSet<ElementId>) -> Query {
        Query::vertices().with_predicates(PredicateTree::and([
            PredicateTree::single(Predicate::id_within(ids)),
            self.vertex_predicates.clone(),
        ]))
    }
}

/// One pipeline operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Step<H> {
    /// Fetch root elements by id; no ids means every element of `kind`.
    FetchRoots {
        /// Kind of element fetched.
        kind: ElementKind,
        /// Requested ids.
        ids: Vec<ElementId>,
    },
    /// Move from each vertex to its incident edges or neighbors.
    Navigate {
        /// Side of the edge the current vertex sits on.
        direction: Direction,
        /// Whether the step yields edges or neighbor vertices.
        returns: ElementKind,
        /// Edge labels to follow; empty means all.
        labels: Vec<String>,
    },
    /// Keep elements matching every predicate.
    Has(Vec<Predicate>),
    /// Keep at most this many elements.
    Limit(usize),
    /// A planned root fetch.
    Fetch(FetchPlan),
    /// A planned batched navigation.
    BatchedNavigate(NavigationPlan),
    /// An engine-specific step.
    Host(H),
}

impl<H> Step<H> {
    /// Whether the rewrite pass turns this step into a planned one.
    pub fn is_rewritable(&self) -> bool {
        matches!(self, Step::FetchRoots { .. } | Step::Navigate { .. })
    }

    fn name(&self) -> &'static str {
        match self {
            Step::FetchRoots { .. } => "fetch_roots",
            Step::Navigate { .. } => "navigate",
            Step::Has(_) => "has",
            Step::Limit(_) => "limit",
            Step::Fetch(_) => "fetch",
            Step::BatchedNavigate(_) => "batched_navigate",
            Step::Host(_) => "host",
        }
    }
}

/// An ordered sequence of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline<H = NoHost> {
    pub(crate) steps: Vec<Step<H>>,
}

impl<H> Default for Pipeline<H> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<H> Pipeline<H> {
    /// An empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pipeline from steps.
    pub fn from_steps(steps: Vec<Step<H>>) -> Self {
        Self { steps }
    }

    /// Steps in execution order.
    pub fn steps(&self) -> &[Step<H>] {
        &self.steps
    }

    /// Mutable access to the steps.
    pub fn steps_mut(&mut self) -> &mut Vec<Step<H>> {
        &mut self.steps
    }

    /// Step names in order, for logging and assertions.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(Step::name).collect()
    }

    /// Append a step.
    pub fn push(mut self, step: Step<H>) -> Self {
        self.steps.push(step);
        self
    }

    /// Start from the vertices with `ids`, or every vertex when empty.
    pub fn vertices(self, ids: impl IntoIterator<Item = impl Into<ElementId>>) -> Self {
        self.push(Step::FetchRoots {
            kind: ElementKind::Vertex,
            ids: ids.into_iter().map(Into::into).collect(),
        })
    }

    /// Start from the edges with `ids`, or every edge when empty.
    pub fn edges(self, ids: impl IntoIterator<Item = impl Into<ElementId>>) -> Self {
        self.push(Step::FetchRoots {
            kind: ElementKind::Edge,
            ids: ids.into_iter().map(Into::into).collect(),
        })
    }

    /// Move to neighbor vertices across edges with `labels`.
    pub fn to_vertices(self, direction: Direction, labels: &[&str]) -> Self {
        self.navigate(direction, ElementKind::Vertex, labels)
    }

    /// Move to incident edges with `labels`.
    pub fn to_edges(self, direction: Direction, labels: &[&str]) -> Self {
        self.navigate(direction, ElementKind::Edge, labels)
    }

    fn navigate(self, direction: Direction, returns: ElementKind, labels: &[&str]) -> Self {
        self.push(Step::Navigate {
            direction,
            returns,
            labels: labels.iter().map(|l| l.to_string()).collect(),
        })
    }

    /// Keep elements matching `predicate`.
    pub fn has(self, predicate: Predicate) -> Self {
        self.push(Step::Has(vec![predicate]))
    }

    /// Keep at most `limit` elements.
    pub fn limit(self, limit: usize) -> Self {
        self.push(Step::Limit(limit))
    }

    /// Append an engine-specific step.
    pub fn host(self, step: H) -> Self {
        self.push(Step::Host(step))
    }
}
