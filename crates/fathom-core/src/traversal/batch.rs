//! Batched navigation operator.
//!
//! Pulls traversal contexts from upstream in groups of `batch_size`, issues
//! one vertex-centred edge query per group and fans the edges back out to
//! the contexts whose current vertex they touch.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use tracing::debug;

use super::element::{TraversalElement, Traverser};
use super::pipeline::NavigationPlan;
use crate::backend::Backend;
use crate::error::Error;
use fathom_proto::{Edge, Element, ElementId, ElementKind};

/// Iterator adapter running a [`NavigationPlan`] over upstream contexts.
///
/// Output is produced lazily: a batch is only pulled and queried once the
/// results of the previous batch have been consumed. Within a batch, output
/// order follows edge order, not input order.
pub struct BatchedNavigation<I, T> {
    upstream: I,
    backend: Arc<dyn Backend>,
    plan: NavigationPlan,
    pending: VecDeque<T>,
    held_error: Option<Error>,
    exhausted: bool,
    batches: usize,
}

impl<I, T> BatchedNavigation<I, T>
where
    I: Iterator<Item = Result<T, Error>>,
    T: Traverser,
{
    /// Wrap `upstream` with the navigation described by `plan`.
    pub fn new(upstream: I, backend: Arc<dyn Backend>, plan: NavigationPlan) -> Self {
        Self {
            upstream,
            backend,
            plan,
            pending: VecDeque::new(),
            held_error: None,
            exhausted: false,
            batches: 0,
        }
    }

    /// Number of batches processed so far.
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Pull up to `batch_size` contexts.
    ///
    /// An upstream error stops the pull; it is held until the contexts
    /// already pulled have been processed and drained.
    fn pull_batch(&mut self) -> Vec<T> {
        let batch_size = self.plan.batch_size.max(1);
        let mut batch = Vec::with_capacity(batch_size);
        while batch.len() < batch_size {
            match self.upstream.next() {
                Some(Ok(traverser)) => batch.push(traverser),
                Some(Err(e)) => {
                    self.held_error = Some(e);
                    self.exhausted = true;
                    break;
                }
                None => {
                    self.exhausted = true;
                    break;
                }
            }
        }
        batch
    }

    fn process(&mut self, batch: Vec<T>) -> Result<Vec<T>, Error> {
        self.batches += 1;
        let contexts = batch.len();

        let mut groups: BTreeMap<ElementId, Vec<T>> = BTreeMap::new();
        for traverser in batch {
            groups
                .entry(traverser.element().id().clone())
                .or_default()
                .push(traverser);
        }

        let query = self.plan.vertex_query(groups.keys().cloned());
        debug!(
            batch = self.batches,
            contexts,
            sources = groups.len(),
            direction = %self.plan.direction,
            "navigation batch"
        );
        let edges = self.backend.query_from_vertices(&query).collect_all()?;

        // (context, edge, neighbor) triples, one per matching endpoint
        let mut fanout: Vec<(&T, &Edge, &ElementId)> = Vec::new();
        for edge in &edges {
            for (side, neighbor) in edge.endpoints(self.plan.direction) {
                if let Some(traversers) = groups.get(side) {
                    for traverser in traversers {
                        fanout.push((traverser, edge, neighbor));
                    }
                }
            }
        }

        debug!(edges = edges.len(), fanout = fanout.len(), "navigation batch fanned out");

        match self.plan.returns {
            ElementKind::Edge => Ok(fanout
                .into_iter()
                .map(|(traverser, edge, _)| traverser.split(TraversalElement::Edge(edge.clone())))
                .collect()),
            ElementKind::Vertex => self.split_to_neighbors(fanout),
        }
    }

    /// Resolve all neighbors of one batch with a single backend call.
    fn split_to_neighbors(&self, fanout: Vec<(&T, &Edge, &ElementId)>) -> Result<Vec<T>, Error> {
        let ids: BTreeSet<ElementId> = fanout.iter().map(|(_, _, n)| (*n).clone()).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let neighbors: HashMap<ElementId, TraversalElement> = if self.plan.vertex_predicates.is_empty() {
            self.backend
                .load_deferred(&ids)
                .into_iter()
                .map(|d| (d.id().clone(), TraversalElement::Deferred(d)))
                .collect()
        } else {
            let mut loaded = HashMap::with_capacity(ids.len());
            for element in self.backend.query(&self.plan.neighbor_query(&ids)) {
                if let Element::Vertex(vertex) = element? {
                    loaded.insert(vertex.id.clone(), TraversalElement::Vertex(vertex));
                }
            }
            debug!(requested = ids.len(), matched = loaded.len(), "filtered neighbor vertices");
            loaded
        };

        let filtered = !self.plan.vertex_predicates.is_empty();
        let mut out = Vec::with_capacity(fanout.len());
        for (traverser, _, neighbor) in fanout {
            match neighbors.get(neighbor) {
                Some(element) => out.push(traverser.split(element.clone())),
                // Neighbor rejected by the vertex filter
                None if filtered => {}
                None => {
                    return Err(Error::InvalidData(format!(
                        "backend returned no placeholder for vertex '{}'",
                        neighbor
                    )))
                }
            }
        }
        Ok(out)
    }
}

impl<I, T> Iterator for BatchedNavigation<I, T>
where
    I: Iterator<Item = Result<T, Error>>,
    T: Traverser,
{
    type Item = Result<T, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(traverser) = self.pending.pop_front() {
                return Some(Ok(traverser));
            }
            if let Some(e) = self.held_error.take() {
                return Some(Err(e));
            }
            if self.exhausted {
                return None;
            }

            let batch = self.pull_batch();
            if batch.is_empty() {
                continue;
            }
            match self.process(batch) {
                Ok(out) => self.pending.extend(out),
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
