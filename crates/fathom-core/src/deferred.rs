//! One-shot batched loading of vertex properties.
//!
//! A [`DeferredLoader`] tracks a set of vertex ids whose properties have not
//! been fetched. The first read for any tracked id runs one query covering the
//! whole set; each read then consumes its own entry, so memory held by the
//! loader shrinks as the traversal moves on. This is not a general cache: a
//! second read of the same id finds nothing.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::backend::Backend;
use crate::error::Error;
use fathom_proto::{
    Element, ElementId, FieldMap, GraphElement, Predicate, PredicateTree, Query, Value, Vertex,
};

enum LoadState {
    Unstarted,
    Loaded(HashMap<ElementId, Vertex>),
}

/// Loads the properties of a fixed id set with a single query.
pub struct DeferredLoader {
    backend: Arc<dyn Backend>,
    ids: BTreeSet<ElementId>,
    default_label: String,
    state: Mutex<LoadState>,
}

impl DeferredLoader {
    /// Create a loader for `ids`. No I/O happens until the first read.
    pub fn new(
        backend: Arc<dyn Backend>,
        ids: BTreeSet<ElementId>,
        default_label: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            ids,
            default_label: default_label.into(),
            state: Mutex::new(LoadState::Unstarted),
        }
    }

    /// Create one placeholder per id, all sharing a fresh loader.
    pub fn placeholders(
        backend: Arc<dyn Backend>,
        ids: &BTreeSet<ElementId>,
        default_label: impl Into<String>,
    ) -> Vec<DeferredVertex> {
        let loader = Arc::new(Self::new(backend, ids.clone(), default_label));
        ids.iter()
            .map(|id| DeferredVertex::new(id.clone(), loader.clone()))
            .collect()
    }

    /// Ids this loader was created for.
    pub fn ids(&self) -> &BTreeSet<ElementId> {
        &self.ids
    }

    /// Whether the batched query has run.
    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.lock(), LoadState::Loaded(_))
    }

    /// Consume the loaded vertex for `id`, loading the whole set first if
    /// needed.
    ///
    /// Returns `None` when the backend had no document for `id` or the entry
    /// was already consumed. A failed load leaves the loader unstarted so a
    /// later read retries.
    pub fn take(&self, id: &ElementId) -> Result<Option<Vertex>, Error> {
        let mut state = self.state.lock();

        if let LoadState::Unstarted = *state {
            *state = LoadState::Loaded(self.load()?);
        }

        match &mut *state {
            LoadState::Loaded(cache) => Ok(cache.remove(id)),
            LoadState::Unstarted => Ok(None),
        }
    }

    /// Consume the field map for `id`. Unknown ids yield an empty map.
    pub fn get(&self, id: &ElementId) -> Result<FieldMap, Error> {
        Ok(self.take(id)?.map(|v| v.fields).unwrap_or_default())
    }

    fn load(&self) -> Result<HashMap<ElementId, Vertex>, Error> {
        debug!(ids = self.ids.len(), "loading deferred vertices");

        let query = Query::vertices()
            .with_predicates(PredicateTree::single(Predicate::id_within(&self.ids)))
            .with_limit(self.ids.len());

        let mut cache = HashMap::with_capacity(self.ids.len());
        for element in self.backend.query(&query) {
            if let Element::Vertex(vertex) = element? {
                cache.insert(vertex.id.clone(), vertex);
            }
        }

        debug!(requested = self.ids.len(), found = cache.len(), "deferred vertices loaded");
        Ok(cache)
    }
}

impl fmt::Debug for DeferredLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredLoader")
            .field("ids", &self.ids.len())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// A vertex whose id is known but whose properties load on first access.
///
/// Clones share the resolved properties, so any number of reads through one
/// placeholder consume the loader entry exactly once.
#[derive(Clone)]
pub struct DeferredVertex {
    id: ElementId,
    loader: Arc<DeferredLoader>,
    resolved: Arc<Mutex<Option<Vertex>>>,
}

impl DeferredVertex {
    fn new(id: ElementId, loader: Arc<DeferredLoader>) -> Self {
        Self {
            id,
            loader,
            resolved: Arc::new(Mutex::new(None)),
        }
    }

    /// Vertex id, available without I/O.
    pub fn id(&self) -> &ElementId {
        &self.id
    }

    /// Whether properties were already read through this placeholder.
    pub fn is_resolved(&self) -> bool {
        self.resolved.lock().is_some()
    }

    /// The fully loaded vertex.
    pub fn resolve(&self) -> Result<Vertex, Error> {
        let mut resolved = self.resolved.lock();
        if let Some(vertex) = resolved.as_ref() {
            return Ok(vertex.clone());
        }

        let vertex = self.loader.take(&self.id)?.unwrap_or_else(|| {
            Vertex::new(self.id.clone(), self.loader.default_label.clone(), FieldMap::new())
        });
        *resolved = Some(vertex.clone());
        Ok(vertex)
    }

    /// Vertex label.
    pub fn label(&self) -> Result<String, Error> {
        Ok(self.resolve()?.label)
    }

    /// All loaded fields.
    pub fn fields(&self) -> Result<FieldMap, Error> {
        Ok(self.resolve()?.fields)
    }

    /// One field value.
    pub fn property(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.resolve()?.field(key).cloned())
    }
}

impl PartialEq for DeferredVertex {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for DeferredVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredVertex")
            .field("id", &self.id)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
