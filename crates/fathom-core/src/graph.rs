//! Read-only graph facade.

use std::fmt;
use std::sync::Arc;

use crate::backend::{Backend, Results};
use crate::config::GraphConfig;
use crate::error::Error;
use crate::search::{SearchBackend, SearchTransport};
use crate::traversal::{HostStep, Pipeline, PipelineRunner, RewritePass, Traversal};
use fathom_proto::{Edge, Element, ElementId, ElementKind, FieldMap, Predicate, PredicateTree, Query, Value, Vertex};

/// Entry point for looking up elements and running traversals.
///
/// The graph is read-only: every mutation returns [`Error::Unsupported`].
#[derive(Clone)]
pub struct Graph {
    backend: Arc<dyn Backend>,
    config: GraphConfig,
    rewrite: RewritePass,
}

impl Graph {
    /// Create a graph over any backend.
    pub fn new(backend: Arc<dyn Backend>, config: GraphConfig) -> Self {
        let rewrite = RewritePass::new(&config);
        Self {
            backend,
            config,
            rewrite,
        }
    }

    /// Create a graph over a search-engine transport.
    pub fn search<T: SearchTransport + 'static>(transport: T, config: GraphConfig) -> Self {
        let backend = SearchBackend::new(transport, config.clone());
        Self::new(Arc::new(backend), config)
    }

    /// The backend queries run against.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Graph configuration.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Vertices with `ids`, or every vertex (up to the default cap) when
    /// `ids` is empty.
    pub fn vertices(&self, ids: &[ElementId]) -> Results<Element> {
        self.backend.query(&lookup(ElementKind::Vertex, ids))
    }

    /// Edges with `ids`, or every edge (up to the default cap) when `ids` is
    /// empty.
    pub fn edges(&self, ids: &[ElementId]) -> Results<Element> {
        self.backend.query(&lookup(ElementKind::Edge, ids))
    }

    /// Rewrite `pipeline` in place without running it.
    pub fn rewrite<H: HostStep>(&self, pipeline: &mut Pipeline<H>) {
        self.rewrite.apply(pipeline);
    }

    /// Rewrite and run `pipeline`.
    pub fn traverse<H: HostStep>(&self, mut pipeline: Pipeline<H>) -> Result<Traversal, Error> {
        self.rewrite.apply(&mut pipeline);
        PipelineRunner::new(self.backend.clone()).run(&pipeline)
    }

    /// Always fails; the graph is read-only.
    pub fn add_vertex(&self, _label: &str, _fields: FieldMap) -> Result<Vertex, Error> {
        Err(Error::unsupported("add_vertex"))
    }

    /// Always fails; the graph is read-only.
    pub fn add_edge(
        &self,
        _label: &str,
        _out_id: &ElementId,
        _in_id: &ElementId,
        _fields: FieldMap,
    ) -> Result<Edge, Error> {
        Err(Error::unsupported("add_edge"))
    }

    /// Always fails; the graph is read-only.
    pub fn set_property(&self, _id: &ElementId, key: &str, _value: Value) -> Result<(), Error> {
        Err(Error::unsupported(format!("set_property({})", key)))
    }

    /// Always fails; the graph is read-only.
    pub fn remove_element(&self, _id: &ElementId) -> Result<(), Error> {
        Err(Error::unsupported("remove_element"))
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph").field("config", &self.config).finish()
    }
}

fn lookup(kind: ElementKind, ids: &[ElementId]) -> Query {
    if ids.is_empty() {
        return Query::new(kind);
    }
    Query::new(kind)
        .with_predicates(PredicateTree::single(Predicate::id_within(ids)))
        .with_limit(ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::MemoryTransport;
    use crate::traversal::Traverser;
    use fathom_proto::{Direction, GraphElement};
    use serde_json::json;

    fn graph() -> Graph {
        let transport = MemoryTransport::new();
        transport.insert("vertices", "v1", json!({ "label": "person", "name": "alice" }));
        transport.insert("vertices", "v2", json!({ "label": "person", "name": "bob" }));
        transport.insert("edges", "e1", json!({ "label": "knows", "outid": "v1", "inid": "v2" }));
        Graph::search(transport, GraphConfig::default())
    }

    #[test]
    fn test_lookup_by_id() {
        let graph = graph();
        let found = graph.vertices(&["v2".into()]).collect_all().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id().as_str(), "v2");

        let all = graph.vertices(&[]).collect_all().unwrap();
        assert_eq!(all.len(), 2);

        let edges = graph.edges(&["e1".into()]).collect_all().unwrap();
        assert_eq!(edges[0].as_edge().unwrap().in_id.as_str(), "v2");
    }

    #[test]
    fn test_traverse() {
        let graph = graph();
        let pipeline: Pipeline = Pipeline::new().vertices(["v1"]).to_vertices(Direction::Out, &["knows"]);
        let out: Vec<_> = graph.traverse(pipeline).unwrap().collect::<Result<_, _>>().unwrap();

        assert_eq!(out.len(), 1);
        let name = out[0].element().resolve().unwrap().field("name").cloned();
        assert_eq!(name, Some(Value::from("bob")));
    }

    #[test]
    fn test_mutations_are_unsupported() {
        let graph = graph();
        let id = ElementId::from("v1");

        let err = graph.add_vertex("person", FieldMap::new()).unwrap_err();
        assert!(err.to_string().contains("add_vertex"));
        assert!(matches!(
            graph.add_edge("knows", &id, &id, FieldMap::new()),
            Err(Error::Unsupported { .. })
        ));
        let err = graph.set_property(&id, "name", Value::from("eve")).unwrap_err();
        assert!(err.to_string().contains("set_property(name)"));
        assert!(matches!(graph.remove_element(&id), Err(Error::Unsupported { .. })));
    }
}
