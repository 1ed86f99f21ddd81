//! Fathom Core - batched graph traversal over search-engine document stores.
//!
//! A traversal pipeline is rewritten so that filters and limits following a
//! root fetch or a navigation step are pushed into backend queries, and
//! navigations run in batches: one edge query per group of traversal
//! contexts instead of one per vertex. Vertex properties reached by
//! navigation load lazily, in one query per batch, on first access.
//!
//! ```
//! use fathom_core::{Graph, GraphConfig, MemoryTransport, Pipeline, Traverser};
//! use fathom_core::proto::{Direction, Predicate};
//! use serde_json::json;
//!
//! let transport = MemoryTransport::new();
//! transport.insert("vertices", "v1", json!({ "label": "person", "age": 29 }));
//! transport.insert("vertices", "v2", json!({ "label": "person", "age": 41 }));
//! transport.insert("edges", "e1", json!({ "label": "knows", "outid": "v1", "inid": "v2" }));
//!
//! let graph = Graph::search(transport, GraphConfig::default());
//! let pipeline: Pipeline = Pipeline::new()
//!     .vertices(["v1"])
//!     .to_vertices(Direction::Out, &["knows"])
//!     .has(Predicate::gt("age", 30));
//!
//! let friends: Vec<_> = graph
//!     .traverse(pipeline)?
//!     .map(|t| t.map(|t| t.element().id().to_string()))
//!     .collect::<Result<_, _>>()?;
//! assert_eq!(friends, vec!["v2"]);
//! # Ok::<(), fathom_core::Error>(())
//! ```

pub mod backend;
pub mod config;
pub mod deferred;
pub mod error;
pub mod graph;
pub mod query;
pub mod search;
pub mod traversal;

pub use backend::{Backend, Results};
pub use config::GraphConfig;
pub use deferred::{DeferredLoader, DeferredVertex};
pub use error::Error;
pub use graph::Graph;
pub use query::PredicateEvaluator;
pub use search::{
    DefaultElementFactory, ElementFactory, MemoryTransport, QueryCompiler, SearchBackend,
    SearchHit, SearchQueryCompiler, SearchRequest, SearchResponse, SearchTransport,
};
pub use traversal::{
    BasicTraverser, BatchedNavigation, FetchPlan, HostStep, NavigationPlan, NoHost, Pipeline,
    PipelineRunner, RewritePass, Step, Traversal, TraversalElement, Traverser,
};

/// Re-export protocol types.
pub use fathom_proto as proto;
