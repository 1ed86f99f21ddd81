//! Search-engine backend.
//!
//! Vertices and edges live as documents in two collections. Predicate trees
//! are compiled to the engine's query DSL, sent through a [`SearchTransport`],
//! and the returned documents are turned into elements by an
//! [`ElementFactory`] and re-checked against the requested predicates.

mod backend;
mod compiler;
mod factory;
mod memory;
mod transport;

pub use backend::SearchBackend;
pub use compiler::{QueryCompiler, SearchQueryCompiler};
pub use factory::{DefaultElementFactory, ElementFactory};
pub use memory::MemoryTransport;
pub use transport::{SearchHit, SearchRequest, SearchResponse, SearchTransport};
