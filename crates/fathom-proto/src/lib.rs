//! Fathom model types.
//!
//! This crate defines the data model shared by the traversal runtime and its
//! backends: field values, graph elements, predicates, predicate trees and
//! query descriptors. It performs no I/O.
//!
//! # Modules
//!
//! - [`value`] - Runtime value types for fields and predicate operands
//! - [`element`] - Element ids, kinds, directions, vertices and edges
//! - [`predicate`] - Atomic predicates and their operators
//! - [`tree`] - AND/OR predicate trees and merge rules
//! - [`query`] - Query descriptors sent to a backend
//! - [`error`] - Encoding error types
//!
//! # Serialization
//!
//! Every type derives `serde::Serialize` and `serde::Deserialize`, so queries
//! can be logged or shipped as JSON:
//!
//! ```
//! use fathom_proto::{Predicate, Query};
//!
//! let query = Query::vertices().filter(Predicate::gt("age", 30)).with_limit(10);
//! let json = query.to_json().unwrap();
//! assert_eq!(Query::from_json(&json).unwrap(), query);
//! ```

pub mod element;
pub mod error;
pub mod predicate;
pub mod query;
pub mod tree;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root
pub use element::{Direction, Edge, Element, ElementId, ElementKind, FieldMap, GraphElement, Vertex};
pub use predicate::{keys, Predicate, PredicateOp};
pub use query::{OrderDirection, OrderSpec, Query, VertexQuery};
pub use tree::{Clause, PredicateTree};
pub use value::Value;
