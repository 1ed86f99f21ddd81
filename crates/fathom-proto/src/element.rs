//! Graph element model: ids, kinds, directions, vertices and edges.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Field map of an element, ordered by field name.
pub type FieldMap = BTreeMap<String, Value>;

/// Identifier of a vertex or edge document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Create an id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ElementId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&ElementId> for Value {
    fn from(id: &ElementId) -> Self {
        Value::String(id.0.clone())
    }
}

impl From<ElementId> for Value {
    fn from(id: ElementId) -> Self {
        Value::String(id.0)
    }
}

/// Kind of graph element a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// Vertex documents.
    Vertex,
    /// Edge documents.
    Edge,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Vertex => write!(f, "vertex"),
            ElementKind::Edge => write!(f, "edge"),
        }
    }
}

/// Edge direction relative to a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Edges leaving the vertex.
    Out,
    /// Edges entering the vertex.
    In,
    /// Edges in either direction.
    Both,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Out => write!(f, "OUT"),
            Direction::In => write!(f, "IN"),
            Direction::Both => write!(f, "BOTH"),
        }
    }
}

/// Capabilities shared by every graph element.
pub trait GraphElement {
    /// Element id.
    fn id(&self) -> &ElementId;

    /// Element label (type discriminator).
    fn label(&self) -> &str;

    /// Look up a field value by name.
    fn field(&self, name: &str) -> Option<&Value>;

    /// Kind of this element.
    fn kind(&self) -> ElementKind;
}

/// A vertex with its loaded fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Vertex id.
    pub id: ElementId,
    /// Vertex label.
    pub label: String,
    /// Vertex fields.
    pub fields: FieldMap,
}

impl Vertex {
    /// Create a vertex.
    pub fn new(id: impl Into<ElementId>, label: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            fields,
        }
    }

    /// Add a field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

impl GraphElement for Vertex {
    fn id(&self) -> &ElementId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Vertex
    }
}

/// An edge between two vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Edge id.
    pub id: ElementId,
    /// Edge label.
    pub label: String,
    /// Id of the vertex the edge leaves.
    pub out_id: ElementId,
    /// Id of the vertex the edge enters.
    pub in_id: ElementId,
    /// Edge fields.
    pub fields: FieldMap,
}

impl Edge {
    /// Create an edge `out_id -> in_id` without fields.
    pub fn new(
        id: impl Into<ElementId>,
        label: impl Into<String>,
        out_id: impl Into<ElementId>,
        in_id: impl Into<ElementId>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            out_id: out_id.into(),
            in_id: in_id.into(),
            fields: FieldMap::new(),
        }
    }

    /// Add a field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Endpoint ids reachable when walking this edge in `direction`,
    /// paired with the vertex on the opposite side.
    ///
    /// `Out` yields the out-vertex, `In` the in-vertex, and `Both` yields the
    /// out-vertex then the in-vertex (a self-loop therefore appears twice).
    pub fn endpoints(&self, direction: Direction) -> Vec<(&ElementId, &ElementId)> {
        match direction {
            Direction::Out => vec![(&self.out_id, &self.in_id)],
            Direction::In => vec![(&self.in_id, &self.out_id)],
            Direction::Both => vec![
                (&self.out_id, self.other_end(&self.out_id)),
                (&self.in_id, self.other_end(&self.in_id)),
            ],
        }
    }

    /// The endpoint opposite `vertex`: the in-vertex when `vertex` is the
    /// out-vertex, otherwise the out-vertex.
    pub fn other_end(&self, vertex: &ElementId) -> &ElementId {
        if *vertex == self.out_id {
            &self.in_id
        } else {
            &self.out_id
        }
    }
}

impl GraphElement for Edge {
    fn id(&self) -> &ElementId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Edge
    }
}

/// A loaded vertex or edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    /// A vertex.
    Vertex(Vertex),
    /// An edge.
    Edge(Edge),
}

impl Element {
    /// Get as vertex reference.
    pub fn as_vertex(&self) -> Option<&Vertex> {
        match self {
            Element::Vertex(v) => Some(v),
            Element::Edge(_) => None,
        }
    }

    /// Get as edge reference.
    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Element::Edge(e) => Some(e),
            Element::Vertex(_) => None,
        }
    }
}

impl GraphElement for Element {
    fn id(&self) -> &ElementId {
        match self {
            Element::Vertex(v) => &v.id,
            Element::Edge(e) => &e.id,
        }
    }

    fn label(&self) -> &str {
        match self {
            Element::Vertex(v) => &v.label,
            Element::Edge(e) => &e.label,
        }
    }

    fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Element::Vertex(v) => v.fields.get(name),
            Element::Edge(e) => e.fields.get(name),
        }
    }

    fn kind(&self) -> ElementKind {
        match self {
            Element::Vertex(_) => ElementKind::Vertex,
            Element::Edge(_) => ElementKind::Edge,
        }
    }
}

impl From<Vertex> for Element {
    fn from(v: Vertex) -> Self {
        Element::Vertex(v)
    }
}

impl From<Edge> for Element {
    fn from(e: Edge) -> Self {
        Element::Edge(e)
    }
}
