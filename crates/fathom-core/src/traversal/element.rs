//! Elements carried by traversal contexts.

use crate::deferred::DeferredVertex;
use crate::error::Error;
use fathom_proto::{Edge, Element, ElementId, ElementKind, Vertex};

/// The current element of a traversal context.
#[derive(Debug, Clone, PartialEq)]
pub enum TraversalElement {
    /// A fully loaded vertex.
    Vertex(Vertex),
    /// A loaded edge.
    Edge(Edge),
    /// A vertex whose properties load on first access.
    Deferred(DeferredVertex),
}

impl TraversalElement {
    /// Element id, available without I/O.
    pub fn id(&self) -> &ElementId {
        match self {
            TraversalElement::Vertex(v) => &v.id,
            TraversalElement::Edge(e) => &e.id,
            TraversalElement::Deferred(d) => d.id(),
        }
    }

    /// Element kind.
    pub fn kind(&self) -> ElementKind {
        match self {
            TraversalElement::Edge(_) => ElementKind::Edge,
            TraversalElement::Vertex(_) | TraversalElement::Deferred(_) => ElementKind::Vertex,
        }
    }

    /// The loaded element, reading deferred properties if needed.
    pub fn resolve(&self) -> Result<Element, Error> {
        match self {
            TraversalElement::Vertex(v) => Ok(Element::Vertex(v.clone())),
            TraversalElement::Edge(e) => Ok(Element::Edge(e.clone())),
            TraversalElement::Deferred(d) => Ok(Element::Vertex(d.resolve()?)),
        }
    }

    /// Get as edge reference.
    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            TraversalElement::Edge(e) => Some(e),
            _ => None,
        }
    }

    /// Get as deferred vertex reference.
    pub fn as_deferred(&self) -> Option<&DeferredVertex> {
        match self {
            TraversalElement::Deferred(d) => Some(d),
            _ => None,
        }
    }
}

impl From<Element> for TraversalElement {
    fn from(element: Element) -> Self {
        match element {
            Element::Vertex(v) => TraversalElement::Vertex(v),
            Element::Edge(e) => TraversalElement::Edge(e),
        }
    }
}

impl From<Vertex> for TraversalElement {
    fn from(v: Vertex) -> Self {
        TraversalElement::Vertex(v)
    }
}

impl From<Edge> for TraversalElement {
    fn from(e: Edge) -> Self {
        TraversalElement::Edge(e)
    }
}

impl From<DeferredVertex> for TraversalElement {
    fn from(d: DeferredVertex) -> Self {
        TraversalElement::Deferred(d)
    }
}

/// A traversal context owned by the driving pipeline.
///
/// The runtime only reads the current element and derives new contexts
/// through [`Traverser::split`]; any other state belongs to the caller.
pub trait Traverser {
    /// The context's current element.
    fn element(&self) -> &TraversalElement;

    /// A new context at `element`, keeping this context's state.
    fn split(&self, element: TraversalElement) -> Self;
}

/// A traverser that records the ids it visited.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicTraverser {
    element: TraversalElement,
    path: Vec<ElementId>,
}

impl BasicTraverser {
    /// Start a traverser at `element`.
    pub fn new(element: impl Into<TraversalElement>) -> Self {
        let element = element.into();
        let path = vec![element.id().clone()];
        Self { element, path }
    }

    /// Ids visited so far, ending with the current element.
    pub fn path(&self) -> &[ElementId] {
        &self.path
    }

    /// Consume the traverser, keeping its element.
    pub fn into_element(self) -> TraversalElement {
        self.element
    }
}

impl Traverser for BasicTraverser {
    fn element(&self) -> &TraversalElement {
        &self.element
    }

    fn split(&self, element: TraversalElement) -> Self {
        let mut path = self.path.clone();
        path.push(element.id().clone());
        Self { element, path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fathom_proto::FieldMap;

    #[test]
    fn test_split_extends_path() {
        let start = BasicTraverser::new(Vertex::new("v1", "person", FieldMap::new()));
        let edge = start.split(Edge::new("e1", "knows", "v1", "v2").into());
        let end = edge.split(Vertex::new("v2", "person", FieldMap::new()).into());

        assert_eq!(start.path().len(), 1);
        let path: Vec<&str> = end.path().iter().map(ElementId::as_str).collect();
        assert_eq!(path, vec!["v1", "e1", "v2"]);
        assert_eq!(end.element().kind(), ElementKind::Vertex);
        assert_eq!(edge.element().kind(), ElementKind::Edge);
    }
}
