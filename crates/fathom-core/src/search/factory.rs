//! Construction of graph elements from raw search documents.

use crate::config::GraphConfig;
use crate::error::Error;
use fathom_proto::{Edge, Element, ElementId, ElementKind, FieldMap, Value, Vertex};

/// Builds concrete elements from `(kind, id, raw fields)`.
pub trait ElementFactory: Send + Sync {
    /// Create an element of `kind` from a document.
    fn create(&self, kind: ElementKind, id: ElementId, fields: FieldMap) -> Result<Element, Error>;
}

/// Factory reading endpoints and labels from the reserved document fields.
///
/// The reserved fields are removed from the resulting field map, so they are
/// never visible as ordinary properties.
#[derive(Debug, Clone)]
pub struct DefaultElementFactory {
    out_id_field: String,
    in_id_field: String,
    label_field: String,
    default_vertex_label: String,
    default_edge_label: String,
}

impl DefaultElementFactory {
    /// Create a factory using the field names of `config`.
    pub fn new(config: &GraphConfig) -> Self {
        Self {
            out_id_field: config.out_id_field.clone(),
            in_id_field: config.in_id_field.clone(),
            label_field: config.label_field.clone(),
            default_vertex_label: config.default_vertex_label.clone(),
            default_edge_label: config.default_edge_label.clone(),
        }
    }

    fn take_label(&self, fields: &mut FieldMap, default: &str) -> String {
        match fields.remove(&self.label_field) {
            Some(Value::String(label)) => label,
            Some(other) if !other.is_null() => other.to_string(),
            _ => default.to_string(),
        }
    }

    fn take_endpoint(&self, id: &ElementId, fields: &mut FieldMap, name: &str) -> Result<ElementId, Error> {
        match fields.remove(name) {
            Some(Value::String(endpoint)) => Ok(ElementId::new(endpoint)),
            Some(Value::Int(endpoint)) => Ok(ElementId::new(endpoint.to_string())),
            _ => Err(Error::InvalidData(format!(
                "edge '{}' has no '{}' endpoint field",
                id, name
            ))),
        }
    }
}

impl Default for DefaultElementFactory {
    fn default() -> Self {
        Self::new(&GraphConfig::default())
    }
}

impl ElementFactory for DefaultElementFactory {
    fn create(&self, kind: ElementKind, id: ElementId, mut fields: FieldMap) -> Result<Element, Error> {
        match kind {
            ElementKind::Vertex => {
                let label = self.take_label(&mut fields, &self.default_vertex_label);
                Ok(Vertex::new(id, label, fields).into())
            }
            ElementKind::Edge => {
                let out_id = self.take_endpoint(&id, &mut fields, &self.out_id_field)?;
                let in_id = self.take_endpoint(&id, &mut fields, &self.in_id_field)?;
                let label = self.take_label(&mut fields, &self.default_edge_label);
                Ok(Edge {
                    id,
                    label,
                    out_id,
                    in_id,
                    fields,
                }
                .into())
            }
        }
    }
}
