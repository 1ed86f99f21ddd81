//! Graph configuration.

use fathom_proto::ElementKind;

/// Default collection holding vertex documents.
pub const DEFAULT_VERTEX_COLLECTION: &str = "vertices";

/// Default collection holding edge documents.
pub const DEFAULT_EDGE_COLLECTION: &str = "edges";

/// Default result cap applied when a query has no limit.
pub const DEFAULT_QUERY_LIMIT: usize = 10_000;

/// Default number of traversal contexts per navigation batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default document field holding an edge's out-vertex id.
pub const DEFAULT_OUT_ID_FIELD: &str = "outid";

/// Default document field holding an edge's in-vertex id.
pub const DEFAULT_IN_ID_FIELD: &str = "inid";

/// Default document field holding the element label.
pub const DEFAULT_LABEL_FIELD: &str = "label";

/// Label given to vertex documents without a label field.
pub const DEFAULT_VERTEX_LABEL: &str = "vertex";

/// Label given to edge documents without a label field.
pub const DEFAULT_EDGE_LABEL: &str = "edge";

/// Configuration shared by the backend, the rewrite pass and the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    /// Collection holding vertex documents.
    pub vertex_collection: String,

    /// Collection holding edge documents.
    pub edge_collection: String,

    /// Result cap for queries without a limit.
    pub query_limit: usize,

    /// Traversal contexts grouped into one navigation query.
    pub batch_size: usize,

    /// Field holding an edge's out-vertex id.
    pub out_id_field: String,

    /// Field holding an edge's in-vertex id.
    pub in_id_field: String,

    /// Field holding the element label.
    pub label_field: String,

    /// Fallback vertex label.
    pub default_vertex_label: String,

    /// Fallback edge label.
    pub default_edge_label: String,
}

impl GraphConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            vertex_collection: DEFAULT_VERTEX_COLLECTION.to_string(),
            edge_collection: DEFAULT_EDGE_COLLECTION.to_string(),
            query_limit: DEFAULT_QUERY_LIMIT,
            batch_size: DEFAULT_BATCH_SIZE,
            out_id_field: DEFAULT_OUT_ID_FIELD.to_string(),
            in_id_field: DEFAULT_IN_ID_FIELD.to_string(),
            label_field: DEFAULT_LABEL_FIELD.to_string(),
            default_vertex_label: DEFAULT_VERTEX_LABEL.to_string(),
            default_edge_label: DEFAULT_EDGE_LABEL.to_string(),
        }
    }

    /// Set the vertex and edge collection names.
    pub fn with_collections(
        mut self,
        vertices: impl Into<String>,
        edges: impl Into<String>,
    ) -> Self {
        self.vertex_collection = vertices.into();
        self.edge_collection = edges.into();
        self
    }

    /// Set the result cap for unbounded queries.
    pub fn with_query_limit(mut self, limit: usize) -> Self {
        self.query_limit = limit.max(1);
        self
    }

    /// Set the navigation batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the endpoint id fields of edge documents.
    pub fn with_endpoint_fields(
        mut self,
        out_id: impl Into<String>,
        in_id: impl Into<String>,
    ) -> Self {
        self.out_id_field = out_id.into();
        self.in_id_field = in_id.into();
        self
    }

    /// Set the label field.
    pub fn with_label_field(mut self, field: impl Into<String>) -> Self {
        self.label_field = field.into();
        self
    }

    /// Collection storing elements of `kind`.
    pub fn collection(&self, kind: ElementKind) -> &str {
        match kind {
            ElementKind::Vertex => &self.vertex_collection,
            ElementKind::Edge => &self.edge_collection,
        }
    }

    /// Fallback label for elements of `kind`.
    pub fn default_label(&self, kind: ElementKind) -> &str {
        match kind {
            ElementKind::Vertex => &self.default_vertex_label,
            ElementKind::Edge => &self.default_edge_label,
        }
    }

    /// Result size to request for a query with `limit`.
    pub fn effective_limit(&self, limit: Option<usize>) -> usize {
        limit.unwrap_or(self.query_limit)
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GraphConfig::default();
        assert_eq!(config.collection(ElementKind::Vertex), DEFAULT_VERTEX_COLLECTION);
        assert_eq!(config.collection(ElementKind::Edge), DEFAULT_EDGE_COLLECTION);
        assert_eq!(config.query_limit, DEFAULT_QUERY_LIMIT);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.out_id_field, "outid");
        assert_eq!(config.in_id_field, "inid");
        assert_eq!(config.default_label(ElementKind::Edge), "edge");
    }

    #[test]
    fn test_config_builder() {
        let config = GraphConfig::new()
            .with_collections("people", "links")
            .with_batch_size(0)
            .with_query_limit(50)
            .with_endpoint_fields("src", "dst")
            .with_label_field("type");

        assert_eq!(config.collection(ElementKind::Vertex), "people");
        assert_eq!(config.collection(ElementKind::Edge), "links");
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.effective_limit(None), 50);
        assert_eq!(config.effective_limit(Some(3)), 3);
        assert_eq!(config.out_id_field, "src");
        assert_eq!(config.label_field, "type");
    }
}
