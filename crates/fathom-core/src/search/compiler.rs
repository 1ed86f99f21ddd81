//! Compilation of predicate trees into search-engine query DSL.

use serde_json::{json, Value as Json};

use crate::error::Error;
use fathom_proto::{keys, Clause, Predicate, PredicateOp, PredicateTree, Value};

/// Translates predicate trees into a backend-native filter expression.
pub trait QueryCompiler: Send + Sync {
    /// Compile `tree`, failing on any predicate the backend cannot express.
    fn compile(&self, tree: &PredicateTree) -> Result<Json, Error>;
}

/// Compiles predicate trees into Elasticsearch-style query JSON.
///
/// An empty tree becomes `match_all`. A node with a single filter compiles
/// to that filter; wider nodes become `constant_score` over a `bool` query
/// with `must` (AND) or `should` (OR) clauses.
#[derive(Debug, Clone)]
pub struct SearchQueryCompiler {
    label_field: String,
}

impl SearchQueryCompiler {
    /// Create a compiler mapping the reserved label key onto `label_field`.
    pub fn new(label_field: impl Into<String>) -> Self {
        Self {
            label_field: label_field.into(),
        }
    }

    fn compile_tree(&self, tree: &PredicateTree) -> Result<Json, Error> {
        let mut filters = Vec::with_capacity(tree.predicates().len() + tree.children().len());
        for predicate in tree.predicates() {
            filters.push(self.compile_predicate(predicate)?);
        }
        for child in tree.children() {
            filters.push(self.compile_tree(child)?);
        }

        if filters.is_empty() {
            return Ok(json!({ "match_all": {} }));
        }
        if filters.len() == 1 {
            return Ok(filters.remove(0));
        }

        let occur = match tree.clause() {
            Clause::And => "must",
            Clause::Or => "should",
        };
        Ok(json!({ "constant_score": { "filter": { "bool": { occur: filters } } } }))
    }

    fn compile_predicate(&self, predicate: &Predicate) -> Result<Json, Error> {
        if predicate.field() == keys::ID {
            return Self::compile_id_predicate(predicate);
        }

        let field = if predicate.field() == keys::LABEL {
            self.label_field.as_str()
        } else {
            predicate.field()
        };
        let value = predicate.value();

        match predicate.op() {
            PredicateOp::Eq => Ok(json!({ "term": { field: Self::scalar(predicate)? } })),
            PredicateOp::Neq => Ok(must_not(json!({ "term": { field: Self::scalar(predicate)? } }))),
            PredicateOp::Gt | PredicateOp::Gte | PredicateOp::Lt | PredicateOp::Lte => {
                let bound = match predicate.op() {
                    PredicateOp::Gt => "gt",
                    PredicateOp::Gte => "gte",
                    PredicateOp::Lt => "lt",
                    _ => "lte",
                };
                Ok(json!({ "range": { field: { bound: Self::scalar(predicate)? } } }))
            }
            PredicateOp::Within if value.is_null() => Ok(json!({ "exists": { "field": field } })),
            PredicateOp::Within => Ok(json!({ "terms": { field: Self::members(value) } })),
            PredicateOp::Without if value.is_null() => {
                Ok(must_not(json!({ "exists": { "field": field } })))
            }
            PredicateOp::Without => Ok(must_not(json!({ "terms": { field: Self::members(value) } }))),
            PredicateOp::Like => Ok(json!({ "wildcard": { field: Self::text(predicate)? } })),
            PredicateOp::Unlike => Ok(must_not(json!({ "wildcard": { field: Self::text(predicate)? } }))),
            PredicateOp::Prefix => Ok(json!({ "prefix": { field: Self::text(predicate)? } })),
            PredicateOp::Unprefix => Ok(must_not(json!({ "prefix": { field: Self::text(predicate)? } }))),
            PredicateOp::Regex => Ok(json!({ "regexp": { field: Self::text(predicate)? } })),
            PredicateOp::Unregex => Ok(must_not(json!({ "regexp": { field: Self::text(predicate)? } }))),
        }
    }

    fn compile_id_predicate(predicate: &Predicate) -> Result<Json, Error> {
        let value = predicate.value();
        let ids = || -> Vec<Json> {
            match value {
                Value::List(items) => items.iter().map(id_string).collect(),
                single => vec![id_string(single)],
            }
        };

        match predicate.op() {
            PredicateOp::Eq | PredicateOp::Within if !value.is_null() => {
                Ok(json!({ "ids": { "values": ids() } }))
            }
            PredicateOp::Neq | PredicateOp::Without if !value.is_null() => {
                Ok(must_not(json!({ "ids": { "values": ids() } })))
            }
            op => Err(Error::compile(
                predicate,
                format!("operator '{}' is not supported on element ids", op),
            )),
        }
    }

    fn scalar(predicate: &Predicate) -> Result<Json, Error> {
        match predicate.value() {
            Value::Null => Err(Error::compile(predicate, "operand must not be null")),
            Value::List(_) => Err(Error::compile(predicate, "operand must be a single value")),
            v => Ok(v.to_json()),
        }
    }

    fn members(value: &Value) -> Json {
        match value {
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            single => Json::Array(vec![single.to_json()]),
        }
    }

    fn text(predicate: &Predicate) -> Result<Json, Error> {
        predicate
            .value()
            .as_str()
            .map(|s| Json::String(s.to_string()))
            .ok_or_else(|| Error::compile(predicate, "text operators require a string operand"))
    }
}

impl Default for SearchQueryCompiler {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_LABEL_FIELD)
    }
}

impl QueryCompiler for SearchQueryCompiler {
    fn compile(&self, tree: &PredicateTree) -> Result<Json, Error> {
        self.compile_tree(tree)
    }
}

fn must_not(filter: Json) -> Json {
    json!({ "bool": { "must_not": [filter] } })
}

fn id_string(value: &Value) -> Json {
    match value {
        Value::String(s) => Json::String(s.clone()),
        other => Json::String(other.to_string()),
    }
}
