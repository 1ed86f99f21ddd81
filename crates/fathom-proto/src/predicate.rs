//! Atomic predicates comparing an element field to a value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::element::ElementId;
use crate::value::Value;

/// Reserved field names that address element metadata rather than fields.
pub mod keys {
    /// Addresses the element id.
    pub const ID: &str = "~id";
    /// Addresses the element label.
    pub const LABEL: &str = "~label";
}

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredicateOp {
    /// Field equals value.
    Eq,
    /// Field does not equal value.
    Neq,
    /// Field greater than value.
    Gt,
    /// Field greater than or equal to value.
    Gte,
    /// Field less than value.
    Lt,
    /// Field less than or equal to value.
    Lte,
    /// Field is a member of a set, or exists when the value is null.
    Within,
    /// Field is not a member of a set, or is absent when the value is null.
    Without,
    /// Field matches a wildcard pattern (`*` and `?`).
    Like,
    /// Field does not match a wildcard pattern.
    Unlike,
    /// Field starts with a prefix.
    Prefix,
    /// Field does not start with a prefix.
    Unprefix,
    /// Field fully matches a regular expression.
    Regex,
    /// Field does not fully match a regular expression.
    Unregex,
}

impl PredicateOp {
    /// Whether this is one of the six text operators.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            PredicateOp::Like
                | PredicateOp::Unlike
                | PredicateOp::Prefix
                | PredicateOp::Unprefix
                | PredicateOp::Regex
                | PredicateOp::Unregex
        )
    }

    /// Whether this is an ordering comparison.
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            PredicateOp::Gt | PredicateOp::Gte | PredicateOp::Lt | PredicateOp::Lte
        )
    }

    fn name(&self) -> &'static str {
        match self {
            PredicateOp::Eq => "eq",
            PredicateOp::Neq => "neq",
            PredicateOp::Gt => "gt",
            PredicateOp::Gte => "gte",
            PredicateOp::Lt => "lt",
            PredicateOp::Lte => "lte",
            PredicateOp::Within => "within",
            PredicateOp::Without => "without",
            PredicateOp::Like => "like",
            PredicateOp::Unlike => "unlike",
            PredicateOp::Prefix => "prefix",
            PredicateOp::Unprefix => "unprefix",
            PredicateOp::Regex => "regex",
            PredicateOp::Unregex => "unregex",
        }
    }
}

impl fmt::Display for PredicateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An immutable condition `field <op> value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    field: String,
    op: PredicateOp,
    value: Value,
}

impl Predicate {
    /// Create a predicate.
    pub fn new(field: impl Into<String>, op: PredicateOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Field name this predicate tests.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Operator of this predicate.
    pub fn op(&self) -> PredicateOp {
        self.op
    }

    /// Value compared against.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Create an equality predicate.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, PredicateOp::Eq, value)
    }

    /// Create a not-equal predicate.
    pub fn neq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, PredicateOp::Neq, value)
    }

    /// Create a greater-than predicate.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, PredicateOp::Gt, value)
    }

    /// Create a greater-than-or-equal predicate.
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, PredicateOp::Gte, value)
    }

    /// Create a less-than predicate.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, PredicateOp::Lt, value)
    }

    /// Create a less-than-or-equal predicate.
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, PredicateOp::Lte, value)
    }

    /// Create a set-membership predicate.
    pub fn within<V: Into<Value>>(field: impl Into<String>, values: Vec<V>) -> Self {
        Self::new(field, PredicateOp::Within, values)
    }

    /// Create a set-exclusion predicate.
    pub fn without<V: Into<Value>>(field: impl Into<String>, values: Vec<V>) -> Self {
        Self::new(field, PredicateOp::Without, values)
    }

    /// Create a "field exists" predicate.
    pub fn exists(field: impl Into<String>) -> Self {
        Self::new(field, PredicateOp::Within, Value::Null)
    }

    /// Create a "field absent" predicate.
    pub fn absent(field: impl Into<String>) -> Self {
        Self::new(field, PredicateOp::Without, Value::Null)
    }

    /// Create a wildcard-match predicate.
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, PredicateOp::Like, pattern.into())
    }

    /// Create a prefix predicate.
    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::new(field, PredicateOp::Prefix, prefix.into())
    }

    /// Create a regular-expression predicate.
    pub fn regex(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, PredicateOp::Regex, pattern.into())
    }

    /// Create a negated wildcard-match predicate. A missing field matches
    /// neither `like` nor `unlike`.
    pub fn unlike(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, PredicateOp::Unlike, pattern.into())
    }

    /// Create a negated prefix predicate.
    pub fn unprefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::new(field, PredicateOp::Unprefix, prefix.into())
    }

    /// Create a negated regular-expression predicate.
    pub fn unregex(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, PredicateOp::Unregex, pattern.into())
    }

    /// Create an id-membership predicate over the reserved id key.
    pub fn id_within<'a, I>(ids: I) -> Self
    where
        I: IntoIterator<Item = &'a ElementId>,
    {
        let values: Vec<Value> = ids.into_iter().map(Value::from).collect();
        Self::new(keys::ID, PredicateOp::Within, Value::List(values))
    }

    /// Create a label-membership predicate over the reserved label key.
    pub fn label_within(labels: &[String]) -> Self {
        Self::within(keys::LABEL, labels.to_vec())
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}({})", self.field, self.op, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let p = Predicate::gt("age", 30);
        assert_eq!(p.field(), "age");
        assert_eq!(p.op(), PredicateOp::Gt);
        assert_eq!(p.value(), &Value::Int(30));

        let exists = Predicate::exists("email");
        assert_eq!(exists.op(), PredicateOp::Within);
        assert!(exists.value().is_null());
    }

    #[test]
    fn test_id_within_collects_ids() {
        let ids = [ElementId::from("v1"), ElementId::from("v2")];
        let p = Predicate::id_within(ids.iter());
        assert_eq!(p.field(), keys::ID);
        assert_eq!(
            p.value(),
            &Value::List(vec![Value::String("v1".into()), Value::String("v2".into())])
        );
    }

    #[test]
    fn test_operator_classes() {
        assert_eq!(Predicate::unlike("name", "al*").op(), PredicateOp::Unlike);
        assert!(Predicate::unprefix("name", "al").op().is_text());
        assert!(PredicateOp::Unregex.is_text());
        assert!(PredicateOp::Lte.is_range());
    }

    #[test]
    fn test_display_names_operator() {
        assert_eq!(Predicate::eq("~label", "person").to_string(), "~label.eq(person)");
    }
}
