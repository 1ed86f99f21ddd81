//! Residual predicate evaluation.
//!
//! This module provides the `PredicateEvaluator` that re-checks elements
//! returned by a backend against the predicate tree of the query that
//! produced them. Backend-side translation is an optimization; this check is
//! what makes results correct.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use parking_lot::{const_mutex, Mutex};
use regex::Regex;

use crate::error::Error;
use fathom_proto::{keys, Clause, GraphElement, Predicate, PredicateOp, PredicateTree, Value};

/// Compiled patterns kept across evaluations; cleared when full.
const REGEX_CACHE_CAPACITY: usize = 256;

static REGEX_CACHE: Mutex<BTreeMap<String, Regex>> = const_mutex(BTreeMap::new());

/// Compile `pattern` as a whole-value match, reusing an earlier compilation
/// of the same pattern.
pub(crate) fn full_match_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut cache = REGEX_CACHE.lock();
    if let Some(regex) = cache.get(pattern) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(&format!("^(?:{})$", pattern))?;
    if cache.len() >= REGEX_CACHE_CAPACITY {
        cache.clear();
    }
    cache.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

/// One unit of a wildcard pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Wildcard {
    Literal(char),
    One,
    Any,
}

fn parse_wildcard(pattern: &str) -> Vec<Wildcard> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '*' => Wildcard::Any,
            '?' => Wildcard::One,
            '\\' => Wildcard::Literal(chars.next().unwrap_or('\\')),
            c => Wildcard::Literal(c),
        });
    }
    tokens
}

/// Evaluates predicate trees against graph elements.
pub struct PredicateEvaluator;

impl PredicateEvaluator {
    /// Evaluate a predicate tree against an element.
    ///
    /// Returns `true` if the element matches. An empty tree matches
    /// everything.
    pub fn evaluate<E>(tree: &PredicateTree, element: &E) -> Result<bool, Error>
    where
        E: GraphElement + ?Sized,
    {
        match tree.clause() {
            Clause::And => {
                for p in tree.predicates() {
                    if !Self::evaluate_predicate(p, element)? {
                        return Ok(false);
                    }
                }
                for child in tree.children() {
                    if !Self::evaluate(child, element)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Clause::Or => {
                if tree.is_empty() {
                    return Ok(true);
                }
                for p in tree.predicates() {
                    if Self::evaluate_predicate(p, element)? {
                        return Ok(true);
                    }
                }
                for child in tree.children() {
                    if Self::evaluate(child, element)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Evaluate one predicate against an element.
    pub fn evaluate_predicate<E>(predicate: &Predicate, element: &E) -> Result<bool, Error>
    where
        E: GraphElement + ?Sized,
    {
        let field_value = Self::get_field_value(element, predicate.field());
        let value = predicate.value();

        match predicate.op() {
            PredicateOp::Within => match field_value {
                None => Ok(false),
                Some(fv) if value.is_null() => Ok(!fv.is_null()),
                Some(fv) => Ok(Self::in_set(&fv, value)),
            },
            PredicateOp::Without => match field_value {
                None => Ok(true),
                Some(fv) if value.is_null() => Ok(fv.is_null()),
                Some(fv) => Ok(fv.is_null() || !Self::in_set(&fv, value)),
            },
            op => {
                let fv = match field_value {
                    Some(fv) if !fv.is_null() => fv,
                    // Missing field doesn't match
                    _ => return Ok(false),
                };
                match op {
                    PredicateOp::Eq => Ok(Self::any_value(&fv, |v| v.loosely_equals(value))),
                    PredicateOp::Neq => Ok(!Self::any_value(&fv, |v| v.loosely_equals(value))),
                    PredicateOp::Gt => Ok(Self::any_ordering(&fv, value, Ordering::is_gt)),
                    PredicateOp::Gte => Ok(Self::any_ordering(&fv, value, Ordering::is_ge)),
                    PredicateOp::Lt => Ok(Self::any_ordering(&fv, value, Ordering::is_lt)),
                    PredicateOp::Lte => Ok(Self::any_ordering(&fv, value, Ordering::is_le)),
                    PredicateOp::Like | PredicateOp::Unlike => {
                        let pattern = Self::text_operand(predicate)?;
                        let hit = Self::any_text(&fv, |s| Self::wildcard_match(s, pattern));
                        Ok(hit == (op == PredicateOp::Like))
                    }
                    PredicateOp::Prefix | PredicateOp::Unprefix => {
                        let prefix = Self::text_operand(predicate)?;
                        let hit = Self::any_text(&fv, |s| s.starts_with(prefix));
                        Ok(hit == (op == PredicateOp::Prefix))
                    }
                    PredicateOp::Regex | PredicateOp::Unregex => {
                        let regex = Self::compiled_regex(predicate)?;
                        let hit = Self::any_text(&fv, |s| regex.is_match(s));
                        Ok(hit == (op == PredicateOp::Regex))
                    }
                    PredicateOp::Within | PredicateOp::Without => Ok(false),
                }
            }
        }
    }

    /// Resolve a field, treating the reserved keys as element metadata.
    fn get_field_value<'a, E>(element: &'a E, field: &str) -> Option<Cow<'a, Value>>
    where
        E: GraphElement + ?Sized,
    {
        match field {
            keys::ID => Some(Cow::Owned(Value::String(element.id().as_str().to_string()))),
            keys::LABEL => Some(Cow::Owned(Value::String(element.label().to_string()))),
            _ => element.field(field).map(Cow::Borrowed),
        }
    }

    /// Apply `test` to a scalar field or to each entry of a multi-valued one.
    fn any_value<F>(field_value: &Value, test: F) -> bool
    where
        F: Fn(&Value) -> bool,
    {
        match field_value {
            Value::List(items) => items.iter().any(&test),
            single => test(single),
        }
    }

    fn any_ordering(field_value: &Value, operand: &Value, accept: fn(Ordering) -> bool) -> bool {
        Self::any_value(field_value, |v| v.compare(operand).map(accept).unwrap_or(false))
    }

    fn any_text<F>(field_value: &Value, test: F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        Self::any_value(field_value, |v| v.as_str().map(&test).unwrap_or(false))
    }

    /// Set membership; a scalar operand is a one-element set.
    fn in_set(field_value: &Value, set: &Value) -> bool {
        match set {
            Value::List(members) => {
                Self::any_value(field_value, |v| members.iter().any(|m| v.loosely_equals(m)))
            }
            single => Self::any_value(field_value, |v| v.loosely_equals(single)),
        }
    }

    fn text_operand(predicate: &Predicate) -> Result<&str, Error> {
        predicate
            .value()
            .as_str()
            .ok_or_else(|| Error::InvalidPredicate {
                predicate: predicate.to_string(),
                reason: "text operators require a string operand".to_string(),
            })
    }

    fn compiled_regex(predicate: &Predicate) -> Result<Regex, Error> {
        let pattern = Self::text_operand(predicate)?;
        full_match_regex(pattern).map_err(|e| Error::InvalidPredicate {
            predicate: predicate.to_string(),
            reason: e.to_string(),
        })
    }

    /// Match a string against a wildcard pattern.
    ///
    /// Supports:
    /// - `*` matches zero or more characters
    /// - `?` matches exactly one character
    /// - `\\*` matches literal `*`
    /// - `\\?` matches literal `?`
    ///
    /// Runs in `O(value * pattern)`: on a mismatch only the most recent `*`
    /// is widened.
    pub fn wildcard_match(value: &str, pattern: &str) -> bool {
        let tokens = parse_wildcard(pattern);
        let text: Vec<char> = value.chars().collect();

        let (mut t, mut p) = (0, 0);
        // (token after the last `*`, text position it currently absorbs up to)
        let mut resume: Option<(usize, usize)> = None;

        while t < text.len() {
            match tokens.get(p) {
                Some(Wildcard::Any) => {
                    p += 1;
                    resume = Some((p, t));
                }
                Some(Wildcard::One) => {
                    p += 1;
                    t += 1;
                }
                Some(Wildcard::Literal(c)) if *c == text[t] => {
                    p += 1;
                    t += 1;
                }
                _ => match resume {
                    Some((after_star, absorbed)) => {
                        p = after_star;
                        t = absorbed + 1;
                        resume = Some((after_star, t));
                    }
                    None => return false,
                },
            }
        }

        tokens[p..].iter().all(|token| *token == Wildcard::Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fathom_proto::{FieldMap, Vertex};
    use std::time::{Duration, Instant};

    fn person() -> Vertex {
        Vertex::new("v1", "person", FieldMap::new())
            .with_field("name", "Alice")
            .with_field("age", 30)
            .with_field("score", 7.5)
            .with_field("tags", vec!["admin", "dev"])
    }

    fn eval(predicate: Predicate) -> bool {
        PredicateEvaluator::evaluate(&PredicateTree::single(predicate), &person()).unwrap()
    }

    #[test]
    fn test_eq_and_neq() {
        assert!(eval(Predicate::eq("name", "Alice")));
        assert!(!eval(Predicate::eq("name", "Bob")));
        assert!(eval(Predicate::neq("name", "Bob")));
        assert!(!eval(Predicate::neq("name", "Alice")));
        // Numeric coercion
        assert!(eval(Predicate::eq("age", 30.0)));
    }

    #[test]
    fn test_comparison_predicates() {
        assert!(eval(Predicate::gt("age", 29)));
        assert!(!eval(Predicate::gt("age", 30)));
        assert!(eval(Predicate::gte("age", 30)));
        assert!(eval(Predicate::lt("score", 8)));
        assert!(eval(Predicate::lte("score", 7.5)));
        assert!(!eval(Predicate::lt("name", 3)));
    }

    #[test]
    fn test_reserved_keys() {
        assert!(eval(Predicate::eq(keys::ID, "v1")));
        assert!(eval(Predicate::within(keys::LABEL, vec!["person", "place"])));
        assert!(!eval(Predicate::eq(keys::LABEL, "place")));
    }

    #[test]
    fn test_within_and_without() {
        assert!(eval(Predicate::within("age", vec![10, 30])));
        assert!(!eval(Predicate::within("age", vec![10, 20])));
        assert!(eval(Predicate::without("age", vec![10, 20])));
        assert!(!eval(Predicate::without("age", vec![30])));
        // Multi-valued field matches on any entry
        assert!(eval(Predicate::within("tags", vec!["dev"])));
    }

    #[test]
    fn test_existence() {
        assert!(eval(Predicate::exists("name")));
        assert!(!eval(Predicate::exists("email")));
        assert!(eval(Predicate::absent("email")));
        assert!(!eval(Predicate::absent("name")));
    }

    #[test]
    fn test_missing_field() {
        assert!(!eval(Predicate::eq("email", "x")));
        assert!(!eval(Predicate::neq("email", "x")));
        assert!(!eval(Predicate::gt("email", 1)));
        assert!(!eval(Predicate::unlike("email", "*")));
        assert!(eval(Predicate::without("email", vec!["x"])));
    }

    #[test]
    fn test_text_predicates() {
        assert!(eval(Predicate::like("name", "A*e")));
        assert!(eval(Predicate::like("name", "Al?ce")));
        assert!(!eval(Predicate::like("name", "Al?e")));
        assert!(eval(Predicate::unlike("name", "Bo*")));
        assert!(eval(Predicate::prefix("name", "Ali")));
        assert!(eval(Predicate::unprefix("name", "Bo")));
        assert!(eval(Predicate::regex("name", "A.*")));
        // Regex must match the whole value
        assert!(!eval(Predicate::regex("name", "lic")));
        assert!(eval(Predicate::unregex("name", "lic")));
    }

    #[test]
    fn test_wildcard_match() {
        assert!(PredicateEvaluator::wildcard_match("hello", "*"));
        assert!(PredicateEvaluator::wildcard_match("", "*"));
        assert!(PredicateEvaluator::wildcard_match("hello", "h*o"));
        assert!(PredicateEvaluator::wildcard_match("a*b", "a\\*b"));
        assert!(!PredicateEvaluator::wildcard_match("axb", "a\\*b"));
        assert!(!PredicateEvaluator::wildcard_match("hello", "h?"));
        assert!(PredicateEvaluator::wildcard_match("abcbd", "a*b?d"));
        assert!(PredicateEvaluator::wildcard_match("mississippi", "m*iss*ppi"));
        assert!(!PredicateEvaluator::wildcard_match("mississippi", "m*iss*ppix"));
        assert!(PredicateEvaluator::wildcard_match("a?c", "a\\?c"));
        assert!(!PredicateEvaluator::wildcard_match("abc", "a\\?c"));
        assert!(!PredicateEvaluator::wildcard_match("ab", "ab?"));
        assert!(PredicateEvaluator::wildcard_match("ab", "ab**"));
    }

    #[test]
    fn test_wildcard_with_many_stars_is_linear() {
        let value = "a".repeat(5_000);
        let started = Instant::now();

        assert!(!PredicateEvaluator::wildcard_match(&value, "*a*a*a*a*a*a*a*b"));
        assert!(PredicateEvaluator::wildcard_match(&value, "*a*a*a*a*a*a*a*a"));
        assert!(!PredicateEvaluator::wildcard_match(&"a".repeat(40), "*a*a*a*a*a*a*a*b"));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_regex_compiled_once_per_pattern() {
        let first = full_match_regex("ca(t|r)s?").unwrap();
        let second = full_match_regex("ca(t|r)s?").unwrap();

        assert!(first.is_match("cars") && second.is_match("cat"));
        assert!(!first.is_match("scat"));
        assert!(REGEX_CACHE.lock().contains_key("ca(t|r)s?"));
        assert!(full_match_regex("(unclosed").is_err());
        assert!(!REGEX_CACHE.lock().contains_key("(unclosed"));
    }

    #[test]
    fn test_invalid_regex_is_error() {
        let tree = PredicateTree::single(Predicate::regex("name", "(unclosed"));
        let err = PredicateEvaluator::evaluate(&tree, &person()).unwrap_err();
        assert!(matches!(err, Error::InvalidPredicate { .. }));
    }

    #[test]
    fn test_and_or_trees() {
        let and = PredicateTree::from_predicates([
            Predicate::eq(keys::LABEL, "person"),
            Predicate::gt("age", 25),
        ]);
        assert!(PredicateEvaluator::evaluate(&and, &person()).unwrap());

        let or = PredicateTree::or([
            PredicateTree::single(Predicate::eq("name", "Bob")),
            PredicateTree::single(Predicate::eq("age", 30)),
        ]);
        assert!(PredicateEvaluator::evaluate(&or, &person()).unwrap());

        let none = PredicateTree::or([
            PredicateTree::single(Predicate::eq("name", "Bob")),
            PredicateTree::single(Predicate::eq("age", 31)),
        ]);
        assert!(!PredicateEvaluator::evaluate(&none, &person()).unwrap());
    }

    #[test]
    fn test_empty_tree_matches() {
        assert!(PredicateEvaluator::evaluate(&PredicateTree::empty(), &person()).unwrap());
    }

    #[test]
    fn test_singleton_normalization_preserves_meaning() {
        let or = PredicateTree::or([
            PredicateTree::single(Predicate::eq("name", "Bob")),
            PredicateTree::single(Predicate::lt("age", 40)),
        ]);
        let v = person();
        let direct = PredicateEvaluator::evaluate(&or, &v).unwrap();
        let via_and = PredicateEvaluator::evaluate(&PredicateTree::and([or.clone()]), &v).unwrap();
        let via_or = PredicateEvaluator::evaluate(&PredicateTree::or([or]), &v).unwrap();
        assert_eq!(direct, via_and);
        assert_eq!(direct, via_or);
    }
}
