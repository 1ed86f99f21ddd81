//! Local query evaluation.
//!
//! The residual evaluator re-checks every element a backend returns against
//! the predicate tree it was asked for.

mod filter;

pub(crate) use filter::full_match_regex;
pub use filter::PredicateEvaluator;
