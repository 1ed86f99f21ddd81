//! Boolean AND/OR trees of predicates and their merge rules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::predicate::Predicate;

/// Boolean connective of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Clause {
    /// Every predicate and child must hold.
    And,
    /// At least one predicate or child must hold.
    Or,
}

/// A node combining predicates and nested trees under one clause.
///
/// Predicate and child order is preserved by every operation; some backend
/// translators pick their primary index lookup from the first constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateTree {
    clause: Clause,
    predicates: Vec<Predicate>,
    children: Vec<PredicateTree>,
}

impl Default for PredicateTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl PredicateTree {
    /// The canonical empty tree: an AND node that matches everything.
    pub fn empty() -> Self {
        Self {
            clause: Clause::And,
            predicates: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Build a node directly from its parts.
    pub fn new(clause: Clause, predicates: Vec<Predicate>, children: Vec<PredicateTree>) -> Self {
        Self {
            clause,
            predicates,
            children,
        }
    }

    /// An AND node holding the given predicates.
    pub fn from_predicates(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self {
            clause: Clause::And,
            predicates: predicates.into_iter().collect(),
            children: Vec::new(),
        }
    }

    /// An AND node holding a single predicate.
    pub fn single(predicate: Predicate) -> Self {
        Self::from_predicates([predicate])
    }

    /// AND-merge trees.
    ///
    /// Empty members are dropped. A single remaining tree is returned as is.
    /// Otherwise AND members are spliced into the new node and OR members are
    /// added as opaque children.
    pub fn and(trees: impl IntoIterator<Item = PredicateTree>) -> Self {
        let mut remaining: Vec<PredicateTree> =
            trees.into_iter().filter(|t| !t.is_empty()).collect();

        match remaining.len() {
            0 => Self::empty(),
            1 => remaining.remove(0),
            _ => {
                let mut merged = Self::empty();
                for tree in remaining {
                    match tree.clause {
                        Clause::And => {
                            merged.predicates.extend(tree.predicates);
                            merged.children.extend(tree.children);
                        }
                        Clause::Or => merged.children.push(tree),
                    }
                }
                merged
            }
        }
    }

    /// OR-merge trees.
    ///
    /// Empty members contribute no matches and are dropped. A single remaining
    /// tree is returned as is; otherwise the trees become children of a new
    /// OR node.
    pub fn or(trees: impl IntoIterator<Item = PredicateTree>) -> Self {
        let mut remaining: Vec<PredicateTree> =
            trees.into_iter().filter(|t| !t.is_empty()).collect();

        match remaining.len() {
            0 => Self::empty(),
            1 => remaining.remove(0),
            _ => Self {
                clause: Clause::Or,
                predicates: Vec::new(),
                children: remaining,
            },
        }
    }

    /// True when the node has no predicates and no children.
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty() && self.children.is_empty()
    }

    /// Clause of this node.
    pub fn clause(&self) -> Clause {
        self.clause
    }

    /// Predicates directly held by this node.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Nested trees.
    pub fn children(&self) -> &[PredicateTree] {
        &self.children
    }

    /// Every predicate in the tree, depth first.
    pub fn all_predicates(&self) -> Vec<&Predicate> {
        let mut out: Vec<&Predicate> = self.predicates.iter().collect();
        for child in &self.children {
            out.extend(child.all_predicates());
        }
        out
    }
}

impl From<Predicate> for PredicateTree {
    fn from(predicate: Predicate) -> Self {
        Self::single(predicate)
    }
}

impl fmt::Display for PredicateTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "true");
        }
        let sep = match self.clause {
            Clause::And => " AND ",
            Clause::Or => " OR ",
        };
        write!(f, "(")?;
        let mut first = true;
        for p in &self.predicates {
            if !first {
                write!(f, "{}", sep)?;
            }
            write!(f, "{}", p)?;
            first = false;
        }
        for c in &self.children {
            if !first {
                write!(f, "{}", sep)?;
            }
            write!(f, "{}", c)?;
            first = false;
        }
        write!(f, ")")
    }
}
