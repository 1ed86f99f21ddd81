//! Pipeline rewrite pass.
//!
//! Replaces root fetches and navigations with planned steps, absorbing the
//! filters and limit that directly follow them into the planned query. The
//! pass is pure and idempotent: planned steps are never rewritten again.

use tracing::debug;

use super::pipeline::{FetchPlan, HostStep, NavigationPlan, Pipeline, Step};
use crate::config::GraphConfig;
use fathom_proto::{ElementKind, Predicate, PredicateTree, Query};

/// Filters and limit taken from the steps following a rewritable step.
#[derive(Debug, Default)]
struct Absorbed {
    predicates: Vec<Predicate>,
    limit: Option<usize>,
}

/// Compiles native pipeline steps into batched plans.
#[derive(Debug, Clone)]
pub struct RewritePass {
    batch_size: usize,
}

impl RewritePass {
    /// Create a pass using the navigation batch size from `config`.
    pub fn new(config: &GraphConfig) -> Self {
        Self {
            batch_size: config.batch_size,
        }
    }

    /// Rewrite `pipeline` in place, including every nested pipeline held by
    /// host steps.
    pub fn apply<H: HostStep>(&self, pipeline: &mut Pipeline<H>) {
        let mut i = 0;
        while i < pipeline.steps.len() {
            if pipeline.steps[i].is_rewritable() {
                let absorbed = absorb(&mut pipeline.steps, i);
                let retained_limit = self.rewrite_step(&mut pipeline.steps[i], absorbed);
                if let Some(limit) = retained_limit {
                    pipeline.steps.insert(i + 1, Step::Limit(limit));
                    i += 1;
                }
            }
            i += 1;
        }

        for step in &mut pipeline.steps {
            if let Step::Host(host) = step {
                for child in host.global_children_mut() {
                    self.apply(child);
                }
                for child in host.local_children_mut() {
                    self.apply(child);
                }
            }
        }
    }

    /// Replace a native step with its plan. Returns a limit that must still
    /// be enforced after the planned step.
    fn rewrite_step<H>(&self, step: &mut Step<H>, absorbed: Absorbed) -> Option<usize> {
        match step {
            Step::FetchRoots { kind, ids } => {
                let plan = fetch_plan(*kind, std::mem::take(ids), absorbed);
                debug!(
                    deferred = matches!(plan, FetchPlan::Deferred { .. }),
                    "rewrote root fetch"
                );
                *step = Step::Fetch(plan);
                None
            }
            Step::Navigate {
                direction,
                returns,
                labels,
            } => {
                let structural = if labels.is_empty() {
                    PredicateTree::empty()
                } else {
                    PredicateTree::single(Predicate::label_within(labels))
                };
                let filters = PredicateTree::from_predicates(absorbed.predicates);

                let (edge_predicates, vertex_predicates) = match returns {
                    ElementKind::Edge => (PredicateTree::and([structural, filters]), PredicateTree::empty()),
                    ElementKind::Vertex => (structural, filters),
                };
                // Limiting edges before the neighbor filter would drop matches.
                let limit = if vertex_predicates.is_empty() {
                    absorbed.limit
                } else {
                    None
                };

                let plan = NavigationPlan {
                    direction: *direction,
                    returns: *returns,
                    edge_predicates,
                    vertex_predicates,
                    limit,
                    batch_size: self.batch_size,
                };
                debug!(
                    direction = %plan.direction,
                    returns = %plan.returns,
                    edge_predicates = %plan.edge_predicates,
                    vertex_predicates = %plan.vertex_predicates,
                    limit = ?plan.limit,
                    "rewrote navigation"
                );
                *step = Step::BatchedNavigate(plan);
                absorbed.limit
            }
            _ => None,
        }
    }
}

/// Remove the `Has` steps and at most one `Limit` directly following
/// position `at`. A `Has` after the limit ends absorption.
fn absorb<H>(steps: &mut Vec<Step<H>>, at: usize) -> Absorbed {
    let mut absorbed = Absorbed::default();
    let mut end = at + 1;
    while end < steps.len() {
        match &steps[end] {
            Step::Has(predicates) if absorbed.limit.is_none() => {
                absorbed.predicates.extend(predicates.iter().cloned());
            }
            Step::Limit(limit) if absorbed.limit.is_none() => {
                absorbed.limit = Some(*limit);
            }
            _ => break,
        }
        end += 1;
    }
    steps.drain(at + 1..end);
    absorbed
}

fn fetch_plan(kind: ElementKind, ids: Vec<fathom_proto::ElementId>, absorbed: Absorbed) -> FetchPlan {
    if kind == ElementKind::Vertex
        && !ids.is_empty()
        && absorbed.predicates.is_empty()
        && absorbed.limit.is_none()
    {
        return FetchPlan::Deferred { ids };
    }

    let structural = if ids.is_empty() {
        PredicateTree::empty()
    } else {
        PredicateTree::single(Predicate::id_within(&ids))
    };
    let predicates = PredicateTree::and([
        structural,
        PredicateTree::from_predicates(absorbed.predicates),
    ]);
    FetchPlan::Query(
        Query::new(kind)
            .with_predicates(predicates)
            .with_optional_limit(absorbed.limit),
    )
}
