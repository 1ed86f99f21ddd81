//! Executes rewritten pipelines.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use super::batch::BatchedNavigation;
use super::element::{BasicTraverser, TraversalElement, Traverser};
use super::pipeline::{FetchPlan, Pipeline, Step};
use crate::backend::Backend;
use crate::error::Error;
use crate::query::PredicateEvaluator;
use fathom_proto::{ElementId, PredicateTree};

/// A lazily evaluated stream of traversers.
pub type Traversal = Box<dyn Iterator<Item = Result<BasicTraverser, Error>> + Send>;

/// Drives a rewritten pipeline of [`BasicTraverser`]s against a backend.
///
/// The pipeline must start with a planned `Fetch` and contain only planned
/// steps, residual `Has` filters and `Limit`s.
#[derive(Clone)]
pub struct PipelineRunner {
    backend: Arc<dyn Backend>,
}

impl PipelineRunner {
    /// Create a runner over `backend`.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Build the traversal for `pipeline`. No backend query runs until the
    /// traversal is first advanced.
    pub fn run<H>(&self, pipeline: &Pipeline<H>) -> Result<Traversal, Error> {
        let mut steps = pipeline.steps().iter();
        let mut traversal: Traversal = match steps.next() {
            None => return Ok(Box::new(std::iter::empty())),
            Some(Step::Fetch(plan)) => self.fetch(plan),
            Some(step) => return Err(unsupported(step)),
        };

        for step in steps {
            traversal = match step {
                Step::BatchedNavigate(plan) => Box::new(BatchedNavigation::new(
                    traversal,
                    self.backend.clone(),
                    plan.clone(),
                )),
                Step::Has(predicates) => {
                    let tree = PredicateTree::from_predicates(predicates.iter().cloned());
                    Box::new(traversal.filter_map(move |item| filter(item, &tree).transpose()))
                }
                Step::Limit(limit) => Box::new(traversal.take(*limit)),
                other => return Err(unsupported(other)),
            };
        }

        debug!(steps = ?pipeline.step_names(), "built traversal");
        Ok(traversal)
    }

    fn fetch(&self, plan: &FetchPlan) -> Traversal {
        match plan {
            FetchPlan::Deferred { ids } => {
                let unique: BTreeSet<ElementId> = ids.iter().cloned().collect();
                let placeholders: HashMap<ElementId, TraversalElement> = self
                    .backend
                    .load_deferred(&unique)
                    .into_iter()
                    .map(|d| (d.id().clone(), TraversalElement::Deferred(d)))
                    .collect();

                let roots: Vec<Result<BasicTraverser, Error>> = ids
                    .iter()
                    .map(|id| match placeholders.get(id) {
                        Some(element) => Ok(BasicTraverser::new(element.clone())),
                        None => Err(Error::InvalidData(format!(
                            "backend returned no placeholder for vertex '{}'",
                            id
                        ))),
                    })
                    .collect();
                Box::new(roots.into_iter())
            }
            FetchPlan::Query(query) => Box::new(
                self.backend
                    .query(query)
                    .map(|element| element.map(|e| BasicTraverser::new(TraversalElement::from(e)))),
            ),
        }
    }
}

/// Residual filter step. `Ok(None)` drops the traverser.
fn filter(
    item: Result<BasicTraverser, Error>,
    tree: &PredicateTree,
) -> Result<Option<BasicTraverser>, Error> {
    let traverser = item?;
    let element = traverser.element().resolve()?;
    Ok(PredicateEvaluator::evaluate(tree, &element)?.then_some(traverser))
}

fn unsupported<H>(step: &Step<H>) -> Error {
    let operation = match step {
        Step::FetchRoots { .. } => "unplanned root fetch",
        Step::Navigate { .. } => "unplanned navigation",
        Step::Fetch(_) => "fetch after the first step",
        Step::Host(_) => "host step",
        Step::Has(_) | Step::Limit(_) | Step::BatchedNavigate(_) => "step as pipeline start",
    };
    Error::unsupported(operation)
}
