//! Traversal runtime: pipeline model, rewrite pass, batched navigation and
//! the runner that ties them together.

mod batch;
mod element;
mod pipeline;
mod rewrite;
mod runner;

pub use batch::BatchedNavigation;
pub use element::{BasicTraverser, TraversalElement, Traverser};
pub use pipeline::{FetchPlan, HostStep, NavigationPlan, NoHost, Pipeline, Step};
pub use rewrite::RewritePass;
pub use runner::{PipelineRunner, Traversal};
