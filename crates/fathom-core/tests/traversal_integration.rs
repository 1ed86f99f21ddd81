//! End-to-end traversal tests over the in-memory store.

use fathom_core::proto::{Direction, ElementKind, GraphElement, Predicate, Value};
use fathom_core::{
    Error, Graph, GraphConfig, HostStep, MemoryTransport, Pipeline, SearchBackend, Step,
    Traversal, TraversalElement,
};
use serde_json::json;
use std::sync::Arc;

struct TestContext {
    backend: SearchBackend<MemoryTransport>,
    graph: Graph,
}

impl TestContext {
    fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    fn with_config(config: GraphConfig) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let backend = SearchBackend::new(MemoryTransport::new(), config.clone());
        let graph = Graph::new(Arc::new(backend.clone()), config);
        Self { backend, graph }
    }

    fn transport(&self) -> &MemoryTransport {
        self.backend.transport()
    }

    fn person(&self, id: &str, name: &str, age: i64) {
        self.transport().insert(
            "vertices",
            id,
            json!({ "label": "person", "name": name, "age": age }),
        );
    }

    fn edge(&self, id: &str, label: &str, out_id: &str, in_id: &str) {
        self.transport().insert(
            "edges",
            id,
            json!({ "label": label, "outid": out_id, "inid": in_id }),
        );
    }

    fn run(&self, pipeline: Pipeline) -> Vec<TraversalElement> {
        collect(self.graph.traverse(pipeline).unwrap())
    }
}

fn collect(traversal: Traversal) -> Vec<TraversalElement> {
    traversal.map(|t| t.unwrap().into_element()).collect()
}

fn sorted_ids(elements: &[TraversalElement]) -> Vec<String> {
    let mut ids: Vec<String> = elements.iter().map(|e| e.id().to_string()).collect();
    ids.sort();
    ids
}

/// alice -knows-> bob, alice -knows-> carol, bob -knows-> dave,
/// carol -likes-> dave, dave -knows-> erin
fn setup_social(ctx: &TestContext) {
    ctx.person("alice", "alice", 29);
    ctx.person("bob", "bob", 35);
    ctx.person("carol", "carol", 41);
    ctx.person("dave", "dave", 23);
    ctx.person("erin", "erin", 52);
    ctx.edge("e1", "knows", "alice", "bob");
    ctx.edge("e2", "knows", "alice", "carol");
    ctx.edge("e3", "knows", "bob", "dave");
    ctx.edge("e4", "likes", "carol", "dave");
    ctx.edge("e5", "knows", "dave", "erin");
}

// ============== Tests ==============

#[test]
fn test_batch_count_follows_pull_count() {
    let ctx = TestContext::with_config(GraphConfig::default().with_batch_size(2));
    setup_social(&ctx);

    let pipeline = Pipeline::new()
        .vertices(["alice", "bob", "carol", "alice", "erin"])
        .to_edges(Direction::Out, &[]);
    let out = ctx.run(pipeline);

    assert_eq!(ctx.transport().request_count("edges"), 3);
    assert_eq!(ctx.transport().request_count("vertices"), 0);
    assert_eq!(sorted_ids(&out), vec!["e1", "e1", "e2", "e2", "e3", "e4"]);
}

#[test]
fn test_two_hop_with_label_filter() {
    let ctx = TestContext::new();
    setup_social(&ctx);

    let pipeline = Pipeline::new()
        .vertices(["alice"])
        .to_vertices(Direction::Out, &["knows"])
        .to_vertices(Direction::Out, &["knows"]);
    let out = ctx.run(pipeline);

    assert_eq!(sorted_ids(&out), vec!["dave"]);
    assert_eq!(ctx.transport().request_count("edges"), 2);
}

#[test]
fn test_neighbor_properties_load_once_per_batch() {
    let ctx = TestContext::new();
    setup_social(&ctx);

    let pipeline = Pipeline::new()
        .vertices(["alice", "carol"])
        .to_vertices(Direction::Out, &[]);
    let out = ctx.run(pipeline);
    assert_eq!(ctx.transport().request_count("vertices"), 0);

    let mut names = Vec::new();
    for element in &out {
        let vertex = element.resolve().unwrap();
        names.push(vertex.field("name").cloned());
    }
    assert_eq!(names.len(), 3);
    assert!(names.iter().all(Option::is_some));
    assert_eq!(ctx.transport().request_count("vertices"), 1);
}

#[test]
fn test_neighbor_filter_is_pushed_down() {
    let ctx = TestContext::new();
    setup_social(&ctx);

    let pipeline = Pipeline::new()
        .vertices(["alice"])
        .to_vertices(Direction::Out, &["knows"])
        .has(Predicate::gt("age", 40));
    let out = ctx.run(pipeline);

    assert_eq!(sorted_ids(&out), vec!["carol"]);
    assert!(matches!(out[0], TraversalElement::Vertex(_)));
    assert_eq!(ctx.transport().request_count("vertices"), 1);
    assert_eq!(ctx.transport().requests().len(), 2);
}

#[test]
fn test_limit_holds_across_batches() {
    let ctx = TestContext::with_config(GraphConfig::default().with_batch_size(1));
    setup_social(&ctx);

    let pipeline = Pipeline::new()
        .vertices(["alice", "bob", "carol", "dave"])
        .to_edges(Direction::Out, &[])
        .limit(2);
    let out = ctx.run(pipeline);

    assert_eq!(out.len(), 2);
    // Both results come from alice's batch; no further batch is pulled.
    assert_eq!(ctx.transport().request_count("edges"), 1);
}

#[test]
fn test_both_direction_self_loop_fans_out_twice() {
    let ctx = TestContext::new();
    setup_social(&ctx);
    ctx.edge("loop", "knows", "erin", "erin");

    let pipeline = Pipeline::new()
        .vertices(["erin"])
        .to_vertices(Direction::Both, &[]);
    let out = ctx.run(pipeline);

    assert_eq!(sorted_ids(&out), vec!["dave", "erin", "erin"]);
}

#[test]
fn test_root_query_with_absorbed_filters() {
    let ctx = TestContext::new();
    setup_social(&ctx);

    let pipeline = Pipeline::new()
        .vertices(Vec::<&str>::new())
        .has(Predicate::gte("age", 35))
        .limit(10)
        .to_edges(Direction::Out, &["knows"]);
    let out = ctx.run(pipeline);

    assert_eq!(sorted_ids(&out), vec!["e3"]);
    let root = &ctx.transport().requests()[0];
    assert_eq!(root.collection, "vertices");
    assert_eq!(root.size, 10);
}

#[test]
fn test_edge_navigation_filters_edge_fields() {
    let ctx = TestContext::new();
    setup_social(&ctx);
    ctx.transport().insert(
        "edges",
        "e6",
        json!({ "label": "knows", "outid": "erin", "inid": "alice", "since": 2015 }),
    );
    ctx.transport().insert(
        "edges",
        "e7",
        json!({ "label": "knows", "outid": "erin", "inid": "bob", "since": 2021 }),
    );

    let pipeline = Pipeline::new()
        .vertices(["erin"])
        .to_edges(Direction::Out, &["knows"])
        .has(Predicate::gt("since", 2020));
    let out = ctx.run(pipeline);

    assert_eq!(sorted_ids(&out), vec!["e7"]);
    let edge = out[0].as_edge().unwrap();
    assert_eq!(edge.field("since"), Some(&Value::Int(2021)));
}

#[test]
fn test_fetch_failure_surfaces_through_navigation() {
    let ctx = TestContext::new();
    setup_social(&ctx);
    ctx.transport().fail_calls(Some("node down"));

    let pipeline: Pipeline = Pipeline::new()
        .vertices(["alice"])
        .has(Predicate::eq("name", "alice"))
        .to_edges(Direction::Out, &[]);
    let mut traversal = ctx.graph.traverse(pipeline).unwrap();

    match traversal.next() {
        Some(Err(Error::Transport(message))) => assert!(message.contains("node down")),
        other => panic!("expected transport error, got {:?}", other.map(|r| r.is_ok())),
    }
    assert!(traversal.next().is_none());
}

#[derive(Debug, Clone, PartialEq)]
enum Union {
    Branches(Vec<Pipeline<Union>>),
}

impl HostStep for Union {
    fn global_children_mut(&mut self) -> Vec<&mut Pipeline<Self>> {
        match self {
            Union::Branches(branches) => branches.iter_mut().collect(),
        }
    }

    fn local_children_mut(&mut self) -> Vec<&mut Pipeline<Self>> {
        Vec::new()
    }
}

#[test]
fn test_host_pipelines_are_rewritten_but_not_run() {
    let ctx = TestContext::new();
    setup_social(&ctx);

    let branch = Pipeline::new()
        .to_edges(Direction::In, &["knows"])
        .has(Predicate::eq("since", 2020));
    let mut pipeline = Pipeline::new()
        .vertices(["bob"])
        .host(Union::Branches(vec![branch]));

    ctx.graph.rewrite(&mut pipeline);
    let Step::Host(Union::Branches(branches)) = &pipeline.steps()[1] else {
        panic!("expected host step");
    };
    assert_eq!(branches[0].step_names(), vec!["batched_navigate"]);
    let Step::BatchedNavigate(plan) = &branches[0].steps()[0] else {
        panic!("expected batched navigation");
    };
    assert_eq!(plan.returns, ElementKind::Edge);
    assert_eq!(plan.edge_predicates.predicates().len(), 2);

    let err = ctx.graph.traverse(pipeline).err().unwrap();
    assert!(matches!(err, Error::Unsupported { .. }));
}

#[test]
fn test_graph_is_read_only() {
    let ctx = TestContext::new();
    let id = "alice".into();

    assert!(matches!(
        ctx.graph.remove_element(&id),
        Err(Error::Unsupported { .. })
    ));
    let err = ctx
        .graph
        .set_property(&id, "age", Value::Int(30))
        .unwrap_err();
    assert!(err.to_string().contains("set_property"));
}
