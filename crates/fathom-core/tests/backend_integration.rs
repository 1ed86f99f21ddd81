//! Integration tests for the search backend.

use std::collections::BTreeSet;

use fathom_core::proto::{
    keys, Direction, Element, ElementId, GraphElement, Predicate, PredicateTree, Query, Value,
    VertexQuery,
};
use fathom_core::{Backend, Error, GraphConfig, MemoryTransport, PredicateEvaluator, SearchBackend};
use serde_json::json;

struct TestContext {
    backend: SearchBackend<MemoryTransport>,
}

impl TestContext {
    fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        Self {
            backend: SearchBackend::new(MemoryTransport::new(), GraphConfig::default()),
        }
    }

    fn transport(&self) -> &MemoryTransport {
        self.backend.transport()
    }

    fn vertex(&self, id: &str, document: serde_json::Value) {
        self.transport().insert("vertices", id, document);
    }

    fn edge(&self, id: &str, label: &str, out_id: &str, in_id: &str) {
        self.transport().insert(
            "edges",
            id,
            json!({ "label": label, "outid": out_id, "inid": in_id }),
        );
    }
}

fn setup_people(ctx: &TestContext) {
    ctx.vertex("v1", json!({ "age": 25 }));
    ctx.vertex("v2", json!({ "label": "person", "age": 40, "name": "bob" }));
    ctx.vertex("v3", json!({ "label": "person", "age": 50, "name": "carol" }));
}

fn ids<E: GraphElement>(items: &[E]) -> Vec<String> {
    let mut ids: Vec<String> = items.iter().map(|e| e.id().to_string()).collect();
    ids.sort();
    ids
}

fn people_over_30() -> Query {
    Query::vertices().with_predicates(PredicateTree::and([
        PredicateTree::single(Predicate::eq(keys::LABEL, "person")),
        PredicateTree::single(Predicate::gt("age", 30)),
    ]))
}

// ============== Tests ==============

#[test]
fn test_label_and_range_query() {
    let ctx = TestContext::new();
    setup_people(&ctx);

    let found = ctx.backend.query(&people_over_30()).collect_all().unwrap();
    assert_eq!(ids(&found), vec!["v2", "v3"]);
}

#[test]
fn test_residual_filter_corrects_over_return() {
    let ctx = TestContext::new();
    setup_people(&ctx);
    ctx.transport().set_over_return(true);

    let query = people_over_30();
    let found = ctx.backend.query(&query).collect_all().unwrap();
    assert_eq!(ids(&found), vec!["v2", "v3"]);
    for element in &found {
        assert!(PredicateEvaluator::evaluate(&query.predicates, element).unwrap());
    }
}

#[test]
fn test_vertex_query_respects_direction() {
    let ctx = TestContext::new();
    setup_people(&ctx);
    ctx.edge("e1", "knows", "v1", "v2");
    ctx.edge("e2", "knows", "v3", "v1");

    let out = VertexQuery::new([ElementId::from("v1")], Direction::Out);
    let edges = ctx.backend.query_from_vertices(&out).collect_all().unwrap();
    assert_eq!(ids(&edges), vec!["e1"]);

    let both = VertexQuery::new([ElementId::from("v1")], Direction::Both);
    let edges = ctx.backend.query_from_vertices(&both).collect_all().unwrap();
    assert_eq!(ids(&edges), vec!["e1", "e2"]);

    // Incidence is re-checked locally even when the store ignores filters.
    ctx.transport().set_over_return(true);
    let edges = ctx.backend.query_from_vertices(&out).collect_all().unwrap();
    assert_eq!(ids(&edges), vec!["e1"]);
}

#[test]
fn test_vertex_query_with_edge_predicates() {
    let ctx = TestContext::new();
    setup_people(&ctx);
    ctx.edge("e1", "knows", "v1", "v2");
    ctx.edge("e2", "likes", "v1", "v3");

    let query = VertexQuery::new([ElementId::from("v1")], Direction::Out)
        .with_predicates(PredicateTree::single(Predicate::eq(keys::LABEL, "likes")));
    let edges = ctx.backend.query_from_vertices(&query).collect_all().unwrap();
    assert_eq!(ids(&edges), vec!["e2"]);
}

#[test]
fn test_deferred_fetch_loads_once() {
    let ctx = TestContext::new();
    setup_people(&ctx);

    let requested: BTreeSet<ElementId> = ["v2", "v3"].into_iter().map(ElementId::from).collect();
    let placeholders = ctx.backend.load_deferred(&requested);
    assert_eq!(placeholders.len(), 2);
    assert_eq!(ctx.transport().call_count(), 0);

    let v2 = placeholders.iter().find(|p| p.id().as_str() == "v2").unwrap();
    let v3 = placeholders.iter().find(|p| p.id().as_str() == "v3").unwrap();

    assert_eq!(v2.property("name").unwrap(), Some(Value::from("bob")));
    assert_eq!(ctx.transport().call_count(), 1);

    let request = &ctx.transport().requests()[0];
    assert_eq!(request.query, json!({ "ids": { "values": ["v2", "v3"] } }));

    assert_eq!(v3.property("name").unwrap(), Some(Value::from("carol")));
    assert_eq!(ctx.transport().call_count(), 1);
}

#[test]
fn test_whole_call_failure_is_distinguishable_from_empty() {
    let ctx = TestContext::new();
    setup_people(&ctx);
    ctx.transport().fail_calls(Some("connection refused"));

    let mut results = ctx.backend.query(&Query::vertices());
    match results.next() {
        Some(Err(Error::Transport(message))) => assert!(message.contains("connection refused")),
        other => panic!("expected transport error, got {:?}", other),
    }
    assert!(results.next().is_none());

    ctx.transport().fail_calls(None);
    let empty = ctx
        .backend
        .query(&Query::vertices().filter(Predicate::gt("age", 100)))
        .collect_all()
        .unwrap();
    assert!(empty.is_empty());
}

#[test]
fn test_partial_multi_search_failure() {
    let ctx = TestContext::new();
    setup_people(&ctx);
    ctx.edge("e1", "knows", "v1", "v2");
    ctx.transport().fail_collection("edges");

    let found = ctx
        .backend
        .query_many(&[people_over_30(), Query::edges()])
        .collect_all()
        .unwrap();
    assert_eq!(ids(&found), vec!["v2", "v3"]);
    assert!(found.iter().all(|e| matches!(e, Element::Vertex(_))));
    assert_eq!(ctx.transport().call_count(), 1);
}

#[test]
fn test_compile_error_names_predicate() {
    let ctx = TestContext::new();
    setup_people(&ctx);

    let query = Query::vertices().filter(Predicate::like(keys::ID, "v*"));
    let err = ctx.backend.query(&query).collect_all().unwrap_err();
    assert!(matches!(err, Error::Compile { .. }));
    assert!(err.to_string().contains("~id"));
    assert_eq!(ctx.transport().call_count(), 0);
}

#[test]
fn test_limit_and_order_reach_the_store() {
    let ctx = TestContext::new();
    setup_people(&ctx);

    let query = Query::vertices()
        .filter(Predicate::exists("age"))
        .with_order(fathom_core::proto::OrderSpec::desc("age"))
        .with_limit(2);
    let found = ctx.backend.query(&query).collect_all().unwrap();

    let found: Vec<&str> = found.iter().map(|e| e.id().as_str()).collect();
    assert_eq!(found, vec!["v3", "v2"]);
    assert_eq!(ctx.transport().requests()[0].size, 2);
}
