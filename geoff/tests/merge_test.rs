use geoff::{Bindings, Error, Subgraph, insert, merge};
use geoff_api::{Direction, Entity, GraphBackend, PropertyValue};
use geoff_store::GraphStore;

fn subgraph(source: &str) -> Subgraph {
    source.parse().unwrap()
}

#[test]
fn merge_twice_with_rebound_names_is_idempotent() {
    let mut store = GraphStore::new();
    let rules = subgraph("(A) {\"name\":\"Alice\"}\n(B)\n(A)-[R:KNOWS]->(B)");

    let first = merge(&rules, &mut store, &Bindings::new()).unwrap();
    assert_eq!(store.node_count(), 2);
    assert_eq!(store.rel_count(), 1);

    let second = merge(&rules, &mut store, &first).unwrap();
    assert_eq!(store.node_count(), 2);
    assert_eq!(store.rel_count(), 1);
    assert_eq!(first, second);
}

#[test]
fn merge_search_reuses_an_existing_relationship() {
    let mut store = GraphStore::new();
    let seeded = insert(&subgraph("(A)-[R:KNOWS]->(B)"), &mut store, &Bindings::new()).unwrap();

    // Same endpoints, fresh relationship name: the search finds and binds
    // the existing relationship instead of creating a second one.
    let mut endpoints = Bindings::new();
    endpoints.insert("(A)".into(), seeded["(A)"]);
    endpoints.insert("(B)".into(), seeded["(B)"]);
    let out = merge(
        &subgraph("(A)-[R2:KNOWS]->(B) {\"since\":1977}"),
        &mut store,
        &endpoints,
    )
    .unwrap();

    assert_eq!(store.rel_count(), 1);
    assert_eq!(out["[R2]"], seeded["[R]"]);
    let r = out["[R2]"].as_rel().unwrap();
    assert_eq!(
        store.properties(Entity::Rel(r)).unwrap()["since"],
        PropertyValue::Int(1977)
    );
}

#[test]
fn bound_relationship_update_replaces_properties_and_folds_endpoints() {
    let mut store = GraphStore::new();
    let seeded = insert(
        &subgraph("(A)-[R:KNOWS]->(B) {\"old\":true}"),
        &mut store,
        &Bindings::new(),
    )
    .unwrap();

    let mut initial = Bindings::new();
    initial.insert("[R]".into(), seeded["[R]"]);
    let out = merge(
        &subgraph("(X)-[R:KNOWS]->(Y) {\"w\":1}"),
        &mut store,
        &initial,
    )
    .unwrap();

    // Actual endpoints were folded in under the new names.
    assert_eq!(out["(X)"], seeded["(A)"]);
    assert_eq!(out["(Y)"], seeded["(B)"]);
    let props = store
        .properties(Entity::Rel(seeded["[R]"].as_rel().unwrap()))
        .unwrap();
    assert_eq!(props.len(), 1);
    assert_eq!(props["w"], PropertyValue::Int(1));
}

#[test]
fn explicit_rel_index_narrows_a_multi_match_to_one_slot() {
    let mut store = GraphStore::new();
    let seeded = insert(
        &subgraph("(A)\n(B)\n(A)-[:KNOWS]->(B)\n(A)-[:KNOWS]->(B)"),
        &mut store,
        &Bindings::new(),
    )
    .unwrap();
    assert_eq!(store.rel_count(), 2);

    let mut endpoints = Bindings::new();
    endpoints.insert("(A)".into(), seeded["(A)"]);
    endpoints.insert("(B)".into(), seeded["(B)"]);
    let out = merge(
        &subgraph("(A)-[R.2:KNOWS]->(B) {\"x\":1}"),
        &mut store,
        &endpoints,
    )
    .unwrap();

    // Two matches, but the `.2` token binds only the first, at slot 2.
    assert!(out.contains_key("[R.2]"));
    assert!(!out.contains_key("[R]"));
    assert!(!out.contains_key("[R.1]"));
    let bound = out["[R.2]"].as_rel().unwrap();
    assert_eq!(
        store.properties(Entity::Rel(bound)).unwrap()["x"],
        PropertyValue::Int(1)
    );

    // The unbound match is untouched.
    let a = seeded["(A)"].as_node().unwrap();
    let other = store
        .rels(a, Direction::Outgoing, None)
        .unwrap()
        .into_iter()
        .find(|&rel| rel != bound)
        .unwrap();
    assert!(store.properties(Entity::Rel(other)).unwrap().is_empty());
}

#[test]
fn bound_relationship_with_wrong_type_is_unbound() {
    let mut store = GraphStore::new();
    let seeded = insert(&subgraph("(A)-[R:KNOWS]->(B)"), &mut store, &Bindings::new()).unwrap();

    let mut initial = Bindings::new();
    initial.insert("[R]".into(), seeded["[R]"]);
    let out = merge(&subgraph("[R:LIKES]"), &mut store, &initial).unwrap();

    assert!(!out.contains_key("[R]"));
    // The relationship itself is untouched.
    assert_eq!(store.rel_count(), 1);
}

#[test]
fn set_addressing_updates_every_member() {
    let mut store = GraphStore::new();
    let out = merge(
        &subgraph("(N.1) {\"v\":1}\n(N.2) {\"v\":2}\n(N) {\"v\":9}"),
        &mut store,
        &Bindings::new(),
    )
    .unwrap();

    assert_eq!(store.node_count(), 2);
    for key in ["(N.1)", "(N.2)"] {
        let id = out[key].as_node().unwrap();
        let props = store.properties(Entity::Node(id)).unwrap();
        assert_eq!(props["v"], PropertyValue::Int(9));
        assert_eq!(props.len(), 1);
    }
}

#[test]
fn node_rule_without_data_is_a_pure_touch() {
    let mut store = GraphStore::new();
    let first = merge(&subgraph("(A) {\"name\":\"Alice\"}"), &mut store, &Bindings::new()).unwrap();
    merge(&subgraph("(A)"), &mut store, &first).unwrap();

    let a = first["(A)"].as_node().unwrap();
    assert_eq!(
        store.properties(Entity::Node(a)).unwrap()["name"],
        PropertyValue::Text("Alice".into())
    );
}

#[test]
fn merge_index_rule_reflects_or_creates_idempotently() {
    let mut store = GraphStore::new();
    let rules = subgraph("(A)<=|People| {\"name\":\"x\"}");

    let first = merge(&rules, &mut store, &Bindings::new()).unwrap();
    assert_eq!(store.node_count(), 1);
    assert_eq!(store.index_row_count("People"), 1);

    let second = merge(&rules, &mut store, &Bindings::new()).unwrap();
    assert_eq!(store.node_count(), 1);
    assert_eq!(store.index_row_count("People"), 1);
    assert_eq!(first["(A)"], second["(A)"]);
}

#[test]
fn merge_index_reflection_returns_the_union_of_hits() {
    let mut store = GraphStore::new();
    let value = PropertyValue::Text("x".into());
    let one = Entity::Node(store.create_node().unwrap());
    let two = Entity::Node(store.create_node().unwrap());
    store.index_add("People", one, "name", &value).unwrap();
    store.index_add("People", two, "name", &value).unwrap();

    let out = merge(
        &subgraph("(P)<=|People| {\"name\":\"x\"}"),
        &mut store,
        &Bindings::new(),
    )
    .unwrap();

    assert_eq!(store.node_count(), 2);
    assert_eq!(out["(P.1)"], one);
    assert_eq!(out["(P.2)"], two);
}

#[test]
fn merge_relationship_index_rule_creates_then_reflects() {
    let mut store = GraphStore::new();
    let rules = subgraph("[R:KNOWS]<=|Rels| {\"k\":\"v\"}");

    // No binding, no hit: a fresh relationship between two fresh anonymous
    // nodes, plus the index row.
    let first = merge(&rules, &mut store, &Bindings::new()).unwrap();
    assert_eq!(store.node_count(), 2);
    assert_eq!(store.rel_count(), 1);
    assert_eq!(store.index_row_count("Rels"), 1);
    let r = first["[R]"].as_rel().unwrap();
    assert_eq!(store.rel_type(r).unwrap(), "KNOWS");

    // Repeat with empty bindings: the lookup reflects the hit instead of
    // creating again.
    let second = merge(&rules, &mut store, &Bindings::new()).unwrap();
    assert_eq!(store.node_count(), 2);
    assert_eq!(store.rel_count(), 1);
    assert_eq!(store.index_row_count("Rels"), 1);
    assert_eq!(second["[R]"], first["[R]"]);
}

#[test]
fn untyped_unbound_relationship_index_rule_is_rejected() {
    let mut store = GraphStore::new();
    let err = merge(
        &subgraph("[R]<=|Rels| {\"k\":\"v\"}"),
        &mut store,
        &Bindings::new(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Rule { rule: 1, .. }));
    assert_eq!(store.node_count(), 0);
    assert_eq!(store.rel_count(), 0);
}

#[test]
fn reflect_shape_binds_matches_without_creating() {
    let mut store = GraphStore::new();
    let seeded = insert(&subgraph("(A)-[R:KNOWS]->(B)"), &mut store, &Bindings::new()).unwrap();

    let mut endpoints = Bindings::new();
    endpoints.insert("(A)".into(), seeded["(A)"]);
    endpoints.insert("(B)".into(), seeded["(B)"]);

    let out = merge(&subgraph("(A)=[R2:KNOWS]=>(B)"), &mut store, &endpoints).unwrap();
    assert_eq!(out["[R2]"], seeded["[R]"]);
    assert_eq!(store.rel_count(), 1);

    // Nothing to reflect: the binding is simply absent, nothing is created.
    let out = merge(&subgraph("(A)=[R3:LIKES]=>(B)"), &mut store, &endpoints).unwrap();
    assert!(!out.contains_key("[R3]"));
    assert_eq!(store.rel_count(), 1);
}

#[test]
fn unnamed_index_is_rejected() {
    let mut store = GraphStore::new();
    let err = merge(
        &subgraph("(A)<=|| {\"name\":\"x\"}"),
        &mut store,
        &Bindings::new(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Rule { rule: 1, .. }));
}

#[test]
fn unrecognized_pattern_is_rejected_with_rule_number() {
    let mut store = GraphStore::new();
    // Well-formed tokens, but no dispatchable shape (missing direction).
    let err = merge(&subgraph("(A)-[R:T]-(B)"), &mut store, &Bindings::new()).unwrap_err();
    assert!(matches!(err, Error::Rule { rule: 1, .. }));
}

#[test]
fn heterogeneous_list_value_is_fatal() {
    let mut store = GraphStore::new();
    let err = merge(
        &subgraph("(A) {\"xs\":[1, 2.5]}"),
        &mut store,
        &Bindings::new(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Value(_)));
}

#[test]
fn list_values_homogenize_onto_the_node() {
    let mut store = GraphStore::new();
    let out = merge(
        &subgraph("(A) {\"ns\":[1,2,3],\"mix\":[\"a\",1],\"skip\":null,\"empty\":[]}"),
        &mut store,
        &Bindings::new(),
    )
    .unwrap();

    let props = store
        .properties(Entity::Node(out["(A)"].as_node().unwrap()))
        .unwrap();
    assert_eq!(props["ns"], PropertyValue::IntArray(vec![1, 2, 3]));
    assert_eq!(
        props["mix"],
        PropertyValue::TextArray(vec!["a".into(), "1".into()])
    );
    assert!(!props.contains_key("skip"));
    assert!(!props.contains_key("empty"));
}
