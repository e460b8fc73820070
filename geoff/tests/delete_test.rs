use geoff::{Bindings, Error, Subgraph, delete, insert};
use geoff_api::BackendError;
use geoff_store::GraphStore;

fn subgraph(source: &str) -> Subgraph {
    source.parse().unwrap()
}

#[test]
fn delete_with_rebound_names_undoes_the_insert() {
    let mut store = GraphStore::new();
    let rules = subgraph("(A)\n(B)\n(A)-[R:KNOWS]->(B)");

    let out = insert(&rules, &mut store, &Bindings::new()).unwrap();
    assert_eq!(store.node_count(), 2);
    assert_eq!(store.rel_count(), 1);

    // Reverse rule order takes the relationship out before its endpoints.
    delete(&rules, &mut store, &out).unwrap();
    assert_eq!(store.node_count(), 0);
    assert_eq!(store.rel_count(), 0);
}

#[test]
fn delete_searches_for_an_unbound_relationship() {
    let mut store = GraphStore::new();
    let seeded = insert(&subgraph("(A)-[R:KNOWS]->(B)"), &mut store, &Bindings::new()).unwrap();

    let mut endpoints = Bindings::new();
    endpoints.insert("(A)".into(), seeded["(A)"]);
    endpoints.insert("(B)".into(), seeded["(B)"]);

    // Fresh relationship name: delete falls back to the same search merge
    // uses and removes the match; the endpoints stay.
    delete(&subgraph("(A)-[X:KNOWS]->(B)"), &mut store, &endpoints).unwrap();
    assert_eq!(store.rel_count(), 0);
    assert_eq!(store.node_count(), 2);
}

#[test]
fn delete_with_no_bound_endpoints_is_a_no_op() {
    let mut store = GraphStore::new();
    insert(&subgraph("(A)-[R:KNOWS]->(B)"), &mut store, &Bindings::new()).unwrap();

    delete(&subgraph("(A)-[R:KNOWS]->(B)"), &mut store, &Bindings::new()).unwrap();
    assert_eq!(store.rel_count(), 1);
    assert_eq!(store.node_count(), 2);

    delete(&subgraph("(C)"), &mut store, &Bindings::new()).unwrap();
    assert_eq!(store.node_count(), 2);
}

#[test]
fn delete_index_rule_removes_the_entry_but_not_the_entity() {
    let mut store = GraphStore::new();
    let rules = subgraph("(A)<=|People| {\"name\":\"x\"}");
    let out = insert(&rules, &mut store, &Bindings::new()).unwrap();
    assert_eq!(store.index_row_count("People"), 1);

    delete(&rules, &mut store, &out).unwrap();
    assert_eq!(store.index_row_count("People"), 0);
    assert_eq!(store.node_count(), 1);
}

#[test]
fn delete_index_lookup_binds_hits_for_the_earlier_rules() {
    let mut store = GraphStore::new();
    let rules = subgraph("(A)\n(A)<=|People| {\"name\":\"x\"}");
    insert(&rules, &mut store, &Bindings::new()).unwrap();
    assert_eq!(store.node_count(), 1);

    // No bindings at all: the index rule (which runs first in reverse
    // order) looks its hits up and binds them, so the node rule can then
    // delete the node itself.
    delete(&rules, &mut store, &Bindings::new()).unwrap();
    assert_eq!(store.index_row_count("People"), 0);
    assert_eq!(store.node_count(), 0);
}

#[test]
fn deleting_a_wired_node_surfaces_the_backend_error() {
    let mut store = GraphStore::new();
    let out = insert(&subgraph("(A)-[R:KNOWS]->(B)"), &mut store, &Bindings::new()).unwrap();

    let mut bindings = Bindings::new();
    bindings.insert("(A)".into(), out["(A)"]);
    let err = delete(&subgraph("(A)"), &mut store, &bindings).unwrap_err();
    assert!(matches!(err, Error::Backend(BackendError::NodeInUse(_))));
}

#[test]
fn failing_delete_rule_reports_its_source_position() {
    let mut store = GraphStore::new();
    // The bad rule is fourth in the source but first in the reversed walk;
    // the diagnostic must still say 4.
    let err = delete(
        &subgraph("(A)\n(B)\n(C)\n(D)<=|| {\"name\":\"x\"}"),
        &mut store,
        &Bindings::new(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Rule { rule: 4, .. }));
}

#[test]
fn reflect_shape_never_deletes() {
    let mut store = GraphStore::new();
    let seeded = insert(&subgraph("(A)-[R:KNOWS]->(B)"), &mut store, &Bindings::new()).unwrap();

    delete(&subgraph("(A)=[R:KNOWS]=>(B)"), &mut store, &seeded).unwrap();
    assert_eq!(store.rel_count(), 1);
}
