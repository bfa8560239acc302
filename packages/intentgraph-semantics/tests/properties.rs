//! Universally quantified properties from the storage-and-semantics
//! contract, exercised through the public API

use std::fs;

use intentgraph_semantics::prelude::*;
use intentgraph_store::{cas, EdgeKind, NodeId, NodeKind, Store};
use pretty_assertions::{assert_eq, assert_ne};

fn snapshot_dir(store: &Store, dir: &std::path::Path) -> NodeId {
    SnapshotBuilder::new(store)
        .create_snapshot(&DirSource::new(dir))
        .unwrap()
}

#[test]
fn snapshot_creation_is_deterministic() {
    let state = tempfile::tempdir().unwrap();
    let store = Store::open(state.path()).unwrap();

    let src = tempfile::tempdir().unwrap();
    fs::create_dir_all(src.path().join("auth")).unwrap();
    fs::write(src.path().join("auth/login.js"), "function login(u){return u;}").unwrap();
    fs::write(src.path().join("config.json"), "{\"timeout\":3600}").unwrap();

    let first = snapshot_dir(&store, src.path());
    let second = snapshot_dir(&store, src.path());
    assert_eq!(first, second);

    // One Snapshot node, one File set
    assert_eq!(
        store.graph().get_nodes_by_kind(NodeKind::Snapshot).unwrap().len(),
        1
    );
    let files_a: Vec<NodeId> = store
        .graph()
        .get_edges(&first, EdgeKind::Contains)
        .unwrap()
        .iter()
        .map(|e| e.dst)
        .collect();
    let files_b: Vec<NodeId> = store
        .graph()
        .get_edges(&second, EdgeKind::Contains)
        .unwrap()
        .iter()
        .map(|e| e.dst)
        .collect();
    assert_eq!(files_a, files_b);
}

#[test]
fn changeset_between_snapshot_and_itself_is_minimal() {
    let state = tempfile::tempdir().unwrap();
    let store = Store::open(state.path()).unwrap();
    let src = tempfile::tempdir().unwrap();
    fs::write(src.path().join("a.js"), "let a = 1;").unwrap();
    let snap = snapshot_dir(&store, src.path());

    let matcher = ModuleMatcher::empty();
    let cs = ChangeSetBuilder::new(&store, &matcher)
        .create_changeset(&snap, &snap)
        .unwrap();

    assert!(store.graph().get_edges(&cs, EdgeKind::Modifies).unwrap().is_empty());
    assert!(store.graph().get_edges(&cs, EdgeKind::Has).unwrap().is_empty());
    assert!(store.graph().get_edges(&cs, EdgeKind::Affects).unwrap().is_empty());
}

#[test]
fn blob_write_read_roundtrip() {
    let state = tempfile::tempdir().unwrap();
    let store = Store::open(state.path()).unwrap();

    for content in [&b"alpha"[..], b"", b"\x00\x01\x02binary"] {
        let digest = store.write_object(content).unwrap();
        assert_eq!(store.read_object(&digest).unwrap(), content);
        // write is a function of the bytes alone
        assert_eq!(store.write_object(content).unwrap(), digest);
    }
}

#[test]
fn intent_update_retargets_single_edge_and_keeps_payload_bytes() {
    let state = tempfile::tempdir().unwrap();
    let store = Store::open(state.path()).unwrap();

    let src_a = tempfile::tempdir().unwrap();
    fs::write(src_a.path().join("a.js"), "const L = 1;").unwrap();
    let base = snapshot_dir(&store, src_a.path());
    let src_b = tempfile::tempdir().unwrap();
    fs::write(src_b.path().join("a.js"), "const L = 2;").unwrap();
    let head = snapshot_dir(&store, src_b.path());

    let matcher = ModuleMatcher::empty();
    let cs = ChangeSetBuilder::new(&store, &matcher)
        .create_changeset(&base, &head)
        .unwrap();
    let payload_before =
        cas::canonical_json_string(&store.graph().require_node(&cs).unwrap().payload);

    let intents = IntentGenerator::new(&store);
    let (first_intent, _) = intents.generate_intent(&cs).unwrap();
    let second_intent = intents.render_intent(&cs, "Raise retry limit").unwrap();
    assert_ne!(first_intent, second_intent);

    // Exactly one HAS_INTENT edge, pointing at the second node
    let edges = store.graph().get_edges(&cs, EdgeKind::HasIntent).unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].dst, second_intent);
    let intent_node = store.graph().require_node(&second_intent).unwrap();
    assert_eq!(intent_node.payload["text"], "Raise retry limit");

    // ChangeSet payload bytes are untouched
    let payload_after =
        cas::canonical_json_string(&store.graph().require_node(&cs).unwrap().payload);
    assert_eq!(payload_before, payload_after);
}

#[test]
fn intent_depends_only_on_reachable_closure() {
    let state = tempfile::tempdir().unwrap();
    let store = Store::open(state.path()).unwrap();

    let src_a = tempfile::tempdir().unwrap();
    fs::create_dir_all(src_a.path().join("auth")).unwrap();
    fs::write(src_a.path().join("auth/login.js"), "function login(u){return u;}").unwrap();
    let base = snapshot_dir(&store, src_a.path());

    let src_b = tempfile::tempdir().unwrap();
    fs::create_dir_all(src_b.path().join("auth")).unwrap();
    fs::write(
        src_b.path().join("auth/login.js"),
        "function login(u,t){return u+t;}",
    )
    .unwrap();
    let head = snapshot_dir(&store, src_b.path());
    SnapshotBuilder::new(&store).analyze_symbols(&head).unwrap();

    let matcher = ModuleMatcher::new(vec![ModuleRule::new("Auth", vec!["auth/**".into()])]).unwrap();
    let cs = ChangeSetBuilder::new(&store, &matcher)
        .create_changeset(&base, &head)
        .unwrap();

    let generator = IntentGenerator::new(&store);
    let text_before = generator.compose(&cs).unwrap();

    // Unrelated graph growth must not affect the sentence
    let src_c = tempfile::tempdir().unwrap();
    fs::write(src_c.path().join("other.js"), "function noise() {}").unwrap();
    let unrelated = snapshot_dir(&store, src_c.path());
    ChangeSetBuilder::new(&store, &matcher)
        .create_changeset(&unrelated, &unrelated)
        .unwrap();

    assert_eq!(generator.compose(&cs).unwrap(), text_before);
    assert_eq!(text_before, "Update Auth login");
}

#[test]
fn file_content_changed_fallback_for_unparseable_code() {
    let state = tempfile::tempdir().unwrap();
    let store = Store::open(state.path()).unwrap();

    // Text files with a supported data extension but broken content
    let src_a = tempfile::tempdir().unwrap();
    fs::write(src_a.path().join("data.json"), "{broken").unwrap();
    let base = snapshot_dir(&store, src_a.path());
    let src_b = tempfile::tempdir().unwrap();
    fs::write(src_b.path().join("data.json"), "{still broken").unwrap();
    let head = snapshot_dir(&store, src_b.path());

    let matcher = ModuleMatcher::empty();
    let cs = ChangeSetBuilder::new(&store, &matcher)
        .create_changeset(&base, &head)
        .unwrap();

    // The file keeps its MODIFIES edge and degrades to FILE_CONTENT_CHANGED
    assert_eq!(store.graph().get_edges(&cs, EdgeKind::Modifies).unwrap().len(), 1);
    let categories: Vec<String> = store
        .graph()
        .get_edges(&cs, EdgeKind::Has)
        .unwrap()
        .iter()
        .map(|e| {
            store.graph().require_node(&e.dst).unwrap().payload["category"]
                .as_str()
                .unwrap()
                .to_string()
        })
        .collect();
    assert_eq!(categories, vec!["FILE_CONTENT_CHANGED"]);
}

#[test]
fn store_stats_count_graph_and_blobs() {
    let state = tempfile::tempdir().unwrap();
    let store = Store::open(state.path()).unwrap();
    let src = tempfile::tempdir().unwrap();
    fs::write(src.path().join("a.js"), "let a = 1;").unwrap();
    fs::write(src.path().join("b.js"), "let b = 2;").unwrap();
    snapshot_dir(&store, src.path());

    let stats = store.stats().unwrap();
    assert_eq!(stats.objects, 2);
    assert!(stats.graph.nodes >= 3); // snapshot + 2 files
    assert!(stats.graph.edges >= 2);
    assert_eq!(stats.graph.slugs, 1);
}
