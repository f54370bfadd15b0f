use buffer_trees::navigator::smallest_node_covering;
use buffer_trees::{
    BufferId, ByteRange, Edit, NameSource, PatternSet, StructuralCommand, SymbolKind,
    SymbolPattern, TextChange,
};
use buffer_trees_treesitter::{
    BufferTreeStore, Error, GrammarRegistry, ParseMode, StoreOptions,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;

const SOURCE: &str = "def f():\n    pass\n";

fn registry() -> GrammarRegistry {
    let mut registry = GrammarRegistry::new();
    registry.register("python", tree_sitter_python::LANGUAGE.into());
    registry.register("rust", tree_sitter_rust::LANGUAGE.into());
    registry
}

fn store() -> BufferTreeStore {
    BufferTreeStore::new(Arc::new(registry()))
}

fn debug_store() -> BufferTreeStore {
    BufferTreeStore::with_options(
        Arc::new(registry()),
        StoreOptions {
            debug: true,
            max_cached_trees: None,
        },
    )
}

fn functions() -> PatternSet {
    PatternSet::new().with(SymbolPattern::by_field(
        "function_definition",
        "name",
        SymbolKind::Function,
    ))
}

#[test]
fn test_track_then_get() {
    let store = store();
    let buffer = BufferId::new(1);
    let tracked = store.track(buffer, "python", SOURCE.as_bytes()).unwrap();

    let tree = store.get(buffer).unwrap();
    assert!(Arc::ptr_eq(&tracked, &tree));
    assert_eq!(tree.source_len(), SOURCE.len());
    assert_eq!(tree.root().end_byte(), SOURCE.len());
    assert_eq!(tree.root().kind(), "module");
    assert_eq!(store.tracked_buffer_ids(), vec![buffer]);
}

#[test]
fn test_unsupported_grammar() {
    let store = store();
    let err = store.track(BufferId::new(1), "cobol", b"MOVE A TO B.").unwrap_err();
    assert!(matches!(err, Error::UnsupportedGrammar(name) if name == "cobol"));
    assert!(store.get(BufferId::new(1)).is_none());
}

#[test]
fn test_update_untracked_buffer() {
    let store = store();
    let buffer = BufferId::new(9);
    let edit = Edit::insert("", 0, "x").unwrap();
    assert!(matches!(
        store.update(buffer, &edit, b"x"),
        Err(Error::UntrackedBuffer(id)) if id == buffer
    ));
    assert!(store.get(buffer).is_none());
}

#[test]
fn test_function_symbol() {
    let store = store();
    let buffer = BufferId::new(1);
    store.track(buffer, "python", SOURCE.as_bytes()).unwrap();

    let symbols = store.symbols(buffer, &functions()).unwrap();
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].name, "f");
    assert_eq!(symbols[0].kind, SymbolKind::Function);
    assert_eq!(SOURCE[symbols[0].range.as_range()].trim_end(), SOURCE.trim_end());
    assert_eq!(symbols[0].name_range, ByteRange::new(4, 5));
    assert_eq!(symbols[0].container, None);
}

#[test]
fn test_rename_function() {
    let store = store();
    let buffer = BufferId::new(1);
    store.track(buffer, "python", SOURCE.as_bytes()).unwrap();

    let renamed = "def foo():\n    pass\n";
    let edit = Edit::insert(SOURCE, 5, "oo").unwrap();
    let tree = store.update(buffer, &edit, renamed.as_bytes()).unwrap();

    assert_eq!(tree.source_len(), renamed.len());
    let node = smallest_node_covering(&tree, ByteRange::point(6)).unwrap();
    assert_eq!(node.kind(), "identifier");
    assert_eq!(node.text(), "foo");
    assert_eq!(node.field_name(), Some("name"));

    let symbols = store.symbols(buffer, &functions()).unwrap();
    assert_eq!(symbols[0].name, "foo");
    assert_eq!(
        store.entry(buffer).unwrap().parsed().mode(),
        ParseMode::Incremental
    );
}

#[test]
fn test_noop_edit_keeps_symbols() {
    let store = store();
    let buffer = BufferId::new(1);
    store.track(buffer, "python", SOURCE.as_bytes()).unwrap();
    let before = store.symbols(buffer, &functions()).unwrap();

    let edit = Edit::insert(SOURCE, 3, "").unwrap();
    store.update(buffer, &edit, SOURCE.as_bytes()).unwrap();
    assert_eq!(store.symbols(buffer, &functions()).unwrap(), before);
}

#[test]
fn test_failed_update_keeps_old_tree() {
    let store = store();
    let buffer = BufferId::new(1);
    let old = store.track(buffer, "python", SOURCE.as_bytes()).unwrap();

    // Claims an insertion but the new source is unchanged.
    let edit = Edit::insert(SOURCE, 0, "#").unwrap();
    assert!(matches!(
        store.update(buffer, &edit, SOURCE.as_bytes()),
        Err(Error::InvalidEdit(_))
    ));
    assert!(matches!(
        store.update(buffer, &edit, b"#def f(\xff"),
        Err(Error::UnsupportedEncoding { .. })
    ));
    assert!(Arc::ptr_eq(&old, &store.get(buffer).unwrap()));
}

#[test]
fn test_readers_keep_their_snapshot() {
    let store = store();
    let buffer = BufferId::new(1);
    let snapshot = store.track(buffer, "python", b"x = 1").unwrap();

    let edit = Edit::insert("x = 1", 5, "0").unwrap();
    store.update(buffer, &edit, b"x = 10").unwrap();

    assert_eq!(snapshot.source(), "x = 1");
    assert_eq!(store.get(buffer).unwrap().source(), "x = 10");
}

#[test]
fn test_untrack_is_idempotent() {
    let store = store();
    let buffer = BufferId::new(1);
    store.track(buffer, "python", b"x = 1").unwrap();
    assert!(store.untrack(buffer));
    assert!(!store.untrack(buffer));
    assert!(store.all().is_empty());
}

#[test]
fn test_all_snapshot() {
    let store = store();
    store.track(BufferId::new(1), "python", b"x = 1").unwrap();
    store.track(BufferId::new(2), "rust", b"fn main() {}").unwrap();

    let all = store.all();
    assert_eq!(all.len(), 2);
    assert_eq!(all[&BufferId::new(2)].grammar(), "rust");
    assert_eq!(all[&BufferId::new(1)].root().kind(), "module");
}

#[test]
fn test_get_or_track() {
    let store = store();
    let buffer = BufferId::new(1);
    let first = store.get_or_track(buffer, "python", b"x = 1").unwrap();
    let again = store.get_or_track(buffer, "python", b"x = 1").unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    let switched = store.get_or_track(buffer, "rust", b"x = 1").unwrap();
    assert_eq!(switched.grammar(), "rust");
    let changed = store.get_or_track(buffer, "rust", b"x = 12").unwrap();
    assert_eq!(changed.source_len(), 6);
}

#[test]
fn test_update_with_changes() {
    let store = debug_store();
    let buffer = BufferId::new(1);
    store.track(buffer, "python", "s = 'é'\n".as_bytes()).unwrap();

    let changes = [TextChange::insert(6, "è"), TextChange::replace(0, "s", "name")];
    let tree = store
        .update_with_changes(buffer, &changes, "name = 'éè'\n".as_bytes())
        .unwrap();
    assert_eq!(tree.source(), "name = 'éè'\n");
    assert_eq!(tree.root().end_byte(), tree.source_len());
}

#[test]
fn test_edit_mismatch_in_debug_mode() {
    let store = debug_store();
    let buffer = BufferId::new(1);
    let old = store.track(buffer, "python", b"x = 1").unwrap();

    let changes = [TextChange::insert(5, "0")];
    assert!(matches!(
        store.update_with_changes(buffer, &changes, b"x = 12"),
        Err(Error::EditMismatch(id)) if id == buffer
    ));
    assert!(Arc::ptr_eq(&old, &store.get(buffer).unwrap()));
}

#[test]
fn test_notifications_in_registration_order() {
    let store = Arc::new(store());
    let log = Arc::new(Mutex::new(Vec::new()));

    for name in ["first", "second"] {
        let log = Arc::clone(&log);
        let reader = Arc::downgrade(&store);
        store.subscribe(move |buffer| {
            let len = reader
                .upgrade()
                .and_then(|store| store.get(buffer))
                .map(|tree| tree.source_len());
            log.lock().push((name, buffer.get(), len));
        });
    }

    let buffer = BufferId::new(3);
    store.track(buffer, "python", b"x = 1").unwrap();
    let edit = Edit::insert("x = 1", 5, "0").unwrap();
    store.update(buffer, &edit, b"x = 10").unwrap();
    store.untrack(buffer);

    assert_eq!(
        *log.lock(),
        vec![
            ("first", 3, Some(5)),
            ("second", 3, Some(5)),
            ("first", 3, Some(6)),
            ("second", 3, Some(6)),
        ]
    );
}

#[test]
fn test_failed_update_does_not_notify() {
    let store = store();
    let count = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&count);
    let id = store.subscribe(move |_| *counter.lock() += 1);

    let buffer = BufferId::new(1);
    store.track(buffer, "python", b"x = 1").unwrap();
    let _ = store.track(buffer, "cobol", b"x = 1");
    assert_eq!(*count.lock(), 1);

    assert!(store.unsubscribe(id));
    store.track(buffer, "python", b"x = 2").unwrap();
    assert_eq!(*count.lock(), 1);
}

#[test]
fn test_reentrant_update_in_debug_mode() {
    let store = Arc::new(debug_store());
    let outcomes = Arc::new(Mutex::new(Vec::new()));

    let weak = Arc::downgrade(&store);
    let seen = Arc::clone(&outcomes);
    store.subscribe(move |buffer| {
        let Some(store) = weak.upgrade() else {
            return;
        };
        let same = store.track(buffer, "python", b"y = 2");
        seen.lock()
            .push(matches!(same, Err(Error::ReentrantUpdate(id)) if id == buffer));
    });

    store.track(BufferId::new(1), "python", b"x = 1").unwrap();
    assert_eq!(*outcomes.lock(), vec![true]);
    assert_eq!(store.get(BufferId::new(1)).unwrap().source(), "x = 1");
}

#[test]
fn test_lru_eviction() {
    let store = BufferTreeStore::with_options(
        Arc::new(registry()),
        StoreOptions {
            debug: false,
            max_cached_trees: Some(2),
        },
    );
    for id in 1..=3 {
        store.track(BufferId::new(id), "python", b"x = 1").unwrap();
    }
    assert_eq!(
        store.tracked_buffer_ids(),
        vec![BufferId::new(2), BufferId::new(3)]
    );

    store.track(BufferId::new(2), "python", b"x = 2").unwrap();
    store.track(BufferId::new(4), "python", b"x = 4").unwrap();
    assert_eq!(
        store.tracked_buffer_ids(),
        vec![BufferId::new(2), BufferId::new(4)]
    );
}

#[test]
fn test_set_registry_drops_unsupported_buffers() {
    let store = store();
    store.track(BufferId::new(1), "python", b"x = 1").unwrap();
    store.track(BufferId::new(2), "rust", b"fn main() {}").unwrap();

    let mut python_only = GrammarRegistry::new();
    python_only.register("python", tree_sitter_python::LANGUAGE.into());
    let removed = store.set_registry(Arc::new(python_only));

    assert_eq!(removed, vec![BufferId::new(2)]);
    assert_eq!(store.tracked_buffer_ids(), vec![BufferId::new(1)]);
    assert!(matches!(
        store.track(BufferId::new(2), "rust", b"fn main() {}"),
        Err(Error::UnsupportedGrammar(_))
    ));
}

#[test]
fn test_navigate() {
    let store = store();
    let buffer = BufferId::new(1);
    store.track(buffer, "python", SOURCE.as_bytes()).unwrap();

    let out = store
        .navigate(
            buffer,
            &StructuralCommand::SelectNode,
            &[ByteRange::point(4)],
        )
        .unwrap();
    assert_eq!(out, vec![ByteRange::new(4, 5)]);

    let err = store
        .navigate(
            buffer,
            &StructuralCommand::SelectNode,
            &[ByteRange::new(0, 100)],
        )
        .unwrap_err();
    assert!(matches!(err, Error::OutOfBounds(_)));
}

#[test]
fn test_out_of_bounds_on_empty_source() {
    let store = store();
    let buffer = BufferId::new(1);
    let tree = store.track(buffer, "python", b"").unwrap();
    assert_eq!(tree.source_len(), 0);
    assert!(smallest_node_covering(&tree, ByteRange::new(0, 1)).is_err());
}

#[test]
fn test_render_and_node_info() {
    let store = store();
    let buffer = BufferId::new(1);
    store.track(buffer, "python", b"x = 1\n").unwrap();

    let rendered = store.render(buffer, Some(ByteRange::point(0))).unwrap();
    assert_eq!(rendered, "identifier [left]  (0, 0) → (0, 1)\n");

    let whole = store.render(buffer, None).unwrap();
    assert!(whole.starts_with("module  (0, 0) → (1, 0)\n"));
    assert!(whole.contains("\n      identifier [left]  (0, 0) → (0, 1)\n"));

    let info = store.node_info(buffer, ByteRange::new(0, 5)).unwrap();
    let kinds: Vec<&str> = info.iter().map(|node| node.kind.as_str()).collect();
    assert_eq!(kinds, vec!["expression_statement", "assignment"]);
}

#[test]
fn test_name_source_by_child_kind() {
    let store = store();
    let buffer = BufferId::new(1);
    store.track(buffer, "python", b"class A:\n    pass\n").unwrap();

    let patterns = PatternSet::new().with(SymbolPattern::new(
        "class_definition",
        NameSource::ChildKind("identifier".into()),
        SymbolKind::Class,
    ));
    let symbols = store.symbols(buffer, &patterns).unwrap();
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].name, "A");
}
