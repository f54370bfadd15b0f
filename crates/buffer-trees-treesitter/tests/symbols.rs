use buffer_trees::{BufferId, ByteRange, PatternSet, SymbolKind, SymbolPattern};
use buffer_trees_treesitter::{
    BufferTreeStore, Error, GrammarRegistry, SYMBOLS_FILE, SymbolQuery, load_query_source,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Arc;

const SAMPLE: &str = include_str!("fixtures/sample.py");

fn queries_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/queries")
}

fn tracked_sample() -> (BufferTreeStore, BufferId) {
    let mut registry = GrammarRegistry::new();
    registry.register("python", tree_sitter_python::LANGUAGE.into());
    registry.register("rust", tree_sitter_rust::LANGUAGE.into());
    let store = BufferTreeStore::new(Arc::new(registry));
    let buffer = BufferId::new(7);
    store.track(buffer, "python", SAMPLE.as_bytes()).unwrap();
    (store, buffer)
}

fn summary(symbols: &[buffer_trees::Symbol]) -> Vec<(&str, SymbolKind, Option<&str>)> {
    symbols
        .iter()
        .map(|s| (s.name.as_str(), s.kind, s.container.as_deref()))
        .collect()
}

#[test]
fn test_pattern_symbols_with_containers() {
    let (store, buffer) = tracked_sample();
    let patterns = PatternSet::new()
        .with(SymbolPattern::by_field(
            "class_definition",
            "name",
            SymbolKind::Class,
        ))
        .with(SymbolPattern::by_field(
            "function_definition",
            "name",
            SymbolKind::Function,
        ))
        // Malformed: skipped, not an error.
        .with(SymbolPattern::by_field("", "name", SymbolKind::Variable));

    let symbols = store.symbols(buffer, &patterns).unwrap();
    assert_eq!(
        summary(&symbols),
        vec![
            ("Greeter", SymbolKind::Class, None),
            ("__init__", SymbolKind::Function, Some("Greeter")),
            ("greet", SymbolKind::Function, Some("Greeter")),
            ("main", SymbolKind::Function, None),
        ]
    );
}

#[test]
fn test_inherited_query_source() {
    let source = load_query_source(queries_path(), "python", SYMBOLS_FILE).unwrap();
    assert!(source.contains("@definition.class"));
    assert!(source.contains("@definition.function"));
    assert!(source.contains("@breadcrumb.1"));
}

#[test]
fn test_missing_query_file() {
    assert!(matches!(
        load_query_source(queries_path(), "cobol", SYMBOLS_FILE),
        Err(Error::QueryFile { .. })
    ));
}

#[test]
fn test_query_symbols() {
    let (store, buffer) = tracked_sample();
    let source = load_query_source(queries_path(), "python", SYMBOLS_FILE).unwrap();
    let query = SymbolQuery::new(&store.registry(), "python", &source).unwrap();

    let symbols = store.query_symbols(buffer, &query).unwrap();
    let names: Vec<(&str, SymbolKind)> = symbols
        .iter()
        .map(|s| (s.name.as_str(), s.kind))
        .collect();
    assert_eq!(
        names,
        vec![
            ("Greeter", SymbolKind::Class),
            ("__init__", SymbolKind::Function),
            ("greet", SymbolKind::Function),
            ("main", SymbolKind::Function),
        ]
    );
    for symbol in &symbols {
        assert_eq!(&SAMPLE[symbol.range.as_range()], symbol.name);
    }

    let containers: Vec<(&str, Option<&str>)> = symbols
        .iter()
        .map(|s| (s.name.as_str(), s.container.as_deref()))
        .collect();
    assert_eq!(
        containers,
        vec![
            ("Greeter", None),
            ("__init__", Some("Greeter")),
            ("greet", Some("Greeter")),
            ("main", None),
        ]
    );
}

#[test]
fn test_query_symbols_without_breadcrumbs() {
    let (store, buffer) = tracked_sample();
    let query = SymbolQuery::new(
        &store.registry(),
        "python",
        "(class_definition name: (identifier) @definition.class)
         (function_definition name: (identifier) @definition.function)",
    )
    .unwrap();

    let symbols = store.query_symbols(buffer, &query).unwrap();
    let greet = symbols.iter().find(|s| s.name == "greet").unwrap();
    assert_eq!(greet.container.as_deref(), Some("Greeter"));
    let main = symbols.iter().find(|s| s.name == "main").unwrap();
    assert_eq!(main.container, None);
}

#[test]
fn test_ad_hoc_query_in_selection() {
    let (store, buffer) = tracked_sample();
    let query = SymbolQuery::ad_hoc(&store.registry(), "python", "function_definition").unwrap();

    let everywhere = store.query_symbols(buffer, &query).unwrap();
    assert_eq!(
        summary(&everywhere),
        vec![
            ("__init__", SymbolKind::Unknown, None),
            ("greet", SymbolKind::Unknown, None),
            ("main", SymbolKind::Unknown, None),
        ]
    );

    let class_start = SAMPLE.find("class Greeter").unwrap();
    let class_end = SAMPLE.find("\n\n\ndef main").unwrap();
    let in_class = store
        .query_symbols_in(buffer, &query, &[ByteRange::new(class_start, class_end)])
        .unwrap();
    let names: Vec<&str> = in_class.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["__init__", "greet"]);

    // A query that already names its captures is compiled as written.
    let explicit = SymbolQuery::ad_hoc(
        &store.registry(),
        "python",
        "(class_definition name: (identifier) @definition.class)",
    )
    .unwrap();
    let classes = store.query_symbols(buffer, &explicit).unwrap();
    assert_eq!(summary(&classes), vec![("Greeter", SymbolKind::Class, None)]);
}

#[test]
fn test_query_for_another_grammar() {
    let (store, buffer) = tracked_sample();
    let query = SymbolQuery::new(
        &store.registry(),
        "rust",
        "(function_item name: (identifier) @definition.function)",
    )
    .unwrap();
    assert!(matches!(
        store.query_symbols(buffer, &query),
        Err(Error::Query(_))
    ));
    assert!(matches!(
        store.query_symbols(BufferId::new(99), &query),
        Err(Error::UntrackedBuffer(_))
    ));
}
