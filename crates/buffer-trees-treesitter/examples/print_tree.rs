//! Parse a file and print its tree, symbols and the node under a byte offset.
//!
//! ```text
//! RUST_LOG=debug cargo run -p buffer-trees-treesitter --example print_tree -- path/to/file.py 120
//! ```

use buffer_trees::{BufferId, ByteRange, PatternSet, SymbolKind, SymbolPattern};
use buffer_trees_lang::Settings;
use buffer_trees_treesitter::{BufferTreeStore, GrammarRegistry, StoreOptions};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn grammar_for_path(path: &str) -> &'static str {
    if path.ends_with(".rs") { "rust" } else { "python" }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: print_tree <file> [byte offset]")?;
    let offset: Option<usize> = args.next().map(|arg| arg.parse()).transpose()?;

    let settings = Settings::default();
    let registry = GrammarRegistry::from_settings(
        &settings,
        [
            ("python", tree_sitter_python::LANGUAGE.into()),
            ("rust", tree_sitter_rust::LANGUAGE.into()),
        ],
    );
    let store = BufferTreeStore::with_options(
        Arc::new(registry),
        StoreOptions::from_settings(&settings),
    );
    store.subscribe(|buffer| tracing::info!(%buffer, "tree replaced"));

    let source = std::fs::read(&path)?;
    let buffer = BufferId::new(1);
    store.track(buffer, grammar_for_path(&path), &source)?;

    print!("{}", store.render(buffer, offset.map(ByteRange::point))?);

    if let Some(offset) = offset {
        for info in store.node_info(buffer, ByteRange::point(offset))? {
            let line: Vec<String> = info
                .pairs()
                .into_iter()
                .map(|(key, value)| format!("{key}: {value}"))
                .collect();
            println!("{}", line.join(", "));
        }
    }

    let patterns = PatternSet::new()
        .with(SymbolPattern::by_field("function_definition", "name", SymbolKind::Function))
        .with(SymbolPattern::by_field("class_definition", "name", SymbolKind::Class))
        .with(SymbolPattern::by_field("function_item", "name", SymbolKind::Function))
        .with(SymbolPattern::by_field("struct_item", "name", SymbolKind::Class));
    for symbol in store.symbols(buffer, &patterns)? {
        let container = symbol.container.as_deref().unwrap_or("-");
        println!("{} {} {} (in {container})", symbol.kind.label(), symbol.name, symbol.range);
    }
    Ok(())
}
