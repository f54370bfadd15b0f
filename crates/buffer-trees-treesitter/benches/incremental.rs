use buffer_trees::{BufferId, ByteRange, Edit, PatternSet, SymbolKind, SymbolPattern};
use buffer_trees_treesitter::{BufferTreeStore, GrammarRegistry};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;

fn large_source(function_count: usize) -> String {
    let mut out = String::with_capacity(function_count * 64);
    for i in 0..function_count {
        out.push_str(&format!(
            "def function_{i:05}(a, b):\n    total = a + b * {i}\n    return total\n\n"
        ));
    }
    out
}

fn store() -> BufferTreeStore {
    let mut registry = GrammarRegistry::new();
    registry.register("python", tree_sitter_python::LANGUAGE.into());
    BufferTreeStore::new(Arc::new(registry))
}

fn bench_track(c: &mut Criterion) {
    let source = large_source(5_000);
    let store = store();
    c.bench_function("track/5k_functions", |b| {
        b.iter(|| {
            let tree = store
                .track(BufferId::new(1), "python", black_box(source.as_bytes()))
                .unwrap();
            black_box(tree.node_count());
        })
    });
}

fn bench_typing_in_middle(c: &mut Criterion) {
    let source = large_source(5_000);
    c.bench_function("update/10_inserts_middle", |b| {
        b.iter_batched(
            || {
                let store = store();
                store
                    .track(BufferId::new(1), "python", source.as_bytes())
                    .unwrap();
                (store, source.clone())
            },
            |(store, mut text)| {
                let mut at = text.len() / 2;
                while !text.is_char_boundary(at) {
                    at += 1;
                }
                for _ in 0..10 {
                    let edit = Edit::insert(&text, at, "x").unwrap();
                    text.insert(at, 'x');
                    at += 1;
                    store
                        .update(BufferId::new(1), &edit, text.as_bytes())
                        .unwrap();
                }
                black_box(store.get(BufferId::new(1)));
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_queries(c: &mut Criterion) {
    let source = large_source(5_000);
    let store = store();
    let buffer = BufferId::new(1);
    store.track(buffer, "python", source.as_bytes()).unwrap();
    let patterns = PatternSet::new().with(SymbolPattern::by_field(
        "function_definition",
        "name",
        SymbolKind::Function,
    ));

    c.bench_function("symbols/5k_functions", |b| {
        b.iter(|| black_box(store.symbols(buffer, &patterns).unwrap().len()))
    });

    let caret = ByteRange::point(source.len() / 2);
    c.bench_function("navigate/select_ancestor", |b| {
        b.iter(|| {
            black_box(
                store
                    .navigate(
                        buffer,
                        &buffer_trees::StructuralCommand::SelectAncestor,
                        &[caret],
                    )
                    .unwrap(),
            )
        })
    });
}

criterion_group!(benches, bench_track, bench_typing_in_middle, bench_queries);
criterion_main!(benches);
