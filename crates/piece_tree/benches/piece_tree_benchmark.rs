use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use piece_tree::{Tree, TreeWalker};
use std::hint::black_box;

fn sample_text(size: usize) -> String {
    "lorem ipsum dolor\n".chars().cycle().take(size).collect()
}

fn bench_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("creation");

    for size in [1_000, 10_000, 100_000].iter() {
        let text = sample_text(*size);

        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::new("piece_tree", size), size, |b, _| {
            b.iter(|| black_box(Tree::from(black_box(text.as_str()))))
        });

        group.bench_with_input(BenchmarkId::new("ropey", size), size, |b, _| {
            b.iter(|| black_box(ropey::Rope::from_str(black_box(text.as_str()))))
        });
    }
    group.finish();
}

fn bench_insert_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    let insert_text = "INSERTED";

    for size in [1_000, 10_000, 100_000].iter() {
        let text = sample_text(*size);
        group.throughput(Throughput::Elements(1));

        for (name, at) in [("beginning", 0), ("middle", size / 2), ("end", *size)] {
            group.bench_with_input(
                BenchmarkId::new(format!("piece_tree_{name}"), size),
                size,
                |b, _| {
                    b.iter_batched(
                        || Tree::from(text.as_str()),
                        |mut tree| {
                            let _ = tree.insert(black_box(at), black_box(insert_text));
                            black_box(tree);
                        },
                        BatchSize::SmallInput,
                    )
                },
            );

            group.bench_with_input(BenchmarkId::new(format!("ropey_{name}"), size), size, |b, _| {
                b.iter_batched(
                    || ropey::Rope::from_str(text.as_str()),
                    |mut rope| {
                        rope.insert(black_box(at), black_box(insert_text));
                        black_box(rope);
                    },
                    BatchSize::SmallInput,
                )
            });

            group.bench_with_input(BenchmarkId::new(format!("string_{name}"), size), size, |b, _| {
                b.iter_batched(
                    || text.clone(),
                    |mut string| {
                        string.insert_str(black_box(at), black_box(insert_text));
                        black_box(string);
                    },
                    BatchSize::SmallInput,
                )
            });
        }
    }
    group.finish();
}

fn bench_typing(c: &mut Criterion) {
    let mut group = c.benchmark_group("typing");
    let text = sample_text(100_000);
    let typed = "the quick brown fox jumps over the lazy dog ";
    group.throughput(Throughput::Elements(typed.len() as u64));

    group.bench_function("piece_tree", |b| {
        b.iter_batched(
            || Tree::from(text.as_str()),
            |mut tree| {
                for (i, ch) in typed.char_indices() {
                    let mut buf = [0; 4];
                    let _ = tree.insert(50_000 + i, ch.encode_utf8(&mut buf));
                }
                black_box(tree);
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("ropey", |b| {
        b.iter_batched(
            || ropey::Rope::from_str(text.as_str()),
            |mut rope| {
                for (i, ch) in typed.char_indices() {
                    rope.insert_char(50_000 + i, ch);
                }
                black_box(rope);
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_delete_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete");

    for size in [1_000, 10_000, 100_000].iter() {
        let text = sample_text(*size);
        let delete_size = size / 10;
        let start = size / 2 - delete_size / 2;

        group.throughput(Throughput::Elements(delete_size as u64));

        group.bench_with_input(BenchmarkId::new("piece_tree_middle", size), size, |b, _| {
            b.iter_batched(
                || {
                    // Fragment the document so the range spans several pieces.
                    let mut tree = Tree::from(text.as_str());
                    for i in (0..*size).step_by(size / 16) {
                        let _ = tree.insert(i, "#");
                    }
                    tree
                },
                |mut tree| {
                    let _ = tree.remove(black_box(start), black_box(delete_size));
                    black_box(tree);
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("ropey_middle", size), size, |b, _| {
            b.iter_batched(
                || ropey::Rope::from_str(text.as_str()),
                |mut rope| {
                    rope.remove(black_box(start..start + delete_size));
                    black_box(rope);
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("string_middle", size), size, |b, _| {
            b.iter_batched(
                || text.clone(),
                |mut string| {
                    string.replace_range(black_box(start..start + delete_size), "");
                    black_box(string);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    let text = sample_text(100_000);
    let mut tree = Tree::from(text.as_str());
    for i in (0..text.len()).step_by(997) {
        let _ = tree.insert(i, "x");
    }
    let rope = ropey::Rope::from_str(&tree.get_full_text());
    let lines = tree.line_count();

    group.bench_function("piece_tree_line_content", |b| {
        b.iter(|| black_box(tree.get_line_content(black_box(lines / 2))))
    });
    group.bench_function("ropey_line_content", |b| {
        b.iter(|| black_box(rope.line(black_box(lines / 2)).to_string()))
    });
    group.bench_function("piece_tree_line_at", |b| {
        b.iter(|| black_box(tree.line_at(black_box(tree.length() / 3))))
    });
    group.bench_function("ropey_line_at", |b| {
        b.iter(|| black_box(rope.byte_to_line(black_box(rope.len_bytes() / 3))))
    });
    group.bench_function("piece_tree_walk", |b| {
        b.iter(|| black_box(TreeWalker::new(&tree, 0).filter(|&b| b == b'\n').count()))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_creation,
    bench_insert_operations,
    bench_typing,
    bench_delete_operations,
    bench_queries
);
criterion_main!(benches);
