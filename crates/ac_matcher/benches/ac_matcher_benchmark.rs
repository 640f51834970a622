use ac_matcher::AhoCorasick;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use piece_tree::Tree;
use std::hint::black_box;

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
];

fn haystack(size: usize) -> String {
    // Filler that shares prefixes with the needle but never completes it.
    "loremipsumdolorsitame\n".chars().cycle().take(size).collect()
}

fn naive_find(needles: &[String], text: &[u8]) -> Option<usize> {
    (0..text.len()).find(|&end| {
        needles
            .iter()
            .any(|n| text[..=end].ends_with(n.as_bytes()))
    })
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for count in [10, 100, 1_000].iter() {
        let patterns: Vec<String> = (0..*count)
            .map(|i| format!("{}{i}", WORDS[i % WORDS.len()]))
            .collect();
        group.bench_with_input(BenchmarkId::new("aho_corasick", count), count, |b, _| {
            b.iter(|| black_box(AhoCorasick::new(black_box(&patterns))))
        });
    }
    group.finish();
}

fn bench_find(c: &mut Criterion) {
    let mut group = c.benchmark_group("find");
    let needles: Vec<String> = WORDS.iter().map(|w| format!("{w}!")).collect();
    let ac = AhoCorasick::new(&needles).unwrap();

    for size in [1_000, 10_000, 100_000].iter() {
        let mut text = haystack(*size);
        text.push_str("amet!");
        let tree = Tree::from(text.as_str());
        group.throughput(Throughput::Bytes(text.len() as u64));

        group.bench_with_input(BenchmarkId::new("aho_corasick_bytes", size), size, |b, _| {
            b.iter(|| black_box(ac.find(black_box(text.bytes()))))
        });
        group.bench_with_input(BenchmarkId::new("aho_corasick_tree", size), size, |b, _| {
            b.iter(|| black_box(ac.find_in_tree(black_box(&tree))))
        });
        group.bench_with_input(BenchmarkId::new("naive", size), size, |b, _| {
            b.iter(|| black_box(naive_find(&needles, black_box(text.as_bytes()))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_find);
criterion_main!(benches);
