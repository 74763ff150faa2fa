//! Digest trie benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ledgersync_crdt::{diff, MerkleTrie, Timestamp};

const START: u64 = 1_542_028_900_122;

/// Timestamps spaced `step` milliseconds apart.
fn stamps(count: usize, step: u64) -> Vec<Timestamp> {
    (0..count as u64)
        .map(|i| Timestamp::new(START + i * step, (i % 16) as u16, "0123456789ABCDEF").unwrap())
        .collect()
}

fn build(stamps: &[Timestamp]) -> MerkleTrie {
    stamps
        .iter()
        .fold(MerkleTrie::new(), |trie, ts| trie.insert(ts))
}

/// Benchmark the canonical hash.
fn bench_hash(c: &mut Criterion) {
    let ts = Timestamp::parse("2018-11-12T13:21:40.122Z-0000-0123456789ABCDEF").unwrap();

    c.bench_function("timestamp_hash", |b| {
        b.iter(|| black_box(black_box(&ts).hash()));
    });

    c.bench_function("timestamp_parse", |b| {
        b.iter(|| {
            let parsed =
                Timestamp::parse(black_box("2018-11-12T13:21:40.122Z-0000-0123456789ABCDEF"))
                    .unwrap();
            black_box(parsed);
        });
    });
}

/// Benchmark inserting batches of changes.
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for count in [10usize, 100, 1000].iter() {
        let batch = stamps(*count, 45_000);
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &batch, |b, batch| {
            b.iter(|| black_box(build(black_box(batch))).prune());
        });
    }

    group.finish();
}

/// Benchmark digest encoding.
fn bench_json(c: &mut Criterion) {
    let mut group = c.benchmark_group("json");
    let trie = build(&stamps(500, 45_000)).prune();
    let encoded = trie.to_json().unwrap();

    group.bench_function("encode_pruned_500", |b| {
        b.iter(|| black_box(black_box(&trie).to_json().unwrap()));
    });

    group.bench_function("decode_pruned_500", |b| {
        b.iter(|| black_box(MerkleTrie::from_json(black_box(&encoded)).unwrap()));
    });

    group.finish();
}

/// Benchmark finding the divergence point.
fn bench_diff(c: &mut Criterion) {
    let all = stamps(1000, 45_000);
    let a = build(&all).prune();
    let b_trie = build(&all[..900]).prune();

    c.bench_function("diff_1000_vs_900", |b| {
        b.iter(|| black_box(diff(black_box(&a), black_box(&b_trie))));
    });
}

criterion_group!(benches, bench_hash, bench_insert, bench_json, bench_diff);

criterion_main!(benches);
