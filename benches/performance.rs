use criterion::{criterion_group, criterion_main, Criterion};

use iostream_core::comparator::NaturalOrder;
use iostream_core::config::Config;
use iostream_core::sortalg::quicksort;
use iostream_pq::AdaptivePQueue;

fn shuffled(n: usize) -> Vec<i64> {
    let mut state = 0x2545F4914F6CDD1Du64;
    let mut xorshift = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    (0..n).map(|_| (xorshift() % 1_000_000) as i64).collect()
}

fn bench_quicksort(c: &mut Criterion) {
    let data = shuffled(10_000);
    c.bench_function("quicksort_10k", |b| {
        b.iter(|| {
            let mut buf = data.clone();
            quicksort(&mut buf, &NaturalOrder);
        })
    });
}

fn bench_adaptive_pqueue(c: &mut Criterion) {
    let data = shuffled(5_000);
    c.bench_function("adaptive_pqueue_insert_extract_5k", |b| {
        b.iter(|| {
            let cfg = Config {
                mem_cap_bytes: 8192, // b = 256 items for i64
                ..Config::default()
            };
            let mut pq: AdaptivePQueue<i64, NaturalOrder> = AdaptivePQueue::new(cfg, NaturalOrder);
            for &v in &data {
                pq.insert(v).unwrap();
            }
            while pq.extract_min().unwrap().is_some() {}
        })
    });
}

fn bench_external_sort(c: &mut Criterion) {
    let data = shuffled(20_000);
    c.bench_function("external_sort_20k", |b| {
        b.iter(|| {
            let dir = tempfile::tempdir().unwrap();
            let cfg = Config {
                stream_dir: Some(dir.path().to_string_lossy().into_owned()),
                mem_cap_bytes: 64 * 1024,
                max_streams_open: 16,
                ..Config::default()
            };
            let mut out = iostream_sort::sort(&cfg, NaturalOrder, data.clone()).unwrap();
            while out.read_item().is_ok() {}
        })
    });
}

criterion_group!(benches, bench_quicksort, bench_adaptive_pqueue, bench_external_sort);
criterion_main!(benches);
