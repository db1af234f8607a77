//! Cross-crate priority queue tests exercising `AdaptivePQueue`'s promotion
//! from an in-memory `MinMaxHeap` to a disk-backed `ExternalPQueue`, wired
//! against real `iostream-stream` anonymous files.

use iostream_core::comparator::NaturalOrder;
use iostream_core::config::Config;
use iostream_pq::AdaptivePQueue;

#[test]
fn stays_in_memory_for_small_workloads() {
    let cfg = Config::default();
    let mut pq: AdaptivePQueue<i32, NaturalOrder> = AdaptivePQueue::new(cfg, NaturalOrder);
    for v in [7, 2, 9, 4, 1] {
        pq.insert(v).unwrap();
    }
    assert!(!pq.is_external());
    let mut out = Vec::new();
    while let Some(v) = pq.extract_min().unwrap() {
        out.push(v);
    }
    assert_eq!(out, vec![1, 2, 4, 7, 9]);
}

#[test]
fn promotes_to_disk_and_extracts_in_order_under_heavy_insert_load() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config {
        mem_cap_bytes: 128, // b = 8 items for i32
        stream_dir: Some(dir.path().to_string_lossy().into_owned()),
        ..Config::default()
    };
    let mut pq: AdaptivePQueue<i32, NaturalOrder> = AdaptivePQueue::new(cfg, NaturalOrder);

    let mut state = 0xD1B54A32D192ED03u64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    let input: Vec<i32> = (0..500).map(|_| (next() % 2_000) as i32).collect();
    for &v in &input {
        pq.insert(v).unwrap();
    }
    assert!(pq.is_external());

    let mut out = Vec::new();
    while let Some(v) = pq.extract_min().unwrap() {
        out.push(v);
    }
    let mut expected = input;
    expected.sort();
    assert_eq!(out, expected);
}

#[test]
fn extract_all_min_coalesces_duplicate_priorities_across_the_disk_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config {
        mem_cap_bytes: 64, // b = 4 items for i32
        stream_dir: Some(dir.path().to_string_lossy().into_owned()),
        ..Config::default()
    };
    let mut pq: AdaptivePQueue<i32, NaturalOrder> = AdaptivePQueue::new(cfg, NaturalOrder);
    for v in [5, 5, 5, 5, 5, 5, 5, 5, 5, 1, 1] {
        pq.insert(v).unwrap();
    }
    assert!(pq.is_external());

    let first = pq.extract_all_min(|a, b| a + b).unwrap().unwrap();
    assert_eq!(first, 2);
    let second = pq.extract_all_min(|a, b| a + b).unwrap().unwrap();
    assert_eq!(second, 45);
}
