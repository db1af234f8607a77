//! Cross-crate external sort pipeline tests: run formation, cascaded merge,
//! and the public `sort`/`sort_stream` entry points wired against real
//! `iostream-stream` streams and `iostream-core` comparators.

use iostream_core::comparator::{Comparator, KeyComparator, NaturalOrder};
use iostream_core::config::Config;
use iostream_stream::stream::Stream;

fn cfg_in(dir: &tempfile::TempDir, mem_cap_bytes: usize, max_streams_open: usize) -> Config {
    Config {
        stream_dir: Some(dir.path().to_string_lossy().into_owned()),
        mem_cap_bytes,
        max_streams_open,
        ..Config::default()
    }
}

#[test]
fn sorts_large_randomized_input_across_many_small_runs() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = cfg_in(&dir, 1024, 6);

    let mut state = 0x9E3779B97F4A7C15u64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    let input: Vec<i64> = (0..3000).map(|_| (next() % 50_000) as i64).collect();

    let mut out = iostream_sort::sort(&cfg, NaturalOrder, input.clone()).unwrap();
    let mut collected = Vec::new();
    while let Ok(v) = out.read_item() {
        collected.push(v);
    }
    let mut expected = input;
    expected.sort();
    assert_eq!(collected, expected);
}

#[test]
fn sort_preserves_duplicate_keys() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = cfg_in(&dir, 256, 3);
    let input = vec![3, 1, 3, 1, 2, 2, 3, 1];
    let mut out = iostream_sort::sort(&cfg, NaturalOrder, input).unwrap();
    let mut collected = Vec::new();
    while let Ok(v) = out.read_item() {
        collected.push(v);
    }
    assert_eq!(collected, vec![1, 1, 1, 2, 2, 3, 3, 3]);
}

#[test]
fn sort_stream_reads_an_existing_stream_and_emits_a_new_sorted_one() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = cfg_in(&dir, 4096, 8);
    let mut src = Stream::new_anonymous(&cfg).unwrap();
    for v in [40, 10, 30, 20, 0] {
        src.write_item(&v).unwrap();
    }
    src.flush().unwrap();
    src.seek(0).unwrap();

    let mut out = iostream_sort::sort_stream(&cfg, NaturalOrder, &mut src).unwrap();
    let mut collected = Vec::new();
    while let Ok(v) = out.read_item() {
        collected.push(v);
    }
    assert_eq!(collected, vec![0, 10, 20, 30, 40]);
}

#[derive(Clone, Copy)]
struct Record {
    key: i32,
    payload: i32,
}

unsafe impl bytemuck::Zeroable for Record {}
unsafe impl bytemuck::Pod for Record {}

#[test]
fn sort_with_a_key_comparator_orders_by_key_not_whole_record() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = cfg_in(&dir, 512, 4);

    let records = vec![
        Record { key: 3, payload: 300 },
        Record { key: 1, payload: 100 },
        Record { key: 2, payload: 200 },
    ];
    let cmp = KeyComparator::new(|r: &Record| r.key);
    let mut out = iostream_sort::sort(&cfg, cmp, records).unwrap();
    let mut keys = Vec::new();
    while let Ok(r) = out.read_item() {
        keys.push(r.key);
    }
    assert_eq!(keys, vec![1, 2, 3]);
}

#[test]
fn natural_order_matches_ord_for_negative_and_positive_values() {
    let cmp = NaturalOrder;
    assert!(cmp.lt(&-5, &3));
    assert!(!cmp.lt(&3, &-5));
}
