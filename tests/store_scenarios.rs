// Copyright (c) 2025 Sketch Store Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Integration tests for the sketch store façade.
//! Walks the word-statistics scenarios end to end through the public API.

use std::sync::{Arc, Barrier};
use std::thread;

use sketch_store_lib::data_structures::bloom::BloomFilterConfig;
use sketch_store_lib::error::StoreError;
use sketch_store_lib::store::{CreatePolicy, InstanceKind, SketchStore};

const NAMES: [&str; 10] = [
    "leibale", "simon", "guy", "suze", "brian", "steve", "kyle", "josefin", "alex", "nava",
];

#[test]
fn test_bloom_names_all_maybe_present() {
    let store = SketchStore::new();
    let config = BloomFilterConfig::new()
        .with_error_rate(0.01)
        .with_capacity(1000);
    store.bf_reserve("mybloom", config, None).unwrap();

    for name in NAMES {
        store.bf_add("mybloom", name.as_bytes()).unwrap();
    }
    for name in NAMES {
        assert!(store.bf_exists("mybloom", name.as_bytes()).unwrap());
    }

    let info = store.bf_info("mybloom").unwrap();
    assert_eq!(info.capacity, 1000);
    assert_eq!(info.number_of_filters, 1);
    assert_eq!(info.number_of_inserted_items, 10);
    assert_eq!(info.expansion_rate, Some(2));
    assert_eq!(info, store.bf_info("mybloom").unwrap());
}

#[test]
fn test_bloom_false_positive_rate_within_bound() {
    let store = SketchStore::new();
    let config = BloomFilterConfig::new()
        .with_error_rate(0.01)
        .with_capacity(5000);
    store.bf_reserve("fp", config, None).unwrap();

    let inserted: Vec<String> = (0..5000).map(|i| format!("member-{i}")).collect();
    store.bf_madd("fp", &inserted).unwrap();

    let strangers: Vec<String> = (0..20_000).map(|i| format!("stranger-{i}")).collect();
    let false_positives = store
        .bf_mexists("fp", &strangers)
        .unwrap()
        .into_iter()
        .filter(|present| *present)
        .count();
    let rate = false_positives as f64 / strangers.len() as f64;
    assert!(rate <= 0.01, "false positive rate {rate}");
}

#[test]
fn test_bloom_scales_past_capacity() {
    let store = SketchStore::new();
    let config = BloomFilterConfig::new()
        .with_error_rate(0.01)
        .with_capacity(100);
    store.bf_reserve("growing", config, None).unwrap();

    let items: Vec<String> = (0..1000).map(|i| format!("word-{i}")).collect();
    store.bf_madd("growing", &items).unwrap();

    let info = store.bf_info("growing").unwrap();
    assert!(info.number_of_filters > 1);
    assert!(info.capacity >= 1000);
    assert!(store
        .bf_mexists("growing", &items)
        .unwrap()
        .into_iter()
        .all(|present| present));
}

#[test]
fn test_count_min_whale() {
    let store = SketchStore::new();
    store.cms_init_by_prob("words", 0.001, 0.01, None).unwrap();

    for _ in 0..906 {
        store.cms_incr_by("words", [("whale", 1)]).unwrap();
    }
    store.cms_incr_by("words", [("ahab", 500), ("sea", 42)]).unwrap();

    let counts = store.cms_query("words", ["whale", "ahab", "sea"]).unwrap();
    assert!(counts[0] >= 906);
    assert!(counts[1] >= 500);
    assert!(counts[2] >= 42);

    let info = store.cms_info("words").unwrap();
    assert_eq!(info.width, 2000);
    assert_eq!(info.depth, 7);
    assert_eq!(info.count, 906 + 542);
}

#[test]
fn test_hyperloglog_thousands_of_words() {
    let store = SketchStore::new();
    let words: Vec<String> = (0..10_000).map(|i| format!("word-{i}")).collect();
    store.pf_add("distinct", &words).unwrap();

    let estimate = store.pf_count(["distinct"]).unwrap() as f64;
    assert!((estimate - 10_000.0).abs() / 10_000.0 < 0.05, "estimate {estimate}");

    store.pf_add("distinct", &words[..5_000]).unwrap();
    assert_eq!(store.pf_count(["distinct"]).unwrap() as f64, estimate);
}

#[test]
fn test_top_k_skewed_stream() {
    let store = SketchStore::new();
    store.topk_reserve("top", 10, Some((8, 7, 0.9)), None).unwrap();

    for _ in 0..1000 {
        store.topk_add("top", ["whale"]).unwrap();
    }
    let others: Vec<String> = (0..9).map(|i| format!("minnow-{i}")).collect();
    store.topk_add("top", &others).unwrap();

    let list = store.topk_list("top").unwrap();
    assert_eq!(list[0].item, b"whale".to_vec());
    assert!(list[0].count >= 990, "count {}", list[0].count);
    assert_eq!(store.topk_info("top").unwrap(), store.topk_info("top").unwrap());
}

#[test]
fn test_lifecycle_and_type_checks() {
    let store = SketchStore::new();
    store.topk_reserve("shared", 5, None, None).unwrap();

    assert_eq!(
        store.topk_reserve("shared", 5, None, None).unwrap_err(),
        StoreError::AlreadyExists("shared".to_string())
    );
    assert!(matches!(
        store.bf_add("shared", b"x").unwrap_err(),
        StoreError::TypeMismatch {
            expected: InstanceKind::Bloom,
            actual: InstanceKind::TopK,
            ..
        }
    ));

    store
        .pf_create("shared", Some(12), Some(CreatePolicy::Replace))
        .unwrap();
    assert_eq!(store.kind("shared"), Some(InstanceKind::HyperLogLog));

    assert_eq!(store.delete(["shared"]), 1);
    assert_eq!(
        store.topk_list("shared").unwrap_err(),
        StoreError::NotFound("shared".to_string())
    );
}

#[test]
fn test_concurrent_writers_share_instances() {
    let store = Arc::new(SketchStore::new());
    store.cms_init_by_dim("freq", 500, 5, None).unwrap();
    store.topk_reserve("top", 3, None, None).unwrap();

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..250 {
                    let word = format!("t{t}-w{i}");
                    store.pf_add("uniq", [&word]).unwrap();
                    store.cms_incr_by("freq", [("whale", 1)]).unwrap();
                    store.topk_add("top", ["whale"]).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.cms_query("freq", ["whale"]).unwrap(), vec![2000]);
    let estimate = store.pf_count(["uniq"]).unwrap() as f64;
    assert!((estimate - 2000.0).abs() / 2000.0 < 0.05, "estimate {estimate}");
    assert_eq!(store.topk_count("top", ["whale"]).unwrap(), vec![2000]);
}
