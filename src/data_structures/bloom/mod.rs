// Copyright (c) 2025 Sketch Store Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Scalable Bloom filter for approximate set membership.
//!
//! A space-efficient probabilistic structure answering "maybe present" or
//! "definitely absent". The filter starts with one layer sized for the
//! reserved capacity and appends larger, stricter layers as it fills, so it
//! never refuses an insert (unless created non-scaling) while the compound
//! false-positive rate stays under the configured target.
//!
//! # Features
//!
//! - Lock-free bit updates through atomic `fetch_or`.
//! - Configurable error rate, initial capacity and expansion factor.
//! - Optimal bit count and hash count per layer.
//! - No false negatives.
//!
//! # Example
//!
//! ```
//! use sketch_store_lib::data_structures::bloom::{BloomFilterConfig, Insertion, ScalableBloomFilter};
//!
//! let config = BloomFilterConfig::new()
//!     .with_error_rate(0.01)
//!     .with_capacity(1_000);
//! let filter = ScalableBloomFilter::with_config(config).unwrap();
//!
//! assert_eq!(filter.insert(b"simon"), Insertion::Added);
//! assert!(filter.contains(b"simon"));
//! assert!(!filter.contains(b"ahab"));
//! ```

mod config;
mod filter;
mod scalable;

pub use config::{optimal_bits, optimal_hash_functions, BloomFilterConfig, ERROR_TIGHTENING_RATIO};
pub use filter::BloomFilter;
pub use scalable::{BloomInfo, Insertion, ScalableBloomFilter};
