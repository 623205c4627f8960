// Copyright (c) 2025 Sketch Store Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! HyperLogLog cardinality estimator.
//!
//! Counts distinct items in a fixed amount of memory: `2^p` one-byte
//! registers give a standard error of about `1.04 / sqrt(2^p)`. Sketches of
//! equal precision can be merged to estimate the size of a union.
//!
//! # Example
//!
//! ```
//! use sketch_store_lib::data_structures::hyperloglog::{HyperLogLog, DEFAULT_PRECISION};
//!
//! let hll = HyperLogLog::new(DEFAULT_PRECISION).unwrap();
//! for word in ["call", "me", "ishmael", "call"] {
//!     hll.add(word.as_bytes());
//! }
//! assert_eq!(hll.count(), 3);
//! ```

mod sketch;

pub use sketch::{
    estimate, HyperLogLog, HyperLogLogInfo, DEFAULT_PRECISION, MAX_PRECISION, MIN_PRECISION,
};
