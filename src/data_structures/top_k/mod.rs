// Copyright (c) 2025 Sketch Store Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Top-K heavy-hitter tracker.
//!
//! Keeps an approximate, ranked list of the K most frequent items of a stream
//! in bounded memory, using the HeavyKeeper count-with-exponential-decay
//! scheme to tell heavy items from the long tail.
//!
//! # Example
//!
//! ```
//! use sketch_store_lib::data_structures::top_k::TopK;
//!
//! let topk = TopK::new(10, 8, 7, 0.9).unwrap();
//! for _ in 0..100 {
//!     topk.add(b"whale");
//! }
//! topk.add(b"squid");
//!
//! let list = topk.list();
//! assert_eq!(list[0].item, b"whale".to_vec());
//! ```

mod heavy_keeper;
mod random;

pub use heavy_keeper::{check_increment, TopK, TopKEntry, TopKInfo, MAX_INCREMENT};

/// Default number of buckets per row.
pub const DEFAULT_WIDTH: usize = 8;

/// Default number of rows.
pub const DEFAULT_DEPTH: usize = 7;

/// Default decay base.
pub const DEFAULT_DECAY: f64 = 0.9;
