//! Probabilistic data structures behind the sketch store.
//!
//! Every structure here is safe to share between threads and takes `&self`
//! for updates:
//! - Bloom filter bits and HyperLogLog registers are updated lock-free
//! - Count-Min counters use atomic saturating adds
//! - Top-K guards its buckets and winners with a single mutex
//!
//! They share nothing but the seeded hash family in [`crate::hash`].

pub mod bloom;
pub mod count_min;
pub mod hyperloglog;
pub mod top_k;

// Re-export common data structures
pub use bloom::{BloomFilterConfig, BloomInfo, Insertion, ScalableBloomFilter};
pub use count_min::{CountMinInfo, CountMinSketch};
pub use hyperloglog::{HyperLogLog, HyperLogLogInfo};
pub use top_k::{TopK, TopKEntry, TopKInfo};
