// Copyright (c) 2025 Sketch Store Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! A single fixed-size Bloom filter layer.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::data_structures::bloom::config::{optimal_bits, optimal_hash_functions};
use crate::error::{StoreError, StoreResult};
use crate::hash::double_hash;

/// One fixed-size layer of a scalable Bloom filter.
///
/// Bits live in `AtomicU64` words and are set with `fetch_or`, so concurrent
/// inserts never lose a bit and readers never need a lock.
#[derive(Debug)]
pub struct BloomFilter {
    /// Bit array as 64-bit words
    words: Vec<AtomicU64>,

    /// Number of bits in `words`
    bits: u64,

    /// Number of bit positions per item
    hash_count: u32,

    /// Items this layer was sized for
    capacity: u64,

    /// False-positive budget of this layer
    error_rate: f64,

    /// Items inserted into this layer
    inserted: AtomicU64,
}

impl BloomFilter {
    /// Create a layer sized for `capacity` items at `error_rate`.
    pub fn new(capacity: u64, error_rate: f64) -> StoreResult<Self> {
        let bits = optimal_bits(capacity, error_rate).ok_or_else(|| {
            StoreError::invalid(format!("a layer for {capacity} items is too large"))
        })?;
        let words = (0..bits / 64).map(|_| AtomicU64::new(0)).collect();

        Ok(Self {
            words,
            bits,
            hash_count: optimal_hash_functions(error_rate),
            capacity,
            error_rate,
            inserted: AtomicU64::new(0),
        })
    }

    /// Returns true if the layer might contain the item with these base hashes.
    ///
    /// False positives are possible, but false negatives are not.
    pub fn check(&self, base: (u64, u64)) -> bool {
        double_hash(base, self.hash_count as usize, self.bits).all(|bit_pos| {
            let word = self.words[bit_pos / 64].load(Ordering::Relaxed);
            word & (1u64 << (bit_pos % 64)) != 0
        })
    }

    /// Set every bit for the item with these base hashes.
    ///
    /// Every call counts towards the layer's load; callers check membership
    /// first. Returns `true` if at least one bit changed.
    pub fn insert(&self, base: (u64, u64)) -> bool {
        let mut changed = false;

        for bit_pos in double_hash(base, self.hash_count as usize, self.bits) {
            let bit_mask = 1u64 << (bit_pos % 64);
            let old_val = self.words[bit_pos / 64].fetch_or(bit_mask, Ordering::Relaxed);
            if old_val & bit_mask == 0 {
                changed = true;
            }
        }

        self.inserted.fetch_add(1, Ordering::Relaxed);
        changed
    }

    /// Whether this layer holds as many items as it was sized for.
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Items inserted into this layer.
    pub fn len(&self) -> u64 {
        self.inserted.load(Ordering::Relaxed)
    }

    /// Whether nothing was inserted yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items this layer was sized for.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// False-positive budget of this layer.
    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    /// Number of bit positions per item.
    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    /// Size of the bit array in bits.
    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Size of the bit array in bytes.
    pub fn size_bytes(&self) -> usize {
        self.words.len() * std::mem::size_of::<AtomicU64>()
    }

    /// Fraction of bits that are set.
    pub fn fill_ratio(&self) -> f64 {
        let set_bits: u64 = self
            .words
            .iter()
            .map(|word| u64::from(word.load(Ordering::Relaxed).count_ones()))
            .sum();
        set_bits as f64 / self.bits as f64
    }
}
