// Copyright (c) 2025 Sketch Store Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Scalable Bloom filter: a growing stack of fixed-size layers.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::data_structures::bloom::config::{layer_bytes, BloomFilterConfig, ERROR_TIGHTENING_RATIO};
use crate::data_structures::bloom::filter::BloomFilter;
use crate::error::StoreResult;
use crate::hash::{FnvMultiHasher, MultiHasher};

/// Snapshot of a scalable Bloom filter's shape and load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BloomInfo {
    /// Items the filter holds before the next layer is added
    pub capacity: u64,
    /// Bytes used by all bit arrays
    pub size: usize,
    /// Bits across all layers
    pub bits: u64,
    /// Number of layers
    pub number_of_filters: usize,
    /// Items inserted so far
    pub number_of_inserted_items: u64,
    /// Capacity growth factor, `None` for a non-scaling filter
    pub expansion_rate: Option<u32>,
}

/// Outcome of a single insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The item was not present and has been added
    Added,
    /// The item was (almost certainly) present already
    Present,
    /// The filter is full and not allowed to grow
    Full,
}

/// A Bloom filter that adds a layer each time the newest one fills up.
///
/// Layer `i` holds `capacity * expansion^i` items with an error budget of
/// `error_rate * (1 - r) * r^i`, so the compound false-positive probability
/// never exceeds the configured `error_rate`. Membership is the OR over all
/// layers. Bits are set lock-free; the layer list is only write-locked while a
/// new layer is appended.
#[derive(Debug)]
pub struct ScalableBloomFilter {
    config: BloomFilterConfig,
    layers: RwLock<Vec<Arc<BloomFilter>>>,
    hasher: FnvMultiHasher,
}

impl ScalableBloomFilter {
    /// Create a filter with a single layer sized from `config`.
    ///
    /// Fails when `config` does not validate.
    pub fn with_config(config: BloomFilterConfig) -> StoreResult<Self> {
        config.validate()?;
        let first = BloomFilter::new(config.capacity(), config.initial_sub_filter_error())?;
        Ok(Self {
            config,
            layers: RwLock::new(vec![Arc::new(first)]),
            hasher: FnvMultiHasher::default(),
        })
    }

    /// Insert an item unless it is already reported present.
    pub fn insert(&self, item: &[u8]) -> Insertion {
        let base = self.hasher.base_hashes(item);

        let active = {
            let layers = self.layers.read();
            if layers.iter().any(|layer| layer.check(base)) {
                return Insertion::Present;
            }
            layers.last().filter(|last| !last.is_full()).cloned()
        };

        let active = match active.or_else(|| self.grow()) {
            Some(layer) => layer,
            None => return Insertion::Full,
        };

        active.insert(base);
        Insertion::Added
    }

    /// Returns true if the item might be present, false if it definitely is not.
    pub fn contains(&self, item: &[u8]) -> bool {
        let base = self.hasher.base_hashes(item);
        self.layers.read().iter().any(|layer| layer.check(base))
    }

    /// Shape and load of the filter.
    pub fn info(&self) -> BloomInfo {
        let layers = self.layers.read();
        BloomInfo {
            capacity: layers.iter().map(|layer| layer.capacity()).sum(),
            size: layers.iter().map(|layer| layer.size_bytes()).sum(),
            bits: layers.iter().map(|layer| layer.bits()).sum(),
            number_of_filters: layers.len(),
            number_of_inserted_items: layers.iter().map(|layer| layer.len()).sum(),
            expansion_rate: (!self.config.non_scaling()).then_some(self.config.expansion()),
        }
    }

    /// Bytes owned by the filter.
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>() + self.info().size
    }

    /// The configuration this filter was created with.
    pub fn config(&self) -> &BloomFilterConfig {
        &self.config
    }

    /// Return a layer with room left, appending one if allowed.
    fn grow(&self) -> Option<Arc<BloomFilter>> {
        let mut layers = self.layers.write();

        // Another writer may have grown the stack while we waited.
        if let Some(last) = layers.last() {
            if !last.is_full() {
                return Some(Arc::clone(last));
            }
        }
        if self.config.non_scaling() {
            return None;
        }

        let (capacity, error_rate) = match layers.last() {
            Some(last) => (
                last.capacity()
                    .checked_mul(u64::from(self.config.expansion()))?,
                last.error_rate() * ERROR_TIGHTENING_RATIO,
            ),
            None => (self.config.capacity(), self.config.initial_sub_filter_error()),
        };

        let used: u64 = layers.iter().map(|layer| layer.size_bytes() as u64).sum();
        let within_limit = layer_bytes(capacity, error_rate)
            .and_then(|bytes| bytes.checked_add(used))
            .filter(|total| self.config.max_bytes().map_or(true, |max| *total <= max));
        if within_limit.is_none() {
            tracing::debug!(
                layer = layers.len(),
                capacity,
                "Bloom filter cannot grow any further"
            );
            return None;
        }

        tracing::debug!(
            layer = layers.len(),
            capacity,
            error_rate,
            "Adding Bloom filter layer"
        );

        let layer = Arc::new(BloomFilter::new(capacity, error_rate).ok()?);
        layers.push(Arc::clone(&layer));
        Some(layer)
    }
}
