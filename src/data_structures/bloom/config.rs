// Copyright (c) 2025 Sketch Store Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Configuration for scalable Bloom filters.

use crate::error::{StoreError, StoreResult};

/// Error budget ratio between consecutive sub-filters.
///
/// With the first sub-filter at `error_rate * (1 - r)` and each following one
/// at `r` times its predecessor, the budgets sum to at most `error_rate`.
pub const ERROR_TIGHTENING_RATIO: f64 = 0.5;

/// Largest bit array a single layer may have.
const MAX_LAYER_BITS: u64 = isize::MAX as u64;

/// Configuration for a scalable Bloom filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomFilterConfig {
    /// Target false-positive probability across all sub-filters
    error_rate: f64,

    /// Number of items the first sub-filter is sized for
    capacity: u64,

    /// Capacity multiplier applied to each new sub-filter
    expansion: u32,

    /// Refuse inserts instead of adding sub-filters once full
    non_scaling: bool,

    /// Upper bound on the bytes of all sub-filters together
    max_bytes: Option<u64>,
}

impl BloomFilterConfig {
    /// Create a new default configuration.
    ///
    /// Default values:
    /// - error_rate: 0.01 (1%)
    /// - capacity: 100
    /// - expansion: 2
    /// - non_scaling: false
    pub fn new() -> Self {
        Self {
            error_rate: 0.01,
            capacity: 100,
            expansion: 2,
            non_scaling: false,
            max_bytes: None,
        }
    }

    /// Set the target false-positive rate (between 0.0 and 1.0 exclusive).
    pub fn with_error_rate(mut self, error_rate: f64) -> Self {
        self.error_rate = error_rate;
        self
    }

    /// Set the number of items the first sub-filter holds.
    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the capacity growth factor for each new sub-filter.
    pub fn with_expansion(mut self, expansion: u32) -> Self {
        self.expansion = expansion;
        self
    }

    /// Disable scaling: a full filter rejects new items.
    pub fn with_non_scaling(mut self, non_scaling: bool) -> Self {
        self.non_scaling = non_scaling;
        self
    }

    /// Cap the bytes all sub-filters may occupy together.
    ///
    /// A scaling filter that would exceed it stops growing and rejects new
    /// items instead.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    /// Check that every parameter is in range and the first sub-filter fits.
    pub fn validate(&self) -> StoreResult<()> {
        if !(self.error_rate > 0.0 && self.error_rate < 1.0) {
            return Err(StoreError::invalid(format!(
                "error rate must be between 0.0 and 1.0 exclusive, got {}",
                self.error_rate
            )));
        }
        if self.capacity == 0 {
            return Err(StoreError::invalid("capacity must be greater than 0"));
        }
        if self.expansion == 0 {
            return Err(StoreError::invalid("expansion must be greater than 0"));
        }
        let bytes = layer_bytes(self.capacity, self.initial_sub_filter_error()).ok_or_else(|| {
            StoreError::invalid(format!("capacity {} is too large", self.capacity))
        })?;
        if let Some(max_bytes) = self.max_bytes {
            if bytes > max_bytes {
                return Err(StoreError::invalid(format!(
                    "capacity {} needs {bytes} bytes, limit is {max_bytes}",
                    self.capacity
                )));
            }
        }
        Ok(())
    }

    /// Target false-positive rate.
    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    /// Capacity of the first sub-filter.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Capacity growth factor.
    pub fn expansion(&self) -> u32 {
        self.expansion
    }

    /// Whether the filter refuses to grow.
    pub fn non_scaling(&self) -> bool {
        self.non_scaling
    }

    /// Byte limit over all sub-filters, if any.
    pub fn max_bytes(&self) -> Option<u64> {
        self.max_bytes
    }

    /// Error budget of the first sub-filter.
    ///
    /// A non-scaling filter only ever has one sub-filter, so it gets the whole
    /// budget.
    pub fn initial_sub_filter_error(&self) -> f64 {
        if self.non_scaling {
            self.error_rate
        } else {
            self.error_rate * (1.0 - ERROR_TIGHTENING_RATIO)
        }
    }
}

impl Default for BloomFilterConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Calculate the optimal bit array size for `capacity` items at `error_rate`.
///
/// This uses the formula: m = -n*ln(p)/(ln(2)^2), rounded up to a whole
/// 64-bit word. Returns `None` when the array could not be allocated.
pub fn optimal_bits(capacity: u64, error_rate: f64) -> Option<u64> {
    let n = capacity as f64;
    let m = -n * error_rate.ln() / (std::f64::consts::LN_2 * std::f64::consts::LN_2);
    if !m.is_finite() || m.ceil() >= MAX_LAYER_BITS as f64 {
        return None;
    }
    let bits = (m.ceil() as u64).max(64);
    bits.div_ceil(64).checked_mul(64)
}

/// Bytes of one sub-filter for `capacity` items at `error_rate`.
pub fn layer_bytes(capacity: u64, error_rate: f64) -> Option<u64> {
    optimal_bits(capacity, error_rate).map(|bits| bits / 8)
}

/// Calculate the optimal number of hash functions for `error_rate`.
///
/// This uses the formula: k = ceil(-log2(p)), which equals ceil(ln(2) * m/n)
/// for the optimal m.
pub fn optimal_hash_functions(error_rate: f64) -> u32 {
    (-error_rate.log2()).ceil().max(1.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BloomFilterConfig::default();
        assert_eq!(config.error_rate(), 0.01);
        assert_eq!(config.capacity(), 100);
        assert_eq!(config.expansion(), 2);
        assert!(!config.non_scaling());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = BloomFilterConfig::new()
            .with_error_rate(0.001)
            .with_capacity(50_000)
            .with_expansion(4)
            .with_non_scaling(true);

        assert_eq!(config.error_rate(), 0.001);
        assert_eq!(config.capacity(), 50_000);
        assert_eq!(config.expansion(), 4);
        assert!(config.non_scaling());
        assert_eq!(config.initial_sub_filter_error(), 0.001);
    }

    #[test]
    fn test_optimal_bits() {
        let expected_bits =
            (-10_000.0 * 0.01f64.ln() / (f64::ln(2.0) * f64::ln(2.0))).ceil() as u64;
        let bits = optimal_bits(10_000, 0.01).unwrap();

        assert_eq!(bits % 64, 0);
        assert!(bits >= expected_bits);
        assert!(bits < expected_bits + 64);
    }

    #[test]
    fn test_optimal_hash_functions() {
        assert_eq!(optimal_hash_functions(0.01), 7);
        assert_eq!(optimal_hash_functions(0.001), 10);
        assert_eq!(optimal_hash_functions(0.5), 1);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(BloomFilterConfig::new().with_error_rate(1.5).validate().is_err());
        assert!(BloomFilterConfig::new().with_error_rate(0.0).validate().is_err());
        assert!(BloomFilterConfig::new().with_capacity(0).validate().is_err());
        assert!(BloomFilterConfig::new().with_expansion(0).validate().is_err());
    }

    #[test]
    fn test_huge_capacity_is_rejected() {
        assert_eq!(optimal_bits(u64::MAX, 0.01), None);
        let config = BloomFilterConfig::new().with_capacity(u64::MAX);
        assert!(matches!(config.validate(), Err(StoreError::InvalidParameters(_))));
    }

    #[test]
    fn test_byte_limit() {
        let config = BloomFilterConfig::new()
            .with_capacity(1_000_000)
            .with_max_bytes(1024);
        assert!(config.validate().is_err());
        assert!(config.with_capacity(100).validate().is_ok());
        assert_eq!(config.max_bytes(), Some(1024));
    }

    #[test]
    fn test_budget_split() {
        let config = BloomFilterConfig::new().with_error_rate(0.01);
        assert!((config.initial_sub_filter_error() - 0.005).abs() < 1e-12);
    }
}
