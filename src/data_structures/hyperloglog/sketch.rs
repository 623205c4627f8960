// Copyright (c) 2025 Sketch Store Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Register array and estimator of the HyperLogLog sketch.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::hash::hash_with_seed;

/// Smallest supported precision.
pub const MIN_PRECISION: u8 = 4;

/// Largest supported precision.
pub const MAX_PRECISION: u8 = 18;

/// Precision used when none is given: 16384 registers, ~0.81% standard error.
pub const DEFAULT_PRECISION: u8 = 14;

/// Seed of the hash function feeding the registers.
const HLL_SEED: u64 = 0x5eed_0f_11;

/// 2^64 as a float, for the large-range correction.
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

/// Shape of a HyperLogLog sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HyperLogLogInfo {
    /// Number of index bits
    pub precision: u8,
    /// Number of registers (2^precision)
    pub registers: usize,
}

/// HyperLogLog distinct-count estimator.
///
/// Each register keeps the highest rank (position of the first set bit) seen
/// among items hashed to it. Registers are `AtomicU8` updated with
/// `fetch_max`: the update is commutative and idempotent, so concurrent adds
/// need no lock and registers only ever grow.
#[derive(Debug)]
pub struct HyperLogLog {
    precision: u8,
    registers: Vec<AtomicU8>,
}

impl HyperLogLog {
    /// Create an empty sketch with `2^precision` registers.
    pub fn new(precision: u8) -> StoreResult<Self> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
            return Err(StoreError::invalid(format!(
                "precision must be between {MIN_PRECISION} and {MAX_PRECISION}, got {precision}"
            )));
        }
        let registers = (0..1usize << precision).map(|_| AtomicU8::new(0)).collect();
        Ok(Self {
            precision,
            registers,
        })
    }

    /// Add an item. Returns true if a register changed.
    pub fn add(&self, item: &[u8]) -> bool {
        let (index, rank) = self.index_and_rank(hash_with_seed(item, HLL_SEED));
        self.registers[index].fetch_max(rank, Ordering::Relaxed) < rank
    }

    /// Estimated number of distinct items added.
    pub fn count(&self) -> u64 {
        estimate(self.precision, self.snapshot().iter().copied())
    }

    /// Raise every register to at least the matching register of `other`.
    pub fn merge_from(&self, other: &HyperLogLog) -> StoreResult<()> {
        self.ensure_compatible(other)?;
        for (mine, theirs) in self.registers.iter().zip(other.registers.iter()) {
            mine.fetch_max(theirs.load(Ordering::Relaxed), Ordering::Relaxed);
        }
        Ok(())
    }

    /// Copy of the register values.
    pub fn snapshot(&self) -> Vec<u8> {
        self.registers
            .iter()
            .map(|register| register.load(Ordering::Relaxed))
            .collect()
    }

    /// Fail unless `other` has the same precision.
    pub fn ensure_compatible(&self, other: &HyperLogLog) -> StoreResult<()> {
        if self.precision != other.precision {
            return Err(StoreError::invalid(format!(
                "cannot combine HyperLogLog sketches of precision {} and {}",
                self.precision, other.precision
            )));
        }
        Ok(())
    }

    /// Number of index bits.
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Shape of the sketch.
    pub fn info(&self) -> HyperLogLogInfo {
        HyperLogLogInfo {
            precision: self.precision,
            registers: self.registers.len(),
        }
    }

    /// Bytes owned by the sketch.
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>() + self.registers.len()
    }

    /// Register index from the low `precision` bits, rank from the rest.
    fn index_and_rank(&self, hash: u64) -> (usize, u8) {
        let p = u32::from(self.precision);
        let index = (hash & ((1u64 << p) - 1)) as usize;
        let remaining = hash >> p;
        // `remaining` has 64 - p significant bits; an all-zero tail ranks 64 - p + 1.
        let rank = (remaining.leading_zeros() - p + 1) as u8;
        (index, rank)
    }
}

/// Estimate the cardinality of a register array.
///
/// Raw estimate `alpha * m^2 / sum(2^-M[j])`, with linear counting below
/// `2.5 m` when empty registers remain and the large-range correction near
/// `2^64`.
pub fn estimate(precision: u8, registers: impl Iterator<Item = u8>) -> u64 {
    let m = (1usize << precision) as f64;
    let mut sum = 0.0f64;
    let mut zero_registers = 0usize;

    for value in registers {
        sum += 2f64.powi(-i32::from(value));
        if value == 0 {
            zero_registers += 1;
        }
    }

    let raw = alpha(m) * m * m / sum;
    let estimate = if raw <= 2.5 * m && zero_registers > 0 {
        m * (m / zero_registers as f64).ln()
    } else if raw > TWO_POW_64 / 30.0 {
        -TWO_POW_64 * (1.0 - raw / TWO_POW_64).ln()
    } else {
        raw
    };

    estimate.round() as u64
}

/// Bias correction constant for `m` registers.
fn alpha(m: f64) -> f64 {
    match m as usize {
        16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_new_hll_is_empty() {
        let hll = HyperLogLog::new(DEFAULT_PRECISION).unwrap();
        assert_eq!(hll.count(), 0);
        assert_eq!(hll.info().registers, 16_384);
    }

    #[test]
    fn test_add_returns_false_for_duplicate() {
        let hll = HyperLogLog::new(DEFAULT_PRECISION).unwrap();
        assert!(hll.add(b"hello"));
        assert!(!hll.add(b"hello"));
        assert_eq!(hll.count(), 1);
    }

    #[test_case(1_000)]
    #[test_case(5_000)]
    #[test_case(20_000)]
    fn test_estimate_within_five_percent(distinct: u32) {
        let hll = HyperLogLog::new(DEFAULT_PRECISION).unwrap();
        for i in 0..distinct {
            hll.add(format!("word-{i}").as_bytes());
        }

        let count = hll.count() as f64;
        let error = (count - f64::from(distinct)).abs() / f64::from(distinct);
        assert!(error < 0.05, "estimate {count} for {distinct}");
    }

    #[test]
    fn test_duplicates_do_not_change_count() {
        let hll = HyperLogLog::new(DEFAULT_PRECISION).unwrap();
        for i in 0..2_000u32 {
            hll.add(format!("word-{i}").as_bytes());
        }
        let before = hll.count();
        for _ in 0..5 {
            for i in 0..2_000u32 {
                hll.add(format!("word-{i}").as_bytes());
            }
        }
        assert_eq!(hll.count(), before);
    }

    #[test]
    fn test_registers_are_monotonic() {
        let hll = HyperLogLog::new(8).unwrap();
        let mut previous = hll.snapshot();
        for i in 0..500u32 {
            hll.add(&i.to_le_bytes());
            let current = hll.snapshot();
            assert!(previous.iter().zip(&current).all(|(a, b)| a <= b));
            previous = current;
        }
    }

    #[test]
    fn test_merge() {
        let left = HyperLogLog::new(12).unwrap();
        let right = HyperLogLog::new(12).unwrap();
        for i in 0..3_000u32 {
            left.add(format!("a-{i}").as_bytes());
            right.add(format!("b-{i}").as_bytes());
        }

        left.merge_from(&right).unwrap();
        let count = left.count() as f64;
        assert!((count - 6_000.0).abs() / 6_000.0 < 0.06, "estimate {count}");
    }

    #[test]
    fn test_precision_mismatch() {
        let left = HyperLogLog::new(12).unwrap();
        let right = HyperLogLog::new(14).unwrap();
        assert!(matches!(
            left.merge_from(&right),
            Err(StoreError::InvalidParameters(_))
        ));
    }

    #[test_case(3)]
    #[test_case(19)]
    fn test_invalid_precision(precision: u8) {
        assert!(HyperLogLog::new(precision).is_err());
    }

    #[test]
    fn test_rank_of_zero_tail() {
        let hll = HyperLogLog::new(14).unwrap();
        assert_eq!(hll.index_and_rank(0), (0, 51));
        assert_eq!(hll.index_and_rank(1u64 << 63), (0, 1));
        assert_eq!(hll.index_and_rank((1u64 << 14) | 5), (5, 50));
    }
}
