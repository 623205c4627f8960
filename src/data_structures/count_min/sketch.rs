// Copyright (c) 2025 Sketch Store Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Counter grid of the Count-Min sketch.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::hash::hash_with_seed;

/// Dimensions and load of a Count-Min sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountMinInfo {
    /// Counters per row
    pub width: usize,
    /// Number of rows
    pub depth: usize,
    /// Total weight added
    pub count: u64,
}

/// Count-Min sketch for approximate point frequencies.
///
/// A `depth x width` grid of `AtomicU64` counters; row `r` uses the hash
/// function with seed `r`. Increments touch one counter per row and a query
/// returns the minimum of those counters, which is never below the true
/// count. Counters saturate instead of wrapping.
#[derive(Debug)]
pub struct CountMinSketch {
    width: usize,
    depth: usize,
    counters: Vec<AtomicU64>,
    total: AtomicU64,
}

impl CountMinSketch {
    /// Create an empty sketch with explicit dimensions.
    pub fn new(width: usize, depth: usize) -> StoreResult<Self> {
        if width == 0 || depth == 0 {
            return Err(StoreError::invalid(format!(
                "width and depth must be greater than 0, got {width}x{depth}"
            )));
        }
        let cells = Self::required_bytes(width, depth)
            .filter(|bytes| *bytes <= isize::MAX as u64)
            .map(|bytes| bytes as usize / std::mem::size_of::<AtomicU64>())
            .ok_or_else(|| {
                StoreError::invalid(format!("sketch of {width}x{depth} counters is too large"))
            })?;

        Ok(Self {
            width,
            depth,
            counters: (0..cells).map(|_| AtomicU64::new(0)).collect(),
            total: AtomicU64::new(0),
        })
    }

    /// Bytes of the counter grid for `width x depth`, `None` if not representable.
    pub fn required_bytes(width: usize, depth: usize) -> Option<u64> {
        (width as u64)
            .checked_mul(depth as u64)?
            .checked_mul(std::mem::size_of::<AtomicU64>() as u64)
    }

    /// Create a sketch whose overestimate exceeds `error_rate * total` with
    /// probability at most `probability`.
    pub fn with_error(error_rate: f64, probability: f64) -> StoreResult<Self> {
        let (width, depth) = Self::dimensions_for(error_rate, probability)?;
        Self::new(width, depth)
    }

    /// Width and depth for an error bound.
    ///
    /// Width `ceil(2 / error_rate)` keeps each row's expected overestimate at
    /// `error_rate * total / 2`, so by Markov's inequality a row exceeds the
    /// bound with probability at most 1/2; depth `ceil(log_0.5(probability))`
    /// rows make all of them exceed it with probability at most `probability`.
    pub fn dimensions_for(error_rate: f64, probability: f64) -> StoreResult<(usize, usize)> {
        if !(error_rate > 0.0 && error_rate < 1.0) {
            return Err(StoreError::invalid(format!(
                "error rate must be between 0.0 and 1.0 exclusive, got {error_rate}"
            )));
        }
        if !(probability > 0.0 && probability < 1.0) {
            return Err(StoreError::invalid(format!(
                "error probability must be between 0.0 and 1.0 exclusive, got {probability}"
            )));
        }
        let width = (2.0 / error_rate).ceil() as usize;
        let depth = (probability.ln() / 0.5f64.ln()).ceil().max(1.0) as usize;
        Ok((width, depth))
    }

    /// Add `delta` to the item's counter in every row.
    ///
    /// Returns the item's estimate after the increment.
    pub fn increment_by(&self, item: &[u8], delta: u64) -> u64 {
        saturating_add(&self.total, delta);
        (0..self.depth)
            .map(|row| saturating_add(&self.counters[self.cell(item, row)], delta))
            .min()
            .unwrap_or(0)
    }

    /// Estimated count of an item, never below its true count.
    pub fn query(&self, item: &[u8]) -> u64 {
        (0..self.depth)
            .map(|row| self.counters[self.cell(item, row)].load(Ordering::Relaxed))
            .min()
            .unwrap_or(0)
    }

    /// Add `weight` times every counter of `other` to this sketch.
    pub fn merge_from(&self, other: &CountMinSketch, weight: u64) -> StoreResult<()> {
        self.ensure_compatible(other)?;
        for (mine, theirs) in self.counters.iter().zip(other.counters.iter()) {
            saturating_add(mine, theirs.load(Ordering::Relaxed).saturating_mul(weight));
        }
        saturating_add(
            &self.total,
            other.total.load(Ordering::Relaxed).saturating_mul(weight),
        );
        Ok(())
    }

    /// Replace every counter with the weighted sum of `sources`.
    ///
    /// Sources are read before anything is written, so `self` may be one of
    /// them.
    pub fn assign_weighted(&self, sources: &[(&CountMinSketch, u64)]) -> StoreResult<()> {
        for (source, _) in sources {
            self.ensure_compatible(source)?;
        }

        let mut cells = vec![0u64; self.counters.len()];
        let mut total = 0u64;
        for (source, weight) in sources {
            for (cell, counter) in cells.iter_mut().zip(source.counters.iter()) {
                *cell = cell.saturating_add(counter.load(Ordering::Relaxed).saturating_mul(*weight));
            }
            total = total.saturating_add(source.total.load(Ordering::Relaxed).saturating_mul(*weight));
        }

        for (counter, cell) in self.counters.iter().zip(cells) {
            counter.store(cell, Ordering::Relaxed);
        }
        self.total.store(total, Ordering::Relaxed);
        Ok(())
    }

    /// Fail unless `other` has the same dimensions.
    pub fn ensure_compatible(&self, other: &CountMinSketch) -> StoreResult<()> {
        if self.width != other.width || self.depth != other.depth {
            return Err(StoreError::invalid(format!(
                "cannot merge a {}x{} sketch into a {}x{} sketch",
                other.width, other.depth, self.width, self.depth
            )));
        }
        Ok(())
    }

    /// Dimensions and total weight.
    pub fn info(&self) -> CountMinInfo {
        CountMinInfo {
            width: self.width,
            depth: self.depth,
            count: self.total.load(Ordering::Relaxed),
        }
    }

    /// Bytes owned by the sketch.
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>() + self.counters.len() * std::mem::size_of::<AtomicU64>()
    }

    fn cell(&self, item: &[u8], row: usize) -> usize {
        let column = (hash_with_seed(item, row as u64) % self.width as u64) as usize;
        row * self.width + column
    }
}

/// Saturating atomic add; returns the new value.
fn saturating_add(counter: &AtomicU64, delta: u64) -> u64 {
    let previous = counter
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
            Some(current.saturating_add(delta))
        })
        .unwrap_or_else(|current| current);
    previous.saturating_add(delta)
}
