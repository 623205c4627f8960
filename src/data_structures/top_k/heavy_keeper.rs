// Copyright (c) 2025 Sketch Store Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! HeavyKeeper buckets plus a bounded table of winners.

use parking_lot::Mutex;
use serde::Serialize;

use crate::data_structures::top_k::random::XorShift64;
use crate::error::{StoreError, StoreResult};
use crate::hash::hash_with_seed;

/// Seed of the fingerprint function; row `r` uses seed `r`.
const FINGERPRINT_SEED: u64 = 0xf1e6_e4b1;

/// Counts below this use the precomputed `decay^count` table.
const DECAY_LOOKUP_SIZE: usize = 256;

/// Largest increment a single update accepts.
///
/// Decaying a foreign bucket costs one random draw per unit of increment.
pub const MAX_INCREMENT: u64 = 100_000;

/// Shape of a Top-K tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TopKInfo {
    /// Number of winners tracked
    pub k: usize,
    /// Buckets per row
    pub width: usize,
    /// Number of rows
    pub depth: usize,
    /// Probability base for decaying foreign buckets
    pub decay: f64,
}

/// One tracked item and its approximate count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopKEntry {
    /// The item bytes
    pub item: Vec<u8>,
    /// Approximate count
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    fingerprint: u32,
    count: u64,
}

#[derive(Debug)]
struct Winner {
    fingerprint: u32,
    item: Vec<u8>,
    count: u64,
}

#[derive(Debug)]
struct State {
    buckets: Vec<Bucket>,
    winners: Vec<Winner>,
    rng: XorShift64,
}

/// Approximate top-K tracker built on HeavyKeeper.
///
/// Each of `depth` rows maps an item to one bucket holding a fingerprint and a
/// counter. A matching bucket counts the item up; a foreign bucket is decayed
/// by one with probability `decay^count` and taken over once it reaches zero,
/// so small flows are evicted while heavy flows keep their buckets. The
/// estimate of an item is its largest counter among matching buckets.
///
/// The winners table keeps at most `k` items. A newcomer enters when there is
/// room, or replaces the smallest winner when its estimate is strictly
/// greater; ties keep the incumbent.
///
/// All state sits behind one mutex: an update reads and writes several rows
/// and the winners table, and must see them consistently.
#[derive(Debug)]
pub struct TopK {
    k: usize,
    width: usize,
    depth: usize,
    decay: f64,
    decay_table: Vec<f64>,
    state: Mutex<State>,
}

impl TopK {
    /// Create an empty tracker.
    pub fn new(k: usize, width: usize, depth: usize, decay: f64) -> StoreResult<Self> {
        Self::with_rng(k, width, depth, decay, XorShift64::default())
    }

    /// Create an empty tracker with a deterministic random source.
    pub fn with_seed(k: usize, width: usize, depth: usize, decay: f64, seed: u64) -> StoreResult<Self> {
        Self::with_rng(k, width, depth, decay, XorShift64::seeded(seed))
    }

    fn with_rng(k: usize, width: usize, depth: usize, decay: f64, rng: XorShift64) -> StoreResult<Self> {
        if k == 0 || width == 0 || depth == 0 {
            return Err(StoreError::invalid(format!(
                "k, width and depth must be greater than 0, got k={k} width={width} depth={depth}"
            )));
        }
        if !(decay > 0.0 && decay <= 1.0) {
            return Err(StoreError::invalid(format!(
                "decay must be in (0.0, 1.0], got {decay}"
            )));
        }
        let cells = Self::required_bytes(width, depth)
            .filter(|bytes| *bytes <= isize::MAX as u64)
            .map(|bytes| bytes as usize / std::mem::size_of::<Bucket>())
            .ok_or_else(|| StoreError::invalid(format!("{width}x{depth} buckets is too large")))?;

        let decay_table = (0..DECAY_LOOKUP_SIZE)
            .map(|count| decay.powi(count as i32))
            .collect();

        Ok(Self {
            k,
            width,
            depth,
            decay,
            decay_table,
            state: Mutex::new(State {
                buckets: vec![Bucket::default(); cells],
                winners: Vec::new(),
                rng,
            }),
        })
    }

    /// Bytes of the bucket grid for `width x depth`, `None` if not representable.
    pub fn required_bytes(width: usize, depth: usize) -> Option<u64> {
        (width as u64)
            .checked_mul(depth as u64)?
            .checked_mul(std::mem::size_of::<Bucket>() as u64)
    }

    /// Count one occurrence of `item`.
    ///
    /// Returns the winner expelled to make room for it, if any.
    pub fn add(&self, item: &[u8]) -> Option<Vec<u8>> {
        self.update(item, 1)
    }

    /// Count `increment` occurrences of `item`.
    ///
    /// Returns the winner expelled to make room for it, if any. Increments
    /// above [`MAX_INCREMENT`] are rejected.
    pub fn increment_by(&self, item: &[u8], increment: u64) -> StoreResult<Option<Vec<u8>>> {
        check_increment(increment)?;
        Ok(self.update(item, increment))
    }

    fn update(&self, item: &[u8], increment: u64) -> Option<Vec<u8>> {
        if increment == 0 {
            return None;
        }
        let fingerprint = fingerprint(item);
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let mut max_count = 0u64;
        for row in 0..self.depth {
            let bucket = &mut state.buckets[self.cell(item, row)];

            if bucket.count == 0 {
                bucket.fingerprint = fingerprint;
                bucket.count = increment;
                max_count = max_count.max(bucket.count);
            } else if bucket.fingerprint == fingerprint {
                bucket.count = bucket.count.saturating_add(increment);
                max_count = max_count.max(bucket.count);
            } else {
                for remaining in (1..=increment).rev() {
                    let probability = self.decay_probability(bucket.count);
                    if probability < f64::EPSILON {
                        break;
                    }
                    if state.rng.next_f64() < probability {
                        bucket.count -= 1;
                        if bucket.count == 0 {
                            bucket.fingerprint = fingerprint;
                            bucket.count = remaining;
                            max_count = max_count.max(remaining);
                            break;
                        }
                    }
                }
            }
        }

        self.update_winners(&mut state.winners, fingerprint, item, max_count)
    }

    /// Whether `item` is currently a winner.
    pub fn contains(&self, item: &[u8]) -> bool {
        let fingerprint = fingerprint(item);
        self.state
            .lock()
            .winners
            .iter()
            .any(|winner| winner.fingerprint == fingerprint && winner.item == item)
    }

    /// HeavyKeeper estimate for `item`, whether or not it is a winner.
    pub fn count(&self, item: &[u8]) -> u64 {
        let fingerprint = fingerprint(item);
        let state = self.state.lock();
        (0..self.depth)
            .map(|row| state.buckets[self.cell(item, row)])
            .filter(|bucket| bucket.fingerprint == fingerprint)
            .map(|bucket| bucket.count)
            .max()
            .unwrap_or(0)
    }

    /// Winners sorted by descending count; ties by ascending item bytes.
    pub fn list(&self) -> Vec<TopKEntry> {
        let mut entries: Vec<TopKEntry> = self
            .state
            .lock()
            .winners
            .iter()
            .map(|winner| TopKEntry {
                item: winner.item.clone(),
                count: winner.count,
            })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.item.cmp(&b.item)));
        entries
    }

    /// Shape of the tracker.
    pub fn info(&self) -> TopKInfo {
        TopKInfo {
            k: self.k,
            width: self.width,
            depth: self.depth,
            decay: self.decay,
        }
    }

    /// Bytes owned by the tracker.
    pub fn memory_usage(&self) -> usize {
        let state = self.state.lock();
        let winners: usize = state
            .winners
            .iter()
            .map(|winner| std::mem::size_of::<Winner>() + winner.item.capacity())
            .sum();
        std::mem::size_of::<Self>()
            + self.decay_table.len() * std::mem::size_of::<f64>()
            + state.buckets.len() * std::mem::size_of::<Bucket>()
            + winners
    }

    fn update_winners(
        &self,
        winners: &mut Vec<Winner>,
        fingerprint: u32,
        item: &[u8],
        max_count: u64,
    ) -> Option<Vec<u8>> {
        if let Some(winner) = winners
            .iter_mut()
            .find(|winner| winner.fingerprint == fingerprint && winner.item == item)
        {
            // Every bucket was taken over; keep the last known estimate.
            if max_count > 0 {
                winner.count = max_count;
            }
            return None;
        }
        if max_count == 0 {
            return None;
        }

        let newcomer = Winner {
            fingerprint,
            item: item.to_vec(),
            count: max_count,
        };
        if winners.len() < self.k {
            winners.push(newcomer);
            return None;
        }

        let (min_index, min_count) = winners
            .iter()
            .enumerate()
            .map(|(index, winner)| (index, winner.count))
            .min_by_key(|(_, count)| *count)?;
        if max_count > min_count {
            let expelled = std::mem::replace(&mut winners[min_index], newcomer);
            return Some(expelled.item);
        }
        None
    }

    fn decay_probability(&self, count: u64) -> f64 {
        match usize::try_from(count) {
            Ok(count) if count < DECAY_LOOKUP_SIZE => self.decay_table[count],
            _ => self.decay.powf(count as f64),
        }
    }

    fn cell(&self, item: &[u8], row: usize) -> usize {
        let column = (hash_with_seed(item, row as u64) % self.width as u64) as usize;
        row * self.width + column
    }
}

/// Fail unless `increment` is at most [`MAX_INCREMENT`].
pub fn check_increment(increment: u64) -> StoreResult<()> {
    if increment > MAX_INCREMENT {
        return Err(StoreError::invalid(format!(
            "increment must be at most {MAX_INCREMENT}, got {increment}"
        )));
    }
    Ok(())
}

fn fingerprint(item: &[u8]) -> u32 {
    hash_with_seed(item, FINGERPRINT_SEED) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(k: usize) -> TopK {
        TopK::with_seed(k, 8, 7, 0.9, 7).unwrap()
    }

    #[test]
    fn test_skewed_stream_ranks_heavy_item_first() {
        let topk = tracker(10);
        for _ in 0..1_000 {
            topk.add(b"whale");
        }
        for i in 0..9 {
            topk.add(format!("minnow-{i}").as_bytes());
        }

        let list = topk.list();
        assert_eq!(list[0].item, b"whale".to_vec());
        assert!(list[0].count >= 990 && list[0].count <= 1_000, "count {}", list[0].count);
        assert!(topk.contains(b"whale"));
    }

    #[test]
    fn test_list_sorted_descending() {
        let topk = TopK::with_seed(5, 64, 5, 0.9, 1).unwrap();
        for (word, times) in [("sea", 50), ("ship", 30), ("whale", 80), ("boat", 10)] {
            topk.increment_by(word.as_bytes(), times).unwrap();
        }

        let list = topk.list();
        let counts: Vec<u64> = list.iter().map(|entry| entry.count).collect();
        let mut sorted = counts.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(counts, sorted);
        assert_eq!(list[0].item, b"whale".to_vec());
        assert_eq!(list[0].count, 80);
    }

    #[test]
    fn test_winners_are_bounded() {
        let topk = tracker(3);
        for i in 0..100u32 {
            topk.add(format!("word-{i}").as_bytes());
        }
        assert!(topk.list().len() <= 3);
    }

    #[test]
    fn test_newcomer_expels_smaller_winner() {
        let topk = TopK::with_seed(2, 256, 4, 0.9, 3).unwrap();
        topk.increment_by(b"a", 5).unwrap();
        topk.increment_by(b"b", 3).unwrap();

        assert_eq!(topk.increment_by(b"c", 10).unwrap(), Some(b"b".to_vec()));
        assert!(topk.contains(b"c"));
        assert!(!topk.contains(b"b"));
    }

    #[test]
    fn test_ties_favor_incumbent() {
        let topk = TopK::with_seed(1, 256, 4, 0.9, 3).unwrap();
        topk.increment_by(b"a", 4).unwrap();
        assert_eq!(topk.increment_by(b"b", 4).unwrap(), None);
        assert!(topk.contains(b"a"));
        assert!(!topk.contains(b"b"));
    }

    #[test]
    fn test_count_and_query() {
        let topk = tracker(10);
        topk.increment_by(b"ahab", 7).unwrap();
        assert_eq!(topk.count(b"ahab"), 7);
        assert_eq!(topk.count(b"pip"), 0);
        assert!(topk.contains(b"ahab"));
        assert!(!topk.contains(b"pip"));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(TopK::new(0, 8, 7, 0.9).is_err());
        assert!(TopK::new(10, 0, 7, 0.9).is_err());
        assert!(TopK::new(10, 8, 0, 0.9).is_err());
        assert!(TopK::new(10, 8, 7, 0.0).is_err());
        assert!(TopK::new(10, 8, 7, 1.5).is_err());
        assert!(TopK::new(10, 8, 7, 1.0).is_ok());
    }

    #[test]
    fn test_info_is_idempotent() {
        let topk = tracker(10);
        topk.add(b"sea");
        assert_eq!(topk.info(), topk.info());
        assert_eq!(topk.info().k, 10);
    }

    #[test]
    fn test_increment_above_cap_is_rejected() {
        let topk = TopK::with_seed(1, 1, 1, 0.9, 7).unwrap();
        topk.increment_by(b"a", 330).unwrap();

        assert!(matches!(
            topk.increment_by(b"b", u64::MAX),
            Err(StoreError::InvalidParameters(_))
        ));
        assert!(topk.increment_by(b"b", MAX_INCREMENT + 1).is_err());
        assert_eq!(topk.count(b"a"), 330);
    }

    #[test]
    fn test_capped_increment_finishes_against_heavy_bucket() {
        let topk = TopK::with_seed(1, 1, 1, 0.9, 7).unwrap();
        topk.increment_by(b"a", 330).unwrap();

        let started = std::time::Instant::now();
        topk.increment_by(b"b", MAX_INCREMENT).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        assert!(topk.contains(b"a"));
    }

    #[test]
    fn test_displaced_winner_keeps_its_count() {
        let topk = TopK::with_seed(2, 1, 1, 0.9, 7).unwrap();
        topk.increment_by(b"a", 5).unwrap();
        topk.increment_by(b"b", 1_000).unwrap();
        assert_eq!(topk.count(b"a"), 0);

        topk.add(b"a");
        let list = topk.list();
        let a = list.iter().find(|entry| entry.item == b"a".to_vec()).unwrap();
        assert_eq!(a.count, 5);
        assert!(list.iter().all(|entry| entry.count > 0));
    }

    #[test]
    fn test_oversized_grid_is_rejected() {
        assert!(TopK::new(10, usize::MAX, 2, 0.9).is_err());
        assert!(TopK::new(10, usize::MAX / 4, 1, 0.9).is_err());
        assert!(TopK::new(usize::MAX, 8, 7, 0.9).is_ok());
        assert_eq!(TopK::required_bytes(8, 7), Some(56 * 16));
    }
}
