//! Seeded hash family shared by every probabilistic structure.
//!
//! Items are opaque byte strings. Each structure derives the hash functions it
//! needs from [`hash_with_seed`]: distinct seeds give independent functions, and
//! the same item and seed always hash to the same value, across processes too.
//! FNV-1a does the byte mixing and a 64-bit finalizer spreads the result over
//! every output bit, which HyperLogLog and the modulo reductions depend on.

use std::hash::Hasher;

use fnv::FnvHasher;

/// FNV-1a 64-bit offset basis.
const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// Seed of the second function used for double hashing.
const SECOND_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Murmur3 64-bit finalizer.
#[inline]
pub fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}

/// Hash `item` with the function selected by `seed`.
#[inline]
pub fn hash_with_seed(item: &[u8], seed: u64) -> u64 {
    let mut hasher = FnvHasher::with_key(FNV_OFFSET_BASIS ^ fmix64(seed));
    hasher.write(item);
    fmix64(hasher.finish())
}

/// Derive `count` indexes in `0..modulus` from a pair of base hashes.
#[inline]
pub fn double_hash(base: (u64, u64), count: usize, modulus: u64) -> impl Iterator<Item = usize> {
    let (h1, h2) = base;
    let modulus = modulus.max(1);
    (0..count as u64).map(move |i| (h1.wrapping_add(i.wrapping_mul(h2)) % modulus) as usize)
}

/// A trait for computing multiple hash values from a single input.
pub trait MultiHasher {
    /// The two base hashes every index is derived from.
    fn base_hashes(&self, item: &[u8]) -> (u64, u64);

    /// Compute `hash_count` indexes in `0..modulus` for `item`.
    fn compute_hashes(&self, item: &[u8], hash_count: usize, modulus: usize) -> Vec<usize> {
        double_hash(self.base_hashes(item), hash_count, modulus as u64).collect()
    }
}

/// Double-hashing multi-hasher: index `i` is `h1 + i * h2 (mod modulus)`.
///
/// Two seeded FNV passes replace `k` independent functions without a
/// measurable loss in false-positive rate (Kirsch and Mitzenmacher).
#[derive(Debug, Clone, Copy, Default)]
pub struct FnvMultiHasher {
    seed: u64,
}

impl FnvMultiHasher {
    /// Create a multi-hasher whose functions are selected by `seed`.
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl MultiHasher for FnvMultiHasher {
    #[inline]
    fn base_hashes(&self, item: &[u8]) -> (u64, u64) {
        let h1 = hash_with_seed(item, self.seed);
        // An odd step never collapses onto a single index.
        let h2 = hash_with_seed(item, self.seed ^ SECOND_SEED) | 1;
        (h1, h2)
    }
}
