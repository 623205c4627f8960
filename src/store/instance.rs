//! Tagged union of the structures a name can hold.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::data_structures::{CountMinSketch, HyperLogLog, ScalableBloomFilter, TopK};
use crate::error::{StoreError, StoreResult};

/// Type tag of a stored instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceKind {
    /// Scalable Bloom filter
    #[serde(rename = "bloom")]
    Bloom,
    /// HyperLogLog estimator
    #[serde(rename = "hyperloglog")]
    HyperLogLog,
    /// Count-Min sketch
    #[serde(rename = "cms")]
    CountMin,
    /// Top-K tracker
    #[serde(rename = "topk")]
    TopK,
}

impl InstanceKind {
    /// Name used in messages and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bloom => "bloom",
            Self::HyperLogLog => "hyperloglog",
            Self::CountMin => "cms",
            Self::TopK => "topk",
        }
    }
}

impl Display for InstanceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named structure as held by the registry.
#[derive(Debug)]
pub enum Instance {
    /// Scalable Bloom filter
    Bloom(ScalableBloomFilter),
    /// HyperLogLog estimator
    HyperLogLog(HyperLogLog),
    /// Count-Min sketch
    CountMin(CountMinSketch),
    /// Top-K tracker
    TopK(TopK),
}

impl Instance {
    /// Type tag of this instance.
    pub fn kind(&self) -> InstanceKind {
        match self {
            Self::Bloom(_) => InstanceKind::Bloom,
            Self::HyperLogLog(_) => InstanceKind::HyperLogLog,
            Self::CountMin(_) => InstanceKind::CountMin,
            Self::TopK(_) => InstanceKind::TopK,
        }
    }

    /// Approximate bytes owned by the instance.
    pub fn memory_usage(&self) -> usize {
        match self {
            Self::Bloom(filter) => filter.memory_usage(),
            Self::HyperLogLog(hll) => hll.memory_usage(),
            Self::CountMin(sketch) => sketch.memory_usage(),
            Self::TopK(topk) => topk.memory_usage(),
        }
    }

    /// The Bloom filter, or `TypeMismatch` naming `name`.
    pub fn as_bloom(&self, name: &str) -> StoreResult<&ScalableBloomFilter> {
        match self {
            Self::Bloom(filter) => Ok(filter),
            other => Err(other.mismatch(name, InstanceKind::Bloom)),
        }
    }

    /// The HyperLogLog, or `TypeMismatch` naming `name`.
    pub fn as_hyperloglog(&self, name: &str) -> StoreResult<&HyperLogLog> {
        match self {
            Self::HyperLogLog(hll) => Ok(hll),
            other => Err(other.mismatch(name, InstanceKind::HyperLogLog)),
        }
    }

    /// The Count-Min sketch, or `TypeMismatch` naming `name`.
    pub fn as_count_min(&self, name: &str) -> StoreResult<&CountMinSketch> {
        match self {
            Self::CountMin(sketch) => Ok(sketch),
            other => Err(other.mismatch(name, InstanceKind::CountMin)),
        }
    }

    /// The Top-K tracker, or `TypeMismatch` naming `name`.
    pub fn as_top_k(&self, name: &str) -> StoreResult<&TopK> {
        match self {
            Self::TopK(topk) => Ok(topk),
            other => Err(other.mismatch(name, InstanceKind::TopK)),
        }
    }

    fn mismatch(&self, name: &str, expected: InstanceKind) -> StoreError {
        StoreError::TypeMismatch {
            name: name.to_string(),
            expected,
            actual: self.kind(),
        }
    }
}
