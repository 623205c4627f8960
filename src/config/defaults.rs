//! Default parameters for structures created without explicit ones.
//!
//! These apply when `bf.add` or `pf.add` auto-create a missing name, when
//! `topk.reserve` is called without dimensions, and when the `analyze`
//! command reserves its structures.

use super::ConfigResult;
use super::Validate;
use crate::data_structures::bloom::BloomFilterConfig;
use crate::data_structures::hyperloglog::{DEFAULT_PRECISION, MAX_PRECISION, MIN_PRECISION};
use crate::data_structures::top_k::{DEFAULT_DECAY, DEFAULT_DEPTH, DEFAULT_WIDTH};
use crate::data_structures::CountMinSketch;
use crate::error::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Defaults for every structure type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Bloom filter defaults
    pub bloom: BloomDefaults,

    /// HyperLogLog defaults
    pub hyperloglog: HyperLogLogDefaults,

    /// Top-K defaults
    pub top_k: TopKDefaults,

    /// Count-Min sketch defaults
    pub count_min: CountMinDefaults,
}

impl Validate for DefaultsConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.bloom.validate()?;
        self.hyperloglog.validate()?;
        self.top_k.validate()?;
        self.count_min.validate()?;
        Ok(())
    }
}

/// Bloom filter defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomDefaults {
    /// Target false-positive probability
    pub error_rate: f64,

    /// Items the first layer holds
    pub capacity: u64,

    /// Capacity growth factor per layer
    pub expansion: u32,
}

impl Default for BloomDefaults {
    fn default() -> Self {
        Self {
            error_rate: 0.01,
            capacity: 100,
            expansion: 2,
        }
    }
}

impl BloomDefaults {
    /// Filter configuration built from these defaults.
    pub fn to_filter_config(&self) -> BloomFilterConfig {
        BloomFilterConfig::new()
            .with_error_rate(self.error_rate)
            .with_capacity(self.capacity)
            .with_expansion(self.expansion)
    }
}

impl Validate for BloomDefaults {
    fn validate(&self) -> ConfigResult<()> {
        self.to_filter_config()
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("defaults.bloom: {e}")))
    }
}

/// HyperLogLog defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperLogLogDefaults {
    /// Number of register index bits
    pub precision: u8,
}

impl Default for HyperLogLogDefaults {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
        }
    }
}

impl Validate for HyperLogLogDefaults {
    fn validate(&self) -> ConfigResult<()> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&self.precision) {
            return Err(ConfigError::ValidationError(format!(
                "defaults.hyperloglog: precision must be between {MIN_PRECISION} and {MAX_PRECISION}, got {}",
                self.precision
            )));
        }
        Ok(())
    }
}

/// Top-K defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TopKDefaults {
    /// Number of winners tracked
    pub k: usize,

    /// Buckets per row
    pub width: usize,

    /// Number of rows
    pub depth: usize,

    /// Probability base for decaying foreign buckets
    pub decay: f64,
}

impl Default for TopKDefaults {
    fn default() -> Self {
        Self {
            k: 10,
            width: DEFAULT_WIDTH,
            depth: DEFAULT_DEPTH,
            decay: DEFAULT_DECAY,
        }
    }
}

impl Validate for TopKDefaults {
    fn validate(&self) -> ConfigResult<()> {
        if self.k == 0 || self.width == 0 || self.depth == 0 {
            return Err(ConfigError::ValidationError(
                "defaults.top_k: k, width and depth must be greater than 0".to_string(),
            ));
        }
        if !(self.decay > 0.0 && self.decay <= 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "defaults.top_k: decay must be in (0.0, 1.0], got {}",
                self.decay
            )));
        }
        Ok(())
    }
}

/// Count-Min sketch defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CountMinDefaults {
    /// Overestimate bound as a fraction of the total count
    pub error_rate: f64,

    /// Probability of exceeding the bound
    pub probability: f64,
}

impl Default for CountMinDefaults {
    fn default() -> Self {
        Self {
            error_rate: 0.001,
            probability: 0.01,
        }
    }
}

impl Validate for CountMinDefaults {
    fn validate(&self) -> ConfigResult<()> {
        CountMinSketch::dimensions_for(self.error_rate, self.probability)
            .map(|_| ())
            .map_err(|e| ConfigError::ValidationError(format!("defaults.count_min: {e}")))
    }
}
