//! Registry configuration module.

use super::ConfigResult;
use super::Validate;
use crate::error::config::ConfigError;
use crate::store::CreatePolicy;
use serde::{Deserialize, Serialize};

/// Default upper bound on the memory of one instance: 512 MiB.
pub const DEFAULT_MAX_INSTANCE_BYTES: u64 = 512 * 1024 * 1024;

/// Registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// What a create call does when the name is taken
    pub create_policy: CreatePolicy,

    /// Number of shards in the name map; must be a power of two
    pub shard_amount: usize,

    /// Largest allocation a Bloom filter, Count-Min sketch or Top-K tracker
    /// may grow to
    pub max_instance_bytes: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            create_policy: CreatePolicy::default(),
            shard_amount: default_shard_amount(),
            max_instance_bytes: DEFAULT_MAX_INSTANCE_BYTES,
        }
    }
}

impl Validate for StoreConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.shard_amount < 2 || !self.shard_amount.is_power_of_two() {
            return Err(ConfigError::ValidationError(format!(
                "shard_amount must be a power of two greater than 1, got {}",
                self.shard_amount
            )));
        }
        if self.max_instance_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "max_instance_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Four shards per CPU, rounded up to a power of two.
fn default_shard_amount() -> usize {
    (num_cpus::get().max(1) * 4).next_power_of_two()
}
