//! The name → instance map and the per-type operations on top of it.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::config::{DefaultsConfig, SketchConfig, StoreConfig};
use crate::data_structures::bloom::{BloomFilterConfig, BloomInfo, Insertion, ScalableBloomFilter};
use crate::data_structures::hyperloglog::{estimate, HyperLogLog};
use crate::data_structures::top_k::check_increment;
use crate::data_structures::{CountMinInfo, CountMinSketch, TopK, TopKEntry, TopKInfo};
use crate::error::{StoreError, StoreResult};
use crate::store::{CreatePolicy, Instance, InstanceKind};

/// Registry of named probabilistic structures.
///
/// Instances are looked up under a shard lock, cloned out as `Arc` and
/// operated on after the lock is released, so a slow operation on one name
/// never blocks lookups of another. Each structure handles its own
/// concurrency.
///
/// `bf_add`/`bf_madd` and `pf_add`/`pf_merge` create a missing name with the
/// configured defaults; every other operation on a missing name fails with
/// `NotFound`.
///
/// Structures whose size depends on caller input are checked against
/// `max_instance_bytes` before anything is allocated, and Bloom filters stop
/// growing at that limit.
#[derive(Debug)]
pub struct SketchStore {
    instances: DashMap<String, Arc<Instance>>,
    policy: CreatePolicy,
    max_instance_bytes: u64,
    defaults: DefaultsConfig,
}

impl Default for SketchStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SketchStore {
    /// Create an empty store with default settings.
    pub fn new() -> Self {
        Self::with_config(&StoreConfig::default(), &DefaultsConfig::default())
    }

    /// Create an empty store from the registry settings and structure defaults.
    pub fn with_config(store: &StoreConfig, defaults: &DefaultsConfig) -> Self {
        let shard_amount = store.shard_amount.max(2).next_power_of_two();
        Self {
            instances: DashMap::with_shard_amount(shard_amount),
            policy: store.create_policy,
            max_instance_bytes: store.max_instance_bytes,
            defaults: defaults.clone(),
        }
    }

    /// Create an empty store from a full configuration.
    pub fn from_config(config: &SketchConfig) -> Self {
        Self::with_config(&config.store, &config.defaults)
    }

    /// Policy applied when a create call does not override it.
    pub fn create_policy(&self) -> CreatePolicy {
        self.policy
    }

    /// Largest allocation a single instance may make.
    pub fn max_instance_bytes(&self) -> u64 {
        self.max_instance_bytes
    }

    /// Structure defaults used for auto-creation.
    pub fn defaults(&self) -> &DefaultsConfig {
        &self.defaults
    }

    // ---- Bloom filter ----

    /// Create a scalable Bloom filter.
    pub fn bf_reserve(
        &self,
        name: &str,
        config: BloomFilterConfig,
        policy: Option<CreatePolicy>,
    ) -> StoreResult<()> {
        let filter = ScalableBloomFilter::with_config(self.limit_bloom(config))?;
        self.create(name, Instance::Bloom(filter), policy)
    }

    /// Add an item. Returns false if it was (almost certainly) present.
    pub fn bf_add(&self, name: &str, item: &[u8]) -> StoreResult<bool> {
        let (instance, _) = self.get_or_create(name, || self.default_bloom())?;
        let filter = instance.as_bloom(name)?;
        Self::bloom_insert(name, filter, item)
    }

    /// Add several items, one result per item.
    ///
    /// Stops at the first item a full non-scaling filter rejects; items
    /// before it stay inserted.
    pub fn bf_madd<I, T>(&self, name: &str, items: I) -> StoreResult<Vec<bool>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let (instance, _) = self.get_or_create(name, || self.default_bloom())?;
        let filter = instance.as_bloom(name)?;
        items
            .into_iter()
            .map(|item| Self::bloom_insert(name, filter, item.as_ref()))
            .collect()
    }

    /// Whether the item may be present. Never a false negative.
    pub fn bf_exists(&self, name: &str, item: &[u8]) -> StoreResult<bool> {
        let instance = self.get(name)?;
        Ok(instance.as_bloom(name)?.contains(item))
    }

    /// `bf_exists` for several items.
    pub fn bf_mexists<I, T>(&self, name: &str, items: I) -> StoreResult<Vec<bool>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let instance = self.get(name)?;
        let filter = instance.as_bloom(name)?;
        Ok(items
            .into_iter()
            .map(|item| filter.contains(item.as_ref()))
            .collect())
    }

    /// Shape and load of a Bloom filter.
    pub fn bf_info(&self, name: &str) -> StoreResult<BloomInfo> {
        let instance = self.get(name)?;
        Ok(instance.as_bloom(name)?.info())
    }

    // ---- HyperLogLog ----

    /// Create a HyperLogLog, with the default precision when none is given.
    pub fn pf_create(
        &self,
        name: &str,
        precision: Option<u8>,
        policy: Option<CreatePolicy>,
    ) -> StoreResult<()> {
        let precision = precision.unwrap_or(self.defaults.hyperloglog.precision);
        self.create(name, Instance::HyperLogLog(HyperLogLog::new(precision)?), policy)
    }

    /// Add items. Returns true if the instance was created or any register changed.
    pub fn pf_add<I, T>(&self, name: &str, items: I) -> StoreResult<bool>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let (instance, created) = self.get_or_create(name, || {
            HyperLogLog::new(self.defaults.hyperloglog.precision).map(Instance::HyperLogLog)
        })?;
        let hll = instance.as_hyperloglog(name)?;
        let changed = items
            .into_iter()
            .fold(false, |changed, item| hll.add(item.as_ref()) | changed);
        Ok(created || changed)
    }

    /// Estimated distinct count of one instance, or of the union of several.
    pub fn pf_count<I, T>(&self, names: I) -> StoreResult<u64>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let handles = names
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name).map(|instance| (name.to_string(), instance))
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let sketches = handles
            .iter()
            .map(|(name, instance)| instance.as_hyperloglog(name))
            .collect::<StoreResult<Vec<_>>>()?;

        let (first, rest) = sketches
            .split_first()
            .ok_or_else(|| StoreError::invalid("pf.count needs at least one name"))?;
        if rest.is_empty() {
            return Ok(first.count());
        }

        let mut union = first.snapshot();
        for sketch in rest {
            first.ensure_compatible(sketch)?;
            for (register, value) in union.iter_mut().zip(sketch.snapshot()) {
                *register = (*register).max(value);
            }
        }
        Ok(estimate(first.precision(), union.into_iter()))
    }

    /// Raise `dest` to the register-wise maximum of itself and `sources`.
    ///
    /// A missing `dest` is created with the precision of the first source.
    pub fn pf_merge<I, T>(&self, dest: &str, sources: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let handles = sources
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name).map(|instance| (name.to_string(), instance))
            })
            .collect::<StoreResult<Vec<_>>>()?;
        let sketches = handles
            .iter()
            .map(|(name, instance)| instance.as_hyperloglog(name))
            .collect::<StoreResult<Vec<_>>>()?;

        if let Some((first, rest)) = sketches.split_first() {
            for sketch in rest {
                first.ensure_compatible(sketch)?;
            }
        }

        let precision = sketches
            .first()
            .map(|sketch| sketch.precision())
            .unwrap_or(self.defaults.hyperloglog.precision);
        let (instance, _) =
            self.get_or_create(dest, || HyperLogLog::new(precision).map(Instance::HyperLogLog))?;
        let target = instance.as_hyperloglog(dest)?;

        for sketch in &sketches {
            target.ensure_compatible(sketch)?;
        }
        for sketch in sketches {
            target.merge_from(sketch)?;
        }
        Ok(())
    }

    // ---- Count-Min sketch ----

    /// Create a Count-Min sketch from an error bound and its probability.
    pub fn cms_init_by_prob(
        &self,
        name: &str,
        error_rate: f64,
        probability: f64,
        policy: Option<CreatePolicy>,
    ) -> StoreResult<()> {
        let (width, depth) = CountMinSketch::dimensions_for(error_rate, probability)?;
        self.cms_init_by_dim(name, width, depth, policy)
    }

    /// Create a Count-Min sketch with explicit dimensions.
    pub fn cms_init_by_dim(
        &self,
        name: &str,
        width: usize,
        depth: usize,
        policy: Option<CreatePolicy>,
    ) -> StoreResult<()> {
        self.check_size(InstanceKind::CountMin, CountMinSketch::required_bytes(width, depth))?;
        let sketch = CountMinSketch::new(width, depth)?;
        self.create(name, Instance::CountMin(sketch), policy)
    }

    /// Add each delta to its item. Returns the new estimate per item.
    pub fn cms_incr_by<I, T>(&self, name: &str, increments: I) -> StoreResult<Vec<u64>>
    where
        I: IntoIterator<Item = (T, u64)>,
        T: AsRef<[u8]>,
    {
        let instance = self.get(name)?;
        let sketch = instance.as_count_min(name)?;
        Ok(increments
            .into_iter()
            .map(|(item, delta)| sketch.increment_by(item.as_ref(), delta))
            .collect())
    }

    /// Estimated count per item, never below the true count.
    pub fn cms_query<I, T>(&self, name: &str, items: I) -> StoreResult<Vec<u64>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let instance = self.get(name)?;
        let sketch = instance.as_count_min(name)?;
        Ok(items
            .into_iter()
            .map(|item| sketch.query(item.as_ref()))
            .collect())
    }

    /// Set `dest` to the weighted sum of `sources`. `dest` may be a source.
    pub fn cms_merge<I, T>(&self, dest: &str, sources: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = (T, u64)>,
        T: AsRef<str>,
    {
        let target = self.get(dest)?;
        let target_sketch = target.as_count_min(dest)?;

        let handles = sources
            .into_iter()
            .map(|(name, weight)| {
                let name = name.as_ref();
                self.get(name)
                    .map(|instance| (name.to_string(), instance, weight))
            })
            .collect::<StoreResult<Vec<_>>>()?;
        if handles.is_empty() {
            return Err(StoreError::invalid("cms.merge needs at least one source"));
        }

        let weighted = handles
            .iter()
            .map(|(name, instance, weight)| {
                instance.as_count_min(name).map(|sketch| (sketch, *weight))
            })
            .collect::<StoreResult<Vec<_>>>()?;
        target_sketch.assign_weighted(&weighted)
    }

    /// Dimensions and total weight of a Count-Min sketch.
    pub fn cms_info(&self, name: &str) -> StoreResult<CountMinInfo> {
        let instance = self.get(name)?;
        Ok(instance.as_count_min(name)?.info())
    }

    // ---- Top-K ----

    /// Create a Top-K tracker.
    ///
    /// `dimensions` is `(width, depth, decay)`; the configured defaults apply
    /// when it is omitted.
    pub fn topk_reserve(
        &self,
        name: &str,
        k: usize,
        dimensions: Option<(usize, usize, f64)>,
        policy: Option<CreatePolicy>,
    ) -> StoreResult<()> {
        let defaults = &self.defaults.top_k;
        let (width, depth, decay) =
            dimensions.unwrap_or((defaults.width, defaults.depth, defaults.decay));
        self.check_size(InstanceKind::TopK, TopK::required_bytes(width, depth))?;
        let topk = TopK::new(k, width, depth, decay)?;
        self.create(name, Instance::TopK(topk), policy)
    }

    /// Count one occurrence of each item. Returns the expelled winner per item.
    pub fn topk_add<I, T>(&self, name: &str, items: I) -> StoreResult<Vec<Option<Vec<u8>>>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let instance = self.get(name)?;
        let topk = instance.as_top_k(name)?;
        Ok(items.into_iter().map(|item| topk.add(item.as_ref())).collect())
    }

    /// Count `increment` occurrences of each item. Returns the expelled winner per item.
    ///
    /// Every increment is checked before any is applied.
    pub fn topk_incr_by<I, T>(&self, name: &str, increments: I) -> StoreResult<Vec<Option<Vec<u8>>>>
    where
        I: IntoIterator<Item = (T, u64)>,
        T: AsRef<[u8]>,
    {
        let instance = self.get(name)?;
        let topk = instance.as_top_k(name)?;
        let increments: Vec<(T, u64)> = increments.into_iter().collect();
        for (_, increment) in &increments {
            check_increment(*increment)?;
        }
        increments
            .iter()
            .map(|(item, increment)| topk.increment_by(item.as_ref(), *increment))
            .collect()
    }

    /// Whether each item is currently a winner.
    pub fn topk_query<I, T>(&self, name: &str, items: I) -> StoreResult<Vec<bool>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let instance = self.get(name)?;
        let topk = instance.as_top_k(name)?;
        Ok(items
            .into_iter()
            .map(|item| topk.contains(item.as_ref()))
            .collect())
    }

    /// Approximate count per item, winner or not.
    pub fn topk_count<I, T>(&self, name: &str, items: I) -> StoreResult<Vec<u64>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let instance = self.get(name)?;
        let topk = instance.as_top_k(name)?;
        Ok(items
            .into_iter()
            .map(|item| topk.count(item.as_ref()))
            .collect())
    }

    /// Winners by descending count.
    pub fn topk_list(&self, name: &str) -> StoreResult<Vec<TopKEntry>> {
        let instance = self.get(name)?;
        Ok(instance.as_top_k(name)?.list())
    }

    /// Shape of a Top-K tracker.
    pub fn topk_info(&self, name: &str) -> StoreResult<TopKInfo> {
        let instance = self.get(name)?;
        Ok(instance.as_top_k(name)?.info())
    }

    // ---- Generic ----

    /// Remove the named instances. Returns how many existed.
    pub fn delete<I, T>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        names
            .into_iter()
            .filter(|name| {
                let removed = self.instances.remove(name.as_ref());
                if let Some((name, instance)) = &removed {
                    debug!(name = %name, kind = %instance.kind(), "Deleted instance");
                }
                removed.is_some()
            })
            .count()
    }

    /// Type of the named instance, if any.
    pub fn kind(&self, name: &str) -> Option<InstanceKind> {
        self.instances.get(name).map(|entry| entry.value().kind())
    }

    /// Whether the name is in use.
    pub fn contains(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    /// All names in ascending order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .instances
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the store holds no instances.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Approximate bytes owned by the named instance, including its name.
    pub fn memory_usage(&self, name: &str) -> StoreResult<usize> {
        let instance = self.get(name)?;
        Ok(name.len() + std::mem::size_of::<Arc<Instance>>() + instance.memory_usage())
    }

    fn get(&self, name: &str) -> StoreResult<Arc<Instance>> {
        self.instances
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// Look up `name`, creating it with `make` if it is missing.
    ///
    /// The flag is true when this call created the instance.
    fn get_or_create<F>(&self, name: &str, make: F) -> StoreResult<(Arc<Instance>, bool)>
    where
        F: FnOnce() -> StoreResult<Instance>,
    {
        if let Ok(instance) = self.get(name) {
            return Ok((instance, false));
        }

        match self.instances.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok((Arc::clone(entry.get()), false)),
            Entry::Vacant(entry) => {
                let instance = Arc::new(make()?);
                debug!(name, kind = %instance.kind(), "Auto-created instance");
                entry.insert(Arc::clone(&instance));
                Ok((instance, true))
            }
        }
    }

    fn create(&self, name: &str, instance: Instance, policy: Option<CreatePolicy>) -> StoreResult<()> {
        let policy = policy.unwrap_or(self.policy);
        let kind = instance.kind();

        match self.instances.entry(name.to_string()) {
            Entry::Occupied(mut entry) => match policy {
                CreatePolicy::Fail => Err(StoreError::AlreadyExists(name.to_string())),
                CreatePolicy::Replace => {
                    let previous = entry.insert(Arc::new(instance));
                    debug!(name, kind = %kind, previous = %previous.kind(), "Replaced instance");
                    Ok(())
                }
            },
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(instance));
                debug!(name, kind = %kind, "Created instance");
                Ok(())
            }
        }
    }

    fn default_bloom(&self) -> StoreResult<Instance> {
        let config = self.limit_bloom(self.defaults.bloom.to_filter_config());
        Ok(Instance::Bloom(ScalableBloomFilter::with_config(config)?))
    }

    /// Apply the instance limit unless `config` already has a tighter one.
    fn limit_bloom(&self, config: BloomFilterConfig) -> BloomFilterConfig {
        match config.max_bytes() {
            Some(max_bytes) if max_bytes <= self.max_instance_bytes => config,
            _ => config.with_max_bytes(self.max_instance_bytes),
        }
    }

    /// Fail unless an allocation of `bytes` is representable and within the limit.
    fn check_size(&self, kind: InstanceKind, bytes: Option<u64>) -> StoreResult<()> {
        match bytes {
            Some(bytes) if bytes <= self.max_instance_bytes => Ok(()),
            Some(bytes) => Err(StoreError::invalid(format!(
                "{kind} needs {bytes} bytes, limit is {}",
                self.max_instance_bytes
            ))),
            None => Err(StoreError::invalid(format!("{kind} dimensions are too large"))),
        }
    }

    fn bloom_insert(name: &str, filter: &ScalableBloomFilter, item: &[u8]) -> StoreResult<bool> {
        match filter.insert(item) {
            Insertion::Added => Ok(true),
            Insertion::Present => Ok(false),
            Insertion::Full => Err(StoreError::CapacityExceeded(name.to_string())),
        }
    }
}
