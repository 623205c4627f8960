//! Test utilities and fixtures for the sketch store.
//!
//! Strategies for generated items and a fixture that owns a temporary
//! directory and the environment variables a test sets.

use proptest::prelude::*;
use proptest::strategy::{BoxedStrategy, Strategy};
use std::path::PathBuf;
use tempfile::TempDir;

/// Maximum item length for generated test data.
const MAX_ITEM_LENGTH: usize = 32;

/// Create a temporary directory for test files.
pub fn create_test_dir() -> std::io::Result<TempDir> {
    tempfile::tempdir()
}

/// Strategy for arbitrary byte-string items.
pub fn item_strategy() -> BoxedStrategy<Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..MAX_ITEM_LENGTH).boxed()
}

/// Strategy for lists of items of up to `max_items` entries.
pub fn items_strategy(max_items: usize) -> BoxedStrategy<Vec<Vec<u8>>> {
    proptest::collection::vec(item_strategy(), 0..max_items).boxed()
}

/// Strategy for lowercase words, as the analysis demo produces them.
pub fn word_strategy() -> BoxedStrategy<String> {
    r"[a-z]{1,12}".prop_map(|s| s).boxed()
}

/// Test fixture owning a temporary directory and environment overrides.
pub struct TestFixture {
    /// Temporary directory for test files
    pub temp_dir: TempDir,
    /// Environment variables to clean up after the test
    env_vars: Vec<String>,
}

impl TestFixture {
    /// Create a new test fixture.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            temp_dir: create_test_dir()?,
            env_vars: Vec::new(),
        })
    }

    /// Set an environment variable, removed again when the fixture drops.
    pub fn set_env<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        std::env::set_var(&key, value.into());
        self.env_vars.push(key);
    }

    /// Write `contents` to `name` inside the fixture directory.
    pub fn create_file<C: AsRef<[u8]>>(&self, name: &str, contents: C) -> std::io::Result<PathBuf> {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}

impl Drop for TestFixture {
    fn drop(&mut self) {
        for key in &self.env_vars {
            std::env::remove_var(key);
        }
    }
}
