//! Cross-module tests for the sketch store.
//!
//! Unit tests live next to the code they cover; this tree holds:
//! - Configuration loading against real files and environment variables
//! - Error types and the global error reporter
//! - Property-based tests of the structures' guarantees
//! - Test fixtures and strategies shared by the above

pub mod config_tests;
pub mod error_tests;
pub mod test_utils;

pub use test_utils::{create_test_dir, item_strategy, items_strategy, word_strategy, TestFixture};
