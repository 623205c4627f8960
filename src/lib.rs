//! Sketch Store Library
//!
//! An in-memory store of named probabilistic data structures: scalable Bloom
//! filters, HyperLogLog distinct counters, Count-Min frequency sketches and
//! HeavyKeeper Top-K trackers. Structures are created and addressed by name
//! through [`store::SketchStore`], and can be driven over a JSON-lines
//! protocol by the `sketch_store` binary.
//!
//! # Architecture
//!
//! - [`data_structures`]: the structures themselves, each safe to share
//!   between threads
//! - [`store`]: the name → instance registry with type-checked dispatch
//! - [`protocol`]: request decoding and the stdio server loop
//! - [`config`]: layered configuration (defaults, file, environment)
//! - [`error`]: error types and error reporting

pub mod config;
pub mod data_structures;
pub mod error;
pub mod hash;
pub mod protocol;
pub mod store;

// Internal modules that are not part of the public API
#[cfg(test)]
pub(crate) mod tests;

/// Version information for the sketch store.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library initialization function.
///
/// Installs the tracing error reporter and the process-wide configuration.
pub fn init(config: config::SketchConfig) {
    error::set_error_reporter(std::sync::Arc::new(error::TracingErrorReporter));
    config::init_global_config(config);
}
