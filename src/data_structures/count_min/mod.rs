// Copyright (c) 2025 Sketch Store Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Count-Min sketch for frequency estimation.
//!
//! The Count-Min sketch provides approximate frequency counts over a
//! high-cardinality key space. Estimates never fall below the true count and
//! overshoot by at most `error_rate * total` with probability at least
//! `1 - probability`.
//!
//! # Usage
//!
//! ```
//! use sketch_store_lib::data_structures::count_min::CountMinSketch;
//!
//! let sketch = CountMinSketch::with_error(0.001, 0.01).unwrap();
//! sketch.increment_by(b"whale", 3);
//! assert!(sketch.query(b"whale") >= 3);
//! ```

mod sketch;

pub use sketch::{CountMinInfo, CountMinSketch};
