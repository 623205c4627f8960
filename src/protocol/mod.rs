// Copyright (c) 2025 Sketch Store Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! JSON-lines protocol for the sketch store.
//!
//! Each input line holds one command object tagged by `"cmd"`; each output
//! line holds the matching response. Command names follow the store
//! operations (`bf.add`, `pf.count`, `cms.incrby`, `topk.list`, ...).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sketch_store_lib::protocol::{CommandHandler, Outcome};
//! use sketch_store_lib::store::SketchStore;
//!
//! let handler = CommandHandler::new(Arc::new(SketchStore::new()));
//! let response = handler.handle_line(r#"{"id":1,"cmd":"bf.add","key":"names","item":"ahab"}"#);
//! assert_eq!(response.outcome, Outcome::Ok(serde_json::json!(true)));
//! ```

pub mod handler;
pub mod server;
pub mod types;

pub use handler::CommandHandler;
pub use server::{serve, serve_stdio, ServeStats};
pub use types::{Command, ErrorBody, Id, Increment, Item, Outcome, Response};
