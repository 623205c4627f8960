// Copyright (c) 2025 Sketch Store Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Decoding and dispatch of single request lines.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::types::{Command, Id, Item, Response};
use crate::data_structures::bloom::BloomFilterConfig;
use crate::error::protocol::ProtocolError;
use crate::error::{SketchError, SketchResult, StoreError};
use crate::store::SketchStore;

/// Executes protocol commands against a shared store.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    store: Arc<SketchStore>,
}

impl CommandHandler {
    /// Creates a handler over `store`.
    pub fn new(store: Arc<SketchStore>) -> Self {
        Self { store }
    }

    /// The store commands run against.
    pub fn store(&self) -> &SketchStore {
        &self.store
    }

    /// Handles one request line and builds its response.
    ///
    /// Never fails: malformed input and store errors become error responses.
    pub fn handle_line(&self, line: &str) -> Response {
        let mut value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                let error = ProtocolError::InvalidRequest(format!("not valid JSON: {e}"));
                warn!(error = %error, "Rejected request line");
                return Response::error(None, &SketchError::Protocol(error));
            }
        };

        let id = match take_id(&mut value) {
            Ok(id) => id,
            Err(error) => {
                warn!(error = %error, "Rejected request line");
                return Response::error(None, &SketchError::Protocol(error));
            }
        };

        let command: Command = match serde_json::from_value(value) {
            Ok(command) => command,
            Err(e) => {
                let error = ProtocolError::InvalidRequest(e.to_string());
                warn!(id = ?id, error = %error, "Rejected request");
                return Response::error(id, &SketchError::Protocol(error));
            }
        };

        match self.execute(command) {
            Ok(value) => Response::ok(id, value),
            Err(error) => {
                debug!(id = ?id, kind = error.kind(), error = %error, "Command failed");
                Response::error(id, &error)
            }
        }
    }

    /// Runs one command and returns its JSON result.
    pub fn execute(&self, command: Command) -> SketchResult<Value> {
        let store = &self.store;
        let value = match command {
            Command::BfReserve {
                key,
                error_rate,
                capacity,
                expansion,
                non_scaling,
                policy,
            } => {
                let mut config = BloomFilterConfig::new()
                    .with_error_rate(error_rate)
                    .with_capacity(capacity)
                    .with_non_scaling(non_scaling);
                if let Some(expansion) = expansion {
                    config = config.with_expansion(expansion);
                }
                store.bf_reserve(&key, config, policy)?;
                json!("OK")
            }
            Command::BfAdd { key, item } => json!(store.bf_add(&key, item.as_ref())?),
            Command::BfMadd { key, items } => json!(store.bf_madd(&key, &items)?),
            Command::BfExists { key, item } => json!(store.bf_exists(&key, item.as_ref())?),
            Command::BfMexists { key, items } => json!(store.bf_mexists(&key, &items)?),
            Command::BfInfo { key } => serde_json::to_value(store.bf_info(&key)?)?,

            Command::PfCreate {
                key,
                precision,
                policy,
            } => {
                store.pf_create(&key, precision, policy)?;
                json!("OK")
            }
            Command::PfAdd { key, items } => json!(store.pf_add(&key, &items)?),
            Command::PfCount { keys } => json!(store.pf_count(&keys)?),
            Command::PfMerge { dest, sources } => {
                store.pf_merge(&dest, &sources)?;
                json!("OK")
            }

            Command::CmsInitByProb {
                key,
                error_rate,
                probability,
                policy,
            } => {
                store.cms_init_by_prob(&key, error_rate, probability, policy)?;
                json!("OK")
            }
            Command::CmsInitByDim {
                key,
                width,
                depth,
                policy,
            } => {
                store.cms_init_by_dim(&key, width, depth, policy)?;
                json!("OK")
            }
            Command::CmsIncrBy { key, increments } => json!(store.cms_incr_by(
                &key,
                increments.iter().map(|(item, delta)| (item, *delta))
            )?),
            Command::CmsQuery { key, items } => json!(store.cms_query(&key, &items)?),
            Command::CmsMerge {
                dest,
                sources,
                weights,
            } => {
                let weights = weights.unwrap_or_else(|| vec![1; sources.len()]);
                if weights.len() != sources.len() {
                    return Err(StoreError::InvalidParameters(format!(
                        "{} weights given for {} sources",
                        weights.len(),
                        sources.len()
                    ))
                    .into());
                }
                store.cms_merge(&dest, sources.iter().zip(weights))?;
                json!("OK")
            }
            Command::CmsInfo { key } => serde_json::to_value(store.cms_info(&key)?)?,

            Command::TopkReserve {
                key,
                k,
                width,
                depth,
                decay,
                policy,
            } => {
                let defaults = &store.defaults().top_k;
                let k = k.unwrap_or(defaults.k);
                let dimensions = (
                    width.unwrap_or(defaults.width),
                    depth.unwrap_or(defaults.depth),
                    decay.unwrap_or(defaults.decay),
                );
                store.topk_reserve(&key, k, Some(dimensions), policy)?;
                json!("OK")
            }
            Command::TopkAdd { key, items } => expelled(store.topk_add(&key, &items)?),
            Command::TopkIncrBy { key, increments } => expelled(store.topk_incr_by(
                &key,
                increments.iter().map(|(item, increment)| (item, *increment)),
            )?),
            Command::TopkQuery { key, items } => json!(store.topk_query(&key, &items)?),
            Command::TopkCount { key, items } => json!(store.topk_count(&key, &items)?),
            Command::TopkList { key, with_count } => {
                let entries = store.topk_list(&key)?;
                let list: Vec<Value> = entries
                    .iter()
                    .map(|entry| {
                        let item = Item::from_bytes(entry.item.clone());
                        if with_count {
                            json!({"item": item, "count": entry.count})
                        } else {
                            json!(item)
                        }
                    })
                    .collect();
                Value::Array(list)
            }
            Command::TopkInfo { key } => serde_json::to_value(store.topk_info(&key)?)?,

            Command::Del { keys } => json!(store.delete(&keys)),
            Command::Type { key } => json!(store.kind(&key)),
            Command::Keys => json!(store.keys()),
            Command::MemoryUsage { key } => json!(store.memory_usage(&key)?),
        };
        Ok(value)
    }
}

/// Expelled items, `null` where nothing was expelled.
fn expelled(items: Vec<Option<Vec<u8>>>) -> Value {
    json!(items
        .into_iter()
        .map(|item| item.map(Item::from_bytes))
        .collect::<Vec<_>>())
}

/// Remove and decode the optional `"id"` member of a request object.
fn take_id(value: &mut Value) -> Result<Option<Id>, ProtocolError> {
    let object = value
        .as_object_mut()
        .ok_or_else(|| ProtocolError::InvalidRequest("request must be a JSON object".to_string()))?;
    match object.remove("id") {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => serde_json::from_value(raw)
            .map(Some)
            .map_err(|_| ProtocolError::InvalidRequest("id must be a string or an integer".to_string())),
    }
}
