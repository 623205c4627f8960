// Copyright (c) 2025 Sketch Store Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Request and response types of the line protocol.
//!
//! A request is one JSON object tagged by `"cmd"`, with an optional `"id"`
//! that is echoed back:
//!
//! ```json
//! {"id": 1, "cmd": "bf.add", "key": "names", "item": "ishmael"}
//! ```
//!
//! Items that are not UTF-8 text are sent as arrays of byte values, for
//! example `"item": [255, 0, 104]`.
//!
//! The reply is either `{"id": 1, "ok": <value>}` or
//! `{"id": 1, "error": {"kind": "not_found", "message": "..."}}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::SketchError;
use crate::store::CreatePolicy;

/// Request identifier, echoed verbatim in the response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Id {
    /// String identifier
    String(String),

    /// Numeric identifier
    Number(i64),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::String(s) => write!(f, "{s}"),
            Id::Number(n) => write!(f, "{n}"),
        }
    }
}

/// An item on the wire.
///
/// Text travels as a JSON string and is handed to the store as its UTF-8
/// bytes; any other byte string travels as an array of byte values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Item {
    /// UTF-8 text
    Text(String),

    /// Raw bytes
    Bytes(Vec<u8>),
}

impl Item {
    /// Wrap item bytes, as text when they are valid UTF-8.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Item::Text(text),
            Err(e) => Item::Bytes(e.into_bytes()),
        }
    }
}

impl AsRef<[u8]> for Item {
    fn as_ref(&self) -> &[u8] {
        match self {
            Item::Text(text) => text.as_bytes(),
            Item::Bytes(bytes) => bytes,
        }
    }
}

impl From<&str> for Item {
    fn from(text: &str) -> Self {
        Item::Text(text.to_string())
    }
}

/// One `(item, amount)` pair, written as a two-element array.
pub type Increment = (Item, u64);

/// A store command.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "cmd")]
pub enum Command {
    /// Create a scalable Bloom filter
    #[serde(rename = "bf.reserve")]
    BfReserve {
        /// Instance name
        key: String,
        /// Target false-positive probability
        error_rate: f64,
        /// Items the first layer holds
        capacity: u64,
        /// Capacity growth factor per layer
        #[serde(default)]
        expansion: Option<u32>,
        /// Refuse inserts once full instead of growing
        #[serde(default)]
        non_scaling: bool,
        /// Override of the configured create policy
        #[serde(default)]
        policy: Option<CreatePolicy>,
    },

    /// Add one item to a Bloom filter
    #[serde(rename = "bf.add")]
    BfAdd {
        /// Instance name
        key: String,
        /// Item to add
        item: Item,
    },

    /// Add several items to a Bloom filter
    #[serde(rename = "bf.madd")]
    BfMadd {
        /// Instance name
        key: String,
        /// Items to add
        items: Vec<Item>,
    },

    /// Test one item against a Bloom filter
    #[serde(rename = "bf.exists")]
    BfExists {
        /// Instance name
        key: String,
        /// Item to test
        item: Item,
    },

    /// Test several items against a Bloom filter
    #[serde(rename = "bf.mexists")]
    BfMexists {
        /// Instance name
        key: String,
        /// Items to test
        items: Vec<Item>,
    },

    /// Shape and load of a Bloom filter
    #[serde(rename = "bf.info")]
    BfInfo {
        /// Instance name
        key: String,
    },

    /// Create a HyperLogLog
    #[serde(rename = "pf.create")]
    PfCreate {
        /// Instance name
        key: String,
        /// Register index bits
        #[serde(default)]
        precision: Option<u8>,
        /// Override of the configured create policy
        #[serde(default)]
        policy: Option<CreatePolicy>,
    },

    /// Add items to a HyperLogLog
    #[serde(rename = "pf.add")]
    PfAdd {
        /// Instance name
        key: String,
        /// Items to add
        #[serde(default)]
        items: Vec<Item>,
    },

    /// Distinct count of one HyperLogLog or the union of several
    #[serde(rename = "pf.count")]
    PfCount {
        /// Instance names
        keys: Vec<String>,
    },

    /// Merge HyperLogLogs into a destination
    #[serde(rename = "pf.merge")]
    PfMerge {
        /// Destination name
        dest: String,
        /// Source names
        sources: Vec<String>,
    },

    /// Create a Count-Min sketch from an error bound
    #[serde(rename = "cms.initbyprob")]
    CmsInitByProb {
        /// Instance name
        key: String,
        /// Overestimate bound as a fraction of the total count
        error_rate: f64,
        /// Probability of exceeding the bound
        probability: f64,
        /// Override of the configured create policy
        #[serde(default)]
        policy: Option<CreatePolicy>,
    },

    /// Create a Count-Min sketch with explicit dimensions
    #[serde(rename = "cms.initbydim")]
    CmsInitByDim {
        /// Instance name
        key: String,
        /// Counters per row
        width: usize,
        /// Number of rows
        depth: usize,
        /// Override of the configured create policy
        #[serde(default)]
        policy: Option<CreatePolicy>,
    },

    /// Increment items in a Count-Min sketch
    #[serde(rename = "cms.incrby")]
    CmsIncrBy {
        /// Instance name
        key: String,
        /// `[item, delta]` pairs
        increments: Vec<Increment>,
    },

    /// Estimated counts from a Count-Min sketch
    #[serde(rename = "cms.query")]
    CmsQuery {
        /// Instance name
        key: String,
        /// Items to look up
        items: Vec<Item>,
    },

    /// Overwrite a Count-Min sketch with a weighted sum of sketches
    #[serde(rename = "cms.merge")]
    CmsMerge {
        /// Destination name
        dest: String,
        /// Source names
        sources: Vec<String>,
        /// One weight per source, all 1 when omitted
        #[serde(default)]
        weights: Option<Vec<u64>>,
    },

    /// Dimensions and total count of a Count-Min sketch
    #[serde(rename = "cms.info")]
    CmsInfo {
        /// Instance name
        key: String,
    },

    /// Create a Top-K tracker
    #[serde(rename = "topk.reserve")]
    TopkReserve {
        /// Instance name
        key: String,
        /// Number of winners tracked, `[defaults.top_k] k` when omitted
        #[serde(default)]
        k: Option<usize>,
        /// Buckets per row
        #[serde(default)]
        width: Option<usize>,
        /// Number of rows
        #[serde(default)]
        depth: Option<usize>,
        /// Decay base
        #[serde(default)]
        decay: Option<f64>,
        /// Override of the configured create policy
        #[serde(default)]
        policy: Option<CreatePolicy>,
    },

    /// Count one occurrence of each item
    #[serde(rename = "topk.add")]
    TopkAdd {
        /// Instance name
        key: String,
        /// Items to count
        items: Vec<Item>,
    },

    /// Count several occurrences of each item
    #[serde(rename = "topk.incrby")]
    TopkIncrBy {
        /// Instance name
        key: String,
        /// `[item, increment]` pairs
        increments: Vec<Increment>,
    },

    /// Whether each item is a winner
    #[serde(rename = "topk.query")]
    TopkQuery {
        /// Instance name
        key: String,
        /// Items to test
        items: Vec<Item>,
    },

    /// Approximate count of each item
    #[serde(rename = "topk.count")]
    TopkCount {
        /// Instance name
        key: String,
        /// Items to look up
        items: Vec<Item>,
    },

    /// Winners by descending count
    #[serde(rename = "topk.list")]
    TopkList {
        /// Instance name
        key: String,
        /// Return `{item, count}` objects instead of bare items
        #[serde(default)]
        with_count: bool,
    },

    /// Shape of a Top-K tracker
    #[serde(rename = "topk.info")]
    TopkInfo {
        /// Instance name
        key: String,
    },

    /// Delete instances
    #[serde(rename = "del")]
    Del {
        /// Instance names
        keys: Vec<String>,
    },

    /// Type of an instance
    #[serde(rename = "type")]
    Type {
        /// Instance name
        key: String,
    },

    /// All instance names
    #[serde(rename = "keys")]
    Keys,

    /// Approximate bytes owned by an instance
    #[serde(rename = "memory.usage")]
    MemoryUsage {
        /// Instance name
        key: String,
    },
}

/// Error payload of a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error kind
    pub kind: String,
    /// Human-readable message
    pub message: String,
}

impl From<&SketchError> for ErrorBody {
    fn from(error: &SketchError) -> Self {
        let message = match error {
            SketchError::Store(e) => e.to_string(),
            SketchError::Protocol(e) => e.to_string(),
            other => other.to_string(),
        };
        Self {
            kind: error.kind().to_string(),
            message,
        }
    }
}

/// Result of a request.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The command succeeded with this value
    Ok(Value),
    /// The command failed
    Error(ErrorBody),
}

/// One response line.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Response {
    /// Identifier of the request, if it carried one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,

    /// Success value or error
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Response {
    /// A successful response.
    pub fn ok(id: Option<Id>, value: Value) -> Self {
        Self {
            id,
            outcome: Outcome::Ok(value),
        }
    }

    /// A failed response.
    pub fn error(id: Option<Id>, error: &SketchError) -> Self {
        Self {
            id,
            outcome: Outcome::Error(ErrorBody::from(error)),
        }
    }

    /// Returns true if the response carries an error.
    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }
}
