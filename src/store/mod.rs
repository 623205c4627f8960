//! Named-instance registry.
//!
//! [`SketchStore`] maps names to probabilistic structures and routes every
//! operation to the instance of the right type. It is the surface the wire
//! protocol and the CLI drive.

mod instance;
mod registry;

pub use instance::{Instance, InstanceKind};
pub use registry::SketchStore;

use serde::{Deserialize, Serialize};

/// What a create call does when the name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreatePolicy {
    /// Fail with `AlreadyExists`
    #[default]
    Fail,
    /// Drop the existing instance and create a new one
    Replace,
}
