//! Shared error types for module execution.

use crate::id::{EntityId, NodeId};
use std::error::Error;
use std::fmt;

/// Errors from individual module execution.
///
/// Returned by `compute()` implementations and wrapped by the engine,
/// which names the failing module and aborts the epoch.
#[derive(Clone, Debug, PartialEq)]
pub enum ModuleError {
    /// The module's compute function failed.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// NaN detected in a computed delta (sentinel checking).
    NanDetected {
        /// The node the delta targeted.
        node: NodeId,
        /// The entity the delta targeted.
        entity: EntityId,
    },
    /// A feature required at run time was absent from the catalog.
    ///
    /// Registration-time validation should make this unreachable; it
    /// exists so modules can fail loudly instead of inventing a value.
    MissingFeature {
        /// The entity lacking the feature.
        entity: EntityId,
        /// Description of the missing feature kind.
        feature: String,
    },
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
            Self::NanDetected { node, entity } => {
                write!(f, "NaN detected for entity {entity} at node {node}")
            }
            Self::MissingFeature { entity, feature } => {
                write!(f, "entity {entity} is missing required feature {feature}")
            }
        }
    }
}

impl Error for ModuleError {}
