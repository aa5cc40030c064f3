//! Error types for graph construction and state addressing.

use osmos_core::{AgentId, EdgeId, NodeId, SubsectionId};
use std::error::Error;
use std::fmt;

/// Errors from graph construction and per-node state addressing.
///
/// All variants are configuration errors: they indicate a reference to
/// something that was never created, and surface before or instead of
/// simulation, never as silent zeros.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphError {
    /// A node ID does not exist in the graph.
    UnknownNode {
        /// The unresolved ID.
        node: NodeId,
    },
    /// An edge ID does not exist in the graph.
    UnknownEdge {
        /// The unresolved ID.
        edge: EdgeId,
    },
    /// An agent ID does not exist in the graph.
    UnknownAgent {
        /// The unresolved ID.
        agent: AgentId,
    },
    /// A subsection is not part of the addressed node's region.
    UnknownSubsection {
        /// The unresolved subsection.
        subsection: SubsectionId,
    },
    /// An edge was requested between a node and itself.
    SelfLoop {
        /// The node at both endpoints.
        node: NodeId,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode { node } => write!(f, "unknown node {node}"),
            Self::UnknownEdge { edge } => write!(f, "unknown edge {edge}"),
            Self::UnknownAgent { agent } => write!(f, "unknown agent {agent}"),
            Self::UnknownSubsection { subsection } => {
                write!(f, "subsection {subsection} is not part of the node's region")
            }
            Self::SelfLoop { node } => {
                write!(f, "cannot connect node {node} to itself")
            }
        }
    }
}

impl Error for GraphError {}
