//! The frozen state layer: capture, candidate evolution, commit.
//!
//! A [`StateLayer`] is a deep, independent copy of everything modules
//! may read and epochs may change: per-node concentration containers
//! and mobile agent poses. Step evaluation clones the base layer into
//! candidates, applies merged deltas to the clones, and — only on
//! acceptance — commits one candidate back into the live graph. A
//! rejected attempt drops its candidates; the base layer and the graph
//! are never touched.

use crate::delta::{Assignment, DeltaKey, MergedDeltas, PositionDelta};
use indexmap::IndexMap;
use osmos_core::{AgentId, EntityId, NodeId, SubsectionId};
use osmos_graph::{AutomatonGraph, ConcentrationContainer, MobileAgent};
use std::error::Error;
use std::fmt;

/// Policy for deltas that would drive a concentration negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NegativePolicy {
    /// Clamp the result to zero and continue.
    #[default]
    Clamp,
    /// Treat a negative result as a fatal consistency error.
    Fail,
}

/// Errors from applying merged deltas to a state layer.
#[derive(Clone, Debug, PartialEq)]
pub enum ApplyError {
    /// A delta addressed a node that is not in the layer.
    UnknownNode {
        /// The unresolved node.
        node: NodeId,
    },
    /// A delta addressed a subsection the node's region does not map.
    UnknownSubsection {
        /// The addressed node.
        node: NodeId,
        /// The unresolved subsection.
        subsection: SubsectionId,
    },
    /// Strict mode: a delta drove a concentration negative.
    NegativeConcentration {
        /// The addressed node.
        node: NodeId,
        /// The addressed subsection.
        subsection: SubsectionId,
        /// The addressed entity.
        entity: EntityId,
        /// The offending resulting value.
        value: f64,
    },
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode { node } => write!(f, "delta addressed unknown node {node}"),
            Self::UnknownSubsection { node, subsection } => {
                write!(
                    f,
                    "delta addressed subsection {subsection} absent from node {node}"
                )
            }
            Self::NegativeConcentration {
                node,
                subsection,
                entity,
                value,
            } => {
                write!(
                    f,
                    "concentration of entity {entity} at node {node}/{subsection} \
                     driven negative ({value})"
                )
            }
        }
    }
}

impl Error for ApplyError {}

/// A deep, independent copy of the mutable simulation state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateLayer {
    containers: IndexMap<NodeId, ConcentrationContainer>,
    agents: IndexMap<AgentId, MobileAgent>,
}

impl StateLayer {
    /// Capture the current state of a graph.
    pub fn capture(graph: &AutomatonGraph) -> Self {
        let containers = graph
            .nodes()
            .map(|n| (n.id(), n.concentrations().clone()))
            .collect();
        let agents = graph.agents().map(|a| (a.id(), *a)).collect();
        Self { containers, agents }
    }

    /// The concentration at a key; `0.0` for anything absent.
    pub fn concentration(&self, node: NodeId, subsection: SubsectionId, entity: EntityId) -> f64 {
        self.containers
            .get(&node)
            .map(|c| c.get(subsection, entity))
            .unwrap_or(0.0)
    }

    /// The container captured for a node.
    pub fn container(&self, node: NodeId) -> Option<&ConcentrationContainer> {
        self.containers.get(&node)
    }

    /// The pose captured for an agent.
    pub fn agent(&self, agent: AgentId) -> Option<&MobileAgent> {
        self.agents.get(&agent)
    }

    /// Iterate over captured agents in insertion order.
    pub fn agents(&self) -> impl Iterator<Item = &MobileAgent> {
        self.agents.values()
    }

    /// Apply merged concentration deltas to this layer.
    ///
    /// Under [`NegativePolicy::Clamp`] results below zero are clamped;
    /// under [`NegativePolicy::Fail`] the first negative result aborts
    /// with the offending key attached.
    pub fn apply_concentrations(
        &mut self,
        deltas: &MergedDeltas,
        policy: NegativePolicy,
    ) -> Result<(), ApplyError> {
        for (key, merged) in deltas.iter() {
            let DeltaKey {
                node,
                subsection,
                entity,
            } = *key;
            let container = self
                .containers
                .get_mut(&node)
                .ok_or(ApplyError::UnknownNode { node })?;
            let next = container.get(subsection, entity) + merged.total;
            let next = if next < 0.0 {
                match policy {
                    NegativePolicy::Clamp => 0.0,
                    NegativePolicy::Fail => {
                        return Err(ApplyError::NegativeConcentration {
                            node,
                            subsection,
                            entity,
                            value: next,
                        })
                    }
                }
            } else {
                next
            };
            container
                .set(subsection, entity, next)
                .map_err(|_| ApplyError::UnknownSubsection { node, subsection })?;
        }
        Ok(())
    }

    /// Apply position deltas to the captured agent poses.
    ///
    /// Deltas for unknown agents are ignored; the producing module read
    /// the same layer, so an unknown agent can only mean it was removed
    /// at setup time between captures.
    pub fn apply_positions(&mut self, deltas: &[PositionDelta]) {
        for delta in deltas {
            if let Some(agent) = self.agents.get_mut(&delta.agent) {
                let [x, y] = agent.position();
                agent.set_position([x + delta.displacement[0], y + delta.displacement[1]]);
            }
        }
    }

    /// Apply direct assignments (absolute overwrites) to this layer.
    pub fn apply_assignments(&mut self, assignments: &[Assignment]) -> Result<(), ApplyError> {
        for assignment in assignments {
            let container = self
                .containers
                .get_mut(&assignment.node)
                .ok_or(ApplyError::UnknownNode {
                    node: assignment.node,
                })?;
            container
                .set(assignment.subsection, assignment.entity, assignment.value)
                .map_err(|_| ApplyError::UnknownSubsection {
                    node: assignment.node,
                    subsection: assignment.subsection,
                })?;
        }
        Ok(())
    }

    /// Maximum absolute concentration difference between two layers.
    ///
    /// Ranges over the union of referenced `(node, subsection, entity)`
    /// keys; a key referenced on one side only compares against `0.0`.
    /// Returns the worst key alongside the magnitude.
    pub fn max_abs_difference(&self, other: &StateLayer) -> (f64, Option<DeltaKey>) {
        let mut worst = 0.0f64;
        let mut worst_key = None;
        let mut visit = |a: &StateLayer, b: &StateLayer| {
            for (node, container) in &a.containers {
                for (subsection, pool) in container.pools() {
                    for (entity, value) in pool.iter() {
                        let diff = (value - b.concentration(*node, subsection, entity)).abs();
                        if diff > worst {
                            worst = diff;
                            worst_key = Some(DeltaKey {
                                node: *node,
                                subsection,
                                entity,
                            });
                        }
                    }
                }
            }
        };
        visit(self, other);
        visit(other, self);
        (worst, worst_key)
    }

    /// Write this layer back into the live graph.
    ///
    /// The single mutation point for accepted epochs: containers and
    /// agent poses are overwritten wholesale.
    pub fn commit_to(&self, graph: &mut AutomatonGraph) {
        for (id, container) in &self.containers {
            if let Some(node) = graph.node_mut(*id) {
                *node.concentrations_mut() = container.clone();
            }
        }
        for (id, captured) in &self.agents {
            if let Some(agent) = graph.agent_mut(*id) {
                agent.set_position(captured.position());
            }
        }
    }
}
