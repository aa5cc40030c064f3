//! Point-like mobile agents (vesicles) moved by displacement modules.

use osmos_core::{AgentId, Position};

/// Discrete motility state of a mobile agent.
///
/// Displacement modules are configured with the state they act on; an
/// agent in any other state is skipped by the applicability predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentState {
    /// Diffusing freely.
    Free,
    /// Confined to a region, still diffusing within it.
    Confined,
    /// Anchored in place; not displaced.
    Tethered,
}

/// A point-like mobile agent, distinct from the fixed graph nodes.
///
/// Displacement deltas change the agent's position, not any
/// concentration, but flow through the same compute/apply protocol.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MobileAgent {
    id: AgentId,
    position: Position,
    state: AgentState,
}

impl MobileAgent {
    pub(crate) fn new(id: AgentId, position: Position, state: AgentState) -> Self {
        Self {
            id,
            position,
            state,
        }
    }

    /// The agent's identifier.
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// The agent's current position.
    pub fn position(&self) -> Position {
        self.position
    }

    /// The agent's current discrete state.
    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Replace the agent's position. Engine apply phase and setup only.
    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Replace the agent's discrete state. Setup-time only.
    pub fn set_state(&mut self, state: AgentState) {
        self.state = state;
    }
}
