//! Automaton nodes: compartmentalized locations with chemical state.

use crate::compartment::CellRegion;
use crate::pool::ConcentrationContainer;
use osmos_core::{NodeId, Position};
use smallvec::SmallVec;
use std::sync::Arc;

/// A spatial location carrying compartmentalized chemical state.
///
/// The region is a shared, read-only reference: many nodes of the same
/// class point at one [`CellRegion`]. The concentration container is
/// exclusively owned.
#[derive(Clone, Debug)]
pub struct AutomatonNode {
    id: NodeId,
    position: Position,
    region: Arc<CellRegion>,
    concentrations: ConcentrationContainer,
    neighbours: SmallVec<[NodeId; 8]>,
}

impl AutomatonNode {
    pub(crate) fn new(id: NodeId, position: Position, region: Arc<CellRegion>) -> Self {
        let concentrations = ConcentrationContainer::for_region(&region);
        Self {
            id,
            position,
            region,
            concentrations,
            neighbours: SmallVec::new(),
        }
    }

    /// The node's identifier.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node's anchor position.
    pub fn position(&self) -> Position {
        self.position
    }

    /// The shared compartment classification.
    pub fn region(&self) -> &Arc<CellRegion> {
        &self.region
    }

    /// The node's chemical state.
    pub fn concentrations(&self) -> &ConcentrationContainer {
        &self.concentrations
    }

    /// Mutable access to the node's chemical state.
    ///
    /// Used at setup (seeding) and by the engine's apply phase; never
    /// called from module compute code, which only sees snapshots.
    pub fn concentrations_mut(&mut self) -> &mut ConcentrationContainer {
        &mut self.concentrations
    }

    /// IDs of directly connected nodes, in connection order.
    pub fn neighbours(&self) -> &[NodeId] {
        &self.neighbours
    }

    pub(crate) fn add_neighbour(&mut self, node: NodeId) {
        if !self.neighbours.contains(&node) {
            self.neighbours.push(node);
        }
    }

    pub(crate) fn remove_neighbour(&mut self, node: NodeId) {
        self.neighbours.retain(|&mut n| n != node);
    }
}
