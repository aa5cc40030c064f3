//! The read-only state view handed to module compute hooks.

use crate::state::StateLayer;
use osmos_core::{AgentId, EntityCatalog, EntityId, FeatureKind, NodeId, SubsectionId};
use osmos_graph::{AutomatonGraph, AutomatonNode, ConcentrationContainer, MobileAgent};

/// Everything a module may read while computing deltas.
///
/// Concentrations and agent poses come from the frozen [`StateLayer`],
/// never from the live graph; the graph reference supplies only the
/// immutable parts — topology, regions, positions. Reading a node's
/// container through [`node`](Self::node) would see stale data during
/// half-step evaluation; always read values through the view.
///
/// The view is `Sync`: compute calls for disjoint nodes run in parallel
/// against one shared view.
pub struct StateView<'a> {
    graph: &'a AutomatonGraph,
    state: &'a StateLayer,
    catalog: &'a EntityCatalog,
    dt: f64,
    time: f64,
    epoch: u64,
    seed: u64,
}

impl<'a> StateView<'a> {
    /// Assemble a view over a frozen layer.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        graph: &'a AutomatonGraph,
        state: &'a StateLayer,
        catalog: &'a EntityCatalog,
        dt: f64,
        time: f64,
        epoch: u64,
        seed: u64,
    ) -> Self {
        Self {
            graph,
            state,
            catalog,
            dt,
            time,
            epoch,
            seed,
        }
    }

    /// The concentration at a key in the frozen layer; `0.0` if absent.
    pub fn concentration(&self, node: NodeId, subsection: SubsectionId, entity: EntityId) -> f64 {
        self.state.concentration(node, subsection, entity)
    }

    /// The frozen container for a node.
    pub fn container(&self, node: NodeId) -> Option<&ConcentrationContainer> {
        self.state.container(node)
    }

    /// Topology and region data for a node (not its live concentrations).
    pub fn node(&self, node: NodeId) -> Option<&AutomatonNode> {
        self.graph.node(node)
    }

    /// Neighbour IDs of a node, empty for unknown IDs.
    pub fn neighbours(&self, node: NodeId) -> &[NodeId] {
        self.graph
            .node(node)
            .map(|n| n.neighbours())
            .unwrap_or(&[])
    }

    /// The frozen pose of an agent.
    pub fn agent(&self, agent: AgentId) -> Option<&MobileAgent> {
        self.state.agent(agent)
    }

    /// Iterate over frozen agent poses.
    pub fn agents(&self) -> impl Iterator<Item = &MobileAgent> {
        self.state.agents()
    }

    /// The entity catalog.
    pub fn catalog(&self) -> &EntityCatalog {
        self.catalog
    }

    /// Shortcut feature lookup on the catalog.
    pub fn feature(&self, entity: EntityId, kind: FeatureKind) -> Option<f64> {
        self.catalog.feature(entity, kind)
    }

    /// The candidate step size for this compute pass.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Simulated time at the start of the epoch.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// The epoch index, for deterministic per-epoch RNG seeding.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The simulation seed, for deterministic per-epoch RNG seeding.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

// Compile-time assertion: StateView must be Send + Sync so compute
// calls can fan out across threads against one shared view.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<StateView<'_>>();
};
