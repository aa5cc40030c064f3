//! The automaton graph: owner of nodes, edges, and mobile agents.

use crate::agent::{AgentState, MobileAgent};
use crate::compartment::CellRegion;
use crate::edge::{AutomatonEdge, EdgeSegment};
use crate::error::GraphError;
use crate::node::AutomatonNode;
use indexmap::IndexMap;
use osmos_core::{AgentId, EdgeId, NodeId, Position};
use std::sync::Arc;

/// Owner of the full node/edge/agent set, addressed by identifier.
///
/// The graph is a passive container with O(1) lookup: it performs no
/// numerical computation. Identifiers are allocated monotonically and
/// never reused after removal. Topology is mutated only outside the
/// epoch loop; during simulation the engine treats it as frozen.
///
/// # Examples
///
/// ```
/// use osmos_graph::{AutomatonGraph, CellRegion, CellSubsection};
/// use osmos_core::SubsectionId;
/// use std::sync::Arc;
///
/// let region = Arc::new(CellRegion::single(
///     "aqueous",
///     CellSubsection::new(SubsectionId(0), "cytoplasm"),
/// ));
///
/// let mut graph = AutomatonGraph::new();
/// let a = graph.add_node(region.clone(), [0.0, 0.0]);
/// let b = graph.add_node(region, [1.0, 0.0]);
/// graph.connect(a, b).unwrap();
///
/// assert_eq!(graph.node(a).unwrap().neighbours(), &[b]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct AutomatonGraph {
    nodes: IndexMap<NodeId, AutomatonNode>,
    edges: IndexMap<EdgeId, AutomatonEdge>,
    agents: IndexMap<AgentId, MobileAgent>,
    next_node: u32,
    next_edge: u32,
    next_agent: u32,
}

impl AutomatonGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Nodes ───────────────────────────────────────────────────────

    /// Add a node with the given region and position. Returns its ID.
    pub fn add_node(&mut self, region: Arc<CellRegion>, position: Position) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, AutomatonNode::new(id, position, region));
        id
    }

    /// Remove a node and every edge incident to it.
    ///
    /// The removed ID is never reassigned.
    pub fn remove_node(&mut self, node: NodeId) -> Result<(), GraphError> {
        if self.nodes.shift_remove(&node).is_none() {
            return Err(GraphError::UnknownNode { node });
        }
        let incident: Vec<EdgeId> = self
            .edges
            .iter()
            .filter(|(_, e)| e.opposite(node).is_some())
            .map(|(id, _)| *id)
            .collect();
        for edge in incident {
            if let Some(removed) = self.edges.shift_remove(&edge) {
                if let Some(other) = removed.opposite(node) {
                    if let Some(n) = self.nodes.get_mut(&other) {
                        n.remove_neighbour(node);
                    }
                }
            }
        }
        Ok(())
    }

    /// Look up a node by ID.
    pub fn node(&self, node: NodeId) -> Option<&AutomatonNode> {
        self.nodes.get(&node)
    }

    /// Mutable node lookup. Setup and apply-phase only.
    pub fn node_mut(&mut self, node: NodeId) -> Option<&mut AutomatonNode> {
        self.nodes.get_mut(&node)
    }

    /// Iterate over nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &AutomatonNode> {
        self.nodes.values()
    }

    /// Node IDs in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ── Edges ───────────────────────────────────────────────────────

    /// Connect two existing nodes with an undirected edge.
    ///
    /// Both endpoints must exist; connecting unknown node IDs is a
    /// configuration error. Registers neighbour back-references on both
    /// endpoints.
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> Result<EdgeId, GraphError> {
        self.connect_with_segment(a, b, None)
    }

    /// Connect two nodes with geometric segment data attached.
    pub fn connect_with_segment(
        &mut self,
        a: NodeId,
        b: NodeId,
        segment: Option<EdgeSegment>,
    ) -> Result<EdgeId, GraphError> {
        if a == b {
            return Err(GraphError::SelfLoop { node: a });
        }
        if !self.nodes.contains_key(&a) {
            return Err(GraphError::UnknownNode { node: a });
        }
        if !self.nodes.contains_key(&b) {
            return Err(GraphError::UnknownNode { node: b });
        }
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.edges.insert(id, AutomatonEdge::new(id, a, b, segment));
        // contains_key checks above make these lookups infallible
        self.nodes.get_mut(&a).expect("endpoint checked").add_neighbour(b);
        self.nodes.get_mut(&b).expect("endpoint checked").add_neighbour(a);
        Ok(id)
    }

    /// Look up an edge by ID.
    pub fn edge(&self, edge: EdgeId) -> Option<&AutomatonEdge> {
        self.edges.get(&edge)
    }

    /// Iterate over edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &AutomatonEdge> {
        self.edges.values()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    // ── Agents ──────────────────────────────────────────────────────

    /// Add a mobile agent at a position with an initial state.
    pub fn add_agent(&mut self, position: Position, state: AgentState) -> AgentId {
        let id = AgentId(self.next_agent);
        self.next_agent += 1;
        self.agents.insert(id, MobileAgent::new(id, position, state));
        id
    }

    /// Look up an agent by ID.
    pub fn agent(&self, agent: AgentId) -> Option<&MobileAgent> {
        self.agents.get(&agent)
    }

    /// Mutable agent lookup. Setup and apply-phase only.
    pub fn agent_mut(&mut self, agent: AgentId) -> Option<&mut MobileAgent> {
        self.agents.get_mut(&agent)
    }

    /// Iterate over agents in insertion order.
    pub fn agents(&self) -> impl Iterator<Item = &MobileAgent> {
        self.agents.values()
    }

    /// Agent IDs in insertion order.
    pub fn agent_ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.agents.keys().copied()
    }

    /// Number of agents.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }
}
