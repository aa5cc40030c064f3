//! Delta value objects, per-call buffers, and the deterministic merge map.

use indexmap::IndexMap;
use osmos_core::{AgentId, EntityId, ModuleId, NodeId, SubsectionId};
use smallvec::SmallVec;

/// One proposed change to a `(node, subsection, entity)` concentration.
///
/// Immutable once produced. Deltas from different modules targeting the
/// same key are combined by summation, so their meaning must not depend
/// on application order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConcentrationDelta {
    /// Target node.
    pub node: NodeId,
    /// Target subsection within the node's region.
    pub subsection: SubsectionId,
    /// Target entity.
    pub entity: EntityId,
    /// The module that produced this delta.
    pub module: ModuleId,
    /// Signed concentration change for the attempted step.
    pub magnitude: f64,
}

/// One proposed change to a mobile agent's position.
///
/// Position deltas flow through the same compute/apply protocol as
/// concentration deltas but are not part of the step-doubling error
/// estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionDelta {
    /// Target agent.
    pub agent: AgentId,
    /// The module that produced this delta.
    pub module: ModuleId,
    /// Displacement to add to the agent's position.
    pub displacement: [f64; 2],
}

/// A direct (absolute) concentration assignment.
///
/// Produced by derived-concentration modules and applied after epoch
/// acceptance, outside the error-controlled delta protocol.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Assignment {
    /// Target node.
    pub node: NodeId,
    /// Target subsection within the node's region.
    pub subsection: SubsectionId,
    /// Target entity.
    pub entity: EntityId,
    /// The module that produced this assignment.
    pub module: ModuleId,
    /// The absolute value to assign.
    pub value: f64,
}

/// Private per-call output buffer handed to a module's compute hook.
///
/// The engine creates one buffer per `(module, node-or-agent)` call, so
/// concurrent compute calls never share a buffer. The buffer stamps
/// every record with the producing module's ID.
#[derive(Debug)]
pub struct DeltaBuffer {
    module: ModuleId,
    concentrations: Vec<ConcentrationDelta>,
    positions: Vec<PositionDelta>,
    assignments: Vec<Assignment>,
}

impl DeltaBuffer {
    /// Create an empty buffer for a module.
    pub fn new(module: ModuleId) -> Self {
        Self {
            module,
            concentrations: Vec::new(),
            positions: Vec::new(),
            assignments: Vec::new(),
        }
    }

    /// The module this buffer stamps onto its records.
    pub fn module(&self) -> ModuleId {
        self.module
    }

    /// Record a concentration delta.
    pub fn add_concentration(
        &mut self,
        node: NodeId,
        subsection: SubsectionId,
        entity: EntityId,
        magnitude: f64,
    ) {
        self.concentrations.push(ConcentrationDelta {
            node,
            subsection,
            entity,
            module: self.module,
            magnitude,
        });
    }

    /// Record a position delta.
    pub fn add_position(&mut self, agent: AgentId, displacement: [f64; 2]) {
        self.positions.push(PositionDelta {
            agent,
            module: self.module,
            displacement,
        });
    }

    /// Record a direct assignment.
    pub fn add_assignment(
        &mut self,
        node: NodeId,
        subsection: SubsectionId,
        entity: EntityId,
        value: f64,
    ) {
        self.assignments.push(Assignment {
            node,
            subsection,
            entity,
            module: self.module,
            value,
        });
    }

    /// Recorded concentration deltas.
    pub fn concentrations(&self) -> &[ConcentrationDelta] {
        &self.concentrations
    }

    /// Recorded position deltas.
    pub fn positions(&self) -> &[PositionDelta] {
        &self.positions
    }

    /// Recorded assignments.
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.concentrations.is_empty() && self.positions.is_empty() && self.assignments.is_empty()
    }
}

/// Addressing key for one concentration value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeltaKey {
    /// Target node.
    pub node: NodeId,
    /// Target subsection.
    pub subsection: SubsectionId,
    /// Target entity.
    pub entity: EntityId,
}

/// Summed contributions for one key, with contributor tracking.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergedDelta {
    /// Sum of all contributing magnitudes.
    pub total: f64,
    /// Modules that contributed, in first-contribution order.
    pub contributors: SmallVec<[ModuleId; 2]>,
}

/// Deterministic merge of concentration deltas across all buffers.
///
/// Built single-threaded, in buffer order, after the parallel compute
/// phase. Deltas targeting the same key are summed; iteration order is
/// first-insertion order, so applying the map is deterministic.
#[derive(Debug, Default)]
pub struct MergedDeltas {
    map: IndexMap<DeltaKey, MergedDelta>,
}

impl MergedDeltas {
    /// Create an empty merge map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a buffer's concentration deltas into the map.
    pub fn absorb(&mut self, buffer: &DeltaBuffer) {
        for delta in buffer.concentrations() {
            let key = DeltaKey {
                node: delta.node,
                subsection: delta.subsection,
                entity: delta.entity,
            };
            let merged = self.map.entry(key).or_default();
            merged.total += delta.magnitude;
            if !merged.contributors.contains(&delta.module) {
                merged.contributors.push(delta.module);
            }
        }
    }

    /// Look up the merged contribution for a key.
    pub fn get(&self, key: &DeltaKey) -> Option<&MergedDelta> {
        self.map.get(key)
    }

    /// Iterate over `(key, merged)` pairs in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&DeltaKey, &MergedDelta)> {
        self.map.iter()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no delta was absorbed.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
