//! Reusable graph builders and module fixtures.
//!
//! Three standard modules for validation and engine testing:
//!
//! - [`ConstantRateModule`] — produces one entity at a fixed rate.
//! - [`EmptyModule`] — applicable everywhere, emits nothing.
//! - [`FailingModule`] — fails deterministically after N calls.

use osmos_core::{EntityId, ModuleError, NodeId, SubsectionId};
use osmos_graph::{AutomatonGraph, CellRegion, CellSubsection, CellTopology};
use osmos_module::{DeltaBuffer, ModuleKind, StateView, UpdateModule};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// The single subsection used by the fixture graphs.
pub const CYTOPLASM: SubsectionId = SubsectionId(0);

/// A single-compartment region mapping [`CellTopology::Inner`] to
/// [`CYTOPLASM`].
pub fn aqueous_region() -> Arc<CellRegion> {
    Arc::new(CellRegion::single(
        "aqueous",
        CellSubsection::new(CYTOPLASM, "cytoplasm"),
    ))
}

/// One node seeded with the given `(entity, concentration)` pairs.
pub fn single_node_graph(seed: &[(EntityId, f64)]) -> (AutomatonGraph, NodeId, SubsectionId) {
    let mut graph = AutomatonGraph::new();
    let node = graph.add_node(aqueous_region(), [0.0, 0.0]);
    seed_node(&mut graph, node, seed);
    (graph, node, CYTOPLASM)
}

/// Two connected nodes, each seeded independently.
pub fn two_node_graph(
    first: &[(EntityId, f64)],
    second: &[(EntityId, f64)],
) -> (AutomatonGraph, [NodeId; 2], SubsectionId) {
    let mut graph = AutomatonGraph::new();
    let region = aqueous_region();
    let a = graph.add_node(region.clone(), [0.0, 0.0]);
    let b = graph.add_node(region, [1.0, 0.0]);
    graph.connect(a, b).expect("fixture endpoints exist");
    seed_node(&mut graph, a, first);
    seed_node(&mut graph, b, second);
    (graph, [a, b], CYTOPLASM)
}

fn seed_node(graph: &mut AutomatonGraph, node: NodeId, seed: &[(EntityId, f64)]) {
    let container = graph
        .node_mut(node)
        .expect("fixture node exists")
        .concentrations_mut();
    for &(entity, value) in seed {
        container
            .initialize(CYTOPLASM, entity, value)
            .expect("fixture subsection exists");
    }
}

/// Produces one entity at a fixed rate in every applicable node.
///
/// Emits `rate · dt` per compute pass, so accepted epochs integrate the
/// entity linearly in time — handy for asserting elapsed-time coupling.
pub struct ConstantRateModule {
    /// Module name.
    pub name: String,
    /// Produced entity.
    pub entity: EntityId,
    /// Production rate per unit time.
    pub rate: f64,
}

impl ConstantRateModule {
    /// Create a constant-rate producer.
    pub fn new(name: impl Into<String>, entity: EntityId, rate: f64) -> Self {
        Self {
            name: name.into(),
            entity,
            rate,
        }
    }
}

impl UpdateModule for ConstantRateModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::NodeLocal
    }

    fn referenced_entities(&self) -> Vec<EntityId> {
        vec![self.entity]
    }

    fn compute(
        &self,
        node: NodeId,
        view: &StateView<'_>,
        out: &mut DeltaBuffer,
    ) -> Result<(), ModuleError> {
        let subsection = match view
            .node(node)
            .and_then(|n| n.region().subsection(CellTopology::Inner))
        {
            Some(s) => s.id(),
            None => return Ok(()),
        };
        out.add_concentration(node, subsection, self.entity, self.rate * view.dt());
        Ok(())
    }
}

/// Applicable everywhere; computes nothing.
pub struct EmptyModule {
    /// Module name.
    pub name: String,
}

impl EmptyModule {
    /// Create an empty module.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl UpdateModule for EmptyModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::NodeLocal
    }
}

/// Fails deterministically after a configurable number of successful calls.
///
/// Useful for testing error propagation through the epoch loop. Uses
/// `AtomicUsize` for the call counter so it satisfies `Sync`.
pub struct FailingModule {
    /// Module name.
    pub name: String,
    /// Number of successful calls before failure.
    pub succeed_count: usize,
    call_count: AtomicUsize,
}

impl FailingModule {
    /// Create a module that succeeds `succeed_count` times then fails.
    pub fn new(name: impl Into<String>, succeed_count: usize) -> Self {
        Self {
            name: name.into(),
            succeed_count,
            call_count: AtomicUsize::new(0),
        }
    }

    /// How many times a compute hook has been called.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl UpdateModule for FailingModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::NodeLocal
    }

    fn compute(
        &self,
        _node: NodeId,
        _view: &StateView<'_>,
        _out: &mut DeltaBuffer,
    ) -> Result<(), ModuleError> {
        let calls = self.call_count.fetch_add(1, Ordering::Relaxed);
        if calls >= self.succeed_count {
            Err(ModuleError::ExecutionFailed {
                reason: format!("scripted failure on call {}", calls + 1),
            })
        } else {
            Ok(())
        }
    }
}
