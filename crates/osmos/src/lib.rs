//! Osmos: an adaptive compartmental reaction-diffusion simulation engine.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Osmos sub-crates. For most users, adding `osmos` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use osmos::prelude::*;
//! use std::sync::Arc;
//!
//! // One species decaying in a single aqueous compartment.
//! let mut catalog = EntityCatalog::new();
//! let a = catalog.register("A", EntityKind::SmallMolecule).unwrap();
//! let p = catalog.register("P", EntityKind::SmallMolecule).unwrap();
//!
//! let cytoplasm = SubsectionId(0);
//! let region = Arc::new(CellRegion::single(
//!     "aqueous",
//!     CellSubsection::new(cytoplasm, "cytoplasm"),
//! ));
//! let mut graph = AutomatonGraph::new();
//! let node = graph.add_node(region, [0.0, 0.0]);
//! graph
//!     .node_mut(node)
//!     .unwrap()
//!     .concentrations_mut()
//!     .initialize(cytoplasm, a, 1.0)
//!     .unwrap();
//!
//! let decay = ReactionModule::builder()
//!     .name("decay")
//!     .substrate(a, 1.0)
//!     .product(p, 1.0)
//!     .mass_action(1.0)
//!     .build();
//!
//! let mut simulation = Simulation::new(SimulationConfig {
//!     graph,
//!     catalog,
//!     modules: vec![Box::new(decay)],
//!     stepping: SteppingConfig::default(),
//!     negative_policy: NegativePolicy::Clamp,
//!     seed: 42,
//! })
//! .unwrap();
//!
//! let result = simulation.next_epoch().unwrap();
//! assert!(result.accepted_step > 0.0);
//! assert!(simulation.concentration(node, cytoplasm, p) > 0.0);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `osmos-core` | IDs, entity catalog, features, core errors |
//! | [`graph`] | `osmos-graph` | Compartments, pools, graph, agents |
//! | [`module`] | `osmos-module` | Module trait, deltas, state views, validation |
//! | [`modules`] | `osmos-modules` | Reference modules (reaction, diffusion, displacement, assignment) |
//! | [`engine`] | `osmos-engine` | Adaptive stepping and the simulation loop |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, IDs, and the entity catalog (`osmos-core`).
pub use osmos_core as types;

/// Compartment model and automaton graph (`osmos-graph`).
pub use osmos_graph as graph;

/// Module trait, delta protocol, and state views (`osmos-module`).
pub use osmos_module as module;

/// Built-in update modules (`osmos-modules`).
pub use osmos_modules as modules;

/// Adaptive stepping engine (`osmos-engine`).
pub use osmos_engine as engine;

/// The most commonly used types, re-exported flat.
pub mod prelude {
    pub use osmos_core::{
        AgentId, ChemicalEntity, EdgeId, EntityCatalog, EntityId, EntityKind, FeatureKind,
        FeatureSet, ModuleError, ModuleId, NodeId, Position, SubsectionId,
    };
    pub use osmos_engine::{
        EpochError, EpochMetrics, EpochResult, ErrorManager, Simulation, SimulationConfig,
        SteppingConfig,
    };
    pub use osmos_graph::{
        AgentState, AutomatonEdge, AutomatonGraph, AutomatonNode, CellRegion, CellSubsection,
        CellTopology, ConcentrationContainer, ConcentrationPool, EdgeSegment, GraphError,
        MobileAgent, RegionBounds,
    };
    pub use osmos_module::{
        DeltaBuffer, ModuleKind, NegativePolicy, StateLayer, StateView, UpdateModule,
        ValidationError,
    };
    pub use osmos_modules::{
        AssignmentModule, DiffusionModule, DisplacementModule, RateLaw, Reactant, ReactantRole,
        ReactionModule,
    };
}
