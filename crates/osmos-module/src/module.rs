//! The [`UpdateModule`] trait and [`ModuleKind`] enum.
//!
//! Modules are modular, stateless operators invoked each epoch. They
//! declare their behavioral variant and feature dependencies at
//! registration, enabling the engine to validate the module list and
//! route compute calls without per-epoch conditionals.

use crate::delta::DeltaBuffer;
use crate::view::StateView;
use osmos_core::{AgentId, EntityId, FeatureSet, ModuleError, NodeId};
use osmos_graph::AutomatonNode;

/// Behavioral variant of an update module.
///
/// The kind decides which compute hook the engine calls and whether the
/// module's output participates in step-doubling error estimation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleKind {
    /// Node-local: reads only the addressed node's own state. Safe to
    /// execute per node in any order or in parallel. Error-controlled.
    NodeLocal,

    /// Reads the addressed node's state and its neighbours' state, all
    /// from the frozen pre-epoch view. Error-controlled.
    NeighbourDependent,

    /// Moves point-like agents; produces position deltas, computed from
    /// the pre-epoch state at the accepted step size. Not part of the
    /// error estimate.
    AgentDisplacement,

    /// Recomputes derived concentrations after acceptance, outside the
    /// error-controlled delta protocol.
    DirectAssignment,
}

/// A modular, stateless unit of update logic.
///
/// # Contract
///
/// - Compute hooks are pure functions of the [`StateView`]: same view,
///   same output. They must not mutate anything reachable besides the
///   private output buffer.
/// - `&self` — modules are stateless; anything per-epoch (e.g. RNG)
///   must be derived from the view's epoch and seed.
/// - `required_features()`, `referenced_entities()`, and
///   `feature_targets()` are called once at validation, not per-epoch.
///
/// # Object safety
///
/// This trait is object-safe; the engine stores modules as
/// `Vec<Box<dyn UpdateModule>>`. `Send + Sync` lets one shared view be
/// read from many compute threads.
pub trait UpdateModule: Send + Sync {
    /// Human-readable name for error reporting and diagnostics.
    fn name(&self) -> &str;

    /// The module's behavioral variant.
    fn kind(&self) -> ModuleKind;

    /// Feature kinds that must be present on every feature target.
    ///
    /// A missing feature is a fatal configuration error, reported at
    /// registration — never at run time.
    fn required_features(&self) -> FeatureSet {
        FeatureSet::empty()
    }

    /// All entities this module reads or writes.
    ///
    /// Validation checks each is registered in the catalog.
    fn referenced_entities(&self) -> Vec<EntityId> {
        Vec::new()
    }

    /// The entities on which [`required_features`](Self::required_features)
    /// must be present. Defaults to every referenced entity.
    fn feature_targets(&self) -> Vec<EntityId> {
        self.referenced_entities()
    }

    /// Applicability predicate: restricts which nodes the module acts on.
    ///
    /// Defaults to all nodes. Consulted only for node-scoped kinds.
    fn applies_to(&self, node: &AutomatonNode) -> bool {
        let _ = node;
        true
    }

    /// Compute this module's contribution for one node.
    ///
    /// Called for [`ModuleKind::NodeLocal`], [`ModuleKind::NeighbourDependent`],
    /// and [`ModuleKind::DirectAssignment`] modules, once per applicable
    /// node per compute pass. May run concurrently with other compute
    /// calls; `out` is private to this call.
    fn compute(
        &self,
        node: NodeId,
        view: &StateView<'_>,
        out: &mut DeltaBuffer,
    ) -> Result<(), ModuleError> {
        let _ = (node, view, out);
        Ok(())
    }

    /// Compute this module's contribution for one mobile agent.
    ///
    /// Called for [`ModuleKind::AgentDisplacement`] modules, once per
    /// agent per attempted step.
    fn compute_agent(
        &self,
        agent: AgentId,
        view: &StateView<'_>,
        out: &mut DeltaBuffer,
    ) -> Result<(), ModuleError> {
        let _ = (agent, view, out);
        Ok(())
    }
}
