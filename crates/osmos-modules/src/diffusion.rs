//! Neighbour-dependent diffusion module.
//!
//! Graph-Laplacian flux: each node relaxes toward its neighbours,
//! `Δc_n = D · Σ_m (c_m − c_n) · dt` over neighbours `m` that carry the
//! same topology. Every node emits only its own delta; the neighbour's
//! compute call emits the mirror term, so summed flux conserves mass.

use osmos_core::{EntityId, FeatureKind, FeatureSet, ModuleError, NodeId};
use osmos_graph::{AutomatonNode, CellTopology};
use osmos_module::{DeltaBuffer, ModuleKind, StateView, UpdateModule};

/// Diffusive exchange of entities between adjacent nodes.
///
/// Reads only the frozen pre-epoch view, including neighbour entries,
/// so instances over disjoint nodes may run in parallel. Diffusivity is
/// resolved per entity from the catalog's `Diffusivity` feature, which
/// registration-time validation guarantees is present.
pub struct DiffusionModule {
    name: String,
    topology: CellTopology,
    entities: Vec<EntityId>,
}

impl DiffusionModule {
    /// Create a diffusion module for the given entities at a topology.
    pub fn new(
        name: impl Into<String>,
        topology: CellTopology,
        entities: Vec<EntityId>,
    ) -> Self {
        Self {
            name: name.into(),
            topology,
            entities,
        }
    }
}

impl UpdateModule for DiffusionModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::NeighbourDependent
    }

    fn required_features(&self) -> FeatureSet {
        [FeatureKind::Diffusivity].into_iter().collect()
    }

    fn referenced_entities(&self) -> Vec<EntityId> {
        self.entities.clone()
    }

    fn applies_to(&self, node: &AutomatonNode) -> bool {
        node.region().subsection(self.topology).is_some()
    }

    fn compute(
        &self,
        node: NodeId,
        view: &StateView<'_>,
        out: &mut DeltaBuffer,
    ) -> Result<(), ModuleError> {
        let subsection = match view
            .node(node)
            .and_then(|n| n.region().subsection(self.topology))
        {
            Some(s) => s.id(),
            None => return Ok(()),
        };

        for &entity in &self.entities {
            let diffusivity = view
                .feature(entity, FeatureKind::Diffusivity)
                .ok_or_else(|| ModuleError::MissingFeature {
                    entity,
                    feature: FeatureKind::Diffusivity.to_string(),
                })?;

            let own = view.concentration(node, subsection, entity);
            let mut flux = 0.0;
            for &neighbour in view.neighbours(node) {
                let neighbour_subsection = match view
                    .node(neighbour)
                    .and_then(|n| n.region().subsection(self.topology))
                {
                    Some(s) => s.id(),
                    None => continue,
                };
                flux += view.concentration(neighbour, neighbour_subsection, entity) - own;
            }
            if flux == 0.0 {
                continue;
            }
            let magnitude = diffusivity * flux * view.dt();
            if !magnitude.is_finite() {
                return Err(ModuleError::NanDetected { node, entity });
            }
            out.add_concentration(node, subsection, entity, magnitude);
        }
        Ok(())
    }
}
