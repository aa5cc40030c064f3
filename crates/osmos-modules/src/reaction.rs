//! Stoichiometric reaction module.
//!
//! Computes a scalar rate from the concentrations at one subsection of
//! one node, then emits one delta per participating entity scaled by
//! its stoichiometric coefficient — negative for substrates, positive
//! for products.
//!
//! Constructed via the builder pattern: [`ReactionModule::builder`].

use osmos_core::{EntityId, FeatureKind, FeatureSet, ModuleError, NodeId};
use osmos_graph::{AutomatonNode, CellTopology};
use osmos_module::{DeltaBuffer, ModuleKind, StateView, UpdateModule};

/// Whether a reactant is consumed or produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReactantRole {
    /// Consumed; its delta is `-coefficient · rate · dt`.
    Substrate,
    /// Produced; its delta is `+coefficient · rate · dt`.
    Product,
}

/// One participant in a reaction, with its stoichiometric coefficient.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reactant {
    /// The participating entity.
    pub entity: EntityId,
    /// Consumed or produced.
    pub role: ReactantRole,
    /// Stoichiometric coefficient (positive).
    pub coefficient: f64,
}

/// The kinetic rate law of a reaction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RateLaw {
    /// Mass action: `rate = k · Π c_substrate^coefficient`.
    MassAction {
        /// The rate constant, in units matching the reaction order.
        k: f64,
    },
    /// Saturating Michaelis–Menten kinetics on the first substrate:
    /// `rate = kcat · [E] · [S] / (Km + [S])`.
    ///
    /// `kcat` and `Km` are resolved from the enzyme's catalog features,
    /// which registration-time validation guarantees are present.
    MichaelisMenten {
        /// The catalyzing enzyme.
        enzyme: EntityId,
    },
}

/// A stoichiometric reaction acting at one topology's subsection.
///
/// Node-local: the rate depends only on the addressed node's own
/// concentrations, so instances over disjoint nodes compute in any
/// order or in parallel.
pub struct ReactionModule {
    name: String,
    topology: CellTopology,
    reactants: Vec<Reactant>,
    law: RateLaw,
}

impl ReactionModule {
    /// Start building a reaction.
    pub fn builder() -> ReactionModuleBuilder {
        ReactionModuleBuilder {
            name: None,
            topology: CellTopology::Inner,
            reactants: Vec::new(),
            law: None,
        }
    }

    fn rate(&self, node: NodeId, view: &StateView<'_>) -> Result<f64, ModuleError> {
        let subsection = match view
            .node(node)
            .and_then(|n| n.region().subsection(self.topology))
        {
            Some(s) => s.id(),
            None => return Ok(0.0),
        };
        match self.law {
            RateLaw::MassAction { k } => {
                let mut rate = k;
                for reactant in &self.reactants {
                    if reactant.role == ReactantRole::Substrate {
                        let c = view.concentration(node, subsection, reactant.entity);
                        rate *= c.powf(reactant.coefficient);
                    }
                }
                Ok(rate)
            }
            RateLaw::MichaelisMenten { enzyme } => {
                let kcat = view
                    .feature(enzyme, FeatureKind::CatalyticConstant)
                    .ok_or_else(|| ModuleError::MissingFeature {
                        entity: enzyme,
                        feature: FeatureKind::CatalyticConstant.to_string(),
                    })?;
                let km = view
                    .feature(enzyme, FeatureKind::MichaelisConstant)
                    .ok_or_else(|| ModuleError::MissingFeature {
                        entity: enzyme,
                        feature: FeatureKind::MichaelisConstant.to_string(),
                    })?;
                let substrate = self
                    .reactants
                    .iter()
                    .find(|r| r.role == ReactantRole::Substrate)
                    .map(|r| view.concentration(node, subsection, r.entity))
                    .unwrap_or(0.0);
                let enzyme_c = view.concentration(node, subsection, enzyme);
                Ok(kcat * enzyme_c * substrate / (km + substrate))
            }
        }
    }
}

impl UpdateModule for ReactionModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::NodeLocal
    }

    fn required_features(&self) -> FeatureSet {
        match self.law {
            RateLaw::MassAction { .. } => FeatureSet::empty(),
            RateLaw::MichaelisMenten { .. } => [
                FeatureKind::CatalyticConstant,
                FeatureKind::MichaelisConstant,
            ]
            .into_iter()
            .collect(),
        }
    }

    fn referenced_entities(&self) -> Vec<EntityId> {
        let mut entities: Vec<EntityId> = self.reactants.iter().map(|r| r.entity).collect();
        if let RateLaw::MichaelisMenten { enzyme } = self.law {
            entities.push(enzyme);
        }
        entities
    }

    fn feature_targets(&self) -> Vec<EntityId> {
        match self.law {
            RateLaw::MassAction { .. } => Vec::new(),
            RateLaw::MichaelisMenten { enzyme } => vec![enzyme],
        }
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
        let velocity = self.rate(node, view)? * view.dt();
        if velocity == 0.0 {
            return Ok(());
        }
        for reactant in &self.reactants {
            let sign = match reactant.role {
                ReactantRole::Substrate => -1.0,
                ReactantRole::Product => 1.0,
            };
            let magnitude = sign * reactant.coefficient * velocity;
            if !magnitude.is_finite() {
                return Err(ModuleError::NanDetected {
                    node,
                    entity: reactant.entity,
                });
            }
            out.add_concentration(node, subsection, reactant.entity, magnitude);
        }
        Ok(())
    }
}

/// Builder for [`ReactionModule`].
///
/// Required: `name` and a rate law. A reaction with no substrates is
/// permitted (zeroth-order production).
pub struct ReactionModuleBuilder {
    name: Option<String>,
    topology: CellTopology,
    reactants: Vec<Reactant>,
    law: Option<RateLaw>,
}

impl ReactionModuleBuilder {
    /// Set the module name used in diagnostics.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the topology whose subsection the reaction acts in
    /// (default: [`CellTopology::Inner`]).
    pub fn topology(mut self, topology: CellTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Add a substrate with a stoichiometric coefficient.
    pub fn substrate(mut self, entity: EntityId, coefficient: f64) -> Self {
        self.reactants.push(Reactant {
            entity,
            role: ReactantRole::Substrate,
            coefficient,
        });
        self
    }

    /// Add a product with a stoichiometric coefficient.
    pub fn product(mut self, entity: EntityId, coefficient: f64) -> Self {
        self.reactants.push(Reactant {
            entity,
            role: ReactantRole::Product,
            coefficient,
        });
        self
    }

    /// Use mass-action kinetics with rate constant `k`.
    pub fn mass_action(mut self, k: f64) -> Self {
        self.law = Some(RateLaw::MassAction { k });
        self
    }

    /// Use Michaelis–Menten kinetics catalyzed by `enzyme`.
    pub fn michaelis_menten(mut self, enzyme: EntityId) -> Self {
        self.law = Some(RateLaw::MichaelisMenten { enzyme });
        self
    }

    /// Finish building.
    ///
    /// # Panics
    ///
    /// Panics if `name` or the rate law was not set. Both are
    /// construction-site programming errors, not runtime conditions.
    pub fn build(self) -> ReactionModule {
        ReactionModule {
            name: self.name.expect("reaction module requires a name"),
            topology: self.topology,
            reactants: self.reactants,
            law: self.law.expect("reaction module requires a rate law"),
        }
    }
}
