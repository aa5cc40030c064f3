//! Simulation configuration, validation, and error types.

use crate::stepping::{SteppingConfig, SteppingConfigError};
use osmos_core::EntityCatalog;
use osmos_graph::AutomatonGraph;
use osmos_module::{validate_modules, NegativePolicy, UpdateModule, ValidationError};
use std::error::Error;
use std::fmt;

/// Errors detected during [`SimulationConfig::validate()`] or by
/// setup-time mutation of a running simulation.
#[derive(Debug)]
pub enum ConfigError {
    /// Module-list validation failed.
    Validation(ValidationError),
    /// Stepping configuration is invalid.
    Stepping(SteppingConfigError),
    /// The graph has no nodes.
    EmptyGraph,
    /// A setup-only operation was attempted after the first epoch.
    SimulationStarted,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "modules: {e}"),
            Self::Stepping(e) => write!(f, "stepping: {e}"),
            Self::EmptyGraph => write!(f, "graph has no nodes"),
            Self::SimulationStarted => {
                write!(f, "setup-time operation attempted after the first epoch")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(e) => Some(e),
            Self::Stepping(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for ConfigError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<SteppingConfigError> for ConfigError {
    fn from(e: SteppingConfigError) -> Self {
        Self::Stepping(e)
    }
}

/// Complete configuration for constructing a [`Simulation`].
///
/// The graph and catalog are populated by external collaborators before
/// construction; modules are registered here and validated against the
/// catalog before the first epoch can run.
///
/// [`Simulation`]: crate::simulation::Simulation
pub struct SimulationConfig {
    /// The populated automaton graph.
    pub graph: AutomatonGraph,
    /// The entity catalog modules resolve features from.
    pub catalog: EntityCatalog,
    /// Modules, in registration order. Delta merging is summation, so
    /// results do not depend on this order.
    pub modules: Vec<Box<dyn UpdateModule>>,
    /// Adaptive stepping configuration.
    pub stepping: SteppingConfig,
    /// Policy for deltas that would drive a concentration negative.
    pub negative_policy: NegativePolicy,
    /// RNG seed for stochastic modules.
    pub seed: u64,
}

impl SimulationConfig {
    /// Validate all structural invariants.
    ///
    /// Checks the graph is non-empty, the stepping configuration is
    /// self-consistent, and every module's entity references and
    /// feature requirements resolve against the catalog.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.graph.node_count() == 0 {
            return Err(ConfigError::EmptyGraph);
        }
        self.stepping.validate()?;
        validate_modules(&self.modules, &self.catalog)?;
        Ok(())
    }
}

impl fmt::Debug for SimulationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationConfig")
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .field("agents", &self.graph.agent_count())
            .field("entities", &self.catalog.len())
            .field("modules", &self.modules.len())
            .field("stepping", &self.stepping)
            .field("negative_policy", &self.negative_policy)
            .field("seed", &self.seed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmos_core::EntityKind;
    use osmos_test_utils::{single_node_graph, EmptyModule};

    fn valid_config() -> SimulationConfig {
        let mut catalog = EntityCatalog::new();
        let a = catalog.register("A", EntityKind::SmallMolecule).unwrap();
        let (graph, _, _) = single_node_graph(&[(a, 1.0)]);
        SimulationConfig {
            graph,
            catalog,
            modules: vec![Box::new(EmptyModule::new("noop"))],
            stepping: SteppingConfig::default(),
            negative_policy: NegativePolicy::Clamp,
            seed: 42,
        }
    }

    #[test]
    fn validate_valid_config_succeeds() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_empty_graph_fails() {
        let mut cfg = valid_config();
        cfg.graph = AutomatonGraph::new();
        assert!(matches!(cfg.validate(), Err(ConfigError::EmptyGraph)));
    }

    #[test]
    fn validate_empty_modules_fails() {
        let mut cfg = valid_config();
        cfg.modules.clear();
        match cfg.validate() {
            Err(ConfigError::Validation(ValidationError::NoModules)) => {}
            other => panic!("expected Validation(NoModules), got {other:?}"),
        }
    }

    #[test]
    fn validate_bad_stepping_fails() {
        let mut cfg = valid_config();
        cfg.stepping.local_tolerance = -1.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Stepping(_))));
    }
}
