//! The simulation loop: compute, estimate, accept or reject, apply.
//!
//! Each epoch walks the state machine
//! `COMPUTE_FULL → COMPUTE_HALF(×2) → EVALUATE_ERROR →
//! {ACCEPT → APPLY → ADVANCE_TIME} | {REJECT → SHRINK_STEP → COMPUTE_FULL}`.
//! There is no internal terminal state — the caller decides when to stop
//! calling [`Simulation::next_epoch`].

use crate::config::{ConfigError, SimulationConfig};
use crate::metrics::EpochMetrics;
use crate::stepping::{ErrorManager, StepVerdict};
use osmos_core::{AgentId, EntityCatalog, EntityId, ModuleError, ModuleId, NodeId, SubsectionId};
use osmos_graph::{AutomatonGraph, MobileAgent};
use osmos_module::{
    validate_modules, ApplyError, Assignment, DeltaBuffer, MergedDeltas, ModuleKind,
    NegativePolicy, PositionDelta, StateLayer, StateView, UpdateModule,
};
use rayon::prelude::*;
use std::error::Error;
use std::fmt;
use std::time::Instant;
use tracing::{debug, error, trace, warn};

// Compile-time assertion: Simulation is Send + Sync (modules are
// Send + Sync trait objects; all state is owned).
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Simulation>();
};

// ── EpochResult ─────────────────────────────────────────────────────

/// Result of one accepted epoch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpochResult {
    /// Zero-based index of the accepted epoch.
    pub epoch: u64,
    /// The step size that satisfied the tolerance.
    pub accepted_step: f64,
    /// Total simulated time after this epoch.
    pub elapsed_after: f64,
    /// The step-doubling local error estimate of the accepted attempt.
    pub local_error: f64,
    /// Number of rejected attempts before acceptance.
    pub retries: u32,
}

// ── EpochError ──────────────────────────────────────────────────────

/// Fatal errors from [`Simulation::next_epoch`].
///
/// On any error the graph state is unchanged: candidates are private
/// copies and the commit happens only after every fallible stage of an
/// accepted epoch has succeeded. Transient over-tolerance attempts are
/// absorbed by the retry loop and never surface here.
#[derive(Debug)]
pub enum EpochError {
    /// A module's compute hook failed; the epoch was abandoned.
    ModuleFailed {
        /// Name of the failing module.
        name: String,
        /// The underlying module error.
        reason: ModuleError,
    },
    /// A delta violated state consistency — in strict mode this is how
    /// a negative concentration surfaces.
    Consistency(ApplyError),
    /// The step was rejected below the configured minimum.
    NumericalDivergence {
        /// Index of the epoch that failed to converge.
        epoch: u64,
        /// The last attempted step size.
        last_step: f64,
        /// The configured step floor.
        minimum_step: f64,
        /// The error estimate of the last attempt.
        local_error: f64,
        /// Modules that contributed to the worst-offending value, when
        /// identifiable.
        offenders: Vec<String>,
    },
    /// Stepping is halted after an earlier numerical divergence.
    Halted,
}

impl fmt::Display for EpochError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModuleFailed { name, reason } => {
                write!(f, "module '{name}' failed: {reason}")
            }
            Self::Consistency(e) => write!(f, "consistency: {e}"),
            Self::NumericalDivergence {
                epoch,
                last_step,
                minimum_step,
                local_error,
                offenders,
            } => {
                write!(
                    f,
                    "numerical divergence in epoch {epoch}: step {last_step} rejected \
                     below minimum {minimum_step} with local error {local_error}"
                )?;
                if !offenders.is_empty() {
                    write!(f, " (offending modules: {})", offenders.join(", "))?;
                }
                Ok(())
            }
            Self::Halted => write!(f, "stepping halted after numerical divergence"),
        }
    }
}

impl Error for EpochError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ModuleFailed { reason, .. } => Some(reason),
            Self::Consistency(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ApplyError> for EpochError {
    fn from(e: ApplyError) -> Self {
        Self::Consistency(e)
    }
}

// ── Simulation ──────────────────────────────────────────────────────

/// Owner of the graph, module list, and error manager; the blocking,
/// epoch-at-a-time scheduler.
///
/// # Example
///
/// ```
/// use osmos_core::{EntityCatalog, EntityKind};
/// use osmos_engine::{Simulation, SimulationConfig, SteppingConfig};
/// use osmos_graph::{AutomatonGraph, CellRegion, CellSubsection};
/// use osmos_module::NegativePolicy;
/// use osmos_core::SubsectionId;
/// use std::sync::Arc;
///
/// # use osmos_module::{ModuleKind, UpdateModule};
/// # struct Noop;
/// # impl UpdateModule for Noop {
/// #     fn name(&self) -> &str { "noop" }
/// #     fn kind(&self) -> ModuleKind { ModuleKind::NodeLocal }
/// # }
/// let mut catalog = EntityCatalog::new();
/// catalog.register("A", EntityKind::SmallMolecule).unwrap();
///
/// let region = Arc::new(CellRegion::single(
///     "aqueous",
///     CellSubsection::new(SubsectionId(0), "cytoplasm"),
/// ));
/// let mut graph = AutomatonGraph::new();
/// graph.add_node(region, [0.0, 0.0]);
///
/// let mut simulation = Simulation::new(SimulationConfig {
///     graph,
///     catalog,
///     modules: vec![Box::new(Noop)],
///     stepping: SteppingConfig::default(),
///     negative_policy: NegativePolicy::Clamp,
///     seed: 42,
/// })
/// .unwrap();
///
/// let result = simulation.next_epoch().unwrap();
/// assert_eq!(result.elapsed_after, simulation.elapsed_time());
/// ```
pub struct Simulation {
    graph: AutomatonGraph,
    catalog: EntityCatalog,
    modules: Vec<Box<dyn UpdateModule>>,
    error_manager: ErrorManager,
    negative_policy: NegativePolicy,
    seed: u64,
    elapsed: f64,
    epoch: u64,
    started: bool,
    last_metrics: EpochMetrics,
}

impl Simulation {
    /// Construct a simulation from a validated configuration.
    ///
    /// Consumes the config. Fails fast on any structural defect — a
    /// simulation that constructs successfully will not hit a
    /// configuration error at run time.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let error_manager = ErrorManager::new(config.stepping);
        Ok(Self {
            graph: config.graph,
            catalog: config.catalog,
            modules: config.modules,
            error_manager,
            negative_policy: config.negative_policy,
            seed: config.seed,
            elapsed: 0.0,
            epoch: 0,
            started: false,
            last_metrics: EpochMetrics::default(),
        })
    }

    /// Advance the simulation by exactly one accepted step.
    ///
    /// Blocks until the epoch resolves. On `Ok`, elapsed time increased
    /// by the accepted step size and the graph holds the committed
    /// half-step state. On `Err`, the graph is unchanged.
    pub fn next_epoch(&mut self) -> Result<EpochResult, EpochError> {
        if self.error_manager.is_diverged() {
            return Err(EpochError::Halted);
        }

        let epoch = self.epoch;
        let epoch_start = Instant::now();
        let base = StateLayer::capture(&self.graph);
        let mut attempts = 0u32;
        let mut compute_us = 0u64;

        loop {
            attempts += 1;
            let h = self.error_manager.current_step();
            trace!(epoch, step = h, attempt = attempts, "attempting step");

            // COMPUTE_FULL: one pass at h.
            let compute_start = Instant::now();
            let full_merged = self.concentration_pass(&base, h, epoch)?;
            let mut full = base.clone();
            full.apply_concentrations(&full_merged, self.negative_policy)?;

            // COMPUTE_HALF ×2: re-snapshotting between the sub-steps.
            let half = h * 0.5;
            let first = self.concentration_pass(&base, half, epoch)?;
            let mut candidate = base.clone();
            candidate.apply_concentrations(&first, self.negative_policy)?;
            let second = self.concentration_pass(&candidate, half, epoch)?;
            candidate.apply_concentrations(&second, self.negative_policy)?;
            compute_us += compute_start.elapsed().as_micros() as u64;

            // EVALUATE_ERROR.
            let (local_error, worst_key) = full.max_abs_difference(&candidate);

            match self.error_manager.verdict(local_error) {
                StepVerdict::Accept => {
                    // APPLY: displacement and direct assignments join the
                    // accepted candidate, then one atomic commit.
                    let apply_start = Instant::now();
                    let positions = self.agent_pass(&base, h, epoch)?;
                    candidate.apply_positions(&positions);
                    let assignments = self.direct_pass(&candidate, h, epoch)?;
                    candidate.apply_assignments(&assignments)?;
                    candidate.commit_to(&mut self.graph);
                    let apply_us = apply_start.elapsed().as_micros() as u64;

                    // ADVANCE_TIME.
                    self.error_manager.accept(local_error);
                    self.elapsed += h;
                    self.epoch += 1;
                    self.started = true;
                    self.last_metrics = EpochMetrics {
                        total_us: epoch_start.elapsed().as_micros() as u64,
                        compute_us,
                        apply_us,
                        attempts,
                    };
                    debug!(
                        epoch,
                        accepted_step = h,
                        local_error,
                        retries = attempts - 1,
                        "epoch accepted"
                    );
                    return Ok(EpochResult {
                        epoch,
                        accepted_step: h,
                        elapsed_after: self.elapsed,
                        local_error,
                        retries: attempts - 1,
                    });
                }
                StepVerdict::Reject => {
                    // SHRINK_STEP, then retry from COMPUTE_FULL. The
                    // candidates are dropped; base and graph are untouched.
                    warn!(epoch, step = h, local_error, "step rejected");
                    if self.error_manager.reject().is_none() {
                        let offenders = worst_key
                            .and_then(|key| full_merged.get(&key))
                            .map(|merged| {
                                merged
                                    .contributors
                                    .iter()
                                    .map(|&id| self.module_name(id))
                                    .collect()
                            })
                            .unwrap_or_default();
                        error!(epoch, last_step = h, local_error, "numerical divergence");
                        return Err(EpochError::NumericalDivergence {
                            epoch,
                            last_step: h,
                            minimum_step: self.error_manager.config().minimum_step,
                            local_error,
                            offenders,
                        });
                    }
                }
            }
        }
    }

    // ── Compute passes ──────────────────────────────────────────────

    /// Fan out node-scoped, error-controlled modules and merge deltas.
    ///
    /// Compute calls run in parallel over nodes; the merge is sequential
    /// in node order, so the summed result is deterministic.
    fn concentration_pass(
        &self,
        base: &StateLayer,
        dt: f64,
        epoch: u64,
    ) -> Result<MergedDeltas, EpochError> {
        let view = StateView::new(&self.graph, base, &self.catalog, dt, self.elapsed, epoch, self.seed);
        let node_ids: Vec<NodeId> = self.graph.node_ids().collect();
        let per_node: Vec<Result<Vec<DeltaBuffer>, EpochError>> = node_ids
            .par_iter()
            .map(|&id| self.compute_node(id, &view))
            .collect();

        let mut merged = MergedDeltas::new();
        for buffers in per_node {
            for buffer in buffers? {
                merged.absorb(&buffer);
            }
        }
        Ok(merged)
    }

    fn compute_node(
        &self,
        id: NodeId,
        view: &StateView<'_>,
    ) -> Result<Vec<DeltaBuffer>, EpochError> {
        let node = match view.node(id) {
            Some(n) => n,
            None => return Ok(Vec::new()),
        };
        let mut buffers = Vec::new();
        for (index, module) in self.modules.iter().enumerate() {
            match module.kind() {
                ModuleKind::NodeLocal | ModuleKind::NeighbourDependent => {}
                ModuleKind::AgentDisplacement | ModuleKind::DirectAssignment => continue,
            }
            if !module.applies_to(node) {
                continue;
            }
            let mut out = DeltaBuffer::new(ModuleId(index as u32));
            module
                .compute(id, view, &mut out)
                .map_err(|reason| EpochError::ModuleFailed {
                    name: module.name().to_string(),
                    reason,
                })?;
            if !out.is_empty() {
                buffers.push(out);
            }
        }
        Ok(buffers)
    }

    /// Collect position deltas from displacement modules, once per
    /// attempted step, from the pre-epoch state.
    fn agent_pass(
        &self,
        base: &StateLayer,
        dt: f64,
        epoch: u64,
    ) -> Result<Vec<PositionDelta>, EpochError> {
        let view = StateView::new(&self.graph, base, &self.catalog, dt, self.elapsed, epoch, self.seed);
        let mut deltas = Vec::new();
        for (index, module) in self.modules.iter().enumerate() {
            if module.kind() != ModuleKind::AgentDisplacement {
                continue;
            }
            for agent in self.graph.agent_ids() {
                let mut out = DeltaBuffer::new(ModuleId(index as u32));
                module
                    .compute_agent(agent, &view, &mut out)
                    .map_err(|reason| EpochError::ModuleFailed {
                        name: module.name().to_string(),
                        reason,
                    })?;
                deltas.extend_from_slice(out.positions());
            }
        }
        Ok(deltas)
    }

    /// Collect direct assignments against the accepted candidate state.
    fn direct_pass(
        &self,
        accepted: &StateLayer,
        dt: f64,
        epoch: u64,
    ) -> Result<Vec<Assignment>, EpochError> {
        let view = StateView::new(
            &self.graph,
            accepted,
            &self.catalog,
            dt,
            self.elapsed,
            epoch,
            self.seed,
        );
        let mut assignments = Vec::new();
        for (index, module) in self.modules.iter().enumerate() {
            if module.kind() != ModuleKind::DirectAssignment {
                continue;
            }
            for id in self.graph.node_ids() {
                let node = match self.graph.node(id) {
                    Some(n) => n,
                    None => continue,
                };
                if !module.applies_to(node) {
                    continue;
                }
                let mut out = DeltaBuffer::new(ModuleId(index as u32));
                module
                    .compute(id, &view, &mut out)
                    .map_err(|reason| EpochError::ModuleFailed {
                        name: module.name().to_string(),
                        reason,
                    })?;
                assignments.extend_from_slice(out.assignments());
            }
        }
        Ok(assignments)
    }

    fn module_name(&self, id: ModuleId) -> String {
        self.modules
            .get(id.0 as usize)
            .map(|m| m.name().to_string())
            .unwrap_or_else(|| format!("module {id}"))
    }

    // ── Setup-time mutation ─────────────────────────────────────────

    /// Register an additional module, re-validating the module list.
    ///
    /// Not valid after the first epoch.
    pub fn add_module(&mut self, module: Box<dyn UpdateModule>) -> Result<(), ConfigError> {
        if self.started {
            return Err(ConfigError::SimulationStarted);
        }
        self.modules.push(module);
        if let Err(e) = validate_modules(&self.modules, &self.catalog) {
            self.modules.pop();
            return Err(e.into());
        }
        Ok(())
    }

    /// Mutable graph access for setup. Not valid after the first epoch.
    pub fn graph_mut(&mut self) -> Result<&mut AutomatonGraph, ConfigError> {
        if self.started {
            return Err(ConfigError::SimulationStarted);
        }
        Ok(&mut self.graph)
    }

    /// Mutable catalog access for setup (feature attachment). Not valid
    /// after the first epoch.
    pub fn catalog_mut(&mut self) -> Result<&mut EntityCatalog, ConfigError> {
        if self.started {
            return Err(ConfigError::SimulationStarted);
        }
        Ok(&mut self.catalog)
    }

    // ── Read-only consumer surface ──────────────────────────────────

    /// The live concentration at a key; `0.0` for anything absent.
    pub fn concentration(
        &self,
        node: NodeId,
        subsection: SubsectionId,
        entity: EntityId,
    ) -> f64 {
        self.graph
            .node(node)
            .map(|n| n.concentrations().get(subsection, entity))
            .unwrap_or(0.0)
    }

    /// The live pose of a mobile agent.
    pub fn agent(&self, agent: AgentId) -> Option<&MobileAgent> {
        self.graph.agent(agent)
    }

    /// Total simulated time across accepted epochs.
    pub fn elapsed_time(&self) -> f64 {
        self.elapsed
    }

    /// Cumulative sum of accepted epochs' local error estimates.
    /// Diagnostic only.
    pub fn global_numerical_error(&self) -> f64 {
        self.error_manager.global_error()
    }

    /// The step size the next epoch will attempt first.
    pub fn current_step(&self) -> f64 {
        self.error_manager.current_step()
    }

    /// Number of accepted epochs.
    pub fn epoch_count(&self) -> u64 {
        self.epoch
    }

    /// The graph, read-only.
    pub fn graph(&self) -> &AutomatonGraph {
        &self.graph
    }

    /// The entity catalog, read-only.
    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    /// Metrics from the most recent accepted epoch.
    pub fn last_metrics(&self) -> &EpochMetrics {
        &self.last_metrics
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("epoch", &self.epoch)
            .field("elapsed", &self.elapsed)
            .field("current_step", &self.error_manager.current_step())
            .field("global_error", &self.error_manager.global_error())
            .field("modules", &self.modules.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stepping::SteppingConfig;
    use osmos_core::EntityKind;
    use osmos_test_utils::{
        single_node_graph, ConstantRateModule, EmptyModule, FailingModule, CYTOPLASM,
    };

    fn simulation_with(
        modules: Vec<Box<dyn UpdateModule>>,
        catalog: EntityCatalog,
        graph: AutomatonGraph,
        stepping: SteppingConfig,
        policy: NegativePolicy,
    ) -> Simulation {
        Simulation::new(SimulationConfig {
            graph,
            catalog,
            modules,
            stepping,
            negative_policy: policy,
            seed: 42,
        })
        .unwrap()
    }

    #[test]
    fn empty_modules_advance_time_without_touching_state() {
        let mut catalog = EntityCatalog::new();
        let a = catalog.register("A", EntityKind::SmallMolecule).unwrap();
        let (graph, node, _) = single_node_graph(&[(a, 1.0)]);
        let stepping = SteppingConfig {
            initial_step: 0.25,
            ..SteppingConfig::default()
        };
        let mut sim = simulation_with(
            vec![Box::new(EmptyModule::new("noop"))],
            catalog,
            graph,
            stepping,
            NegativePolicy::Clamp,
        );

        let result = sim.next_epoch().unwrap();
        assert_eq!(result.accepted_step, 0.25);
        assert_eq!(result.local_error, 0.0);
        assert_eq!(result.retries, 0);
        assert_eq!(sim.elapsed_time(), 0.25);
        assert_eq!(sim.concentration(node, CYTOPLASM, a), 1.0);
    }

    #[test]
    fn constant_rate_integrates_exactly() {
        let mut catalog = EntityCatalog::new();
        let x = catalog.register("X", EntityKind::SmallMolecule).unwrap();
        let (graph, node, _) = single_node_graph(&[]);
        let stepping = SteppingConfig {
            initial_step: 0.5,
            ..SteppingConfig::default()
        };
        let mut sim = simulation_with(
            vec![Box::new(ConstantRateModule::new("source", x, 2.0))],
            catalog,
            graph,
            stepping,
            NegativePolicy::Clamp,
        );

        // A constant rate has zero step-doubling error: full and half
        // candidates agree exactly, so the first attempt is accepted.
        let result = sim.next_epoch().unwrap();
        assert_eq!(result.local_error, 0.0);
        assert!((sim.concentration(node, CYTOPLASM, x) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn failing_module_leaves_state_unchanged() {
        let mut catalog = EntityCatalog::new();
        let a = catalog.register("A", EntityKind::SmallMolecule).unwrap();
        let (graph, node, _) = single_node_graph(&[(a, 1.0)]);
        let mut sim = simulation_with(
            vec![Box::new(FailingModule::new("bomb", 0))],
            catalog,
            graph,
            SteppingConfig::default(),
            NegativePolicy::Clamp,
        );

        match sim.next_epoch() {
            Err(EpochError::ModuleFailed { name, .. }) => assert_eq!(name, "bomb"),
            other => panic!("expected ModuleFailed, got {other:?}"),
        }
        assert_eq!(sim.elapsed_time(), 0.0);
        assert_eq!(sim.concentration(node, CYTOPLASM, a), 1.0);
    }

    #[test]
    fn setup_mutation_sealed_after_first_epoch() {
        let mut catalog = EntityCatalog::new();
        catalog.register("A", EntityKind::SmallMolecule).unwrap();
        let (graph, _, _) = single_node_graph(&[]);
        let mut sim = simulation_with(
            vec![Box::new(EmptyModule::new("noop"))],
            catalog,
            graph,
            SteppingConfig::default(),
            NegativePolicy::Clamp,
        );

        // Before the first epoch both succeed.
        assert!(sim.graph_mut().is_ok());
        assert!(sim.add_module(Box::new(EmptyModule::new("late"))).is_ok());

        sim.next_epoch().unwrap();

        assert!(matches!(
            sim.add_module(Box::new(EmptyModule::new("too_late"))),
            Err(ConfigError::SimulationStarted)
        ));
        assert!(matches!(sim.graph_mut(), Err(ConfigError::SimulationStarted)));
        assert!(matches!(sim.catalog_mut(), Err(ConfigError::SimulationStarted)));
    }

    /// Emits a fixed-magnitude delta regardless of dt, so the half-step
    /// chain doubles it and the error estimate never shrinks.
    struct ConstantKick {
        entity: EntityId,
    }

    impl UpdateModule for ConstantKick {
        fn name(&self) -> &str {
            "constant_kick"
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
            _view: &StateView<'_>,
            out: &mut DeltaBuffer,
        ) -> Result<(), ModuleError> {
            out.add_concentration(node, CYTOPLASM, self.entity, 1.0);
            Ok(())
        }
    }

    #[test]
    fn divergence_reports_context_and_halts() {
        let mut catalog = EntityCatalog::new();
        let a = catalog.register("A", EntityKind::SmallMolecule).unwrap();
        let (graph, node, _) = single_node_graph(&[(a, 1.0)]);
        let stepping = SteppingConfig {
            local_tolerance: 0.01,
            initial_step: 0.1,
            minimum_step: 0.01,
            ..SteppingConfig::default()
        };
        let mut sim = simulation_with(
            vec![Box::new(ConstantKick { entity: a })],
            catalog,
            graph,
            stepping,
            NegativePolicy::Clamp,
        );

        match sim.next_epoch() {
            Err(EpochError::NumericalDivergence {
                epoch,
                local_error,
                offenders,
                ..
            }) => {
                assert_eq!(epoch, 0);
                assert!((local_error - 1.0).abs() < 1e-12);
                assert_eq!(offenders, vec!["constant_kick".to_string()]);
            }
            other => panic!("expected NumericalDivergence, got {other:?}"),
        }
        // State untouched, and the run stays halted.
        assert_eq!(sim.concentration(node, CYTOPLASM, a), 1.0);
        assert_eq!(sim.elapsed_time(), 0.0);
        assert!(matches!(sim.next_epoch(), Err(EpochError::Halted)));
    }
}
