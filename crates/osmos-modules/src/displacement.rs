//! Stochastic displacement module for mobile agents.
//!
//! Draws a 2D step from a standard Gaussian scaled by `√(2·D·dt)` and
//! confines the result to a configured region. Respects the determinism
//! contract: the RNG is a seeded ChaCha8 derived from
//! `seed_offset XOR simulation seed XOR epoch XOR agent id`, so a fixed
//! configuration replays identical trajectories, and retries of the
//! same epoch at a smaller step re-scale the same draw direction
//! instead of resampling fresh noise per attempt.

use osmos_core::{AgentId, ModuleError};
use osmos_graph::{AgentState, RegionBounds};
use osmos_module::{DeltaBuffer, ModuleKind, StateView, UpdateModule};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Brownian displacement of point-like agents.
///
/// Acts only on agents whose discrete state matches the configured
/// confining state and whose position lies inside the configured
/// bounds; proposed positions are clamped back onto the bounds.
#[derive(Debug)]
pub struct DisplacementModule {
    name: String,
    diffusivity: f64,
    confining_state: AgentState,
    bounds: RegionBounds,
    seed_offset: u64,
}

impl DisplacementModule {
    /// Create a displacement module.
    ///
    /// `diffusivity` is the agent diffusion coefficient in µm²/s;
    /// `confining_state` selects which agents move; `bounds` confines
    /// the motion; `seed_offset` decorrelates multiple displacement
    /// modules sharing one simulation seed.
    pub fn new(
        name: impl Into<String>,
        diffusivity: f64,
        confining_state: AgentState,
        bounds: RegionBounds,
        seed_offset: u64,
    ) -> Self {
        Self {
            name: name.into(),
            diffusivity,
            confining_state,
            bounds,
            seed_offset,
        }
    }

    /// Generate a Gaussian sample using the Box-Muller transform.
    /// Avoids the `rand_distr` dependency.
    fn box_muller(rng: &mut ChaCha8Rng) -> f64 {
        let u1: f64 = rng.gen::<f64>().max(1e-300); // avoid ln(0)
        let u2: f64 = rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

impl UpdateModule for DisplacementModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::AgentDisplacement
    }

    fn compute_agent(
        &self,
        agent: AgentId,
        view: &StateView<'_>,
        out: &mut DeltaBuffer,
    ) -> Result<(), ModuleError> {
        let pose = match view.agent(agent) {
            Some(p) => p,
            None => return Ok(()),
        };
        if pose.state() != self.confining_state || !self.bounds.contains(pose.position()) {
            return Ok(());
        }

        let seed = self.seed_offset ^ view.seed() ^ view.epoch() ^ ((agent.0 as u64) << 32);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let scale = (2.0 * self.diffusivity * view.dt()).sqrt();
        let step = [
            scale * Self::box_muller(&mut rng),
            scale * Self::box_muller(&mut rng),
        ];
        if !step[0].is_finite() || !step[1].is_finite() {
            return Err(ModuleError::ExecutionFailed {
                reason: format!("non-finite displacement for agent {agent}"),
            });
        }

        let [x, y] = pose.position();
        let target = self.bounds.clamp([x + step[0], y + step[1]]);
        out.add_position(agent, [target[0] - x, target[1] - y]);
        Ok(())
    }
}
