//! Step-size governance: tolerance comparison, growth, shrink, divergence.
//!
//! Step-doubling gives a local error estimate without a second,
//! structurally different integrator: the same modules are evaluated
//! once at `h` and twice at `h/2`, and the candidate states are
//! compared. The [`ErrorManager`] owns the resulting accept/reject
//! policy and the step-size trajectory.

use std::error::Error;
use std::fmt;

/// Outcome of comparing a local error estimate against the tolerance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepVerdict {
    /// Error within tolerance; commit the half-step candidate.
    Accept,
    /// Error above tolerance; discard candidates and shrink the step.
    Reject,
}

/// Configuration for the adaptive step-doubling controller.
///
/// Constants follow conventional embedded step-doubling practice:
/// shrink ×0.5 on rejection, grow ×2 capped by the maximum step, with
/// growth gated behind a safety margin of 0.9 on the tolerance.
#[derive(Clone, Copy, Debug)]
pub struct SteppingConfig {
    /// Local numerical tolerance ε for one epoch's error estimate.
    pub local_tolerance: f64,
    /// Step size of the first attempted epoch.
    pub initial_step: f64,
    /// Fatal-divergence floor: rejecting below this step aborts the run.
    pub minimum_step: f64,
    /// Upper bound on step growth.
    pub maximum_step: f64,
    /// Multiplier applied on growth. Default: 2.0.
    pub growth_factor: f64,
    /// Multiplier applied on rejection. Default: 0.5.
    pub shrink_factor: f64,
    /// Growth is allowed only when `error < safety_factor · tolerance`.
    /// Default: 0.9.
    pub safety_factor: f64,
}

impl Default for SteppingConfig {
    fn default() -> Self {
        Self {
            local_tolerance: 0.01,
            initial_step: 0.01,
            minimum_step: 1e-9,
            maximum_step: 1.0,
            growth_factor: 2.0,
            shrink_factor: 0.5,
            safety_factor: 0.9,
        }
    }
}

/// A violated stepping-config invariant, by description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SteppingConfigError {
    /// Which invariant was violated.
    pub reason: String,
}

impl fmt::Display for SteppingConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid stepping config: {}", self.reason)
    }
}

impl Error for SteppingConfigError {}

impl SteppingConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), SteppingConfigError> {
        let positive = [
            ("local_tolerance", self.local_tolerance),
            ("initial_step", self.initial_step),
            ("minimum_step", self.minimum_step),
            ("maximum_step", self.maximum_step),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SteppingConfigError {
                    reason: format!("{name} must be finite and positive, got {value}"),
                });
            }
        }
        if self.minimum_step > self.initial_step {
            return Err(SteppingConfigError {
                reason: format!(
                    "minimum_step ({}) exceeds initial_step ({})",
                    self.minimum_step, self.initial_step,
                ),
            });
        }
        if self.initial_step > self.maximum_step {
            return Err(SteppingConfigError {
                reason: format!(
                    "initial_step ({}) exceeds maximum_step ({})",
                    self.initial_step, self.maximum_step,
                ),
            });
        }
        if !self.growth_factor.is_finite() || self.growth_factor <= 1.0 {
            return Err(SteppingConfigError {
                reason: format!(
                    "growth_factor must be finite and > 1.0, got {}",
                    self.growth_factor,
                ),
            });
        }
        if !self.shrink_factor.is_finite()
            || self.shrink_factor <= 0.0
            || self.shrink_factor >= 1.0
        {
            return Err(SteppingConfigError {
                reason: format!(
                    "shrink_factor must be in (0.0, 1.0), got {}",
                    self.shrink_factor,
                ),
            });
        }
        if !self.safety_factor.is_finite()
            || self.safety_factor <= 0.0
            || self.safety_factor > 1.0
        {
            return Err(SteppingConfigError {
                reason: format!(
                    "safety_factor must be in (0.0, 1.0], got {}",
                    self.safety_factor,
                ),
            });
        }
        Ok(())
    }
}

/// Governs step acceptance and the step-size trajectory across epochs.
///
/// Holds the candidate step for the next attempt, the cumulative global
/// numerical error (diagnostic only — it never affects correctness),
/// and the divergence latch.
#[derive(Clone, Debug)]
pub struct ErrorManager {
    config: SteppingConfig,
    step: f64,
    global_error: f64,
    diverged: bool,
}

impl ErrorManager {
    /// Create a manager starting at the configured initial step.
    pub fn new(config: SteppingConfig) -> Self {
        let step = config.initial_step;
        Self {
            config,
            step,
            global_error: 0.0,
            diverged: false,
        }
    }

    /// The step size the next attempt will use.
    pub fn current_step(&self) -> f64 {
        self.step
    }

    /// The configured tolerance and factors.
    pub fn config(&self) -> &SteppingConfig {
        &self.config
    }

    /// Cumulative sum of accepted epochs' local error estimates.
    pub fn global_error(&self) -> f64 {
        self.global_error
    }

    /// Whether a rejection cascade has driven the step below the floor.
    pub fn is_diverged(&self) -> bool {
        self.diverged
    }

    /// Compare a local error estimate against the tolerance.
    pub fn verdict(&self, local_error: f64) -> StepVerdict {
        if local_error <= self.config.local_tolerance {
            StepVerdict::Accept
        } else {
            StepVerdict::Reject
        }
    }

    /// Record an accepted epoch.
    ///
    /// Accumulates the global error and grows the step — only when the
    /// error sits comfortably below tolerance — up to the maximum.
    pub fn accept(&mut self, local_error: f64) {
        self.global_error += local_error;
        if local_error < self.config.safety_factor * self.config.local_tolerance {
            self.step = (self.step * self.config.growth_factor).min(self.config.maximum_step);
        }
    }

    /// Record a rejected attempt, shrinking the step.
    ///
    /// Returns the new step for the retry, or `None` once the step has
    /// fallen below the configured minimum — the divergence latch is
    /// then set and stays set.
    pub fn reject(&mut self) -> Option<f64> {
        self.step *= self.config.shrink_factor;
        if self.step < self.config.minimum_step {
            self.diverged = true;
            None
        } else {
            Some(self.step)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(initial: f64, tolerance: f64) -> ErrorManager {
        ErrorManager::new(SteppingConfig {
            local_tolerance: tolerance,
            initial_step: initial,
            minimum_step: 1e-6,
            maximum_step: 4.0,
            ..SteppingConfig::default()
        })
    }

    #[test]
    fn accept_below_safety_margin_grows() {
        let mut em = manager(1.0, 0.01);
        em.accept(0.001);
        assert_eq!(em.current_step(), 2.0);
        em.accept(0.001);
        em.accept(0.001);
        // Growth is capped by maximum_step.
        assert_eq!(em.current_step(), 4.0);
    }

    #[test]
    fn accept_near_tolerance_holds_step() {
        let mut em = manager(1.0, 0.01);
        // 0.0095 > 0.9 * 0.01: inside tolerance but outside the margin.
        em.accept(0.0095);
        assert_eq!(em.current_step(), 1.0);
    }

    #[test]
    fn reject_shrinks_by_the_configured_factor() {
        let mut em = manager(1.0, 0.01);
        assert_eq!(em.reject(), Some(0.5));
        assert_eq!(em.reject(), Some(0.25));
        assert_eq!(em.current_step(), 0.25);
    }

    #[test]
    fn repeated_rejection_latches_divergence() {
        let mut em = manager(1e-5, 0.01);
        assert_eq!(em.reject(), Some(5e-6));
        assert_eq!(em.reject(), Some(2.5e-6));
        assert_eq!(em.reject(), Some(1.25e-6));
        assert_eq!(em.reject(), None);
        assert!(em.is_diverged());
    }

    #[test]
    fn global_error_accumulates_monotonically() {
        let mut em = manager(1.0, 0.01);
        assert_eq!(em.global_error(), 0.0);
        em.accept(0.004);
        em.accept(0.002);
        assert!((em.global_error() - 0.006).abs() < 1e-15);
    }

    #[test]
    fn verdict_boundary_is_inclusive() {
        let em = manager(1.0, 0.01);
        assert_eq!(em.verdict(0.01), StepVerdict::Accept);
        assert_eq!(em.verdict(0.010000001), StepVerdict::Reject);
    }

    #[test]
    fn default_config_validates() {
        assert!(SteppingConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_step_bounds_rejected() {
        let config = SteppingConfig {
            minimum_step: 1.0,
            initial_step: 0.1,
            ..SteppingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn shrink_factor_of_one_rejected() {
        let config = SteppingConfig {
            shrink_factor: 1.0,
            ..SteppingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn nan_tolerance_rejected() {
        let config = SteppingConfig {
            local_tolerance: f64::NAN,
            ..SteppingConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
