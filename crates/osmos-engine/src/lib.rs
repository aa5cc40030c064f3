//! Adaptive-stepping simulation engine.
//!
//! Orchestrates one epoch at a time: fan out module compute calls over
//! a frozen state layer, estimate the local numerical error by step
//! doubling, accept or reject the candidate step, and apply accepted
//! deltas atomically back into the live graph.
//!
//! # Scheduling model
//!
//! Synchronous and epoch-at-a-time: [`Simulation::next_epoch`] blocks
//! until the epoch's outcome is resolved. Within one attempted step,
//! compute calls for disjoint nodes run in parallel against the shared
//! immutable view; the apply phase is single-threaded and is the only
//! point at which live state is mutated.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod metrics;
pub mod simulation;
pub mod stepping;

pub use config::{ConfigError, SimulationConfig};
pub use metrics::EpochMetrics;
pub use simulation::{EpochError, EpochResult, Simulation};
pub use stepping::{ErrorManager, SteppingConfig, StepVerdict};
