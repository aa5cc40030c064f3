//! Built-in update modules for the Osmos simulation framework.
//!
//! Four reference modules covering the behavioral variants:
//!
//! - [`ReactionModule`] — stoichiometric kinetics (node-local).
//! - [`DiffusionModule`] — graph-Laplacian flux (neighbour-dependent).
//! - [`DisplacementModule`] — stochastic agent motion (agent displacement).
//! - [`AssignmentModule`] — derived concentrations (direct assignment).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod assignment;
pub mod diffusion;
pub mod displacement;
pub mod reaction;

pub use assignment::{AssignmentExpr, AssignmentModule};
pub use diffusion::DiffusionModule;
pub use displacement::DisplacementModule;
pub use reaction::{RateLaw, Reactant, ReactantRole, ReactionModule, ReactionModuleBuilder};
