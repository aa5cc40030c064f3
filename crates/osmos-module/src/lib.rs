//! Update module trait, delta protocol, and state views.
//!
//! Modules are modular, stateless operators invoked each epoch. They
//! read a frozen pre-epoch state layer and write proposed changes into
//! private delta buffers; the engine merges and applies buffers in a
//! single-threaded apply phase. Nothing a module can reach is mutable.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod delta;
pub mod module;
pub mod state;
pub mod validate;
pub mod view;

pub use delta::{
    Assignment, ConcentrationDelta, DeltaBuffer, DeltaKey, MergedDelta, MergedDeltas,
    PositionDelta,
};
pub use module::{ModuleKind, UpdateModule};
pub use state::{ApplyError, NegativePolicy, StateLayer};
pub use validate::{validate_modules, ValidationError};
pub use view::StateView;
