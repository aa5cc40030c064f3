//! Shared test fixtures for the Osmos workspace.
//!
//! Not intended for use outside the workspace's own test suites.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod fixtures;

pub use fixtures::{
    aqueous_region, single_node_graph, two_node_graph, ConstantRateModule, EmptyModule,
    FailingModule, CYTOPLASM,
};
