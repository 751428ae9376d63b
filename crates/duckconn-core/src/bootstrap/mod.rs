//! Schema bootstrap: materialize a remote source into a table once per target

pub mod controller;
pub mod registry;

pub use controller::{BootstrapController, BootstrapPolicy, DEFAULT_EXISTS_SQL};
pub use registry::{BootstrapOutcome, BootstrapRecord, BootstrapRegistry, BootstrapState};
