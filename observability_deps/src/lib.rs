//! Observability ecosystem dependencies, to ensure consistent versions and
//! unified updates across the workspace.

pub use tracing;
