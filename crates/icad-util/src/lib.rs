//! Logging setup and time/partition-path helpers shared across the workspace.

mod logging;
mod timeutil;

pub use logging::*;
pub use timeutil::*;
