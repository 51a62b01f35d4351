//! Engine module
//!
//! Event loop, control handle and status reporting

mod handle;
mod orchestrator;
mod status;

pub use handle::EngineHandle;
pub use orchestrator::Orchestrator;
pub use status::{EngineStatus, FinalSnapshot};
