mod builder;
mod core;
mod probes;

pub use builder::OrchestratorBuilder;
pub use core::*;
pub use probes::{NetworkProbes, ProbeFactory};
