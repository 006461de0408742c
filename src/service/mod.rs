//! The fixed service roles and how they are turned into containers.
//!
//! - [`ServiceRole`] / [`RunTarget`]: which services exist and what `--run` asked for
//! - [`InstanceRegistry`]: running instances, collision-free names
//! - [`LaunchSpec`]: an immutable description of one `docker run`
//! - [`ServiceLauncher`]: role + identity → `LaunchSpec` → runtime

mod launcher;
mod registry;
mod role;
mod spec;

pub use launcher::*;
pub use registry::*;
pub use role::*;
pub use spec::*;
