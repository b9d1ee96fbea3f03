//! Hardware detection
//!
//! Builds a [`SystemSpecs`] snapshot of RAM, CPU and GPUs. RAM and CPU come
//! from OS accounting; GPUs are enumerated by a platform-specific list of
//! [`GpuProbe`]s, each of which degrades to "nothing found" on failure.

mod command;
mod gpu;
mod probes;
mod resources;
mod specs;
mod wsl;

pub use command::{run_command, PROBE_TIMEOUT};
pub use gpu::*;
pub use probes::*;
pub use resources::*;
pub use specs::*;
pub use wsl::is_running_in_wsl;
