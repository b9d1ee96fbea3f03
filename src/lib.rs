//! # llmpole - right-size LLMs to the local machine
//!
//! llmpole takes a snapshot of this machine's RAM, CPU and GPUs, then
//! analyzes a catalog of open-weight models against it. For every model it
//! decides where the weights would live (GPU, CPU+GPU offload, MoE expert
//! offload or CPU only), picks the best quantization that fits, estimates
//! generation speed and combines quality, speed, fit and context into a
//! single score used for ranking.
//!
//! ## Quick Start
//!
//! ```no_run
//! use llmpole::fit::{analyze_all, rank_models_by_fit};
//! use llmpole::models::ModelDatabase;
//! use llmpole::system::SystemSpecs;
//!
//! let specs = SystemSpecs::detect().unwrap();
//! let db = ModelDatabase::bundled().unwrap();
//! let ranked = rank_models_by_fit(analyze_all(db.all_models(), &specs));
//!
//! for fit in ranked.iter().take(5) {
//!     println!("{} {} ({:.0})", fit.fit_level.emoji(), fit.model.name, fit.score);
//! }
//! ```
//!
//! ## Custom hardware
//!
//! Snapshots can be assembled by hand, which is how "what if" questions
//! about other machines are answered:
//!
//! ```no_run
//! use llmpole::system::{CpuInfo, GpuBackend, GpuInfo, MemoryInfo, SystemSpecs};
//!
//! let specs = SystemSpecs::from_parts(
//!     MemoryInfo { total_gb: 64.0, available_gb: 48.0 },
//!     CpuInfo { cores: 16, name: "AMD Ryzen 9 7950X".into(), arch: "x86_64".into() },
//!     vec![GpuInfo::new("NVIDIA GeForce RTX 4090", Some(24.0), GpuBackend::Cuda)],
//!     false,
//! );
//! assert!(specs.has_gpu);
//! ```

#![warn(clippy::all)]

pub mod catalog;
pub mod config;
pub mod display;
pub mod error;
pub mod fit;
pub mod models;
pub mod system;

// Re-export commonly used types
pub use config::{CliArgs, PoleConfig};
pub use error::{PoleError, Result};
pub use fit::{FitLevel, ModelFit, RunMode};
pub use models::{LlmModel, ModelDatabase};
pub use system::SystemSpecs;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use llmpole::prelude::*;
    //! ```

    pub use crate::error::{PoleError, Result};
    pub use crate::fit::{
        analyze_all, filter_by_use_case, filter_min_fit, filter_perfect_only, rank_models_by_fit, FitLevel,
        ModelFit, RunMode,
    };
    pub use crate::models::{LlmModel, ModelDatabase, UseCase};
    pub use crate::system::{GpuBackend, GpuInfo, SystemSpecs};
}
