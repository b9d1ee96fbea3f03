//! Fit engine: run mode, fit level, best quantization, speed, and score
//! for each model on the detected hardware, plus ranking and filters.

mod analysis;
mod ranking;
mod scoring;

pub use analysis::*;
pub use ranking::*;
pub use scoring::*;
