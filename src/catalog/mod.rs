//! Quantization capability catalog
//!
//! Static lookup from a quantization identifier (e.g. `Q4_K_M`) to the
//! figures the fit engine needs: bytes per parameter, relative speed and
//! quality penalty.

mod quant;

pub use quant::*;
