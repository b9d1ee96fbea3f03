//! Quantization schemes and their capability figures

use serde::Serialize;

/// Capability figures for one quantization scheme
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuantSpec {
    /// Identifier as it appears in model records (`Q4_K_M`, `F16`, ...)
    pub id: &'static str,
    /// Bytes of weight storage per parameter
    pub bytes_per_param: f64,
    /// Inference speed relative to a 5-bit baseline
    pub speed_multiplier: f64,
    /// Points added to the quality score (zero or negative)
    pub quality_penalty: f64,
}

const fn spec(id: &'static str, bytes_per_param: f64, speed_multiplier: f64, quality_penalty: f64) -> QuantSpec {
    QuantSpec {
        id,
        bytes_per_param,
        speed_multiplier,
        quality_penalty,
    }
}

/// Every known scheme
pub const QUANT_TABLE: &[QuantSpec] = &[
    // only the storage size is defined; speed and penalty are the unknown-label figures
    spec("F32", 4.0, DEFAULT_QUANT.speed_multiplier, DEFAULT_QUANT.quality_penalty),
    spec("F16", 2.0, 0.6, 0.0),
    spec("BF16", 2.0, 0.6, 0.0),
    spec("Q8_0", 1.05, 0.8, 0.0),
    spec("Q6_K", 0.80, 0.95, -1.0),
    spec("Q5_K_M", 0.68, 1.0, -2.0),
    spec("Q4_K_M", 0.58, 1.15, -5.0),
    spec("Q4_0", 0.58, 1.15, -5.0),
    spec("Q3_K_M", 0.48, 1.25, -8.0),
    spec("Q2_K", 0.37, 1.35, -12.0),
];

/// Figures used for any identifier not in [`QUANT_TABLE`] (a Q4-class guess)
pub const DEFAULT_QUANT: QuantSpec = spec("unknown", 0.58, 1.15, -5.0);

/// Quantizations tried by budget search, best fidelity first
pub const QUANT_HIERARCHY: &[&str] = &["Q8_0", "Q6_K", "Q5_K_M", "Q4_K_M", "Q3_K_M", "Q2_K"];

/// Look up a scheme by exact identifier, falling back to [`DEFAULT_QUANT`]
pub fn lookup(quant: &str) -> QuantSpec {
    QUANT_TABLE
        .iter()
        .find(|q| q.id == quant)
        .copied()
        .unwrap_or(DEFAULT_QUANT)
}

/// Whether the identifier is in the catalog
pub fn is_known(quant: &str) -> bool {
    QUANT_TABLE.iter().any(|q| q.id == quant)
}

/// Bytes per parameter for a quantization
pub fn quant_bpp(quant: &str) -> f64 {
    lookup(quant).bytes_per_param
}

/// Speed multiplier for a quantization (lower precision runs faster)
pub fn quant_speed_multiplier(quant: &str) -> f64 {
    lookup(quant).speed_multiplier
}

/// Quality penalty for a quantization (lower precision scores lower)
pub fn quant_quality_penalty(quant: &str) -> f64 {
    lookup(quant).quality_penalty
}

/// Budget-search order, best fidelity to most compressed
pub fn quant_hierarchy() -> &'static [&'static str] {
    QUANT_HIERARCHY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_triples() {
        let expected = [
            ("F32", 4.0, 1.15, -5.0),
            ("F16", 2.0, 0.6, 0.0),
            ("BF16", 2.0, 0.6, 0.0),
            ("Q8_0", 1.05, 0.8, 0.0),
            ("Q6_K", 0.80, 0.95, -1.0),
            ("Q5_K_M", 0.68, 1.0, -2.0),
            ("Q4_K_M", 0.58, 1.15, -5.0),
            ("Q4_0", 0.58, 1.15, -5.0),
            ("Q3_K_M", 0.48, 1.25, -8.0),
            ("Q2_K", 0.37, 1.35, -12.0),
        ];
        for (id, bpp, speed, penalty) in expected {
            assert_eq!(quant_bpp(id), bpp, "bpp for {}", id);
            assert_eq!(quant_speed_multiplier(id), speed, "speed for {}", id);
            assert_eq!(quant_quality_penalty(id), penalty, "penalty for {}", id);
        }
    }

    #[test]
    fn test_unknown_uses_default() {
        for id in ["unknown", "", "q4_k_m", "GPTQ"] {
            let q = lookup(id);
            assert_eq!(q.bytes_per_param, 0.58);
            assert_eq!(q.speed_multiplier, 1.15);
            assert_eq!(q.quality_penalty, -5.0);
            assert!(!is_known(id));
        }
    }

    #[test]
    fn test_f32_scores_like_unknown_label() {
        assert!(is_known("F32"));
        assert_eq!(quant_bpp("F32"), 4.0);
        assert_eq!(quant_speed_multiplier("F32"), DEFAULT_QUANT.speed_multiplier);
        assert_eq!(quant_quality_penalty("F32"), DEFAULT_QUANT.quality_penalty);
    }

    #[test]
    fn test_hierarchy_is_ordered_by_size() {
        let sizes: Vec<f64> = quant_hierarchy().iter().map(|q| quant_bpp(q)).collect();
        assert!(sizes.windows(2).all(|w| w[0] > w[1]));
        assert!(quant_hierarchy().iter().all(|q| is_known(q)));
    }
}
