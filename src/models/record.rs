//! Model records and their derived quantities

use crate::catalog::{quant_bpp, quant_hierarchy};
use serde::{Deserialize, Serialize};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Parameter count (billions) assumed when a record gives nothing parseable
pub const DEFAULT_PARAMS_B: f64 = 7.0;

/// KV-cache GB per billion parameters per context token
const KV_CACHE_GB_PER_B_TOKEN: f64 = 0.000008;

/// Fixed runtime overhead (GB) for buffers and the compute context
const RUNTIME_OVERHEAD_GB: f64 = 0.5;

/// Approximate fraction of an MoE model's weights shared by every token
/// (attention, embeddings, router). Placeholder figure, not measured.
pub const MOE_SHARED_PARAM_FRACTION: f64 = 0.05;

/// One candidate model, as found in the bundled dataset or the user overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmModel {
    /// Repository-style name, e.g. `Qwen/Qwen2.5-7B-Instruct`
    pub name: String,
    /// Publisher
    #[serde(default)]
    pub provider: String,
    /// Human-readable size such as `7B` or `137M`
    #[serde(default)]
    pub parameter_count: String,
    /// Exact parameter count, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters_raw: Option<u64>,
    /// Minimum system RAM (GB) for CPU inference
    #[serde(default)]
    pub min_ram_gb: f64,
    /// Recommended memory (GB) for comfortable inference
    #[serde(default)]
    pub recommended_ram_gb: f64,
    /// Minimum VRAM (GB) for full GPU offload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_vram_gb: Option<f64>,
    /// Default quantization the record's memory figures assume
    #[serde(default)]
    pub quantization: String,
    /// Maximum context length in tokens
    #[serde(default)]
    pub context_length: u32,
    /// Free-text description of what the model is for
    #[serde(default)]
    pub use_case: String,
    /// Mixture-of-experts architecture
    #[serde(default)]
    pub is_moe: bool,
    /// Total experts per MoE layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_experts: Option<u32>,
    /// Experts routed per token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_experts: Option<u32>,
    /// Parameters touched per token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_parameters: Option<u64>,
}

impl LlmModel {
    /// Parameter count in billions.
    ///
    /// Prefers `parameters_raw`; otherwise parses a trailing `B` or `M`
    /// suffix from `parameter_count`; otherwise [`DEFAULT_PARAMS_B`].
    pub fn params_b(&self) -> f64 {
        if let Some(raw) = self.parameters_raw {
            return raw as f64 / 1e9;
        }
        parse_param_count(&self.parameter_count).unwrap_or(DEFAULT_PARAMS_B)
    }

    /// Estimated memory (GB) at a quantization and context length:
    /// weights + KV cache + fixed overhead.
    pub fn estimate_memory_gb(&self, quant: &str, ctx: u32) -> f64 {
        let params = self.params_b();
        let weights = params * quant_bpp(quant);
        let kv_cache = KV_CACHE_GB_PER_B_TOKEN * params * ctx as f64;
        weights + kv_cache + RUNTIME_OVERHEAD_GB
    }

    /// Best quantization whose estimate fits `budget_gb`, with its estimate.
    ///
    /// Tries the full context first, then half the context (when that is
    /// still at least 1024 tokens). When nothing fits, returns the record's
    /// default quantization so callers always get an answer.
    pub fn best_quant_for_budget(&self, budget_gb: f64, ctx: u32) -> (String, f64) {
        if let Some((q, mem)) = first_fitting(self, budget_gb, ctx) {
            return (q.to_string(), mem);
        }
        let half_ctx = ctx / 2;
        if half_ctx >= 1024 {
            if let Some((q, mem)) = first_fitting(self, budget_gb, half_ctx) {
                return (q.to_string(), mem);
            }
        }
        (
            self.quantization.clone(),
            self.estimate_memory_gb(&self.quantization, ctx),
        )
    }

    /// VRAM (GB) needed to keep only the active experts on the GPU.
    /// `None` for dense models or when the active-parameter count is unknown.
    pub fn moe_active_vram_gb(&self) -> Option<f64> {
        if !self.is_moe {
            return None;
        }
        let active = self.active_parameters? as f64;
        let size_gb = active * quant_bpp(&self.quantization) / GIB;
        Some((size_gb * 1.1).max(0.5))
    }

    /// RAM (GB) for the inactive experts offloaded from the GPU.
    /// `None` unless both the active and total parameter counts are known.
    pub fn moe_offloaded_ram_gb(&self) -> Option<f64> {
        if !self.is_moe {
            return None;
        }
        let active = self.active_parameters? as f64;
        let total = self.parameters_raw? as f64;
        let inactive = total - active;
        if inactive <= 0.0 {
            return Some(0.0);
        }
        Some(inactive * quant_bpp(&self.quantization) / GIB)
    }

    /// Approximate active parameters for an MoE record that declares its
    /// expert counts but no active-parameter figure. Returns the literal
    /// figure when one is present.
    pub fn estimated_active_parameters(&self) -> Option<u64> {
        if !self.is_moe {
            return None;
        }
        if self.active_parameters.is_some() {
            return self.active_parameters;
        }
        let total = self.parameters_raw? as f64;
        let experts = self.num_experts.filter(|&n| n > 0)? as f64;
        let active = self.active_experts? as f64;
        let shared = total * MOE_SHARED_PARAM_FRACTION;
        let routed = total * (1.0 - MOE_SHARED_PARAM_FRACTION) * (active / experts).min(1.0);
        Some((shared + routed).round() as u64)
    }

    /// Minimum VRAM for GPU inference, falling back to minimum RAM
    pub fn min_vram_or_ram(&self) -> f64 {
        self.min_vram_gb.unwrap_or(self.min_ram_gb)
    }
}

fn first_fitting(model: &LlmModel, budget_gb: f64, ctx: u32) -> Option<(&'static str, f64)> {
    quant_hierarchy().iter().find_map(|&q| {
        let mem = model.estimate_memory_gb(q, ctx);
        (mem <= budget_gb).then_some((q, mem))
    })
}

/// Parse "7B", "1.5b", "600M" into billions of parameters
pub fn parse_param_count(s: &str) -> Option<f64> {
    let s = s.trim().to_uppercase();
    if let Some(num) = s.strip_suffix('B') {
        num.trim().parse::<f64>().ok()
    } else if let Some(num) = s.strip_suffix('M') {
        num.trim().parse::<f64>().ok().map(|m| m / 1000.0)
    } else {
        None
    }
}

#[cfg(test)]
pub(crate) fn test_model(name: &str, params: &str) -> LlmModel {
    LlmModel {
        name: name.to_string(),
        provider: "Test".to_string(),
        parameter_count: params.to_string(),
        parameters_raw: None,
        min_ram_gb: 8.0,
        recommended_ram_gb: 12.0,
        min_vram_gb: Some(6.0),
        quantization: "Q4_K_M".to_string(),
        context_length: 4096,
        use_case: "general".to_string(),
        is_moe: false,
        num_experts: None,
        active_experts: None,
        active_parameters: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn moe(active: Option<u64>, total: Option<u64>) -> LlmModel {
        LlmModel {
            is_moe: true,
            parameters_raw: total,
            active_parameters: active,
            num_experts: Some(8),
            active_experts: Some(2),
            ..test_model("moe", "47B")
        }
    }

    #[test]
    fn test_params_b_from_string() {
        let cases = [
            ("7B", 7.0),
            ("70B", 70.0),
            ("1.5B", 1.5),
            ("1.5b", 1.5),
            ("600M", 0.6),
            ("137M", 0.137),
            ("", 7.0),
            ("?", 7.0),
            ("xB", 7.0),
        ];
        for (s, want) in cases {
            let got = test_model("m", s).params_b();
            assert!((got - want).abs() < 1e-9, "{:?} -> {} (want {})", s, got, want);
        }
    }

    #[test]
    fn test_params_b_prefers_raw() {
        let mut m = test_model("m", "?");
        m.parameters_raw = Some(7_000_000_000);
        assert!((m.params_b() - 7.0).abs() < 1e-9);
        m.parameters_raw = Some(1_500_000_000);
        m.parameter_count = "70B".to_string();
        assert!((m.params_b() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_memory_7b_q4() {
        let m = test_model("m", "7B");
        let want = 7.0 * 0.58 + 0.000008 * 7.0 * 4096.0 + 0.5;
        assert!((m.estimate_memory_gb("Q4_K_M", 4096) - want).abs() < 0.01);
    }

    #[test]
    fn test_best_quant_huge_budget() {
        let m = test_model("m", "7B");
        let (q, mem) = m.best_quant_for_budget(100.0, 4096);
        assert_eq!(q, "Q8_0");
        assert!(mem > 0.0);
    }

    #[test]
    fn test_best_quant_tiny_budget_falls_back_to_default() {
        let m = test_model("m", "7B");
        let (q, mem) = m.best_quant_for_budget(0.1, 4096);
        assert_eq!(q, m.quantization);
        assert!(mem > 0.0);
    }

    #[test]
    fn test_best_quant_halves_context() {
        // at 32k nothing fits 4.9 GB (Q2_K needs 4.93); at 16k Q3_K_M needs 4.78
        let m = test_model("m", "7B");
        let (q, mem) = m.best_quant_for_budget(4.9, 32768);
        assert_eq!(q, "Q3_K_M");
        assert!(mem <= 4.9);
        assert!((mem - m.estimate_memory_gb("Q3_K_M", 16384)).abs() < 1e-9);
    }

    #[test]
    fn test_moe_figures_absent_for_dense_or_unknown() {
        assert!(test_model("dense", "7B").moe_active_vram_gb().is_none());
        assert!(moe(None, Some(46_700_000_000)).moe_active_vram_gb().is_none());
        assert!(moe(Some(12_900_000_000), None).moe_offloaded_ram_gb().is_none());
    }

    #[test]
    fn test_moe_figures() {
        let m = moe(Some(12_900_000_000), Some(46_700_000_000));
        let active = m.moe_active_vram_gb().unwrap();
        let want_active = 12.9e9 * 0.58 / GIB * 1.1;
        assert!((active - want_active).abs() < 1e-6);
        let offloaded = m.moe_offloaded_ram_gb().unwrap();
        let want_offloaded = (46.7e9 - 12.9e9) * 0.58 / GIB;
        assert!((offloaded - want_offloaded).abs() < 1e-6);
    }

    #[test]
    fn test_moe_active_floor_and_offload_floor() {
        let tiny = moe(Some(1_000), Some(500));
        assert_eq!(tiny.moe_active_vram_gb(), Some(0.5));
        assert_eq!(tiny.moe_offloaded_ram_gb(), Some(0.0));
    }

    #[test]
    fn test_estimated_active_parameters_is_approximate() {
        // 8 experts, 2 active: 5% shared + 95% * 2/8 = 28.75% of the total
        let m = moe(None, Some(46_700_000_000));
        let est = m.estimated_active_parameters().unwrap() as f64;
        let rough = 46.7e9 * 0.2875;
        assert!((est - rough).abs() / rough < 0.01);
        // a literal figure always wins
        assert_eq!(
            moe(Some(12_900_000_000), Some(46_700_000_000)).estimated_active_parameters(),
            Some(12_900_000_000)
        );
        assert!(test_model("dense", "7B").estimated_active_parameters().is_none());
    }

    proptest! {
        #[test]
        fn prop_memory_increases_with_params(a in 1u64..200_000, b in 1u64..200_000, ctx in 512u32..131_072) {
            prop_assume!(a != b);
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            let mut small = test_model("s", "");
            small.parameters_raw = Some(lo * 1_000_000);
            let mut large = test_model("l", "");
            large.parameters_raw = Some(hi * 1_000_000);
            prop_assert!(small.estimate_memory_gb("Q4_K_M", ctx) < large.estimate_memory_gb("Q4_K_M", ctx));
        }

        #[test]
        fn prop_memory_increases_with_context(lo in 1u32..65_536, extra in 1u32..65_536) {
            let m = test_model("m", "7B");
            prop_assert!(m.estimate_memory_gb("Q4_K_M", lo) < m.estimate_memory_gb("Q4_K_M", lo + extra));
        }

        #[test]
        fn prop_params_monotonic_in_magnitude(x in 1u32..100_000, y in 1u32..100_000) {
            prop_assume!(x < y);
            let a = test_model("a", &format!("{}M", x)).params_b();
            let b = test_model("b", &format!("{}M", y)).params_b();
            prop_assert!(a < b);
        }
    }
}
