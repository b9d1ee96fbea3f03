//! Speed estimate and the four score components

use super::RunMode;
use crate::catalog::{quant_quality_penalty, quant_speed_multiplier};
use crate::models::{LlmModel, UseCase};
use crate::system::{GpuBackend, SystemSpecs};
use serde::Serialize;

/// Per-dimension scores, each in [0, 100]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreComponents {
    pub quality: f64,
    pub speed: f64,
    pub fit: f64,
    pub context: f64,
}

/// Relative weight of each component for one use case
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub quality: f64,
    pub speed: f64,
    pub fit: f64,
    pub context: f64,
}

const fn weights(quality: f64, speed: f64, fit: f64, context: f64) -> ScoreWeights {
    ScoreWeights {
        quality,
        speed,
        fit,
        context,
    }
}

/// Component weights for a use case
pub fn weights_for(use_case: UseCase) -> ScoreWeights {
    match use_case {
        UseCase::General => weights(0.45, 0.30, 0.15, 0.10),
        UseCase::Coding => weights(0.50, 0.20, 0.15, 0.15),
        UseCase::Reasoning => weights(0.55, 0.15, 0.15, 0.15),
        UseCase::Chat => weights(0.40, 0.35, 0.15, 0.10),
        UseCase::Multimodal => weights(0.50, 0.20, 0.15, 0.15),
        UseCase::Embedding => weights(0.30, 0.40, 0.20, 0.10),
    }
}

/// Tokens/sec for one billion parameters at a 5-bit baseline
pub fn backend_speed_constant(backend: GpuBackend) -> f64 {
    match backend {
        GpuBackend::Cuda => 220.0,
        GpuBackend::Metal => 160.0,
        GpuBackend::Rocm => 180.0,
        GpuBackend::Vulkan => 150.0,
        GpuBackend::Sycl => 100.0,
        GpuBackend::CpuArm => 90.0,
        GpuBackend::CpuX86 => 70.0,
    }
}

const MIN_TPS: f64 = 0.1;
const MANY_CORES: usize = 8;
const MANY_CORES_BONUS: f64 = 1.1;

/// Estimated generation speed in tokens/sec.
///
/// CPU-only runs use the CPU backend's constant in place of the GPU's.
pub fn estimate_tps(model: &LlmModel, quant: &str, system: &SystemSpecs, run_mode: RunMode) -> f64 {
    let backend = match run_mode {
        RunMode::CpuOnly => system.cpu_backend,
        _ => system.backend,
    };
    let params = model.params_b().max(0.1);
    let mut tps = backend_speed_constant(backend) / params * quant_speed_multiplier(quant);
    if system.total_cpu_cores >= MANY_CORES {
        tps *= MANY_CORES_BONUS;
    }
    tps *= match run_mode {
        RunMode::MoeOffload => 0.8,
        RunMode::CpuOffload => 0.5,
        RunMode::Gpu | RunMode::CpuOnly => 1.0,
    };
    tps.max(MIN_TPS)
}

fn quality_base(params_b: f64) -> f64 {
    match params_b {
        p if p < 1.0 => 30.0,
        p if p < 3.0 => 45.0,
        p if p < 7.0 => 60.0,
        p if p < 10.0 => 75.0,
        p if p < 20.0 => 82.0,
        p if p < 40.0 => 89.0,
        _ => 95.0,
    }
}

/// Family bonus, first match on the lower-cased name
const FAMILY_BONUS: &[(&[&str], f64)] = &[
    (&["qwen"], 2.0),
    (&["deepseek"], 3.0),
    (&["llama"], 2.0),
    (&["mistral", "mixtral"], 1.0),
    (&["gemma"], 1.0),
    (&["starcoder"], 1.0),
];

fn family_bonus(name_lower: &str) -> f64 {
    FAMILY_BONUS
        .iter()
        .find(|(pats, _)| pats.iter().any(|p| name_lower.contains(p)))
        .map_or(0.0, |&(_, bonus)| bonus)
}

fn task_bonus(model: &LlmModel, name_lower: &str, use_case: UseCase) -> f64 {
    let applies = match use_case {
        UseCase::Coding => ["code", "starcoder", "wizard"].iter().any(|p| name_lower.contains(p)),
        UseCase::Reasoning => model.params_b() >= 13.0,
        UseCase::Multimodal => {
            name_lower.contains("vision") || model.use_case.to_lowercase().contains("vision")
        }
        _ => false,
    };
    match (applies, use_case) {
        (true, UseCase::Reasoning) => 5.0,
        (true, _) => 6.0,
        (false, _) => 0.0,
    }
}

/// Model quality: size tier + family + quantization penalty + task fit
pub fn quality_score(model: &LlmModel, quant: &str, use_case: UseCase) -> f64 {
    let name_lower = model.name.to_lowercase();
    let score = quality_base(model.params_b())
        + family_bonus(&name_lower)
        + quant_quality_penalty(quant)
        + task_bonus(model, &name_lower, use_case);
    score.clamp(0.0, 100.0)
}

/// Speed relative to a use-case target rate
pub fn speed_score(tps: f64, use_case: UseCase) -> f64 {
    let target = match use_case {
        UseCase::Reasoning => 25.0,
        UseCase::Embedding => 200.0,
        _ => 40.0,
    };
    (tps / target * 100.0).clamp(0.0, 100.0)
}

/// Memory headroom: best between half and 80% utilization
pub fn fit_score(required: f64, available: f64) -> f64 {
    if available <= 0.0 || required > available {
        return 0.0;
    }
    let ratio = required / available;
    if ratio <= 0.5 {
        60.0 + ratio / 0.5 * 40.0
    } else if ratio <= 0.8 {
        100.0
    } else if ratio <= 0.9 {
        70.0
    } else {
        50.0
    }
}

/// Context window against a use-case target
pub fn context_score(model: &LlmModel, use_case: UseCase) -> f64 {
    let target: u32 = match use_case {
        UseCase::Coding | UseCase::Reasoning => 8192,
        UseCase::Embedding => 512,
        _ => 4096,
    };
    if model.context_length >= target {
        100.0
    } else if model.context_length >= target / 2 {
        70.0
    } else {
        30.0
    }
}

pub fn compute_scores(
    model: &LlmModel,
    quant: &str,
    use_case: UseCase,
    tps: f64,
    required: f64,
    available: f64,
) -> ScoreComponents {
    ScoreComponents {
        quality: quality_score(model, quant, use_case),
        speed: speed_score(tps, use_case),
        fit: fit_score(required, available),
        context: context_score(model, use_case),
    }
}

/// Composite score, rounded to one decimal
pub fn weighted_score(sc: &ScoreComponents, use_case: UseCase) -> f64 {
    let w = weights_for(use_case);
    let raw = sc.quality * w.quality + sc.speed * w.speed + sc.fit * w.fit + sc.context * w.context;
    (raw * 10.0).round() / 10.0
}
