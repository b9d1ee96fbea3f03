//! Fit analysis of one model against one hardware snapshot
//!
//! The decision tree picks a run mode first (where the weights live), which
//! fixes the required and available memory; the fit level, best
//! quantization, speed estimate and scores all follow from that choice.

use super::scoring::{compute_scores, estimate_tps, weighted_score, ScoreComponents};
use crate::models::{LlmModel, UseCase};
use crate::system::SystemSpecs;
use serde::Serialize;
use std::fmt;

/// How well a model fits, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FitLevel {
    Perfect,
    Good,
    Marginal,
    TooTight,
}

impl FitLevel {
    pub fn label(&self) -> &'static str {
        match self {
            FitLevel::Perfect => "Perfect",
            FitLevel::Good => "Good",
            FitLevel::Marginal => "Marginal",
            FitLevel::TooTight => "Too Tight",
        }
    }

    /// Status marker for tables
    pub fn emoji(&self) -> &'static str {
        match self {
            FitLevel::Perfect => "🟢",
            FitLevel::Good => "🟡",
            FitLevel::Marginal => "🟠",
            FitLevel::TooTight => "🔴",
        }
    }
}

impl fmt::Display for FitLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where the model's weights are placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RunMode {
    /// Entirely in VRAM (or a unified pool)
    Gpu,
    /// Active experts in VRAM, inactive experts in system RAM
    MoeOffload,
    /// GPU present but the model spills to system RAM
    CpuOffload,
    /// System RAM only
    CpuOnly,
}

impl RunMode {
    pub fn label(&self) -> &'static str {
        match self {
            RunMode::Gpu => "GPU",
            RunMode::MoeOffload => "MoE",
            RunMode::CpuOffload => "CPU+GPU",
            RunMode::CpuOnly => "CPU",
        }
    }

    fn runs_on_cpu(&self) -> bool {
        matches!(self, RunMode::CpuOffload | RunMode::CpuOnly)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of analyzing one model on one machine
#[derive(Debug, Clone, Serialize)]
pub struct ModelFit<'a> {
    #[serde(skip)]
    pub model: &'a LlmModel,
    #[serde(skip)]
    pub system: &'a SystemSpecs,
    pub fit_level: FitLevel,
    pub run_mode: RunMode,
    pub memory_required_gb: f64,
    pub memory_available_gb: f64,
    /// Required over available, in percent; `None` when nothing is available
    pub utilization_pct: Option<f64>,
    pub notes: Vec<String>,
    /// System RAM holding inactive experts in MoE-offload mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moe_offloaded_gb: Option<f64>,
    pub score: f64,
    pub score_components: ScoreComponents,
    pub estimated_tps: f64,
    pub best_quant: String,
    pub use_case: UseCase,
}

/// Memory placement decided by the run-mode tree
struct Placement {
    run_mode: RunMode,
    required: f64,
    available: f64,
}

impl Placement {
    fn new(run_mode: RunMode, required: f64, available: f64) -> Self {
        Self {
            run_mode,
            required,
            available,
        }
    }
}

impl<'a> ModelFit<'a> {
    /// Analyze `model` against `system`. Never fails: a model that cannot
    /// run is reported as [`FitLevel::TooTight`].
    pub fn analyze(model: &'a LlmModel, system: &'a SystemSpecs) -> Self {
        let use_case = UseCase::from_model(model);
        let mut notes = Vec::new();
        let placement = place(model, system, &mut notes);
        let Placement {
            run_mode,
            required,
            available,
        } = placement;

        let fit_level = score_fit(required, available, model.recommended_ram_gb, run_mode);
        let utilization_pct = (available > 0.0).then(|| required / available * 100.0);

        if run_mode == RunMode::CpuOnly {
            notes.push("No GPU -- inference will be slow".to_string());
        }
        if run_mode.runs_on_cpu() && system.total_cpu_cores < 4 {
            notes.push("Low CPU core count may bottleneck inference".to_string());
        }

        let moe_offloaded_gb = match run_mode {
            RunMode::MoeOffload => model.moe_offloaded_ram_gb(),
            _ => None,
        };

        let (best_quant, _) = model.best_quant_for_budget(available, model.context_length);
        if best_quant != model.quantization {
            notes.push(format!(
                "Best quantization for hardware: {} (model default: {})",
                best_quant, model.quantization
            ));
        }

        let estimated_tps = estimate_tps(model, &best_quant, system, run_mode);
        let score_components =
            compute_scores(model, &best_quant, use_case, estimated_tps, required, available);
        let score = weighted_score(&score_components, use_case);
        notes.push(format!("Estimated speed: {:.1} tok/s", estimated_tps));

        ModelFit {
            model,
            system,
            fit_level,
            run_mode,
            memory_required_gb: required,
            memory_available_gb: available,
            utilization_pct,
            notes,
            moe_offloaded_gb,
            score,
            score_components,
            estimated_tps,
            best_quant,
            use_case,
        }
    }

    /// Whether the model can run at all
    pub fn is_runnable(&self) -> bool {
        self.fit_level != FitLevel::TooTight
    }
}

/// Analyze every model, preserving input order
pub fn analyze_all<'a>(models: &'a [LlmModel], system: &'a SystemSpecs) -> Vec<ModelFit<'a>> {
    models.iter().map(|m| ModelFit::analyze(m, system)).collect()
}

fn place(model: &LlmModel, system: &SystemSpecs, notes: &mut Vec<String>) -> Placement {
    let min_vram = model.min_vram_or_ram();
    let vram = match (system.has_gpu, system.gpu_vram_gb) {
        (false, _) => return cpu_path(model, system, notes),
        (true, None) => {
            notes.push("GPU detected but VRAM unknown".to_string());
            return cpu_path(model, system, notes);
        }
        (true, Some(vram)) => vram,
    };

    if system.unified_memory {
        notes.push("Unified memory: GPU and CPU share the same pool".to_string());
        if let (true, Some(experts)) = (model.is_moe, model.num_experts) {
            notes.push(format!(
                "MoE: {}/{} experts active (all share unified memory pool)",
                model.active_experts.unwrap_or(0),
                experts
            ));
        }
        return Placement::new(RunMode::Gpu, min_vram, vram);
    }

    if min_vram <= vram {
        notes.push("GPU: model loaded into VRAM".to_string());
        if let (true, Some(experts)) = (model.is_moe, model.num_experts) {
            notes.push(format!("MoE: all {} experts loaded in VRAM (optimal)", experts));
        }
        return Placement::new(RunMode::Gpu, min_vram, vram);
    }

    if model.is_moe {
        return moe_offload_path(model, system, vram, min_vram, notes);
    }

    if model.min_ram_gb <= system.available_ram_gb {
        notes.push("GPU: insufficient VRAM, spilling to system RAM".to_string());
        notes.push("Performance will be significantly reduced".to_string());
        return Placement::new(RunMode::CpuOffload, model.min_ram_gb, system.available_ram_gb);
    }

    notes.push("Insufficient VRAM and system RAM".to_string());
    notes.push(format!(
        "Need {:.1} GB VRAM or {:.1} GB system RAM",
        min_vram, model.min_ram_gb
    ));
    Placement::new(RunMode::Gpu, min_vram, vram)
}

fn cpu_path(model: &LlmModel, system: &SystemSpecs, notes: &mut Vec<String>) -> Placement {
    notes.push("CPU-only: model loaded into system RAM".to_string());
    if model.is_moe {
        notes.push("MoE architecture, but expert offloading requires a GPU".to_string());
    }
    Placement::new(RunMode::CpuOnly, model.min_ram_gb, system.available_ram_gb)
}

fn moe_offload_path(
    model: &LlmModel,
    system: &SystemSpecs,
    vram: f64,
    min_vram: f64,
    notes: &mut Vec<String>,
) -> Placement {
    let active_vram = model.moe_active_vram_gb();
    if let Some(active) = active_vram {
        let offloaded = model.moe_offloaded_ram_gb().unwrap_or(0.0);
        if active <= vram && offloaded <= system.available_ram_gb {
            notes.push(format!(
                "MoE: {}/{} experts active in VRAM ({:.1} GB)",
                model.active_experts.unwrap_or(0),
                model.num_experts.unwrap_or(0),
                active
            ));
            notes.push(format!(
                "Inactive experts offloaded to system RAM ({:.1} GB)",
                offloaded
            ));
            return Placement::new(RunMode::MoeOffload, active, vram);
        }
    }

    if model.min_ram_gb <= system.available_ram_gb {
        notes.push("MoE: insufficient VRAM for expert offloading".to_string());
        notes.push("Spilling entire model to system RAM".to_string());
        notes.push("Performance will be significantly reduced".to_string());
        return Placement::new(RunMode::CpuOffload, model.min_ram_gb, system.available_ram_gb);
    }

    let required = active_vram.unwrap_or(min_vram);
    notes.push("Insufficient VRAM and system RAM".to_string());
    notes.push(format!(
        "Need {:.1} GB VRAM (full) or {:.1} GB (MoE offload) + RAM",
        min_vram, required
    ));
    Placement::new(RunMode::Gpu, required, vram)
}

/// Fit level for a placement
pub fn score_fit(required: f64, available: f64, recommended: f64, run_mode: RunMode) -> FitLevel {
    if required > available {
        return FitLevel::TooTight;
    }
    let roomy = available >= required * 1.2;
    match run_mode {
        RunMode::Gpu if recommended <= available => FitLevel::Perfect,
        RunMode::Gpu | RunMode::MoeOffload | RunMode::CpuOffload if roomy => FitLevel::Good,
        _ => FitLevel::Marginal,
    }
}
