//! JSON documents for tool integration
//!
//! Shape: `{ "system": {...}, "models": [...] }`. GB figures are rounded to
//! two decimals; scores, speeds and percentages to one.

use crate::error::Result;
use crate::fit::ModelFit;
use crate::models::LlmModel;
use crate::system::{GpuInfo, SystemSpecs};
use serde_json::{json, Value};

/// Round to one decimal place
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Round to two decimal places
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn gpu_json(gpu: &GpuInfo) -> Value {
    let mut value = json!({
        "name": gpu.name,
        "backend": gpu.backend.label(),
        "count": gpu.count,
        "unified_memory": gpu.unified_memory,
    });
    if let Some(vram) = gpu.vram_gb {
        value["vram_gb"] = json!(round2(vram));
    }
    value
}

/// Hardware snapshot as a JSON object
pub fn system_json(specs: &SystemSpecs) -> Value {
    json!({
        "total_ram_gb": round2(specs.total_ram_gb),
        "available_ram_gb": round2(specs.available_ram_gb),
        "cpu_cores": specs.total_cpu_cores,
        "cpu_name": specs.cpu_name,
        "has_gpu": specs.has_gpu,
        "gpu_vram_gb": specs.gpu_vram_gb.map(round2),
        "gpu_name": specs.gpu_name,
        "gpu_count": specs.gpu_count,
        "unified_memory": specs.unified_memory,
        "backend": specs.backend.label(),
        "gpus": specs.gpus.iter().map(gpu_json).collect::<Vec<_>>(),
    })
}

/// One fit result as a JSON object
pub fn fit_json(fit: &ModelFit<'_>) -> Value {
    let model = fit.model;
    json!({
        "name": model.name,
        "provider": model.provider,
        "parameter_count": model.parameter_count,
        "params_b": round2(model.params_b()),
        "context_length": model.context_length,
        "use_case": model.use_case,
        "category": fit.use_case.label(),
        "is_moe": model.is_moe,
        "fit_level": fit.fit_level.label(),
        "run_mode": fit.run_mode.label(),
        "score": round1(fit.score),
        "score_components": {
            "quality": round1(fit.score_components.quality),
            "speed": round1(fit.score_components.speed),
            "fit": round1(fit.score_components.fit),
            "context": round1(fit.score_components.context),
        },
        "estimated_tps": round1(fit.estimated_tps),
        "best_quant": fit.best_quant,
        "memory_required_gb": round2(fit.memory_required_gb),
        "memory_available_gb": round2(fit.memory_available_gb),
        "utilization_pct": fit.utilization_pct.map(round1),
        "moe_offloaded_gb": fit.moe_offloaded_gb.map(round2),
        "notes": fit.notes,
    })
}

fn pretty(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// `{ "system": ... }`
pub fn render_system_json(specs: &SystemSpecs) -> Result<String> {
    pretty(&json!({ "system": system_json(specs) }))
}

/// `{ "system": ..., "models": [fit, ...] }`
pub fn render_fits_json(specs: &SystemSpecs, fits: &[ModelFit<'_>]) -> Result<String> {
    pretty(&json!({
        "system": system_json(specs),
        "models": fits.iter().map(fit_json).collect::<Vec<_>>(),
    }))
}

/// `{ "models": [record, ...] }` for catalog queries that need no hardware
pub fn render_models_json(models: &[&LlmModel]) -> Result<String> {
    pretty(&json!({ "models": models }))
}
