//! Plain-text tables and detail views

use crate::fit::{FitLevel, ModelFit, RunMode};
use crate::models::LlmModel;
use crate::system::{GpuInfo, SystemSpecs};
use console::{pad_str, style, Alignment};
use std::fmt::Write;

// === Tables ===

struct Column {
    header: &'static str,
    width: usize,
    align: Alignment,
}

const fn col(header: &'static str, width: usize, align: Alignment) -> Column {
    Column { header, width, align }
}

const FIT_COLUMNS: &[Column] = &[
    col("Status", 13, Alignment::Left),
    col("Model", 40, Alignment::Left),
    col("Provider", 12, Alignment::Left),
    col("Size", 7, Alignment::Right),
    col("Score", 5, Alignment::Right),
    col("tok/s", 7, Alignment::Right),
    col("Quant", 7, Alignment::Left),
    col("Mode", 7, Alignment::Left),
    col("Mem %", 7, Alignment::Right),
    col("Context", 7, Alignment::Right),
];

const RECORD_COLUMNS: &[Column] = &[
    col("Model", 40, Alignment::Left),
    col("Provider", 12, Alignment::Left),
    col("Size", 7, Alignment::Right),
    col("Quant", 7, Alignment::Left),
    col("Context", 7, Alignment::Right),
    col("Use Case", 30, Alignment::Left),
];

/// Pad (or truncate) each cell to its column; emoji and ANSI styling are
/// measured by display width.
fn table_line(columns: &[Column], cells: &[String]) -> String {
    let line = columns
        .iter()
        .zip(cells)
        .map(|(c, cell)| pad_str(cell, c.width, c.align, Some("…")).into_owned())
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn render_table(columns: &[Column], rows: &[Vec<String>]) -> String {
    let headers: Vec<String> = columns.iter().map(|c| c.header.to_string()).collect();
    let width = columns.iter().map(|c| c.width).sum::<usize>() + 2 * columns.len().saturating_sub(1);

    let mut out = String::new();
    let _ = writeln!(out, "{}", table_line(columns, &headers));
    let _ = writeln!(out, "{}", "-".repeat(width));
    for row in rows {
        let _ = writeln!(out, "{}", table_line(columns, row));
    }
    out
}

fn styled_level(level: FitLevel) -> String {
    let label = format!("{} {}", level.emoji(), level.label());
    match level {
        FitLevel::Perfect => style(label).green().to_string(),
        FitLevel::Good => style(label).yellow().to_string(),
        FitLevel::Marginal => style(label).color256(208).to_string(),
        FitLevel::TooTight => style(label).red().to_string(),
    }
}

fn context_k(tokens: u32) -> String {
    format!("{}k", tokens / 1000)
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |p| format!("{:.1}%", p))
}

fn fit_row(fit: &ModelFit<'_>) -> Vec<String> {
    vec![
        styled_level(fit.fit_level),
        fit.model.name.clone(),
        fit.model.provider.clone(),
        fit.model.parameter_count.clone(),
        format!("{:.0}", fit.score),
        format!("{:.1}", fit.estimated_tps),
        fit.best_quant.clone(),
        fit.run_mode.label().to_string(),
        percent(fit.utilization_pct),
        context_k(fit.model.context_length),
    ]
}

fn record_row(model: &LlmModel) -> Vec<String> {
    vec![
        model.name.clone(),
        model.provider.clone(),
        model.parameter_count.clone(),
        model.quantization.clone(),
        context_k(model.context_length),
        model.use_case.clone(),
    ]
}

/// Fit results as a table, in the given order
pub fn fit_table(fits: &[ModelFit<'_>]) -> String {
    let rows: Vec<Vec<String>> = fits.iter().map(fit_row).collect();
    render_table(FIT_COLUMNS, &rows)
}

// === System ===

fn gpu_line(gpu: &GpuInfo) -> String {
    let backend = gpu.backend.label();
    match gpu.vram_gb {
        Some(vram) if gpu.unified_memory => {
            format!("{} (unified memory, {:.2} GB shared, {})", gpu.name, vram, backend)
        }
        Some(vram) if gpu.count > 1 => {
            format!("{} x{} ({:.2} GB VRAM total, {})", gpu.name, gpu.count, vram, backend)
        }
        Some(vram) => format!("{} ({:.2} GB VRAM, {})", gpu.name, vram, backend),
        None => format!("{} (VRAM unknown, {})", gpu.name, backend),
    }
}

/// Human-readable hardware snapshot
pub fn render_system(specs: &SystemSpecs) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== System Specifications ===");
    let _ = writeln!(out, "CPU: {} ({} cores)", specs.cpu_name, specs.total_cpu_cores);
    let _ = writeln!(out, "Total RAM: {:.2} GB", specs.total_ram_gb);
    let _ = writeln!(out, "Available RAM: {:.2} GB", specs.available_ram_gb);
    let _ = writeln!(out, "Backend: {}", specs.backend.label());
    if specs.is_wsl {
        let _ = writeln!(out, "Environment: WSL");
    }

    match specs.gpus.as_slice() {
        [] => {
            let _ = writeln!(out, "GPU: Not detected");
        }
        [only] => {
            let _ = writeln!(out, "GPU: {}", gpu_line(only));
        }
        many => {
            for (i, gpu) in many.iter().enumerate() {
                let _ = writeln!(out, "GPU {}: {}", i + 1, gpu_line(gpu));
            }
        }
    }
    out
}

// === Fit results ===

/// Ranked fit table with a header, or a notice when nothing fits
pub fn render_fits(fits: &[ModelFit<'_>]) -> String {
    if fits.is_empty() {
        return "No compatible models found for your system.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "=== Pole Analysis ===");
    let _ = writeln!(out, "Found {} compatible model(s)\n", fits.len());
    out.push_str(&fit_table(fits));
    out
}

/// Every model in dataset order with its fit on this machine
pub fn render_model_list(fits: &[ModelFit<'_>]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Available LLM Models ===");
    let _ = writeln!(out, "Total models: {}\n", fits.len());
    out.push_str(&fit_table(fits));
    out
}

/// Catalog records matching a search query
pub fn render_search(query: &str, models: &[&LlmModel]) -> String {
    if models.is_empty() {
        return format!("No models found matching '{}'\n", query);
    }
    let mut out = String::new();
    let _ = writeln!(out, "=== Search Results for '{}' ===", query);
    let _ = writeln!(out, "Found {} model(s)\n", models.len());
    let rows: Vec<Vec<String>> = models.iter().map(|m| record_row(m)).collect();
    out.push_str(&render_table(RECORD_COLUMNS, &rows));
    out
}

/// Hardware summary followed by the recommended fits
pub fn render_recommend(specs: &SystemSpecs, fits: &[ModelFit<'_>]) -> String {
    let mut out = render_system(specs);
    out.push('\n');
    out.push_str(&render_fits(fits));
    out
}

// === Detail view ===

/// Full breakdown of one model's fit
pub fn render_info(fit: &ModelFit<'_>) -> String {
    let model = fit.model;
    let mut out = String::new();

    let _ = writeln!(out, "=== {} ===\n", model.name);
    let _ = writeln!(out, "Provider: {}", model.provider);
    let _ = writeln!(out, "Parameters: {}", model.parameter_count);
    let _ = writeln!(out, "Quantization: {}", model.quantization);
    let _ = writeln!(out, "Best Quant: {}", fit.best_quant);
    let _ = writeln!(out, "Context Length: {} tokens", model.context_length);
    let _ = writeln!(out, "Use Case: {}", model.use_case);
    let _ = writeln!(out, "Category: {}", fit.use_case.label());

    let _ = writeln!(out, "\nScore Breakdown:");
    let _ = writeln!(out, "  Overall: {:.1}/100", fit.score);
    let sc = &fit.score_components;
    let _ = writeln!(
        out,
        "  Quality: {:.0}  Speed: {:.0}  Fit: {:.0}  Context: {:.0}",
        sc.quality, sc.speed, sc.fit, sc.context
    );
    let _ = writeln!(out, "  Estimated Speed: {:.1} tok/s", fit.estimated_tps);

    let _ = writeln!(out, "\nResource Requirements:");
    if let Some(vram) = model.min_vram_gb {
        let _ = writeln!(out, "  Min VRAM: {:.1} GB", vram);
    }
    let _ = writeln!(out, "  Min RAM: {:.1} GB (CPU inference)", model.min_ram_gb);
    let _ = writeln!(out, "  Recommended RAM: {:.1} GB", model.recommended_ram_gb);

    if model.is_moe {
        let _ = writeln!(out, "\nMoE Architecture:");
        if let (Some(active), Some(total)) = (model.active_experts, model.num_experts) {
            let _ = writeln!(out, "  Experts: {} active / {} total per token", active, total);
        }
        if let Some(active_vram) = model.moe_active_vram_gb() {
            let _ = writeln!(
                out,
                "  Active VRAM: {:.1} GB (vs {:.1} GB full model)",
                active_vram,
                model.min_vram_or_ram()
            );
        }
        if let Some(offloaded) = fit.moe_offloaded_gb {
            let _ = writeln!(out, "  Offloaded: {:.1} GB inactive experts in RAM", offloaded);
        }
    }

    let _ = writeln!(out, "\nFit Analysis:");
    let _ = writeln!(out, "  Status: {} {}", fit.fit_level.emoji(), fit.fit_level.label());
    let _ = writeln!(out, "  Run Mode: {}", fit.run_mode.label());
    let _ = writeln!(
        out,
        "  Memory Utilization: {} ({:.1} / {:.1} GB)",
        percent(fit.utilization_pct),
        fit.memory_required_gb,
        fit.memory_available_gb
    );
    if fit.run_mode == RunMode::CpuOnly && fit.system.has_gpu {
        let _ = writeln!(out, "  GPU present but not used for this model");
    }

    if !fit.notes.is_empty() {
        let _ = writeln!(out, "\nNotes:");
        for note in &fit.notes {
            let _ = writeln!(out, "  - {}", note);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::analyze_all;
    use crate::models::test_model;
    use crate::system::fixtures::{spec_no_gpu, spec_with_gpu};
    use crate::system::GpuBackend;

    #[test]
    fn test_gpu_line_variants() {
        let mut gpu = GpuInfo::new("RTX 4090", Some(24.0), GpuBackend::Cuda);
        assert_eq!(gpu_line(&gpu), "RTX 4090 (24.00 GB VRAM, CUDA)");

        gpu.count = 2;
        gpu.vram_gb = Some(48.0);
        assert_eq!(gpu_line(&gpu), "RTX 4090 x2 (48.00 GB VRAM total, CUDA)");

        let mut apple = GpuInfo::new("Apple M2", Some(16.0), GpuBackend::Metal);
        apple.unified_memory = true;
        assert_eq!(gpu_line(&apple), "Apple M2 (unified memory, 16.00 GB shared, Metal)");

        let unknown = GpuInfo::new("Arc A770", None, GpuBackend::Sycl);
        assert_eq!(gpu_line(&unknown), "Arc A770 (VRAM unknown, SYCL)");
    }

    #[test]
    fn test_render_system() {
        let text = render_system(&spec_no_gpu(32.0, 8));
        assert!(text.starts_with("=== System Specifications ==="));
        assert!(text.contains("CPU: Intel Xeon (8 cores)"));
        assert!(text.contains("Total RAM: 32.00 GB"));
        assert!(text.contains("Available RAM: 25.60 GB"));
        assert!(text.contains("GPU: Not detected"));

        let text = render_system(&spec_with_gpu(12.0, 32.0, false));
        assert!(text.contains("GPU: Test GPU (12.00 GB VRAM, CUDA)"));
    }

    #[test]
    fn test_render_system_numbers_multiple_gpus() {
        let mut spec = spec_with_gpu(24.0, 64.0, false);
        spec.gpus.push(GpuInfo::new("Second", Some(8.0), GpuBackend::Vulkan));
        let text = render_system(&spec);
        assert!(text.contains("GPU 1: Test GPU"));
        assert!(text.contains("GPU 2: Second (8.00 GB VRAM, Vulkan)"));
    }

    #[test]
    fn test_render_fits_empty() {
        assert_eq!(render_fits(&[]), "No compatible models found for your system.\n");
    }

    #[test]
    fn test_fit_table_rows() {
        let spec = spec_no_gpu(32.0, 8);
        let mut model = test_model("org/Model-7B", "7B");
        model.context_length = 32768;
        let models = vec![model];
        let fits = analyze_all(&models, &spec);
        let text = render_fits(&fits);

        assert!(text.contains("Found 1 compatible model(s)"));
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[3].starts_with("Status"));
        let row = lines[5];
        assert!(row.contains("org/Model-7B"));
        assert!(row.contains("CPU"));
        assert!(row.contains("32k"));
    }

    #[test]
    fn test_long_names_are_truncated() {
        let cells = vec!["x".repeat(60)];
        let line = table_line(&FIT_COLUMNS[1..2], &cells);
        assert_eq!(console::measure_text_width(&line), 40);
        assert!(line.ends_with('…'));
    }

    #[test]
    fn test_render_search() {
        let model = test_model("org/Coder-7B", "7B");
        let text = render_search("coder", &[&model]);
        assert!(text.contains("=== Search Results for 'coder' ==="));
        assert!(text.contains("Found 1 model(s)"));
        assert!(text.contains("org/Coder-7B"));
        assert_eq!(render_search("zzz", &[]), "No models found matching 'zzz'\n");
    }

    #[test]
    fn test_render_info_sections() {
        let spec = spec_with_gpu(24.0, 64.0, false);
        let mut model = test_model("org/MoE-8x7B", "46.7B");
        model.is_moe = true;
        model.num_experts = Some(8);
        model.active_experts = Some(2);
        model.parameters_raw = Some(46_700_000_000);
        model.active_parameters = Some(12_900_000_000);
        model.min_vram_gb = Some(26.0);
        let models = vec![model];
        let fits = analyze_all(&models, &spec);
        let text = render_info(&fits[0]);

        assert!(text.starts_with("=== org/MoE-8x7B ==="));
        assert!(text.contains("Score Breakdown:"));
        assert!(text.contains("Min VRAM: 26.0 GB"));
        assert!(text.contains("MoE Architecture:"));
        assert!(text.contains("Experts: 2 active / 8 total per token"));
        assert!(text.contains("Fit Analysis:"));
    }

    #[test]
    fn test_render_recommend_has_system_header() {
        let spec = spec_no_gpu(16.0, 4);
        let text = render_recommend(&spec, &[]);
        assert!(text.starts_with("=== System Specifications ==="));
        assert!(text.ends_with("No compatible models found for your system.\n"));
    }
}
