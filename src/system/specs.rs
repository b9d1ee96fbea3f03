//! Hardware snapshot assembly

use super::gpu::{cpu_backend, GpuBackend, GpuInfo};
use super::probes::{default_probes, enumerate_gpus, GpuProbe, ProbeContext};
use super::resources::{detect_cpu_and_memory, CpuInfo, MemoryInfo};
use super::wsl::is_running_in_wsl;
use crate::error::Result;
use serde::Serialize;

/// Hardware capabilities of this machine, built once per run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSpecs {
    pub total_ram_gb: f64,
    pub available_ram_gb: f64,
    #[serde(rename = "cpu_cores")]
    pub total_cpu_cores: usize,
    pub cpu_name: String,
    pub has_gpu: bool,
    /// VRAM of the primary GPU entry (all of its devices)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_vram_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_name: Option<String>,
    pub gpu_count: u32,
    pub unified_memory: bool,
    /// Primary GPU backend, or the CPU backend when there is no GPU
    pub backend: GpuBackend,
    /// Backend used when running on the CPU alone
    pub cpu_backend: GpuBackend,
    /// Every detected GPU, largest VRAM first
    pub gpus: Vec<GpuInfo>,
    pub is_wsl: bool,
}

impl SystemSpecs {
    /// Detect the running machine with the platform's default probes
    pub fn detect() -> Result<Self> {
        Self::detect_with_probes(&default_probes())
    }

    /// Detect RAM and CPU, then enumerate GPUs with the given probes.
    /// Fails only when system memory cannot be read.
    pub fn detect_with_probes(probes: &[Box<dyn GpuProbe>]) -> Result<Self> {
        let (cpu, memory) = detect_cpu_and_memory()?;
        let is_wsl = is_running_in_wsl();
        let ctx = ProbeContext::new(memory.total_gb, cpu.name.clone(), is_wsl);
        let gpus = enumerate_gpus(probes, &ctx);
        let specs = Self::from_parts(memory, cpu, gpus, is_wsl);
        tracing::info!(
            "Detected {:.1} GB RAM ({:.1} GB available), {} cores, {} GPU(s), backend {}",
            specs.total_ram_gb,
            specs.available_ram_gb,
            specs.total_cpu_cores,
            specs.gpus.len(),
            specs.backend
        );
        Ok(specs)
    }

    /// Assemble a snapshot from already-detected parts. GPUs are ordered by
    /// VRAM (unknown counts as 0, ties keep probe order) and the first one
    /// fills the primary-GPU fields.
    pub fn from_parts(memory: MemoryInfo, cpu: CpuInfo, mut gpus: Vec<GpuInfo>, is_wsl: bool) -> Self {
        gpus.sort_by(|a, b| b.vram_or_zero().total_cmp(&a.vram_or_zero()));
        let cpu_backend = cpu_backend(&cpu.name);
        let primary = gpus.first();
        SystemSpecs {
            total_ram_gb: memory.total_gb,
            available_ram_gb: memory.available_gb,
            total_cpu_cores: cpu.cores,
            has_gpu: primary.is_some(),
            gpu_vram_gb: primary.and_then(|g| g.vram_gb),
            gpu_name: primary.map(|g| g.name.clone()),
            gpu_count: primary.map_or(0, |g| g.count),
            unified_memory: primary.is_some_and(|g| g.unified_memory),
            backend: primary.map_or(cpu_backend, |g| g.backend),
            cpu_name: cpu.name,
            cpu_backend,
            gpus,
            is_wsl,
        }
    }

    /// The primary (largest-VRAM) GPU, if any
    pub fn primary_gpu(&self) -> Option<&GpuInfo> {
        self.gpus.first()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn cpu(cores: usize, name: &str) -> CpuInfo {
        CpuInfo {
            cores,
            name: name.to_string(),
            arch: "x86_64".to_string(),
        }
    }

    pub fn memory(total_gb: f64, available_gb: f64) -> MemoryInfo {
        MemoryInfo {
            total_gb,
            available_gb,
        }
    }

    /// CPU-only machine with 80% of RAM available
    pub fn spec_no_gpu(ram_gb: f64, cores: usize) -> SystemSpecs {
        let mut specs = SystemSpecs::from_parts(memory(ram_gb, ram_gb * 0.8), cpu(cores, "Intel Xeon"), Vec::new(), false);
        specs.cpu_backend = GpuBackend::CpuX86;
        specs.backend = GpuBackend::CpuX86;
        specs
    }

    /// One CUDA GPU with 8 cores and 80% of RAM available
    pub fn spec_with_gpu(vram_gb: f64, ram_gb: f64, unified: bool) -> SystemSpecs {
        let gpu = GpuInfo {
            name: "Test GPU".to_string(),
            vram_gb: Some(vram_gb),
            backend: GpuBackend::Cuda,
            count: 1,
            unified_memory: unified,
        };
        let mut specs = SystemSpecs::from_parts(memory(ram_gb, ram_gb * 0.8), cpu(8, "Intel Xeon"), vec![gpu], false);
        specs.cpu_backend = GpuBackend::CpuX86;
        specs
    }
}
