//! GPU descriptors, acceleration backends, and name-based heuristics

use serde::{Deserialize, Serialize};
use std::fmt;

pub(crate) const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Acceleration backend used for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GpuBackend {
    Cuda,
    Metal,
    Rocm,
    Vulkan,
    Sycl,
    CpuArm,
    CpuX86,
}

impl GpuBackend {
    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            GpuBackend::Cuda => "CUDA",
            GpuBackend::Metal => "Metal",
            GpuBackend::Rocm => "ROCm",
            GpuBackend::Vulkan => "Vulkan",
            GpuBackend::Sycl => "SYCL",
            GpuBackend::CpuArm => "CPU (ARM)",
            GpuBackend::CpuX86 => "CPU (x86)",
        }
    }

    /// Whether this is one of the CPU-only backends
    pub fn is_cpu(&self) -> bool {
        matches!(self, GpuBackend::CpuArm | GpuBackend::CpuX86)
    }
}

impl fmt::Display for GpuBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One detected GPU model (possibly several identical devices)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuInfo {
    /// Marketing name as reported by the driver tool
    pub name: String,
    /// Total VRAM in GB across `count` devices; `None` when unknown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vram_gb: Option<f64>,
    pub backend: GpuBackend,
    /// Number of identical devices
    pub count: u32,
    /// GPU shares system RAM (Apple Silicon)
    pub unified_memory: bool,
}

impl GpuInfo {
    /// A single discrete device
    pub fn new(name: impl Into<String>, vram_gb: Option<f64>, backend: GpuBackend) -> Self {
        Self {
            name: name.into(),
            vram_gb,
            backend,
            count: 1,
            unified_memory: false,
        }
    }

    /// VRAM used for ordering, with unknown treated as 0
    pub fn vram_or_zero(&self) -> f64 {
        self.vram_gb.unwrap_or(0.0)
    }
}

/// Known GPU names and their VRAM in GB, checked in order against the
/// lower-cased name. More specific patterns come before their prefixes.
const VRAM_BY_NAME: &[(&str, f64)] = &[
    // GeForce RTX 50
    ("5090", 32.0),
    ("5080", 16.0),
    ("5070 ti", 16.0),
    ("5070", 12.0),
    ("5060 ti", 16.0),
    ("5060", 8.0),
    // GeForce RTX 40
    ("4090", 24.0),
    ("4080", 16.0),
    ("4070 ti", 12.0),
    ("4070", 12.0),
    ("4060 ti", 16.0),
    ("4060", 8.0),
    // GeForce RTX 30
    ("3090", 24.0),
    ("3080 ti", 12.0),
    ("3080", 10.0),
    ("3070", 8.0),
    ("3060 ti", 8.0),
    ("3060", 12.0),
    // data center
    ("h100", 80.0),
    ("a100", 80.0),
    ("l40", 48.0),
    ("a10", 24.0),
    ("t4", 16.0),
    // Radeon RX 9000 / 7000 / 6000 / 5000
    ("9070 xt", 16.0),
    ("9070", 12.0),
    ("7900 xtx", 24.0),
    ("7900", 20.0),
    ("7800", 16.0),
    ("7700", 12.0),
    ("7600", 8.0),
    ("6950", 16.0),
    ("6900", 16.0),
    ("6800", 16.0),
    ("6750", 12.0),
    ("6700", 12.0),
    ("6650", 8.0),
    ("6600", 8.0),
    ("6500", 4.0),
    ("5700 xt", 8.0),
    ("5700", 8.0),
    ("5600", 6.0),
    ("5500", 4.0),
    // generic families
    ("rtx", 8.0),
    ("gtx", 4.0),
    ("rx ", 8.0),
    ("radeon", 8.0),
];

/// Estimate VRAM (GB) from a GPU name; 0.0 means no estimate
pub fn estimate_vram_from_name(name: &str) -> f64 {
    let lower = name.to_lowercase();
    VRAM_BY_NAME
        .iter()
        .find(|(pat, _)| lower.contains(pat))
        .map(|&(_, gb)| gb)
        .unwrap_or(0.0)
}

const BACKEND_BY_NAME: &[(GpuBackend, &[&str])] = &[
    (GpuBackend::Cuda, &["nvidia", "geforce", "quadro", "tesla", "rtx"]),
    (GpuBackend::Vulkan, &["amd", "radeon", "ati"]),
    (GpuBackend::Sycl, &["intel", "arc"]),
];

/// Infer the backend from an adapter name; unknown vendors get Vulkan
pub fn infer_backend_from_name(name: &str) -> GpuBackend {
    let lower = name.to_lowercase();
    BACKEND_BY_NAME
        .iter()
        .find(|(_, pats)| pats.iter().any(|p| lower.contains(p)))
        .map(|&(backend, _)| backend)
        .unwrap_or(GpuBackend::Vulkan)
}

/// CPU-only backend for a CPU name on a given architecture
pub fn cpu_backend_for(cpu_name: &str, arch: &str) -> GpuBackend {
    if cpu_name.to_lowercase().contains("apple") || arch == "aarch64" || arch == "arm" {
        GpuBackend::CpuArm
    } else {
        GpuBackend::CpuX86
    }
}

/// CPU-only backend for a CPU name on the running architecture
pub fn cpu_backend(cpu_name: &str) -> GpuBackend {
    cpu_backend_for(cpu_name, std::env::consts::ARCH)
}

/// Reported VRAM in GB, replaced by the name estimate when implausibly small
/// (< 0.1 GB). `None` when neither source gives a positive figure.
pub fn resolve_vram(reported_gb: f64, name: &str) -> Option<f64> {
    let vram = if reported_gb < 0.1 {
        estimate_vram_from_name(name)
    } else {
        reported_gb
    };
    (vram > 0.0).then_some(vram)
}

/// VRAM for a Windows adapter-RAM figure. The adapter query caps at 4 GB on
/// many drivers, so a figure at or below 4.1 GB is replaced by a larger name
/// estimate as well.
pub fn resolve_adapter_vram(raw_bytes: u64, name: &str) -> Option<f64> {
    let reported = raw_bytes as f64 / GIB;
    let estimate = estimate_vram_from_name(name);
    let vram = if (reported < 0.1 || (reported <= 4.1 && estimate > 4.1)) && estimate > 0.0 {
        estimate
    } else {
        reported
    };
    (vram > 0.0).then_some(vram)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_vram_from_name() {
        let cases = [
            ("NVIDIA GeForce RTX 4090", 24.0),
            ("RTX 4080", 16.0),
            ("NVIDIA GeForce RTX 4070 Ti", 12.0),
            ("NVIDIA GeForce RTX 4060 Ti", 16.0),
            ("H100", 80.0),
            ("NVIDIA A100-SXM4-80GB", 80.0),
            ("AMD Radeon RX 7900 XTX", 24.0),
            ("RX 7800", 16.0),
            ("RTX 3060", 12.0),
            ("NVIDIA GeForce RTX 2080", 8.0),
            ("NVIDIA GeForce GTX 1080", 4.0),
            ("AMD Radeon Pro", 8.0),
            ("Unknown", 0.0),
        ];
        for (name, want) in cases {
            assert_eq!(estimate_vram_from_name(name), want, "{}", name);
        }
    }

    #[test]
    fn test_infer_backend_from_name() {
        assert_eq!(infer_backend_from_name("NVIDIA GeForce RTX 3080"), GpuBackend::Cuda);
        assert_eq!(infer_backend_from_name("Quadro P2000"), GpuBackend::Cuda);
        assert_eq!(infer_backend_from_name("AMD Radeon RX 7900"), GpuBackend::Vulkan);
        assert_eq!(infer_backend_from_name("Intel Arc A770"), GpuBackend::Sycl);
        assert_eq!(infer_backend_from_name("Unknown GPU"), GpuBackend::Vulkan);
    }

    #[test]
    fn test_cpu_backend() {
        assert_eq!(cpu_backend_for("Apple M1 Pro", "x86_64"), GpuBackend::CpuArm);
        assert_eq!(cpu_backend_for("apple silicon", "x86_64"), GpuBackend::CpuArm);
        assert_eq!(cpu_backend_for("Intel Xeon", "x86_64"), GpuBackend::CpuX86);
        assert_eq!(cpu_backend_for("Neoverse-N1", "aarch64"), GpuBackend::CpuArm);
        assert!(cpu_backend("anything").is_cpu());
    }

    #[test]
    fn test_resolve_vram() {
        assert_eq!(resolve_vram(24.0, "RTX 4090"), Some(24.0));
        assert_eq!(resolve_vram(0.0, "RTX 4090"), Some(24.0));
        assert_eq!(resolve_vram(0.05, "Mystery GPU"), None);
        // only the adapter query applies the 4 GB cap rule
        assert_eq!(resolve_vram(4.0, "RTX 4090"), Some(4.0));
    }

    #[test]
    fn test_resolve_adapter_vram() {
        assert_eq!(resolve_adapter_vram(0, "NVIDIA GeForce RTX 4090"), Some(24.0));
        assert_eq!(resolve_adapter_vram(4 * 1024 * 1024 * 1024, "NVIDIA GeForce RTX 4090"), Some(24.0));
        assert_eq!(resolve_adapter_vram(32 * 1024 * 1024 * 1024, "Unknown GPU"), Some(32.0));
        assert_eq!(resolve_adapter_vram(2 * 1024 * 1024 * 1024, "GTX 1050"), Some(2.0));
        assert_eq!(resolve_adapter_vram(0, "Unknown GPU"), None);
    }

    #[test]
    fn test_backend_labels() {
        assert_eq!(GpuBackend::Rocm.to_string(), "ROCm");
        assert_eq!(GpuBackend::CpuX86.label(), "CPU (x86)");
        assert!(!GpuBackend::Metal.is_cpu());
    }
}
