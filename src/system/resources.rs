//! RAM and CPU detection
//!
//! Memory and CPU figures come from `sysinfo`. When the OS reports no
//! available memory (seen on some macOS versions), it is derived from
//! `vm_stat` on macOS or approximated as a share of total RAM elsewhere.

use super::command::run_command;
use super::gpu::GIB;
use crate::error::{PoleError, Result};
use serde::{Deserialize, Serialize};
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

/// Share of total RAM assumed available when the OS reports none
pub const AVAILABLE_RAM_FALLBACK_RATIO: f64 = 0.8;

/// Page size assumed when `vm_stat` does not print one
const DEFAULT_VM_PAGE_SIZE: u64 = 16384;

/// CPU information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuInfo {
    /// Logical CPU count
    pub cores: usize,
    /// Model name, falling back to the vendor id
    pub name: String,
    /// Architecture (`x86_64`, `aarch64`, ...)
    pub arch: String,
}

/// Memory information in GB (1024³ bytes)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub total_gb: f64,
    pub available_gb: f64,
}

impl CpuInfo {
    /// Collect CPU information
    pub fn collect(sys: &System) -> Self {
        let first = sys.cpus().first();
        let brand = first.map(|c| c.brand().trim().to_string()).unwrap_or_default();
        let vendor = first.map(|c| c.vendor_id().trim().to_string()).unwrap_or_default();
        CpuInfo {
            cores: num_cpus::get(),
            name: cpu_display_name(&brand, &vendor),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

impl MemoryInfo {
    /// Collect memory information. Fails only when total RAM reads as zero.
    pub fn collect(sys: &System) -> Result<Self> {
        Self::from_bytes(sys.total_memory(), sys.available_memory(), available_ram_fallback)
    }

    /// Build from raw byte counts. `fallback` receives total GB and supplies
    /// the available figure when the OS reports none.
    pub fn from_bytes(total: u64, available: u64, fallback: impl FnOnce(f64) -> f64) -> Result<Self> {
        if total == 0 {
            return Err(PoleError::ResourceDetection(
                "total system memory reported as 0".to_string(),
            ));
        }
        let total_gb = total as f64 / GIB;
        let available_gb = if available == 0 {
            tracing::debug!("OS reported no available memory, using fallback");
            fallback(total_gb)
        } else {
            available as f64 / GIB
        };
        Ok(MemoryInfo {
            total_gb,
            available_gb,
        })
    }
}

/// Refresh only what the snapshot needs
pub fn refreshed_system() -> System {
    System::new_with_specifics(
        RefreshKind::new()
            .with_memory(MemoryRefreshKind::everything())
            .with_cpu(CpuRefreshKind::everything()),
    )
}

/// Detect CPU and memory together
pub fn detect_cpu_and_memory() -> Result<(CpuInfo, MemoryInfo)> {
    let sys = refreshed_system();
    let memory = MemoryInfo::collect(&sys)?;
    Ok((CpuInfo::collect(&sys), memory))
}

fn cpu_display_name(brand: &str, vendor: &str) -> String {
    [brand, vendor]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or("Unknown CPU")
        .to_string()
}

fn available_ram_fallback(total_gb: f64) -> f64 {
    if cfg!(target_os = "macos") {
        if let Some(gb) = run_command("vm_stat", &[]).and_then(|out| parse_vm_stat(&out)) {
            return gb;
        }
    }
    total_gb * AVAILABLE_RAM_FALLBACK_RATIO
}

/// Available memory (GB) from `vm_stat` output: free, inactive and purgeable
/// pages times the page size. `None` when the sum is zero.
pub fn parse_vm_stat(output: &str) -> Option<f64> {
    let mut page_size = DEFAULT_VM_PAGE_SIZE;
    let mut pages = 0u64;
    for line in output.lines() {
        if line.starts_with("Mach Virtual Memory Statistics:") {
            if let Some(size) = line
                .split("page size of ")
                .nth(1)
                .and_then(|rest| rest.split_whitespace().next())
                .and_then(|n| n.parse().ok())
            {
                page_size = size;
            }
            continue;
        }
        for key in ["Pages free:", "Pages inactive:", "Pages purgeable:"] {
            if let Some(rest) = line.strip_prefix(key) {
                pages += rest.trim().trim_end_matches('.').parse::<u64>().unwrap_or(0);
            }
        }
    }
    let bytes = pages.saturating_mul(page_size);
    (bytes > 0).then(|| bytes as f64 / GIB)
}
