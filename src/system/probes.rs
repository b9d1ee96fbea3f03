//! GPU probes
//!
//! Each probe asks one source (a vendor tool, the DRM sysfs tree, the
//! Windows adapter list, the macOS display report) for the GPUs it can see.
//! Probes never fail: a missing tool, a timeout, or unparseable output means
//! "nothing found". Parsing lives in free functions so it can be tested
//! without the hardware.

use super::command::run_command;
use super::gpu::{
    infer_backend_from_name, resolve_adapter_vram, resolve_vram, GpuBackend, GpuInfo, GIB,
};
use std::fs;
use std::path::{Path, PathBuf};

/// DRM class directory on Linux
pub const DEFAULT_DRM_ROOT: &str = "/sys/class/drm";

const AMD_PCI_VENDOR: &str = "0x1002";
const INTEL_PCI_VENDOR: &str = "0x8086";

/// What a probe may need to know about the machine
#[derive(Debug, Clone)]
pub struct ProbeContext {
    /// Total system RAM (GB), shared with the GPU on unified-memory machines
    pub total_ram_gb: f64,
    pub cpu_name: String,
    /// Skip sysfs probes; under WSL the DRM tree does not describe the host GPU
    pub is_wsl: bool,
    pub drm_root: PathBuf,
}

impl ProbeContext {
    pub fn new(total_ram_gb: f64, cpu_name: impl Into<String>, is_wsl: bool) -> Self {
        Self {
            total_ram_gb,
            cpu_name: cpu_name.into(),
            is_wsl,
            drm_root: PathBuf::from(DEFAULT_DRM_ROOT),
        }
    }

    /// Whether the DRM sysfs tree may be consulted. Always false under WSL,
    /// where `/sys/class/drm` shows the paravirtual adapter rather than the
    /// host GPU; the AMD and Intel probes then rely on `rocm-smi` or `lspci`
    /// alone, and the snapshot still records `is_wsl` for display.
    pub fn sysfs_usable(&self) -> bool {
        cfg!(target_os = "linux") && !self.is_wsl
    }
}

/// One source of GPU information
pub trait GpuProbe {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// GPUs visible to this source
    fn probe(&self, ctx: &ProbeContext) -> Vec<GpuInfo>;

    /// Whether `candidate` describes a GPU already in the list
    fn is_duplicate(&self, candidate: &GpuInfo, existing: &GpuInfo) -> bool {
        names_overlap(&candidate.name, &existing.name)
    }
}

/// Case-insensitive substring match in either direction
pub fn names_overlap(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a.contains(&b) || b.contains(&a)
}

/// Probes for the running platform, in enumeration order
pub fn default_probes() -> Vec<Box<dyn GpuProbe>> {
    let mut probes: Vec<Box<dyn GpuProbe>> = vec![Box::new(NvidiaSmiProbe), Box::new(AmdProbe)];
    if cfg!(target_os = "windows") {
        probes.push(Box::new(WindowsAdapterProbe));
    }
    if cfg!(target_os = "linux") {
        probes.push(Box::new(IntelProbe));
    }
    if cfg!(target_os = "macos") {
        probes.push(Box::new(AppleSiliconProbe));
    }
    probes
}

/// Run every probe in order and merge their results, dropping duplicates
pub fn enumerate_gpus(probes: &[Box<dyn GpuProbe>], ctx: &ProbeContext) -> Vec<GpuInfo> {
    let mut gpus: Vec<GpuInfo> = Vec::new();
    for probe in probes {
        let found = probe.probe(ctx);
        tracing::debug!("{} probe found {} GPU(s)", probe.name(), found.len());
        for gpu in found {
            if gpus.iter().any(|existing| probe.is_duplicate(&gpu, existing)) {
                tracing::debug!("Skipping duplicate GPU {}", gpu.name);
                continue;
            }
            gpus.push(gpu);
        }
    }
    gpus
}

// === NVIDIA ===

/// `nvidia-smi` query
pub struct NvidiaSmiProbe;

impl GpuProbe for NvidiaSmiProbe {
    fn name(&self) -> &'static str {
        "nvidia-smi"
    }

    fn probe(&self, _ctx: &ProbeContext) -> Vec<GpuInfo> {
        run_command(
            "nvidia-smi",
            &["--query-gpu=memory.total,name", "--format=csv,noheader,nounits"],
        )
        .map(|out| parse_nvidia_smi(&out))
        .unwrap_or_default()
    }
}

/// Parse `memory.total,name` CSV rows (MiB). Devices with the same name are
/// folded into one entry with summed VRAM and a device count.
pub fn parse_nvidia_smi(output: &str) -> Vec<GpuInfo> {
    let mut groups: Vec<(String, f64, u32)> = Vec::new();
    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (mem, name) = line.split_once(',').unwrap_or((line, ""));
        let Ok(mib) = mem.trim().parse::<f64>() else {
            continue;
        };
        let name = match name.trim() {
            "" => "NVIDIA GPU",
            n => n,
        };
        match groups.iter_mut().find(|g| g.0 == name) {
            Some((_, total, count)) => {
                *total += mib;
                *count += 1;
            }
            None => groups.push((name.to_string(), mib, 1)),
        }
    }
    groups
        .into_iter()
        .map(|(name, mib, count)| GpuInfo {
            vram_gb: resolve_vram(mib / 1024.0, &name),
            name,
            backend: GpuBackend::Cuda,
            count,
            unified_memory: false,
        })
        .collect()
}

// === AMD ===

/// `rocm-smi`, falling back to the DRM sysfs tree and `lspci`
pub struct AmdProbe;

impl GpuProbe for AmdProbe {
    fn name(&self) -> &'static str {
        "amd"
    }

    fn probe(&self, ctx: &ProbeContext) -> Vec<GpuInfo> {
        if let Some(meminfo) = run_command("rocm-smi", &["--showmeminfo", "vram"]) {
            let product = run_command("rocm-smi", &["--showproductname"])
                .and_then(|out| parse_rocm_product_name(&out));
            return vec![amd_from_rocm(&meminfo, product)];
        }
        if !ctx.sysfs_usable() {
            return Vec::new();
        }
        let Some(card) = scan_drm(&ctx.drm_root, AMD_PCI_VENDOR).into_iter().next() else {
            return Vec::new();
        };
        let name = run_command("lspci", &[])
            .and_then(|out| parse_lspci_amd_name(&out))
            .unwrap_or_else(|| "AMD GPU".to_string());
        vec![amd_from_sysfs(&card, name)]
    }
}

/// Build the ROCm descriptor from `--showmeminfo vram` output
pub fn amd_from_rocm(meminfo: &str, product: Option<String>) -> GpuInfo {
    let (bytes, cards) = parse_rocm_vram(meminfo);
    let name = product.unwrap_or_else(|| "AMD GPU".to_string());
    GpuInfo {
        vram_gb: resolve_vram(bytes as f64 / GIB, &name),
        name,
        backend: GpuBackend::Rocm,
        count: cards.max(1),
        unified_memory: false,
    }
}

/// Build the Vulkan descriptor for an AMD card found in sysfs
pub fn amd_from_sysfs(card: &DrmCard, name: String) -> GpuInfo {
    let reported = card.vram_bytes.unwrap_or(0) as f64 / GIB;
    let vram = resolve_vram(reported, &name);
    GpuInfo::new(name, vram, GpuBackend::Vulkan)
}

/// Sum the `total` (not `used`) VRAM byte counts, one per card
pub fn parse_rocm_vram(output: &str) -> (u64, u32) {
    let mut total = 0u64;
    let mut cards = 0u32;
    for line in output.lines() {
        let lower = line.to_lowercase();
        if !lower.contains("total") || lower.contains("used") {
            continue;
        }
        if let Some(bytes) = line
            .split_whitespace()
            .rev()
            .filter_map(|f| f.parse::<u64>().ok())
            .find(|&n| n > 0)
        {
            total += bytes;
            cards += 1;
        }
    }
    (total, cards)
}

/// Product name from the "Card series" or "Card model" line
pub fn parse_rocm_product_name(output: &str) -> Option<String> {
    output
        .lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            lower.contains("card series") || lower.contains("card model")
        })
        .filter_map(|line| line.rsplit_once(':').map(|(_, v)| v.trim()))
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Marketing name of the first AMD display controller in `lspci` output,
/// taken from the last bracketed group of the description.
pub fn parse_lspci_amd_name(output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| {
            let lower = line.to_lowercase();
            is_display_controller(&lower)
                && (lower.contains("amd") || lower.contains("ati technologies") || lower.contains("radeon"))
        })
        .and_then(|line| {
            let desc = lspci_description(line);
            let bracketed = desc
                .rfind('[')
                .and_then(|start| desc[start..].find(']').map(|end| &desc[start + 1..start + end]));
            match bracketed {
                Some(inner) if !inner.is_empty() => Some(inner.to_string()),
                _ if !desc.is_empty() => Some(desc.to_string()),
                _ => None,
            }
        })
}

/// Whether `lspci` lists an Intel Arc display controller
pub fn lspci_has_intel_arc(output: &str) -> bool {
    output.lines().any(|line| {
        let lower = line.to_lowercase();
        lower.contains("intel") && lower.contains("arc")
    })
}

fn is_display_controller(lower: &str) -> bool {
    lower.contains("vga") || lower.contains("3d controller") || lower.contains("display controller")
}

/// Device description after the slot and class prefix
fn lspci_description(line: &str) -> &str {
    let desc = match line.rsplit_once("]:") {
        Some((_, rest)) => rest,
        None => line.split_once(": ").map_or(line, |(_, rest)| rest),
    };
    desc.split(" (rev").next().unwrap_or(desc).trim()
}

// === DRM sysfs ===

/// A `cardN` entry under the DRM class directory
#[derive(Debug, Clone, PartialEq)]
pub struct DrmCard {
    pub card: String,
    /// `mem_info_vram_total`, when present and positive
    pub vram_bytes: Option<u64>,
}

/// Cards under `root` whose PCI vendor id matches, sorted by card name.
/// Connector entries (`card0-DP-1`) are skipped.
pub fn scan_drm(root: &Path, vendor: &str) -> Vec<DrmCard> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };
    let mut cards: Vec<DrmCard> = entries
        .flatten()
        .filter_map(|entry| {
            let card = entry.file_name().to_string_lossy().to_string();
            if !card.starts_with("card") || card.contains('-') {
                return None;
            }
            let device = entry.path().join("device");
            let found_vendor = fs::read_to_string(device.join("vendor")).ok()?;
            if found_vendor.trim() != vendor {
                return None;
            }
            let vram_bytes = fs::read_to_string(device.join("mem_info_vram_total"))
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|&b| b > 0);
            Some(DrmCard { card, vram_bytes })
        })
        .collect();
    cards.sort_by(|a, b| a.card.cmp(&b.card));
    cards
}

// === Windows ===

const WINDOWS_ADAPTER_QUERY: &str = "Get-CimInstance Win32_VideoController | Select-Object Name,AdapterRAM | ForEach-Object { $_.Name + '|' + $_.AdapterRAM }";

const IGNORED_ADAPTERS: &[&str] = &["microsoft", "basic", "virtual"];

/// Win32_VideoController listing through PowerShell
pub struct WindowsAdapterProbe;

impl GpuProbe for WindowsAdapterProbe {
    fn name(&self) -> &'static str {
        "windows-adapters"
    }

    fn probe(&self, _ctx: &ProbeContext) -> Vec<GpuInfo> {
        run_command("powershell", &["-NoProfile", "-Command", WINDOWS_ADAPTER_QUERY])
            .map(|out| parse_windows_adapters(&out))
            .unwrap_or_default()
    }
}

/// Parse `Name|AdapterRAM` lines, skipping software and virtual adapters
pub fn parse_windows_adapters(output: &str) -> Vec<GpuInfo> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|line| {
            let (name, raw) = line.split_once('|').unwrap_or((line, ""));
            let name = name.trim();
            let lower = name.to_lowercase();
            if name.is_empty() || IGNORED_ADAPTERS.iter().any(|p| lower.contains(p)) {
                return None;
            }
            let raw_bytes = raw.trim().parse::<u64>().unwrap_or(0);
            Some(GpuInfo::new(
                name,
                resolve_adapter_vram(raw_bytes, name),
                infer_backend_from_name(name),
            ))
        })
        .collect()
}

// === Intel ===

/// Intel Arc via sysfs, confirmed by `lspci` when sysfs has no VRAM figure
pub struct IntelProbe;

impl GpuProbe for IntelProbe {
    fn name(&self) -> &'static str {
        "intel"
    }

    fn probe(&self, ctx: &ProbeContext) -> Vec<GpuInfo> {
        let sysfs_vram = if ctx.sysfs_usable() {
            scan_drm(&ctx.drm_root, INTEL_PCI_VENDOR)
                .into_iter()
                .find_map(|card| card.vram_bytes)
        } else {
            None
        };
        let found = match sysfs_vram {
            Some(bytes) => Some(Some(bytes as f64 / GIB)),
            None => run_command("lspci", &[])
                .filter(|out| lspci_has_intel_arc(out))
                .map(|_| None),
        };
        found
            .map(|vram| vec![GpuInfo::new("Intel Arc", vram, GpuBackend::Sycl)])
            .unwrap_or_default()
    }

    fn is_duplicate(&self, _candidate: &GpuInfo, existing: &GpuInfo) -> bool {
        existing.name.to_lowercase().contains("intel")
    }
}

// === Apple ===

/// Apple Silicon GPU from `system_profiler`
pub struct AppleSiliconProbe;

impl GpuProbe for AppleSiliconProbe {
    fn name(&self) -> &'static str {
        "apple"
    }

    fn probe(&self, ctx: &ProbeContext) -> Vec<GpuInfo> {
        run_command("system_profiler", &["SPDisplaysDataType"])
            .filter(|out| reports_apple_gpu(out))
            .map(|_| vec![apple_silicon_gpu(ctx)])
            .unwrap_or_default()
    }
}

/// Whether a display report lists an Apple GPU
pub fn reports_apple_gpu(output: &str) -> bool {
    output.lines().any(|line| {
        let lower = line.to_lowercase();
        lower.contains("apple m") || lower.contains("apple gpu")
    })
}

/// Unified-memory descriptor: all system RAM is addressable by the GPU
pub fn apple_silicon_gpu(ctx: &ProbeContext) -> GpuInfo {
    let name = if ctx.cpu_name.to_lowercase().contains("apple") {
        ctx.cpu_name.clone()
    } else {
        "Apple Silicon".to_string()
    };
    GpuInfo {
        name,
        vram_gb: (ctx.total_ram_gb > 0.0).then_some(ctx.total_ram_gb),
        backend: GpuBackend::Metal,
        count: 1,
        unified_memory: true,
    }
}
