//! Windows Subsystem for Linux detection

use std::sync::OnceLock;

static IS_WSL: OnceLock<bool> = OnceLock::new();

const WSL_ENV_VARS: &[&str] = &["WSL_INTEROP", "WSL_DISTRO_NAME"];
const KERNEL_ID_FILES: &[&str] = &["/proc/sys/kernel/osrelease", "/proc/version"];

/// Whether this process runs under WSL. Computed once per process; always
/// false off Linux.
pub fn is_running_in_wsl() -> bool {
    *IS_WSL.get_or_init(|| {
        let detected = cfg!(target_os = "linux") && detect_wsl();
        if detected {
            tracing::debug!("Running under WSL");
        }
        detected
    })
}

fn detect_wsl() -> bool {
    let env_hit = WSL_ENV_VARS
        .iter()
        .any(|v| std::env::var_os(v).is_some_and(|s| !s.is_empty()));
    env_hit
        || KERNEL_ID_FILES.iter().any(|p| {
            std::fs::read_to_string(p)
                .map(|s| kernel_id_mentions_microsoft(&s))
                .unwrap_or(false)
        })
}

/// A kernel release/version string as built for WSL
pub fn kernel_id_mentions_microsoft(text: &str) -> bool {
    text.to_lowercase().contains("microsoft")
}
