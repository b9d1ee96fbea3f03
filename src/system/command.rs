//! External tool invocation for hardware probes

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Longest time a probe tool may run before it is treated as absent
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run `cmd` with `args` and return its stdout.
///
/// Returns `None` when the tool is missing, exits non-zero, prints invalid
/// UTF-8, or does not finish within [`PROBE_TIMEOUT`].
pub fn run_command(cmd: &str, args: &[&str]) -> Option<String> {
    run_command_with_timeout(cmd, args, PROBE_TIMEOUT)
}

pub fn run_command_with_timeout(cmd: &str, args: &[&str], timeout: Duration) -> Option<String> {
    let mut child = match Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            tracing::debug!("{} unavailable: {}", cmd, e);
            return None;
        }
    };

    // stdout is drained concurrently; a full pipe would stall the child
    let mut stdout = child.stdout.take()?;
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).map(|_| buf)
    });

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if start.elapsed() >= timeout => {
                tracing::debug!("{} timed out after {:?}", cmd, timeout);
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                tracing::debug!("waiting on {} failed: {}", cmd, e);
                return None;
            }
        }
    };

    if !status.success() {
        tracing::debug!("{} exited with {}", cmd, status);
        return None;
    }
    let bytes = reader.join().ok()?.ok()?;
    String::from_utf8(bytes).ok()
}
