//! The `/status` page: host metrics and the live connection count.

use std::fmt::Write;

/// Filesystem roots whose free space is summed.
#[cfg(unix)]
const ROOTS: &[&str] = &["/"];
#[cfg(not(unix))]
const ROOTS: &[&str] = &[];

/// A snapshot of host resources. Metrics the platform cannot report are 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostMetrics {
    /// Unused physical memory, in bytes.
    pub free_memory: u64,
    /// Space available to unprivileged users across all roots, in bytes.
    pub free_disk: u64,
    pub processors: usize,
}

impl HostMetrics {
    pub fn sample() -> Self {
        Self {
            free_memory: free_memory(),
            free_disk: ROOTS.iter().map(|root| free_disk(root)).sum(),
            processors: num_cpus::get(),
        }
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn free_memory() -> u64 {
    match nix::sys::sysinfo::sysinfo() {
        Ok(info) => info.ram_unused(),
        Err(e) => {
            tracing::warn!(error = %e, "sysinfo failed");
            0
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn free_memory() -> u64 {
    0
}

#[cfg(unix)]
fn free_disk(root: &str) -> u64 {
    match nix::sys::statvfs::statvfs(root) {
        Ok(stat) => (stat.blocks_available() as u64).saturating_mul(stat.fragment_size() as u64),
        Err(e) => {
            tracing::warn!(root, error = %e, "statvfs failed");
            0
        }
    }
}

#[cfg(not(unix))]
fn free_disk(_root: &str) -> u64 {
    0
}

/// Renders the status page for the current host state.
pub fn status_html(active_connections: usize) -> String {
    render(&HostMetrics::sample(), active_connections)
}

pub fn render(metrics: &HostMetrics, active_connections: usize) -> String {
    let mut html = String::from(r#"<html><head><meta charset="UTF-8"></head><body>"#);
    html.push_str("<h1>Server status</h1>");

    // Writing into a String cannot fail.
    let _ = write!(html, "<p>Free memory: {} bytes</p>", metrics.free_memory);
    let _ = write!(html, "<p>Free disk space: {} bytes</p>", metrics.free_disk);
    let _ = write!(html, "<p>Processors: {}</p>", metrics.processors);
    let _ = write!(html, "<p>Active connections: {active_connections}</p>");

    html.push_str("</body></html>");
    html
}
