//! Memory usage sampling around model invocation.
//!
//! Purely observational: samples are logged at debug level and never feed
//! back into request handling. On platforms without `/proc` every sample is
//! `None` and the probe does nothing.

use std::sync::OnceLock;
use tracing::debug;

const KIB_PER_MIB: f64 = 1024.0;

/// Resident and peak resident set size of the process, in KiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    pub resident_kib: u64,
    pub peak_kib: u64,
}

impl MemoryUsage {
    pub fn current() -> Option<Self> {
        #[cfg(target_os = "linux")]
        {
            let status = std::fs::read_to_string("/proc/self/status").ok()?;
            Self::parse_status(&status)
        }
        #[cfg(not(target_os = "linux"))]
        {
            None
        }
    }

    /// Parses the `VmRSS` and `VmHWM` lines of `/proc/<pid>/status`.
    pub fn parse_status(status: &str) -> Option<Self> {
        let mut resident = None;
        let mut peak = None;
        for line in status.lines() {
            if let Some(rest) = line.strip_prefix("VmRSS:") {
                resident = parse_kib(rest);
            } else if let Some(rest) = line.strip_prefix("VmHWM:") {
                peak = parse_kib(rest);
            }
        }
        Some(Self {
            resident_kib: resident?,
            peak_kib: peak?,
        })
    }
}

fn parse_kib(value: &str) -> Option<u64> {
    value.trim().trim_end_matches("kB").trim().parse().ok()
}

/// Change in memory usage across one invocation, in KiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReport {
    pub after: MemoryUsage,
    pub resident_delta_kib: i64,
    pub resident_drift_kib: i64,
    pub peak_drift_kib: i64,
}

/// Tracks memory around invocations; drift is measured against the first
/// sample recorded after an invocation.
#[derive(Debug, Default)]
pub struct MemoryProbe {
    baseline: OnceLock<MemoryUsage>,
}

impl MemoryProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&self) -> Option<MemoryUsage> {
        MemoryUsage::current()
    }

    pub fn record(&self, before: Option<MemoryUsage>) -> Option<MemoryReport> {
        let after = MemoryUsage::current()?;
        let report = self.compare(before?, after);

        debug!(
            "Current Mem: {:.2} MiB, Peak Mem: {:.2} MiB, Invocation Delta: {:.2} MiB",
            report.after.resident_kib as f64 / KIB_PER_MIB,
            report.after.peak_kib as f64 / KIB_PER_MIB,
            report.resident_delta_kib as f64 / KIB_PER_MIB,
        );
        debug!(
            "Current Mem Diff: {:.2} MiB, Peak Mem Diff: {:.2} MiB",
            report.resident_drift_kib as f64 / KIB_PER_MIB,
            report.peak_drift_kib as f64 / KIB_PER_MIB,
        );

        Some(report)
    }

    fn compare(&self, before: MemoryUsage, after: MemoryUsage) -> MemoryReport {
        let baseline = *self.baseline.get_or_init(|| after);
        MemoryReport {
            after,
            resident_delta_kib: after.resident_kib as i64 - before.resident_kib as i64,
            resident_drift_kib: after.resident_kib as i64 - baseline.resident_kib as i64,
            peak_drift_kib: after.peak_kib as i64 - baseline.peak_kib as i64,
        }
    }
}
