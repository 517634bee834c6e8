//! Real-time auxiliary metrics
//!
//! These metrics describe the monitor itself and its surroundings rather than
//! the analyzed codebase. They are merged into dashboard snapshots and never
//! recorded into history or checked against thresholds.

use crate::events::{
    ArchitectureMetric, EventSeverity, MetricCategory, MonitoringEvent, Threshold, TrendDirection,
};
use crate::triggers::WatchStats;
use chrono::Utc;
use log::{debug, warn};

/// Default memory budget for the monitor process, in megabytes
pub const DEFAULT_MEMORY_BUDGET_MB: u64 = 512;

/// Counts of recent issue events by severity
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IssueCounts {
    pub critical: usize,
    pub error: usize,
    pub warning: usize,
}

impl IssueCounts {
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a MonitoringEvent>) -> Self {
        events
            .into_iter()
            .fold(IssueCounts::default(), |mut counts, event| {
                match event.severity {
                    EventSeverity::Critical => counts.critical += 1,
                    EventSeverity::Error => counts.error += 1,
                    EventSeverity::Warning => counts.warning += 1,
                    EventSeverity::Info => {}
                }
                counts
            })
    }
}

/// Samples process and watcher state for the dashboard
#[derive(Debug, Clone)]
pub struct ProcessProbe {
    memory_budget_bytes: u64,
}

impl ProcessProbe {
    pub fn new(memory_budget_mb: u64) -> Self {
        Self {
            memory_budget_bytes: memory_budget_mb.max(1) * 1024 * 1024,
        }
    }

    /// Build the auxiliary metrics for one dashboard snapshot
    ///
    /// # Arguments
    ///
    /// * `watch` - Current watcher subscription counts
    /// * `issues` - Issue events seen over the last hour
    pub fn auxiliary_metrics(&self, watch: WatchStats, issues: IssueCounts) -> Vec<ArchitectureMetric> {
        let rss = memory_usage();
        let memory_score = memory_efficiency(rss, self.memory_budget_bytes);
        if rss > self.memory_budget_bytes {
            warn!(
                "Monitor memory usage {}MB exceeds budget of {}MB",
                rss / 1024 / 1024,
                self.memory_budget_bytes / 1024 / 1024
            );
        }
        debug!(
            "Probe: rss={}MB watched={} failed={} issues={:?}",
            rss / 1024 / 1024,
            watch.watched,
            watch.failed,
            issues
        );

        vec![
            auxiliary_metric(
                "process-memory-efficiency",
                memory_score,
                MetricCategory::Performance,
                "Share of the memory budget left unused by the monitor process",
            ),
            auxiliary_metric(
                "watch-coverage",
                watch_coverage(watch),
                MetricCategory::Compliance,
                "Percentage of discovered files with an active change subscription",
            ),
            auxiliary_metric(
                "code-quality-signal",
                quality_signal(issues),
                MetricCategory::Quality,
                "Quality signal derived from issue events over the last hour",
            ),
        ]
    }
}

impl Default for ProcessProbe {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_BUDGET_MB)
    }
}

fn auxiliary_metric(
    name: &str,
    value: f64,
    category: MetricCategory,
    description: &str,
) -> ArchitectureMetric {
    let threshold = Threshold::default();
    ArchitectureMetric {
        name: name.to_string(),
        value: value.clamp(0.0, 100.0),
        unit: "percent".to_string(),
        category,
        trend: TrendDirection::Stable,
        timestamp: Utc::now(),
        warning_threshold: threshold.warning,
        critical_threshold: threshold.critical,
        description: description.to_string(),
        recommendations: Vec::new(),
    }
}

fn memory_efficiency(rss: u64, budget: u64) -> f64 {
    if budget == 0 {
        return 0.0;
    }
    (100.0 * (1.0 - rss as f64 / budget as f64)).clamp(0.0, 100.0)
}

fn watch_coverage(watch: WatchStats) -> f64 {
    let total = watch.watched + watch.failed;
    if total == 0 {
        return 100.0;
    }
    watch.watched as f64 / total as f64 * 100.0
}

fn quality_signal(issues: IssueCounts) -> f64 {
    let penalty = 10 * issues.critical + 5 * issues.error + issues.warning;
    (100.0 - penalty as f64).clamp(0.0, 100.0)
}

/// Resident memory of the current process in bytes, 0 if unavailable
pub fn memory_usage() -> u64 {
    #[cfg(target_os = "macos")]
    {
        use std::process::Command;

        if let Ok(output) = Command::new("ps")
            .args(["-o", "rss=", "-p", &std::process::id().to_string()])
            .output()
        {
            if let Ok(output_str) = String::from_utf8(output.stdout) {
                if let Ok(rss_kb) = output_str.trim().parse::<u64>() {
                    return rss_kb * 1024;
                }
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<u64>().ok());
            if let Some(kb) = rss_kb {
                return kb * 1024;
            }
        }
    }

    #[cfg(unix)]
    {
        // Peak rather than current usage
        unsafe {
            let mut usage: libc::rusage = std::mem::zeroed();
            if libc::getrusage(libc::RUSAGE_SELF, &mut usage) == 0 {
                #[cfg(target_os = "macos")]
                return usage.ru_maxrss as u64;

                #[cfg(not(target_os = "macos"))]
                return (usage.ru_maxrss as u64) * 1024;
            }
        }
    }

    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventType;

    fn create_test_event(severity: EventSeverity) -> MonitoringEvent {
        MonitoringEvent::new(
            EventType::Violation,
            severity,
            "src/lib.rs",
            "Test issue",
            MetricCategory::Quality,
        )
    }

    #[test]
    fn test_issue_counts() {
        let events = vec![
            create_test_event(EventSeverity::Critical),
            create_test_event(EventSeverity::Error),
            create_test_event(EventSeverity::Error),
            create_test_event(EventSeverity::Warning),
            create_test_event(EventSeverity::Info),
        ];
        let counts = IssueCounts::from_events(&events);
        assert_eq!(
            counts,
            IssueCounts {
                critical: 1,
                error: 2,
                warning: 1
            }
        );
    }

    #[test]
    fn test_quality_signal() {
        assert_eq!(quality_signal(IssueCounts::default()), 100.0);
        assert_eq!(
            quality_signal(IssueCounts {
                critical: 1,
                error: 2,
                warning: 3
            }),
            77.0
        );
        assert_eq!(
            quality_signal(IssueCounts {
                critical: 20,
                error: 0,
                warning: 0
            }),
            0.0
        );
    }

    #[test]
    fn test_watch_coverage() {
        assert_eq!(watch_coverage(WatchStats { watched: 0, failed: 0 }), 100.0);
        assert_eq!(watch_coverage(WatchStats { watched: 3, failed: 1 }), 75.0);
    }

    #[test]
    fn test_memory_efficiency() {
        let mb = 1024 * 1024;
        assert_eq!(memory_efficiency(0, 512 * mb), 100.0);
        assert_eq!(memory_efficiency(256 * mb, 512 * mb), 50.0);
        assert_eq!(memory_efficiency(1024 * mb, 512 * mb), 0.0);
    }

    #[test]
    fn test_auxiliary_metrics() {
        let probe = ProcessProbe::default();
        let metrics = probe.auxiliary_metrics(
            WatchStats { watched: 10, failed: 0 },
            IssueCounts::default(),
        );

        let names: Vec<&str> = metrics.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["process-memory-efficiency", "watch-coverage", "code-quality-signal"]
        );
        for metric in &metrics {
            assert!((0.0..=100.0).contains(&metric.value));
            assert_eq!(metric.trend, TrendDirection::Stable);
        }
        assert_eq!(metrics[1].value, 100.0);
    }

    #[cfg(unix)]
    #[test]
    fn test_memory_usage_reported() {
        assert!(memory_usage() > 0);
    }
}
