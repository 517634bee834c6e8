//! Core data types for the architecture health monitor
//!
//! This module defines the values that flow between the collector, the history
//! store, the alert registry and the dashboard: metrics, monitoring events,
//! alerts and their enumerations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// Quality dimension a metric belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum MetricCategory {
    Compliance,
    Performance,
    Quality,
    Security,
}

impl MetricCategory {
    /// All categories in dashboard order
    pub const ALL: [MetricCategory; 4] = [
        MetricCategory::Compliance,
        MetricCategory::Performance,
        MetricCategory::Quality,
        MetricCategory::Security,
    ];

    /// Lowercase name used in exports and configuration keys
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricCategory::Compliance => "compliance",
            MetricCategory::Performance => "performance",
            MetricCategory::Quality => "quality",
            MetricCategory::Security => "security",
        }
    }

    /// Bucket a metric into a category by keywords found in its name
    ///
    /// Used for dashboard trend buckets, where history is keyed by metric name
    /// only. Returns `None` when no keyword matches.
    pub fn from_metric_name(name: &str) -> Option<MetricCategory> {
        let name = name.to_lowercase();
        let matches = |keywords: &[&str]| keywords.iter().any(|k| name.contains(k));

        if matches(&["compliance", "modularity", "architecture"]) {
            Some(MetricCategory::Compliance)
        } else if matches(&["performance", "latency", "memory"]) {
            Some(MetricCategory::Performance)
        } else if matches(&["quality", "consistency", "interface", "type"]) {
            Some(MetricCategory::Quality)
        } else if matches(&["security", "dependency", "vulnerab"]) {
            Some(MetricCategory::Security)
        } else {
            None
        }
    }
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of change for a metric or a value series
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Stable => "stable",
            TrendDirection::Declining => "declining",
        }
    }
}

/// A single named quality score produced by one collection cycle
///
/// Metrics are immutable once created; the next cycle supersedes a metric by
/// producing a new value under the same name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArchitectureMetric {
    pub name: String,
    /// Score in the range 0-100
    pub value: f64,
    pub unit: String,
    pub category: MetricCategory,
    pub trend: TrendDirection,
    pub timestamp: Timestamp,
    pub warning_threshold: f64,
    pub critical_threshold: f64,
    pub description: String,
    pub recommendations: Vec<String>,
}

/// Snapshot of a metric kept in the history store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricHistoryEntry {
    pub metric: ArchitectureMetric,
    pub timestamp: Timestamp,
}

/// Warning and critical levels for one metric
///
/// A value at or below `critical` is critical; at or below `warning` is a
/// warning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Threshold {
    pub warning: f64,
    pub critical: f64,
}

impl Threshold {
    pub fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }

    /// Check that both levels are scores and critical does not exceed warning
    pub fn validate(&self) -> Result<(), String> {
        for (label, value) in [("warning", self.warning), ("critical", self.critical)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(format!("{} threshold {} is outside 0-100", label, value));
            }
        }
        if self.critical > self.warning {
            return Err(format!(
                "critical threshold {} is above warning threshold {}",
                self.critical, self.warning
            ));
        }
        Ok(())
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::new(70.0, 50.0)
    }
}

/// Kind of monitoring event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Violation,
    Improvement,
    Alert,
    Metric,
    Trend,
}

/// Severity of a monitoring event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl EventSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSeverity::Info => "info",
            EventSeverity::Warning => "warning",
            EventSeverity::Error => "error",
            EventSeverity::Critical => "critical",
        }
    }

    /// Critical and error events count as issues on the dashboard
    pub fn is_issue(&self) -> bool {
        matches!(self, EventSeverity::Error | EventSeverity::Critical)
    }
}

/// Something observed by the monitor, typically the outcome of a file check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub severity: EventSeverity,
    pub timestamp: Timestamp,
    pub source: String,
    pub message: String,
    pub category: MetricCategory,
    pub tags: Vec<String>,
}

impl MonitoringEvent {
    /// Create an event stamped with a fresh id and the current time
    pub fn new(
        event_type: EventType,
        severity: EventSeverity,
        source: impl Into<String>,
        message: impl Into<String>,
        category: MetricCategory,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type,
            severity,
            timestamp: Utc::now(),
            source: source.into(),
            message: message.into(),
            category,
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Kind of alert
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Threshold,
    Anomaly,
    Violation,
    Trend,
}

/// Severity level for alerts and analyzer issues
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// A threshold or event-driven violation, open until resolved
///
/// The lifecycle is one-way: once `resolved` is set it is never cleared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub timestamp: Timestamp,
    pub source: String,
    pub immediate_actions: Vec<String>,
    pub short_term_actions: Vec<String>,
    pub long_term_actions: Vec<String>,
    pub resolved: bool,
    pub resolved_at: Option<Timestamp>,
    pub resolved_by: Option<String>,
}
