use crate::events::{
    AlertType, ArchitectureMetric, EventSeverity, MonitoringAlert, MonitoringEvent, Severity,
};
use chrono::Utc;
use log::{debug, info, warn};
use uuid::Uuid;

const LONG_TERM_ACTIONS: [&str; 2] = [
    "Implement continuous monitoring",
    "Set up automated alerts",
];

const VIOLATION_IMMEDIATE_ACTIONS: [&str; 2] = [
    "Review the reported violation",
    "Assess the impact on dependent modules",
];

const VIOLATION_SHORT_TERM_ACTIONS: [&str; 2] = [
    "Fix the underlying violation",
    "Add a regression check for the affected area",
];

/// Tracks open and resolved alerts
///
/// The registry raises alerts when metrics cross their thresholds or when
/// severe monitoring events arrive. It does not deduplicate: every breach that
/// fires produces a new alert. Alerts move from open to resolved exactly once.
#[derive(Debug, Default, Clone)]
pub struct AlertRegistry {
    /// Alerts in creation order
    alerts: Vec<MonitoringAlert>,
}

impl AlertRegistry {
    pub fn new() -> Self {
        Self { alerts: Vec::new() }
    }

    /// Compare a metric against its thresholds and raise an alert on a breach
    ///
    /// A value at or below the critical threshold raises a `Critical` alert;
    /// at or below the warning threshold raises a `High` alert. Values above
    /// the warning threshold raise nothing.
    ///
    /// # Returns
    ///
    /// The newly created alert, if any
    pub fn evaluate(&mut self, metric: &ArchitectureMetric) -> Option<MonitoringAlert> {
        let (severity, level, threshold) = if metric.value <= metric.critical_threshold {
            (Severity::Critical, "critical", metric.critical_threshold)
        } else if metric.value <= metric.warning_threshold {
            (Severity::High, "warning", metric.warning_threshold)
        } else {
            debug!(
                "{} at {:.1} is above warning threshold {:.1}",
                metric.name, metric.value, metric.warning_threshold
            );
            return None;
        };

        let recommendations = &metric.recommendations;
        let alert = MonitoringAlert {
            id: Uuid::new_v4().to_string(),
            alert_type: AlertType::Threshold,
            severity,
            title: format!("{} below {} threshold", metric.name, level),
            description: format!(
                "{} scored {:.1}, at or below the {} threshold of {:.1}",
                metric.name, metric.value, level, threshold
            ),
            timestamp: Utc::now(),
            source: metric.name.clone(),
            immediate_actions: recommendations.iter().take(2).cloned().collect(),
            short_term_actions: recommendations.iter().skip(2).take(2).cloned().collect(),
            long_term_actions: LONG_TERM_ACTIONS.iter().map(|s| s.to_string()).collect(),
            resolved: false,
            resolved_at: None,
            resolved_by: None,
        };

        warn!("Threshold alert raised: {}", alert.title);
        self.alerts.push(alert.clone());
        Some(alert)
    }

    /// Raise a violation alert for critical and error events
    ///
    /// Critical events raise `Critical` alerts and error events raise `High`
    /// alerts. Warning and info events raise nothing.
    pub fn evaluate_event(&mut self, event: &MonitoringEvent) -> Option<MonitoringAlert> {
        let severity = match event.severity {
            EventSeverity::Critical => Severity::Critical,
            EventSeverity::Error => Severity::High,
            EventSeverity::Warning | EventSeverity::Info => return None,
        };

        let alert = MonitoringAlert {
            id: Uuid::new_v4().to_string(),
            alert_type: AlertType::Violation,
            severity,
            title: format!("Violation detected in {}", event.source),
            description: event.message.clone(),
            timestamp: Utc::now(),
            source: event.source.clone(),
            immediate_actions: VIOLATION_IMMEDIATE_ACTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            short_term_actions: VIOLATION_SHORT_TERM_ACTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            long_term_actions: LONG_TERM_ACTIONS.iter().map(|s| s.to_string()).collect(),
            resolved: false,
            resolved_at: None,
            resolved_by: None,
        };

        warn!("Violation alert raised: {}", alert.title);
        self.alerts.push(alert.clone());
        Some(alert)
    }

    /// Mark an alert as resolved
    ///
    /// Unknown ids and alerts that are already resolved are left untouched.
    ///
    /// # Returns
    ///
    /// The resolved alert, or `None` if nothing changed
    pub fn resolve(&mut self, id: &str, resolved_by: &str) -> Option<MonitoringAlert> {
        let Some(alert) = self.alerts.iter_mut().find(|a| a.id == id) else {
            debug!("Ignoring resolve for unknown alert {}", id);
            return None;
        };

        if alert.resolved {
            debug!("Alert {} already resolved", id);
            return None;
        }

        alert.resolved = true;
        alert.resolved_at = Some(Utc::now());
        alert.resolved_by = Some(resolved_by.to_string());
        info!("Alert {} resolved by {}", id, resolved_by);
        Some(alert.clone())
    }

    /// All alerts that have not been resolved
    pub fn active(&self) -> Vec<MonitoringAlert> {
        self.alerts.iter().filter(|a| !a.resolved).cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<MonitoringAlert> {
        self.alerts.iter().find(|a| a.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}
