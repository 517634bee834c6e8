use crate::aggregator::{EventLog, HistoryStore};
use crate::alerts::AlertRegistry;
use crate::collectors::IssueCounts;
use crate::config::Config;
use crate::error::MonitorError;
use crate::events::{
    ArchitectureMetric, EventSeverity, MetricHistoryEntry, MonitoringAlert, MonitoringEvent,
    Threshold, Timestamp,
};
use crate::monitor::dashboard::DashboardInputs;
use chrono::{Duration, Utc};
use log::{debug, info};
use std::collections::HashMap;

/// Number of events listed as top issues on the dashboard
pub const TOP_ISSUES: usize = 10;

/// Everything the monitor mutates
///
/// Owned by exactly one coordinator task; every other task works on copies.
#[derive(Debug, Clone)]
pub struct MonitorState {
    history: HistoryStore,
    alerts: AlertRegistry,
    events: EventLog,
    thresholds: HashMap<String, Threshold>,
}

impl MonitorState {
    pub fn new(config: &Config) -> Self {
        Self {
            history: HistoryStore::new(config.monitor.history_capacity),
            alerts: AlertRegistry::new(),
            events: EventLog::new(config.monitor.event_capacity),
            thresholds: config.thresholds.clone(),
        }
    }

    /// Check a cycle's metrics against their thresholds, then store them
    ///
    /// # Returns
    ///
    /// The alerts raised by this cycle
    pub fn record_cycle(&mut self, metrics: Vec<ArchitectureMetric>) -> Vec<MonitoringAlert> {
        let mut raised = Vec::new();
        for metric in metrics {
            if let Some(alert) = self.alerts.evaluate(&metric) {
                raised.push(alert);
            }
            self.history.append(metric);
        }
        raised
    }

    /// Log an event and raise a violation alert for it if severe enough
    pub fn record_event(&mut self, event: MonitoringEvent) -> Option<MonitoringAlert> {
        debug!(
            "Recording {} event from {}",
            event.severity.as_str(),
            event.source
        );
        let alert = self.alerts.evaluate_event(&event);
        self.events.append(event);
        alert
    }

    pub fn resolve_alert(&mut self, id: &str, resolved_by: &str) -> Option<MonitoringAlert> {
        self.alerts.resolve(id, resolved_by)
    }

    /// Replace a metric's threshold; the next cycle picks it up
    pub fn set_threshold(&mut self, name: &str, threshold: Threshold) -> Result<(), MonitorError> {
        threshold
            .validate()
            .map_err(|reason| MonitorError::InvalidThreshold {
                name: name.to_string(),
                reason,
            })?;
        info!(
            "Threshold for {} set to warning {} / critical {}",
            name, threshold.warning, threshold.critical
        );
        self.thresholds.insert(name.to_string(), threshold);
        Ok(())
    }

    pub fn thresholds(&self) -> &HashMap<String, Threshold> {
        &self.thresholds
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn metric_history(&self, name: &str, since_hours: Option<f64>) -> Vec<MetricHistoryEntry> {
        self.history.get(name, since_hours)
    }

    pub fn events_in_range(&self, from: Timestamp, to: Timestamp) -> Vec<MonitoringEvent> {
        self.events.in_range(from, to)
    }

    pub fn active_alerts(&self) -> Vec<MonitoringAlert> {
        self.alerts.active()
    }

    pub fn alert(&self, id: &str) -> Option<MonitoringAlert> {
        self.alerts.get(id)
    }

    /// Issue events from the last hour, by severity
    pub fn recent_issue_counts(&self) -> IssueCounts {
        IssueCounts::from_events(self.events.since(Utc::now() - Duration::hours(1)))
    }

    /// Copy out what a dashboard needs
    pub fn dashboard_inputs(&self) -> DashboardInputs {
        DashboardInputs {
            history: self.history.clone(),
            active_alerts: self.alerts.active(),
            top_issues: self.events.recent_issues(TOP_ISSUES),
            critical_events: self.events.count_severity(EventSeverity::Critical),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventType, MetricCategory, Severity, TrendDirection};

    fn create_test_metric(name: &str, value: f64) -> ArchitectureMetric {
        ArchitectureMetric {
            name: name.to_string(),
            value,
            unit: "score".to_string(),
            category: MetricCategory::Compliance,
            trend: TrendDirection::Stable,
            timestamp: Utc::now(),
            warning_threshold: 70.0,
            critical_threshold: 50.0,
            description: String::new(),
            recommendations: Vec::new(),
        }
    }

    fn create_test_event(severity: EventSeverity) -> MonitoringEvent {
        MonitoringEvent::new(
            EventType::Violation,
            severity,
            "src/lib.rs",
            "Cyclic dependency",
            MetricCategory::Compliance,
        )
    }

    #[test]
    fn test_record_cycle_alerts_and_appends() {
        let mut state = MonitorState::new(&Config::default());
        let raised = state.record_cycle(vec![
            create_test_metric("modularity-compliance", 45.0),
            create_test_metric("type-safety", 95.0),
        ]);

        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].severity, Severity::Critical);
        assert_eq!(state.history().len("modularity-compliance"), 1);
        assert_eq!(state.history().len("type-safety"), 1);
        assert_eq!(state.active_alerts().len(), 1);
    }

    #[test]
    fn test_record_event() {
        let mut state = MonitorState::new(&Config::default());

        assert!(state.record_event(create_test_event(EventSeverity::Info)).is_none());
        let alert = state
            .record_event(create_test_event(EventSeverity::Critical))
            .unwrap();
        assert_eq!(alert.severity, Severity::Critical);

        let inputs = state.dashboard_inputs();
        assert_eq!(inputs.top_issues.len(), 1);
        assert_eq!(inputs.critical_events, 1);
        assert_eq!(state.recent_issue_counts().critical, 1);
    }

    #[test]
    fn test_set_threshold_validates() {
        let mut state = MonitorState::new(&Config::default());

        assert!(matches!(
            state.set_threshold("type-safety", Threshold::new(60.0, 80.0)),
            Err(MonitorError::InvalidThreshold { .. })
        ));
        assert_eq!(
            state.thresholds()["type-safety"],
            Threshold::new(90.0, 75.0)
        );

        state
            .set_threshold("custom-metric", Threshold::new(60.0, 40.0))
            .unwrap();
        assert_eq!(
            state.thresholds()["custom-metric"],
            Threshold::new(60.0, 40.0)
        );
    }
}
