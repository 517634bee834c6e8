use crate::events::{MonitoringAlert, MonitoringEvent, Timestamp};
use serde::Serialize;

/// Broadcast capacity; slow subscribers miss the oldest notifications
pub const NOTIFICATION_CAPACITY: usize = 256;

/// Fire-and-forget messages published by the monitor
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MonitorNotification {
    MonitoringStarted {
        timestamp: Timestamp,
    },
    MonitoringStopped {
        timestamp: Timestamp,
    },
    PeriodicAnalysisComplete {
        metrics: usize,
        alerts_raised: usize,
        failures: usize,
        duration_ms: u64,
        timestamp: Timestamp,
    },
    ThresholdViolation {
        alert: MonitoringAlert,
        timestamp: Timestamp,
    },
    ViolationAlert {
        alert: MonitoringAlert,
        event: MonitoringEvent,
        timestamp: Timestamp,
    },
    AlertResolved {
        alert: MonitoringAlert,
        timestamp: Timestamp,
    },
    AnalysisError {
        analyzer: String,
        message: String,
        timestamp: Timestamp,
    },
}

impl MonitorNotification {
    /// Kebab-case name of the notification kind
    pub fn kind(&self) -> &'static str {
        match self {
            MonitorNotification::MonitoringStarted { .. } => "monitoring-started",
            MonitorNotification::MonitoringStopped { .. } => "monitoring-stopped",
            MonitorNotification::PeriodicAnalysisComplete { .. } => "periodic-analysis-complete",
            MonitorNotification::ThresholdViolation { .. } => "threshold-violation",
            MonitorNotification::ViolationAlert { .. } => "violation-alert",
            MonitorNotification::AlertResolved { .. } => "alert-resolved",
            MonitorNotification::AnalysisError { .. } => "analysis-error",
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            MonitorNotification::MonitoringStarted { timestamp }
            | MonitorNotification::MonitoringStopped { timestamp }
            | MonitorNotification::PeriodicAnalysisComplete { timestamp, .. }
            | MonitorNotification::ThresholdViolation { timestamp, .. }
            | MonitorNotification::ViolationAlert { timestamp, .. }
            | MonitorNotification::AlertResolved { timestamp, .. }
            | MonitorNotification::AnalysisError { timestamp, .. } => *timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_serialized_tag_matches_kind() {
        let notification = MonitorNotification::AnalysisError {
            analyzer: "type-safety".to_string(),
            message: "timed out".to_string(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["type"], notification.kind());
        assert_eq!(json["analyzer"], "type-safety");
    }
}
