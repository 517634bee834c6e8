//! Bounded log of monitoring events

use crate::events::{EventSeverity, MonitoringEvent, Timestamp};
use std::collections::VecDeque;

/// Default number of events retained
pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

/// FIFO log of monitoring events with a fixed capacity
///
/// Once the log is full, appending drops the oldest event.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<MonitoringEvent>,
    max_size: usize,
}

impl EventLog {
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            events: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    pub fn append(&mut self, event: MonitoringEvent) {
        self.events.push_back(event);
        while self.events.len() > self.max_size {
            self.events.pop_front();
        }
    }

    /// Events with `from <= timestamp <= to`, oldest first
    pub fn in_range(&self, from: Timestamp, to: Timestamp) -> Vec<MonitoringEvent> {
        self.events
            .iter()
            .filter(|event| event.timestamp >= from && event.timestamp <= to)
            .cloned()
            .collect()
    }

    /// The `limit` most recent critical or error events, newest first
    pub fn recent_issues(&self, limit: usize) -> Vec<MonitoringEvent> {
        self.events
            .iter()
            .rev()
            .filter(|event| event.severity.is_issue())
            .take(limit)
            .cloned()
            .collect()
    }

    /// Events newer than `since`, oldest first
    pub fn since(&self, since: Timestamp) -> Vec<&MonitoringEvent> {
        self.events.iter().filter(|e| e.timestamp >= since).collect()
    }

    pub fn count_severity(&self, severity: EventSeverity) -> usize {
        self.events.iter().filter(|e| e.severity == severity).count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventType, MetricCategory};
    use chrono::{Duration, Utc};

    fn create_test_event(severity: EventSeverity, timestamp: Timestamp) -> MonitoringEvent {
        let mut event = MonitoringEvent::new(
            EventType::Violation,
            severity,
            "src/core/module.rs",
            "Test violation",
            MetricCategory::Compliance,
        );
        event.timestamp = timestamp;
        event
    }

    #[test]
    fn test_capacity_enforcement() {
        let mut log = EventLog::new(5);
        let now = Utc::now();
        for i in 0..10 {
            log.append(create_test_event(EventSeverity::Info, now + Duration::seconds(i)));
        }

        assert_eq!(log.len(), 5);
        let all = log.in_range(now - Duration::hours(1), now + Duration::hours(1));
        assert_eq!(all[0].timestamp, now + Duration::seconds(5));
    }

    #[test]
    fn test_in_range_is_inclusive() {
        let mut log = EventLog::default();
        let now = Utc::now();
        log.append(create_test_event(EventSeverity::Info, now - Duration::minutes(10)));
        log.append(create_test_event(EventSeverity::Info, now - Duration::minutes(5)));
        log.append(create_test_event(EventSeverity::Info, now));

        let ranged = log.in_range(now - Duration::minutes(5), now);
        assert_eq!(ranged.len(), 2);
        assert!(log.in_range(now + Duration::seconds(1), now).is_empty());
    }

    #[test]
    fn test_recent_issues_newest_first() {
        let mut log = EventLog::default();
        let now = Utc::now();
        log.append(create_test_event(EventSeverity::Critical, now - Duration::seconds(3)));
        log.append(create_test_event(EventSeverity::Warning, now - Duration::seconds(2)));
        log.append(create_test_event(EventSeverity::Error, now - Duration::seconds(1)));
        log.append(create_test_event(EventSeverity::Info, now));

        let issues = log.recent_issues(10);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].severity, EventSeverity::Error);
        assert_eq!(issues[1].severity, EventSeverity::Critical);
        assert_eq!(log.recent_issues(1).len(), 1);
        assert_eq!(log.count_severity(EventSeverity::Critical), 1);
    }
}
