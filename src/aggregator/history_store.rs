//! Bounded per-metric history
//!
//! This module provides the HistoryStore which keeps the most recent samples of
//! every metric in a FIFO ring buffer with a fixed per-name capacity.

use crate::events::{ArchitectureMetric, MetricHistoryEntry, Timestamp};
use chrono::{Duration, Utc};
use std::collections::{HashMap, VecDeque};

/// Default number of entries retained per metric name
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Per-metric ring buffer of history entries
///
/// Every metric name owns its own buffer. When a buffer grows past
/// `max_entries`, the oldest entries are dropped first.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    buffers: HashMap<String, VecDeque<MetricHistoryEntry>>,
    max_entries: usize,
}

impl HistoryStore {
    /// Create a new HistoryStore with the given per-metric capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use archwatch::aggregator::HistoryStore;
    ///
    /// let store = HistoryStore::new(100);
    /// assert!(store.get("modularity-compliance", None).is_empty());
    /// ```
    pub fn new(max_entries: usize) -> Self {
        Self {
            buffers: HashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Append the latest sample of a metric under its name
    pub fn append(&mut self, metric: ArchitectureMetric) {
        let max_entries = self.max_entries;
        let entry = MetricHistoryEntry {
            timestamp: metric.timestamp,
            metric,
        };
        let buffer = self
            .buffers
            .entry(entry.metric.name.clone())
            .or_insert_with(|| VecDeque::with_capacity(max_entries));
        buffer.push_back(entry);

        while buffer.len() > max_entries {
            buffer.pop_front();
        }
    }

    /// Get stored entries for a metric, oldest first
    ///
    /// # Arguments
    ///
    /// * `name` - Metric name
    /// * `since_hours` - When set, only entries newer than `now - since_hours`
    ///   are returned. Zero or negative windows return nothing; NaN and
    ///   windows reaching past the representable time range return everything.
    pub fn get(&self, name: &str, since_hours: Option<f64>) -> Vec<MetricHistoryEntry> {
        let Some(buffer) = self.buffers.get(name) else {
            return Vec::new();
        };

        match since_hours.and_then(|hours| window_start(Utc::now(), hours)) {
            Some(cutoff) => {
                buffer
                    .iter()
                    .filter(|entry| entry.timestamp > cutoff)
                    .cloned()
                    .collect()
            }
            None => buffer.iter().cloned().collect(),
        }
    }

    /// Values of the last `n` entries for a metric, oldest first
    pub fn recent_values(&self, name: &str, n: usize) -> Vec<f64> {
        self.buffers
            .get(name)
            .map(|buffer| {
                let skip = buffer.len().saturating_sub(n);
                buffer.iter().skip(skip).map(|e| e.metric.value).collect()
            })
            .unwrap_or_default()
    }

    /// Names of all metrics with at least one stored entry, sorted
    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.buffers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of entries stored for a metric
    pub fn len(&self, name: &str) -> usize {
        self.buffers.get(name).map(VecDeque::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.values().all(VecDeque::is_empty)
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }
}

/// Start of a window of `hours` ending at `now`; `None` means unbounded
fn window_start(now: Timestamp, hours: f64) -> Option<Timestamp> {
    if hours.is_nan() {
        return None;
    }
    if hours <= 0.0 {
        return Some(now);
    }

    let millis = hours * 3_600_000.0;
    if millis >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(millis as i64).and_then(|window| now.checked_sub_signed(window))
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}


// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::events::{MetricCategory, TrendDirection};
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    /// A sequence of appends spread over a handful of metric names
    #[derive(Debug, Clone)]
    struct AppendSequence(Vec<(u8, u8)>);

    impl Arbitrary for AppendSequence {
        fn arbitrary(g: &mut Gen) -> Self {
            let size = usize::arbitrary(g) % 400;
            let mut appends = Vec::with_capacity(size);
            for _ in 0..size {
                appends.push((u8::arbitrary(g) % 4, u8::arbitrary(g) % 101));
            }
            AppendSequence(appends)
        }
    }

    #[quickcheck]
    fn prop_history_is_bounded_and_keeps_latest(sequence: AppendSequence) -> bool {
        let mut store = HistoryStore::new(DEFAULT_HISTORY_CAPACITY);
        let start = Utc::now();
        let mut appended: HashMap<String, Vec<i64>> = HashMap::new();

        for (i, (name_idx, value)) in sequence.0.iter().enumerate() {
            let name = format!("metric-{}", name_idx);
            let timestamp = start + Duration::milliseconds(i as i64);
            store.append(ArchitectureMetric {
                name: name.clone(),
                value: *value as f64,
                unit: "score".to_string(),
                category: MetricCategory::Quality,
                trend: TrendDirection::Stable,
                timestamp,
                warning_threshold: 70.0,
                critical_threshold: 50.0,
                description: String::new(),
                recommendations: Vec::new(),
            });
            appended.entry(name).or_default().push(i as i64);
        }

        appended.iter().all(|(name, offsets)| {
            let entries = store.get(name, None);
            let skip = offsets.len().saturating_sub(DEFAULT_HISTORY_CAPACITY);
            let expected: Vec<_> = offsets[skip..]
                .iter()
                .map(|o| start + Duration::milliseconds(*o))
                .collect();
            let actual: Vec<_> = entries.iter().map(|e| e.timestamp).collect();
            entries.len() <= DEFAULT_HISTORY_CAPACITY && actual == expected
        })
    }
}
