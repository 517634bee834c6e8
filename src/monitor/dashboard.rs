//! Point-in-time dashboard assembly

use crate::aggregator::HistoryStore;
use crate::analysis::{analyze, TrendAnalysis};
use crate::events::{
    ArchitectureMetric, MetricCategory, MonitoringAlert, MonitoringEvent, Severity, Timestamp,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// History entries per metric feeding the trend buckets
pub const TREND_WINDOW: usize = 48;

/// Length of the stand-in series for a bucket without history
pub const SYNTHETIC_POINTS: usize = 24;

/// Values and trend analysis for one category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendBucket {
    pub points: Vec<f64>,
    pub analysis: TrendAnalysis,
    /// Set when `points` is the stand-in series rather than real history
    pub synthetic: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardTrends {
    pub compliance: TrendBucket,
    pub performance: TrendBucket,
    pub quality: TrendBucket,
    pub security: TrendBucket,
}

impl DashboardTrends {
    pub fn get(&self, category: MetricCategory) -> &TrendBucket {
        match category {
            MetricCategory::Compliance => &self.compliance,
            MetricCategory::Performance => &self.performance,
            MetricCategory::Quality => &self.quality,
            MetricCategory::Security => &self.security,
        }
    }

    /// Buckets in dashboard order
    pub fn iter(&self) -> impl Iterator<Item = (MetricCategory, &TrendBucket)> {
        MetricCategory::ALL
            .into_iter()
            .map(move |category| (category, self.get(category)))
    }
}

/// Read-only health snapshot, assembled fresh for every request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    /// Weighted average of metric values, 0-100
    pub overall_health: f64,
    pub metrics: Vec<ArchitectureMetric>,
    /// Active alerts
    pub alerts: Vec<MonitoringAlert>,
    pub trends: DashboardTrends,
    /// Most recent critical and error events, newest first
    pub top_issues: Vec<MonitoringEvent>,
    pub recommendations: Vec<String>,
    pub last_updated: Timestamp,
}

/// State the coordinator hands over for one dashboard
#[derive(Debug, Clone, Default)]
pub struct DashboardInputs {
    pub history: HistoryStore,
    pub active_alerts: Vec<MonitoringAlert>,
    pub top_issues: Vec<MonitoringEvent>,
    /// Critical events currently held in the event log
    pub critical_events: usize,
}

/// Assemble a dashboard from fresh metrics and a state copy
///
/// # Arguments
///
/// * `metrics` - Metrics from this request's collection pass
/// * `inputs` - History, alerts and events copied from the monitor state
/// * `weight` - Health weight of each category
pub fn assemble(
    metrics: Vec<ArchitectureMetric>,
    inputs: DashboardInputs,
    weight: impl Fn(MetricCategory) -> f64,
) -> DashboardSnapshot {
    let overall_health = overall_health(&metrics, weight);
    let trends = DashboardTrends {
        compliance: trend_bucket(&inputs.history, MetricCategory::Compliance),
        performance: trend_bucket(&inputs.history, MetricCategory::Performance),
        quality: trend_bucket(&inputs.history, MetricCategory::Quality),
        security: trend_bucket(&inputs.history, MetricCategory::Security),
    };
    let recommendations =
        recommendations(overall_health, &inputs.active_alerts, inputs.critical_events);

    DashboardSnapshot {
        overall_health,
        metrics,
        alerts: inputs.active_alerts,
        trends,
        top_issues: inputs.top_issues,
        recommendations,
        last_updated: Utc::now(),
    }
}

/// Weighted average of metric values by category, rounded
///
/// Every metric contributes its value times its category weight; the sum is
/// divided by the total weight. Returns 0 when there are no metrics.
pub fn overall_health(
    metrics: &[ArchitectureMetric],
    weight: impl Fn(MetricCategory) -> f64,
) -> f64 {
    let (weighted, total) = metrics.iter().fold((0.0, 0.0), |(sum, total), metric| {
        let w = weight(metric.category);
        (sum + metric.value * w, total + w)
    });

    if total <= 0.0 {
        return 0.0;
    }
    (weighted / total).round().clamp(0.0, 100.0)
}

/// Average the recent history of every metric in a category
///
/// Series are aligned at their newest entry so that position `i` from the end
/// averages the values available at that position.
pub fn trend_bucket(history: &HistoryStore, category: MetricCategory) -> TrendBucket {
    let series: Vec<Vec<f64>> = history
        .metric_names()
        .into_iter()
        .filter(|name| MetricCategory::from_metric_name(name) == Some(category))
        .map(|name| history.recent_values(&name, TREND_WINDOW))
        .filter(|values| !values.is_empty())
        .collect();

    if series.is_empty() {
        let points = synthetic_series(category);
        return TrendBucket {
            analysis: analyze(&points, category.as_str()),
            points,
            synthetic: true,
        };
    }

    let length = series.iter().map(Vec::len).max().unwrap_or(0);
    let points: Vec<f64> = (0..length)
        .map(|position| {
            let from_end = length - position;
            let available: Vec<f64> = series
                .iter()
                .filter(|values| values.len() >= from_end)
                .map(|values| values[values.len() - from_end])
                .collect();
            available.iter().sum::<f64>() / available.len() as f64
        })
        .collect();

    TrendBucket {
        analysis: analyze(&points, category.as_str()),
        points,
        synthetic: false,
    }
}

/// Baseline, drift per point and volatility of the stand-in series
fn synthetic_profile(category: MetricCategory) -> (f64, f64, f64) {
    match category {
        MetricCategory::Compliance => (85.0, 0.2, 2.0),
        MetricCategory::Performance => (78.0, -0.1, 4.0),
        MetricCategory::Quality => (82.0, 0.15, 3.0),
        MetricCategory::Security => (88.0, 0.05, 1.5),
    }
}

/// Deterministic series keeping an empty bucket renderable
pub fn synthetic_series(category: MetricCategory) -> Vec<f64> {
    let (baseline, drift, volatility) = synthetic_profile(category);
    (0..SYNTHETIC_POINTS)
        .map(|i| {
            let i = i as f64;
            (baseline + drift * i + volatility * (0.9 * i).sin()).clamp(0.0, 100.0)
        })
        .collect()
}

fn recommendations(
    overall_health: f64,
    active_alerts: &[MonitoringAlert],
    critical_events: usize,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    let critical_alerts = active_alerts
        .iter()
        .filter(|a| a.severity == Severity::Critical)
        .count();
    if critical_alerts > 0 {
        recommendations.push(format!(
            "Resolve {} critical alert(s) before starting new feature work",
            critical_alerts
        ));
    }
    if active_alerts.len() > critical_alerts {
        recommendations.push(format!(
            "Review {} open warning alert(s) and schedule fixes",
            active_alerts.len() - critical_alerts
        ));
    }
    if critical_events > 0 {
        recommendations.push(format!(
            "Investigate {} critical event(s) reported by file checks",
            critical_events
        ));
    }
    if overall_health > 0.0 && overall_health < 70.0 {
        recommendations.push(
            "Overall health is below 70; prioritize architectural refactoring".to_string(),
        );
    }
    if recommendations.is_empty() {
        recommendations
            .push("Architecture health is stable; continue regular monitoring".to_string());
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::events::{AlertType, TrendDirection};

    fn create_test_metric(name: &str, category: MetricCategory, value: f64) -> ArchitectureMetric {
        ArchitectureMetric {
            name: name.to_string(),
            value,
            unit: "score".to_string(),
            category,
            trend: TrendDirection::Stable,
            timestamp: Utc::now(),
            warning_threshold: 70.0,
            critical_threshold: 50.0,
            description: String::new(),
            recommendations: Vec::new(),
        }
    }

    fn create_test_alert(severity: Severity) -> MonitoringAlert {
        MonitoringAlert {
            id: "alert-1".to_string(),
            alert_type: AlertType::Threshold,
            severity,
            title: "modularity-compliance below warning threshold".to_string(),
            description: String::new(),
            timestamp: Utc::now(),
            source: "modularity-compliance".to_string(),
            immediate_actions: Vec::new(),
            short_term_actions: Vec::new(),
            long_term_actions: Vec::new(),
            resolved: false,
            resolved_at: None,
            resolved_by: None,
        }
    }

    #[test]
    fn test_overall_health_weighting() {
        let config = Config::default();
        let metrics = vec![
            create_test_metric("modularity-compliance", MetricCategory::Compliance, 100.0),
            create_test_metric("performance-score", MetricCategory::Performance, 0.0),
            create_test_metric("type-safety", MetricCategory::Quality, 0.0),
            create_test_metric("dependency-health", MetricCategory::Security, 0.0),
        ];

        assert_eq!(overall_health(&metrics, |c| config.health_weight(c)), 30.0);
    }

    #[test]
    fn test_overall_health_empty() {
        let config = Config::default();
        assert_eq!(overall_health(&[], |c| config.health_weight(c)), 0.0);
    }

    #[test]
    fn test_overall_health_missing_weight_falls_back() {
        let mut config = Config::default();
        config.health_weights.remove("security");
        let metrics = vec![
            create_test_metric("modularity-compliance", MetricCategory::Compliance, 80.0),
            create_test_metric("dependency-health", MetricCategory::Security, 40.0),
        ];

        // (80 * 0.30 + 40 * 0.10) / 0.40 = 70
        assert_eq!(overall_health(&metrics, |c| config.health_weight(c)), 70.0);
    }

    #[test]
    fn test_trend_bucket_aligns_series_at_newest_entry() {
        let mut history = HistoryStore::default();
        for value in [60.0, 70.0, 80.0] {
            history.append(create_test_metric(
                "modularity-compliance",
                MetricCategory::Compliance,
                value,
            ));
        }
        history.append(create_test_metric(
            "architecture-layering",
            MetricCategory::Compliance,
            100.0,
        ));

        let bucket = trend_bucket(&history, MetricCategory::Compliance);
        assert!(!bucket.synthetic);
        assert_eq!(bucket.points, vec![60.0, 70.0, 90.0]);
    }

    #[test]
    fn test_trend_bucket_uses_name_keywords() {
        let mut history = HistoryStore::default();
        // Declared as compliance but bucketed by name
        history.append(create_test_metric(
            "dependency-health",
            MetricCategory::Compliance,
            75.0,
        ));

        assert!(!trend_bucket(&history, MetricCategory::Security).synthetic);
        assert!(trend_bucket(&history, MetricCategory::Compliance).synthetic);
    }

    #[test]
    fn test_trend_bucket_window() {
        let mut history = HistoryStore::default();
        for i in 0..60 {
            history.append(create_test_metric(
                "performance-score",
                MetricCategory::Performance,
                i as f64,
            ));
        }

        let bucket = trend_bucket(&history, MetricCategory::Performance);
        assert_eq!(bucket.points.len(), TREND_WINDOW);
        assert_eq!(bucket.points[0], 12.0);
        assert_eq!(bucket.analysis.direction, TrendDirection::Improving);
    }

    #[test]
    fn test_synthetic_series_is_deterministic() {
        for category in MetricCategory::ALL {
            let series = synthetic_series(category);
            assert_eq!(series.len(), SYNTHETIC_POINTS);
            assert_eq!(series, synthetic_series(category));
            assert!(series.iter().all(|v| (0.0..=100.0).contains(v)));
        }
        assert_eq!(synthetic_series(MetricCategory::Compliance)[0], 85.0);
    }

    #[test]
    fn test_assemble_empty_state() {
        let dashboard = assemble(Vec::new(), DashboardInputs::default(), |_| 0.25);

        assert_eq!(dashboard.overall_health, 0.0);
        assert!(dashboard.trends.iter().all(|(_, bucket)| bucket.synthetic));
        assert_eq!(
            dashboard.recommendations,
            vec!["Architecture health is stable; continue regular monitoring"]
        );
    }

    #[test]
    fn test_recommendations_from_counts() {
        let alerts = vec![
            create_test_alert(Severity::Critical),
            create_test_alert(Severity::High),
            create_test_alert(Severity::High),
        ];

        let recs = recommendations(85.0, &alerts, 4);
        assert_eq!(recs.len(), 3);
        assert!(recs[0].contains("1 critical alert"));
        assert!(recs[1].contains("2 open warning alert"));
        assert!(recs[2].contains("4 critical event"));

        let recs = recommendations(55.0, &[], 0);
        assert!(recs[0].contains("below 70"));
    }
}
