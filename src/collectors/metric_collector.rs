use crate::aggregator::HistoryStore;
use crate::analysis::trend;
use crate::collectors::analyzer::{Analyzer, AnalyzerReport};
use crate::error::AnalyzerError;
use crate::events::{ArchitectureMetric, MetricCategory, Threshold, TrendDirection};
use crate::triggers::FileKind;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{self, JoinSet};

/// Number of history entries averaged when tagging a metric's trend
pub const TREND_LOOKBACK: usize = 5;

/// Points a new value must move away from the recent mean to count as a trend
pub const TREND_MARGIN: f64 = 5.0;

/// An analyzer call that produced no metric
#[derive(Debug)]
pub struct AnalyzerFailure {
    pub analyzer: String,
    pub error: AnalyzerError,
}

/// Outcome of one collection cycle
#[derive(Debug, Default)]
pub struct Collection {
    /// One metric per successful analyzer, in registration order
    pub metrics: Vec<ArchitectureMetric>,
    pub failures: Vec<AnalyzerFailure>,
    pub duration: Duration,
}

/// A successful analyzer report for a single file
#[derive(Debug, Clone)]
pub struct FileReport {
    pub analyzer: String,
    pub category: MetricCategory,
    pub report: AnalyzerReport,
}

/// Outcome of running the relevant analyzers against one changed file
#[derive(Debug)]
pub struct FileCheck {
    pub path: PathBuf,
    pub kind: FileKind,
    pub reports: Vec<FileReport>,
    pub failures: Vec<AnalyzerFailure>,
}

/// Fan-out/fan-in caller of the registered analyzers
///
/// Every analyzer is invoked concurrently on its own task, and each call is
/// bounded by `analyzer_timeout`. A failed or timed-out analyzer contributes
/// nothing to the cycle; the remaining analyzers are unaffected.
pub struct MetricCollector {
    /// Codebase root passed to analyzers on full cycles
    root: PathBuf,
    analyzers: Vec<Arc<dyn Analyzer>>,
    analyzer_timeout: Duration,
    /// Threshold used for metrics without an entry in the threshold table
    default_threshold: Threshold,
}

impl MetricCollector {
    /// Create a new MetricCollector with no analyzers
    ///
    /// # Arguments
    ///
    /// * `root` - Codebase root analyzed on every full cycle
    /// * `analyzer_timeout` - Upper bound for a single analyzer call
    pub fn new(root: impl Into<PathBuf>, analyzer_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            analyzers: Vec::new(),
            analyzer_timeout,
            default_threshold: Threshold::default(),
        }
    }

    pub fn with_default_threshold(mut self, threshold: Threshold) -> Self {
        self.default_threshold = threshold;
        self
    }

    /// Register an analyzer; metrics are reported in registration order
    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) {
        info!(
            "Registered analyzer {} ({})",
            analyzer.name(),
            analyzer.category()
        );
        self.analyzers.push(analyzer);
    }

    pub fn analyzer_count(&self) -> usize {
        self.analyzers.len()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run every analyzer against the root and build this cycle's metrics
    ///
    /// # Arguments
    ///
    /// * `history` - Point-in-time copy of the history, used for trend tagging
    /// * `thresholds` - Threshold table keyed by metric name
    pub async fn collect(
        &self,
        history: &HistoryStore,
        thresholds: &HashMap<String, Threshold>,
    ) -> Collection {
        let started = Instant::now();
        debug!(
            "Starting collection over {} analyzers in {}",
            self.analyzers.len(),
            self.root.display()
        );

        let results = self
            .run_analyzers(self.analyzers.clone(), self.root.clone())
            .await;

        let mut collection = Collection::default();
        for (analyzer, result) in results {
            match result {
                Ok(report) => {
                    let threshold = thresholds
                        .get(analyzer.name())
                        .copied()
                        .unwrap_or(self.default_threshold);
                    collection
                        .metrics
                        .push(build_metric(analyzer.as_ref(), report, history, threshold));
                }
                Err(error) => {
                    warn!(
                        "Analyzer {} failed, omitting its metric this cycle: {}",
                        analyzer.name(),
                        error
                    );
                    collection.failures.push(AnalyzerFailure {
                        analyzer: analyzer.name().to_string(),
                        error,
                    });
                }
            }
        }

        collection.duration = started.elapsed();
        info!(
            "Collected {} metrics ({} analyzer failures) in {:?}",
            collection.metrics.len(),
            collection.failures.len(),
            collection.duration
        );
        collection
    }

    /// Run the analyzers relevant to a changed file against that file only
    pub async fn check_file(&self, path: &Path, kind: FileKind) -> FileCheck {
        let relevant: Vec<Arc<dyn Analyzer>> = self
            .analyzers
            .iter()
            .filter(|a| a.relevant_to(kind))
            .cloned()
            .collect();

        debug!(
            "Checking {} with {} relevant analyzers",
            path.display(),
            relevant.len()
        );

        let mut check = FileCheck {
            path: path.to_path_buf(),
            kind,
            reports: Vec::new(),
            failures: Vec::new(),
        };

        for (analyzer, result) in self.run_analyzers(relevant, path.to_path_buf()).await {
            match result {
                Ok(report) => check.reports.push(FileReport {
                    analyzer: analyzer.name().to_string(),
                    category: analyzer.category(),
                    report,
                }),
                Err(error) => {
                    warn!(
                        "Analyzer {} failed on {}: {}",
                        analyzer.name(),
                        path.display(),
                        error
                    );
                    check.failures.push(AnalyzerFailure {
                        analyzer: analyzer.name().to_string(),
                        error,
                    });
                }
            }
        }

        check
    }

    /// Invoke analyzers concurrently, each under its own timeout
    ///
    /// Results come back in the order the analyzers were given. An analyzer
    /// whose task panics is reported as failed.
    async fn run_analyzers(
        &self,
        analyzers: Vec<Arc<dyn Analyzer>>,
        target: PathBuf,
    ) -> Vec<(Arc<dyn Analyzer>, Result<AnalyzerReport, AnalyzerError>)> {
        let timeout = self.analyzer_timeout;
        let mut tasks = JoinSet::new();
        let mut spawned: HashMap<task::Id, (usize, Arc<dyn Analyzer>)> = HashMap::new();

        for (index, analyzer) in analyzers.into_iter().enumerate() {
            let target = target.clone();
            let running = analyzer.clone();
            let handle = tasks.spawn(async move {
                match tokio::time::timeout(timeout, running.analyze(&target)).await {
                    Ok(result) => result,
                    Err(_) => Err(AnalyzerError::Timeout(timeout)),
                }
            });
            spawned.insert(handle.id(), (index, analyzer));
        }

        let mut results = Vec::with_capacity(spawned.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(e) => {
                    error!("Analyzer task did not complete: {}", e);
                    (e.id(), Err(AnalyzerError::Failed(format!("analyzer task aborted: {}", e))))
                }
            };
            if let Some((index, analyzer)) = spawned.remove(&id) {
                results.push((index, analyzer, result));
            }
        }

        results.sort_by_key(|(index, _, _)| *index);
        results
            .into_iter()
            .map(|(_, analyzer, result)| (analyzer, result))
            .collect()
    }
}

/// Build a metric from a report, tagging its trend against recent history
fn build_metric(
    analyzer: &dyn Analyzer,
    report: AnalyzerReport,
    history: &HistoryStore,
    threshold: Threshold,
) -> ArchitectureMetric {
    let name = analyzer.name().to_string();
    let value = report.overall_score.clamp(0.0, 100.0);
    let description = if analyzer.description().is_empty() {
        format!("{} score", name)
    } else {
        analyzer.description().to_string()
    };

    ArchitectureMetric {
        trend: trend_against_history(history, &name, value),
        name,
        value,
        unit: "score".to_string(),
        category: analyzer.category(),
        timestamp: Utc::now(),
        warning_threshold: threshold.warning,
        critical_threshold: threshold.critical,
        description,
        recommendations: report.recommendations,
    }
}

/// Compare a value with the mean of the last few stored values
pub fn trend_against_history(history: &HistoryStore, name: &str, value: f64) -> TrendDirection {
    let recent = history.recent_values(name, TREND_LOOKBACK);
    if recent.is_empty() {
        return TrendDirection::Stable;
    }

    let baseline = trend::mean(&recent);
    if value > baseline + TREND_MARGIN {
        TrendDirection::Improving
    } else if value < baseline - TREND_MARGIN {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::analyzer::{AnalyzeFuture, AnalyzerScope, MockAnalyzer};

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

    fn collector_with(analyzers: Vec<MockAnalyzer>) -> MetricCollector {
        let mut collector = MetricCollector::new(".", Duration::from_secs(5));
        for analyzer in analyzers {
            collector.register(Arc::new(analyzer));
        }
        collector
    }

    #[tokio::test]
    async fn test_collect_builds_metrics_in_order() {
        let collector = collector_with(vec![
            MockAnalyzer::score("modularity-compliance", MetricCategory::Compliance, 88.0),
            MockAnalyzer::score("performance-score", MetricCategory::Performance, 76.0),
        ]);
        let mut thresholds = HashMap::new();
        thresholds.insert("modularity-compliance".to_string(), Threshold::new(70.0, 50.0));

        let collection = collector.collect(&HistoryStore::default(), &thresholds).await;

        assert_eq!(collection.metrics.len(), 2);
        assert!(collection.failures.is_empty());
        assert_eq!(collection.metrics[0].name, "modularity-compliance");
        assert_eq!(collection.metrics[0].category, MetricCategory::Compliance);
        assert_eq!(collection.metrics[0].warning_threshold, 70.0);
        assert_eq!(collection.metrics[1].name, "performance-score");
        // Falls back to the default threshold
        assert_eq!(collection.metrics[1].warning_threshold, 70.0);
        assert_eq!(collection.metrics[1].critical_threshold, 50.0);
    }

    #[tokio::test]
    async fn test_partial_failure_resilience() {
        let collector = collector_with(vec![
            MockAnalyzer::score("modularity-compliance", MetricCategory::Compliance, 88.0),
            MockAnalyzer::error("dependency-health", MetricCategory::Security, "lockfile missing"),
            MockAnalyzer::score("type-safety", MetricCategory::Quality, 91.0),
        ]);

        let collection = collector
            .collect(&HistoryStore::default(), &HashMap::new())
            .await;

        assert_eq!(collection.metrics.len(), 2);
        assert_eq!(collection.failures.len(), 1);
        assert_eq!(collection.failures[0].analyzer, "dependency-health");
    }

    /// Analyzer whose task panics instead of returning
    struct PanickingAnalyzer;

    impl Analyzer for PanickingAnalyzer {
        fn name(&self) -> &str {
            "interface-consistency"
        }

        fn category(&self) -> MetricCategory {
            MetricCategory::Quality
        }

        fn analyze<'a>(&'a self, _path: &'a Path) -> AnalyzeFuture<'a> {
            Box::pin(async move {
                let crash = || -> Result<AnalyzerReport, AnalyzerError> { panic!("analyzer crashed") };
                crash()
            })
        }
    }

    #[tokio::test]
    async fn test_panicking_analyzer_is_reported_as_failure() {
        let mut collector = collector_with(vec![MockAnalyzer::score(
            "modularity-compliance",
            MetricCategory::Compliance,
            88.0,
        )]);
        collector.register(Arc::new(PanickingAnalyzer));
        collector.register(Arc::new(MockAnalyzer::score(
            "type-safety",
            MetricCategory::Quality,
            91.0,
        )));

        let collection = collector
            .collect(&HistoryStore::default(), &HashMap::new())
            .await;

        assert_eq!(collection.metrics.len(), 2);
        assert_eq!(collection.metrics[0].name, "modularity-compliance");
        assert_eq!(collection.metrics[1].name, "type-safety");
        assert_eq!(collection.failures.len(), 1);
        assert_eq!(collection.failures[0].analyzer, "interface-consistency");
        assert!(matches!(collection.failures[0].error, AnalyzerError::Failed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_analyzer_times_out() {
        let mut collector = MetricCollector::new(".", Duration::from_secs(1));
        collector.register(Arc::new(
            MockAnalyzer::score("performance-score", MetricCategory::Performance, 80.0)
                .with_delay(Duration::from_secs(60)),
        ));
        collector.register(Arc::new(MockAnalyzer::score(
            "type-safety",
            MetricCategory::Quality,
            91.0,
        )));

        let collection = collector
            .collect(&HistoryStore::default(), &HashMap::new())
            .await;

        assert_eq!(collection.metrics.len(), 1);
        assert_eq!(collection.metrics[0].name, "type-safety");
        assert!(matches!(
            collection.failures[0].error,
            AnalyzerError::Timeout(_)
        ));
    }

    #[tokio::test]
    async fn test_scores_are_clamped() {
        let collector = collector_with(vec![MockAnalyzer::score(
            "type-safety",
            MetricCategory::Quality,
            130.0,
        )]);

        let collection = collector
            .collect(&HistoryStore::default(), &HashMap::new())
            .await;
        assert_eq!(collection.metrics[0].value, 100.0);
    }

    #[tokio::test]
    async fn test_recommendations_carried_over() {
        let report = AnalyzerReport::new(60.0)
            .with_recommendations(vec!["Break up god module".to_string()]);
        let collector = collector_with(vec![MockAnalyzer::report(
            "modularity-compliance",
            MetricCategory::Compliance,
            report,
        )]);

        let collection = collector
            .collect(&HistoryStore::default(), &HashMap::new())
            .await;
        assert_eq!(
            collection.metrics[0].recommendations,
            vec!["Break up god module"]
        );
    }

    #[test]
    fn test_trend_against_history() {
        let mut history = HistoryStore::default();
        assert_eq!(
            trend_against_history(&history, "m", 50.0),
            TrendDirection::Stable
        );

        // Only the last five values count: mean of [70, 70, 70, 70, 70]
        history.append(create_test_metric("m", 10.0));
        for _ in 0..5 {
            history.append(create_test_metric("m", 70.0));
        }

        assert_eq!(
            trend_against_history(&history, "m", 75.1),
            TrendDirection::Improving
        );
        assert_eq!(
            trend_against_history(&history, "m", 75.0),
            TrendDirection::Stable
        );
        assert_eq!(
            trend_against_history(&history, "m", 65.0),
            TrendDirection::Stable
        );
        assert_eq!(
            trend_against_history(&history, "m", 64.9),
            TrendDirection::Declining
        );
    }

    #[tokio::test]
    async fn test_check_file_runs_relevant_analyzers_only() {
        let source = Arc::new(MockAnalyzer::score(
            "interface-consistency",
            MetricCategory::Quality,
            80.0,
        ));
        let manifest = Arc::new(
            MockAnalyzer::score("dependency-health", MetricCategory::Security, 70.0)
                .with_scope(AnalyzerScope::Manifest),
        );

        let mut collector = MetricCollector::new(".", Duration::from_secs(5));
        collector.register(source.clone());
        collector.register(manifest.clone());

        let check = collector
            .check_file(Path::new("Cargo.toml"), FileKind::Manifest)
            .await;

        assert_eq!(check.reports.len(), 1);
        assert_eq!(check.reports[0].analyzer, "dependency-health");
        assert_eq!(source.call_count(), 0);
        assert_eq!(manifest.call_count(), 1);
    }
}
