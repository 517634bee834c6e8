/// Analyzer contract, command-backed and mock analyzers
pub mod analyzer;

/// Concurrent analyzer fan-out with per-call timeouts
pub mod metric_collector;

/// Process and watcher auxiliary metrics
pub mod process_probe;

pub use analyzer::{
    Analyzer, AnalyzerReport, AnalyzerScope, CommandAnalyzer, Issue, MockAnalyzer,
};
pub use metric_collector::{AnalyzerFailure, Collection, FileCheck, FileReport, MetricCollector};
pub use process_probe::{IssueCounts, ProcessProbe};
