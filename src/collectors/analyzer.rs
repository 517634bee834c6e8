//! Metric analyzer contract and built-in implementations
//!
//! Analyzers are the external collaborators that turn a codebase root or a
//! single file into a score for one quality dimension. The monitor never looks
//! inside a score; it only schedules analyzers, bounds how long they may run,
//! and records what they return.

use crate::error::AnalyzerError;
use crate::events::{MetricCategory, Severity};
use crate::triggers::FileKind;
use log::debug;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Future returned by [`Analyzer::analyze`]
pub type AnalyzeFuture<'a> =
    Pin<Box<dyn Future<Output = Result<AnalyzerReport, AnalyzerError>> + Send + 'a>>;

/// Trait for metric analyzers
pub trait Analyzer: Send + Sync {
    /// Metric name produced by this analyzer, e.g. `modularity-compliance`
    fn name(&self) -> &str;

    /// Quality dimension the score belongs to
    fn category(&self) -> MetricCategory;

    fn description(&self) -> &str {
        ""
    }

    /// Whether a change to a file of this kind should re-run the analyzer
    fn relevant_to(&self, kind: FileKind) -> bool {
        kind == FileKind::Source
    }

    /// Analyze a codebase root or a single file
    fn analyze<'a>(&'a self, path: &'a Path) -> AnalyzeFuture<'a>;
}

/// A problem reported by an analyzer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
}

/// Result of a single analyzer call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerReport {
    /// Score in the range 0-100
    pub overall_score: f64,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl AnalyzerReport {
    pub fn new(overall_score: f64) -> Self {
        Self {
            overall_score,
            metadata: serde_json::Map::new(),
            recommendations: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn with_recommendations(mut self, recommendations: Vec<String>) -> Self {
        self.recommendations = recommendations;
        self
    }

    pub fn with_issues(mut self, issues: Vec<Issue>) -> Self {
        self.issues = issues;
        self
    }

    /// Parse a report from JSON and check that the score is a finite number
    pub fn from_json(json: &str) -> Result<Self, AnalyzerError> {
        let report: AnalyzerReport = serde_json::from_str(json)
            .map_err(|e| AnalyzerError::InvalidReport(format!("malformed JSON: {}", e)))?;
        if !report.overall_score.is_finite() {
            return Err(AnalyzerError::InvalidReport(format!(
                "overallScore is not a finite number: {}",
                report.overall_score
            )));
        }
        Ok(report)
    }
}

/// Which file changes re-run an analyzer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerScope {
    #[default]
    Source,
    Manifest,
    All,
}

impl AnalyzerScope {
    fn covers(&self, kind: FileKind) -> bool {
        match self {
            AnalyzerScope::Source => kind == FileKind::Source,
            AnalyzerScope::Manifest => kind == FileKind::Manifest,
            AnalyzerScope::All => kind != FileKind::Other,
        }
    }
}

/// Analyzer backed by an external program
///
/// The program is run with the configured arguments followed by the target
/// path, and must print an [`AnalyzerReport`] as JSON on stdout.
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    name: String,
    category: MetricCategory,
    description: String,
    scope: AnalyzerScope,
    program: PathBuf,
    args: Vec<String>,
}

impl CommandAnalyzer {
    /// Create a new command analyzer
    ///
    /// # Arguments
    ///
    /// * `name` - Metric name the analyzer reports under
    /// * `category` - Quality dimension of the score
    /// * `program` - Executable to run
    /// * `args` - Arguments passed before the target path
    pub fn new(
        name: impl Into<String>,
        category: MetricCategory,
        program: impl Into<PathBuf>,
        args: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            description: String::new(),
            scope: AnalyzerScope::default(),
            program: program.into(),
            args,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_scope(mut self, scope: AnalyzerScope) -> Self {
        self.scope = scope;
        self
    }
}

impl Analyzer for CommandAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> MetricCategory {
        self.category
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn relevant_to(&self, kind: FileKind) -> bool {
        self.scope.covers(kind)
    }

    fn analyze<'a>(&'a self, path: &'a Path) -> AnalyzeFuture<'a> {
        Box::pin(async move {
            debug!(
                "Running analyzer {} ({}) on {}",
                self.name,
                self.program.display(),
                path.display()
            );

            // The collector's timeout drops this future; the child must die with it
            let output = tokio::process::Command::new(&self.program)
                .args(&self.args)
                .arg(path)
                .kill_on_drop(true)
                .output()
                .await?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(AnalyzerError::Failed(format!(
                    "{} exited with status {}: {}",
                    self.program.display(),
                    output.status,
                    stderr.trim()
                )));
            }

            let stdout = String::from_utf8_lossy(&output.stdout);
            AnalyzerReport::from_json(stdout.trim())
        })
    }
}

/// Analyzer returning canned responses, for tests and demos
pub struct MockAnalyzer {
    name: String,
    category: MetricCategory,
    scope: AnalyzerScope,
    responses: Vec<Result<AnalyzerReport, String>>,
    current_index: AtomicUsize,
    delay: Option<Duration>,
    call_count: AtomicUsize,
}

impl MockAnalyzer {
    /// Create a mock analyzer with multiple responses
    ///
    /// Responses are returned in order. After the last response, the analyzer
    /// cycles back to the first.
    pub fn with_responses(
        name: impl Into<String>,
        category: MetricCategory,
        responses: Vec<Result<AnalyzerReport, String>>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            scope: AnalyzerScope::default(),
            responses,
            current_index: AtomicUsize::new(0),
            delay: None,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Create a mock analyzer that always reports the given score
    ///
    /// # Example
    /// ```
    /// use archwatch::collectors::MockAnalyzer;
    /// use archwatch::events::MetricCategory;
    ///
    /// let analyzer = MockAnalyzer::score("type-safety", MetricCategory::Quality, 92.0);
    /// ```
    pub fn score(name: impl Into<String>, category: MetricCategory, score: f64) -> Self {
        Self::with_responses(name, category, vec![Ok(AnalyzerReport::new(score))])
    }

    /// Create a mock analyzer that always returns the given report
    pub fn report(name: impl Into<String>, category: MetricCategory, report: AnalyzerReport) -> Self {
        Self::with_responses(name, category, vec![Ok(report)])
    }

    /// Create a mock analyzer that always fails
    pub fn error(name: impl Into<String>, category: MetricCategory, message: &str) -> Self {
        Self::with_responses(name, category, vec![Err(message.to_string())])
    }

    /// Add a delay to all responses (useful for testing timeout behavior)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_scope(mut self, scope: AnalyzerScope) -> Self {
        self.scope = scope;
        self
    }

    /// Get the number of times analyze() has been called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Analyzer for MockAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> MetricCategory {
        self.category
    }

    fn description(&self) -> &str {
        "Mock analyzer"
    }

    fn relevant_to(&self, kind: FileKind) -> bool {
        self.scope.covers(kind)
    }

    fn analyze<'a>(&'a self, _path: &'a Path) -> AnalyzeFuture<'a> {
        Box::pin(async move {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if self.responses.is_empty() {
                return Err(AnalyzerError::Failed("no mock responses configured".to_string()));
            }

            let index = self.current_index.fetch_add(1, Ordering::SeqCst) % self.responses.len();
            match &self.responses[index] {
                Ok(report) => Ok(report.clone()),
                Err(message) => Err(AnalyzerError::Failed(message.clone())),
            }
        })
    }
}
