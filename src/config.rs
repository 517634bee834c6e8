use crate::collectors::AnalyzerScope;
use crate::error::ConfigError;
use crate::events::{MetricCategory, Threshold};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Weight used for a category missing from the health weight table
pub const FALLBACK_HEALTH_WEIGHT: f64 = 0.10;

/// Main configuration structure for the monitor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub monitor: MonitorConfig,
    pub watcher: WatcherConfig,
    /// Threshold applied to metrics without their own entry
    pub default_threshold: Threshold,
    /// Per-metric thresholds, merged over the built-in table
    pub thresholds: HashMap<String, Threshold>,
    /// Category weights used for overall health, keyed by category name
    pub health_weights: HashMap<String, f64>,
    pub analyzers: Vec<AnalyzerConfig>,
}

/// Scheduling and retention settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Codebase root to analyze and watch
    pub root: PathBuf,
    /// Seconds between periodic collection cycles
    pub interval_seconds: u64,
    /// Upper bound for a single analyzer call
    pub analyzer_timeout_seconds: u64,
    /// History entries retained per metric
    pub history_capacity: usize,
    /// Monitoring events retained
    pub event_capacity: usize,
    /// Memory budget used for the process memory metric
    pub memory_budget_mb: u64,
}

/// File discovery and classification rules
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatcherConfig {
    pub enabled: bool,
    /// Extensions (without dot) that mark source files
    pub source_extensions: Vec<String>,
    /// Exact file names that mark dependency manifests
    pub manifest_files: Vec<String>,
    /// Directory names never descended into
    pub excluded_dirs: Vec<String>,
}

/// An external analyzer program
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzerConfig {
    /// Metric name produced by the analyzer
    pub name: String,
    pub category: MetricCategory,
    #[serde(default)]
    pub description: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub scope: AnalyzerScope,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            interval_seconds: 30,
            analyzer_timeout_seconds: 10,
            history_capacity: 100,
            event_capacity: 1000,
            memory_budget_mb: 512,
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_secs(self.analyzer_timeout_seconds)
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_extensions: strings(&[
                "rs", "ts", "tsx", "js", "jsx", "mjs", "py", "go", "java", "kt", "swift", "c",
                "cc", "cpp", "h", "hpp", "cs", "rb",
            ]),
            manifest_files: strings(&[
                "Cargo.toml",
                "Cargo.lock",
                "package.json",
                "package-lock.json",
                "yarn.lock",
                "pnpm-lock.yaml",
                "go.mod",
                "go.sum",
                "pyproject.toml",
                "requirements.txt",
                "pom.xml",
                "build.gradle",
            ]),
            excluded_dirs: strings(&[
                ".git",
                "target",
                "node_modules",
                "dist",
                "build",
                "out",
                "coverage",
                "vendor",
                "test",
                "tests",
                "__tests__",
            ]),
        }
    }
}

/// Built-in per-metric thresholds
pub fn default_thresholds() -> HashMap<String, Threshold> {
    [
        ("modularity-compliance", Threshold::new(70.0, 50.0)),
        ("dependency-health", Threshold::new(80.0, 60.0)),
        ("interface-consistency", Threshold::new(85.0, 70.0)),
        ("type-safety", Threshold::new(90.0, 75.0)),
        ("performance-score", Threshold::new(80.0, 60.0)),
    ]
    .into_iter()
    .map(|(name, threshold)| (name.to_string(), threshold))
    .collect()
}

/// Built-in category weights for overall health
pub fn default_health_weights() -> HashMap<String, f64> {
    [
        (MetricCategory::Compliance, 0.30),
        (MetricCategory::Performance, 0.25),
        (MetricCategory::Quality, 0.25),
        (MetricCategory::Security, 0.20),
    ]
    .into_iter()
    .map(|(category, weight)| (category.as_str().to_string(), weight))
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            watcher: WatcherConfig::default(),
            default_threshold: Threshold::default(),
            thresholds: default_thresholds(),
            health_weights: default_health_weights(),
            analyzers: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// `ConfigError::ReadError` if the file cannot be read; parse and
    /// validation errors otherwise.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// Thresholds given in the file are merged over the built-in table, so a
    /// file only needs to list the metrics it changes.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(contents)?;
        for (name, threshold) in default_thresholds() {
            config.thresholds.entry(name).or_insert(threshold);
        }
        config.validate()?;
        Ok(config)
    }

    /// Weight of a category in the overall health score
    pub fn health_weight(&self, category: MetricCategory) -> f64 {
        self.health_weights
            .get(category.as_str())
            .copied()
            .unwrap_or(FALLBACK_HEALTH_WEIGHT)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let monitor = &self.monitor;
        if monitor.interval_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "monitor.interval_seconds must be greater than 0".to_string(),
            ));
        }
        if monitor.analyzer_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "monitor.analyzer_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if monitor.history_capacity == 0 || monitor.event_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "monitor history and event capacities must be greater than 0".to_string(),
            ));
        }

        self.default_threshold
            .validate()
            .map_err(|reason| ConfigError::ValidationError(format!("default_threshold: {}", reason)))?;
        for (name, threshold) in &self.thresholds {
            threshold
                .validate()
                .map_err(|reason| ConfigError::ValidationError(format!("{}: {}", name, reason)))?;
        }

        for (category, weight) in &self.health_weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "health weight for {} must be a non-negative number",
                    category
                )));
            }
        }

        let mut names = HashSet::new();
        for analyzer in &self.analyzers {
            if analyzer.command.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "analyzer {} has an empty command",
                    analyzer.name
                )));
            }
            if !names.insert(analyzer.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate analyzer name: {}",
                    analyzer.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.monitor.interval(), Duration::from_secs(30));
        assert_eq!(config.thresholds.len(), 5);
        assert_eq!(
            config.thresholds["interface-consistency"],
            Threshold::new(85.0, 70.0)
        );
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [monitor]
            root = "/srv/app"
            interval_seconds = 60
            analyzer_timeout_seconds = 5

            [watcher]
            enabled = false

            [default_threshold]
            warning = 65.0
            critical = 40.0

            [thresholds.type-safety]
            warning = 95.0
            critical = 80.0

            [health_weights]
            compliance = 0.5

            [[analyzers]]
            name = "modularity-compliance"
            category = "compliance"
            command = "archlint"
            args = ["--json"]

            [[analyzers]]
            name = "dependency-health"
            category = "security"
            command = "depcheck"
            scope = "manifest"
        "#;

        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.monitor.root, PathBuf::from("/srv/app"));
        assert_eq!(config.monitor.interval_seconds, 60);
        assert_eq!(config.monitor.history_capacity, 100);
        assert!(!config.watcher.enabled);
        assert!(!config.watcher.source_extensions.is_empty());
        assert_eq!(config.default_threshold, Threshold::new(65.0, 40.0));

        // Overridden entry plus the remaining built-ins
        assert_eq!(config.thresholds["type-safety"], Threshold::new(95.0, 80.0));
        assert_eq!(config.thresholds.len(), 5);

        assert_eq!(config.health_weight(MetricCategory::Compliance), 0.5);
        assert_eq!(config.health_weight(MetricCategory::Security), FALLBACK_HEALTH_WEIGHT);

        assert_eq!(config.analyzers.len(), 2);
        assert_eq!(config.analyzers[0].args, vec!["--json"]);
        assert_eq!(config.analyzers[0].scope, AnalyzerScope::Source);
        assert_eq!(config.analyzers[1].scope, AnalyzerScope::Manifest);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let toml = r#"
            [thresholds.type-safety]
            warning = 50.0
            critical = 80.0
        "#;
        assert!(matches!(
            Config::from_toml_str(toml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let toml = "[monitor]\ninterval_seconds = 0\n";
        assert!(matches!(
            Config::from_toml_str(toml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_duplicate_analyzer_rejected() {
        let toml = r#"
            [[analyzers]]
            name = "type-safety"
            category = "quality"
            command = "a"

            [[analyzers]]
            name = "type-safety"
            category = "quality"
            command = "b"
        "#;
        assert!(Config::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            Config::from_toml_str("[monitor\ninterval_seconds = "),
            Err(ConfigError::TomlError(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[monitor]\ninterval_seconds = 15").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.monitor.interval_seconds, 15);
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file(Path::new("/nonexistent/archwatch.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }
}
