use crate::collectors::FileCheck;
use crate::config::WatcherConfig;
use crate::error::WatchError;
use crate::events::{EventSeverity, EventType, MetricCategory, MonitoringEvent, Severity};
use log::{debug, info, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

/// Classification of a watched file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Source,
    Manifest,
    Other,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Source => "source",
            FileKind::Manifest => "manifest",
            FileKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Removed => "removed",
        }
    }

    fn from_event_kind(kind: &EventKind) -> Option<ChangeKind> {
        match kind {
            EventKind::Create(_) => Some(ChangeKind::Created),
            EventKind::Modify(_) => Some(ChangeKind::Modified),
            EventKind::Remove(_) => Some(ChangeKind::Removed),
            _ => None,
        }
    }
}

/// A change notification for a single watched file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub change: ChangeKind,
}

/// Subscription counts reported by the watcher
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchStats {
    pub watched: usize,
    pub failed: usize,
}

/// Files found under the root by `discover`
#[derive(Debug, Default)]
pub struct Discovery {
    pub files: Vec<PathBuf>,
    /// Directories that could not be read
    pub skipped_dirs: usize,
}

/// Classify a path by file name, then by extension
pub fn classify(path: &Path, config: &WatcherConfig) -> FileKind {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if config.manifest_files.iter().any(|m| m == file_name) {
        return FileKind::Manifest;
    }

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if config.source_extensions.iter().any(|s| s.eq_ignore_ascii_case(ext)) => {
            FileKind::Source
        }
        _ => FileKind::Other,
    }
}

/// Walk `root` and collect every source and manifest file
///
/// Excluded directories are not descended into and symlinked directories are
/// not followed. Unreadable directories are logged and skipped.
pub fn discover(root: &Path, config: &WatcherConfig) -> Discovery {
    let mut discovery = Discovery::default();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                let error = WatchError::DirectoryScan {
                    path: dir.clone(),
                    reason: e.to_string(),
                };
                warn!("{}", error);
                discovery.skipped_dirs += 1;
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                debug!("Skipping {}: file type unavailable", path.display());
                continue;
            };

            if file_type.is_dir() {
                let excluded = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|name| config.excluded_dirs.iter().any(|d| d == name))
                    .unwrap_or(false);
                if !excluded {
                    pending.push(path);
                }
            } else if file_type.is_file() && classify(&path, config) != FileKind::Other {
                discovery.files.push(path);
            }
        }
    }

    discovery.files.sort();
    discovery
}

/// Multiplexed change subscription over every discovered file
///
/// One `notify` watcher holds a non-recursive subscription per file and
/// forwards created/modified/removed notifications onto a channel. Dropping or
/// stopping the watcher closes the channel's sending side.
pub struct FileChangeWatcher {
    watcher: Option<RecommendedWatcher>,
    stats: WatchStats,
}

impl FileChangeWatcher {
    /// Discover files under `root` and subscribe to each of them
    ///
    /// # Arguments
    ///
    /// * `root` - Directory to scan
    /// * `config` - Classification and exclusion rules
    /// * `tx` - Channel receiving change notifications
    ///
    /// # Returns
    ///
    /// An error only if the notification backend cannot be created. Files that
    /// cannot be watched are logged and counted in `stats()`.
    pub fn start(
        root: &Path,
        config: &WatcherConfig,
        tx: UnboundedSender<FileChange>,
    ) -> Result<Self, WatchError> {
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    let Some(change) = ChangeKind::from_event_kind(&event.kind) else {
                        return;
                    };
                    for path in event.paths {
                        if tx.send(FileChange { path, change }).is_err() {
                            debug!("File change receiver closed");
                            return;
                        }
                    }
                }
                Err(e) => warn!("File watch error: {}", e),
            }
        })?;

        let discovery = discover(root, config);
        let mut stats = WatchStats::default();

        for file in &discovery.files {
            match watcher.watch(file, RecursiveMode::NonRecursive) {
                Ok(()) => stats.watched += 1,
                Err(e) => {
                    let error = WatchError::SetupFailed {
                        path: file.clone(),
                        reason: e.to_string(),
                    };
                    warn!("{}", error);
                    stats.failed += 1;
                }
            }
        }

        info!(
            "Watching {} files under {} ({} failed, {} directories skipped)",
            stats.watched,
            root.display(),
            stats.failed,
            discovery.skipped_dirs
        );

        Ok(Self {
            watcher: Some(watcher),
            stats,
        })
    }

    /// Drop every subscription; further calls do nothing
    pub fn stop(&mut self) {
        if self.watcher.take().is_some() {
            info!("File watcher stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }

    pub fn stats(&self) -> WatchStats {
        self.stats
    }
}

/// Build the monitoring event for a checked file change
///
/// The event severity follows the worst issue reported by any analyzer:
/// critical for a critical issue, error for a high one, warning for any other
/// issue and info when there are none.
pub fn change_event(change: &FileChange, check: &FileCheck) -> MonitoringEvent {
    let issues: Vec<_> = check
        .reports
        .iter()
        .flat_map(|r| r.report.issues.iter().map(move |issue| (r, issue)))
        .collect();

    let worst = issues.iter().max_by_key(|(_, issue)| issue.severity);
    let severity = match worst.map(|(_, issue)| issue.severity) {
        Some(Severity::Critical) => EventSeverity::Critical,
        Some(Severity::High) => EventSeverity::Error,
        Some(_) => EventSeverity::Warning,
        None => EventSeverity::Info,
    };

    let category = worst
        .map(|(report, _)| report.category)
        .or_else(|| check.reports.first().map(|r| r.category))
        .unwrap_or(match check.kind {
            FileKind::Manifest => MetricCategory::Security,
            _ => MetricCategory::Quality,
        });

    let (event_type, message) = if issues.is_empty() {
        (
            EventType::Metric,
            format!(
                "No issues found in {} {} file",
                change.change.as_str(),
                check.kind.as_str()
            ),
        )
    } else {
        let details: Vec<&str> = issues.iter().map(|(_, i)| i.message.as_str()).collect();
        (
            EventType::Violation,
            format!(
                "{} issue(s) found in {} {} file: {}",
                issues.len(),
                change.change.as_str(),
                check.kind.as_str(),
                details.join("; ")
            ),
        )
    };

    let mut tags = vec![check.kind.as_str().to_string(), change.change.as_str().to_string()];
    tags.extend(check.reports.iter().map(|r| r.analyzer.clone()));

    MonitoringEvent::new(
        event_type,
        severity,
        change.path.display().to_string(),
        message,
        category,
    )
    .with_tags(tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::{AnalyzerReport, FileReport, Issue};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn create_test_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/api")).unwrap();
        fs::create_dir_all(root.join("target/debug")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("Cargo.toml"), "[package]\n").unwrap();
        fs::write(root.join("src/lib.rs"), "pub mod api;\n").unwrap();
        fs::write(root.join("src/api/mod.rs"), "\n").unwrap();
        fs::write(root.join("README.md"), "# readme\n").unwrap();
        fs::write(root.join("target/debug/build.rs"), "\n").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "\n").unwrap();
        dir
    }

    fn create_test_check(kind: FileKind, issues: Vec<Issue>) -> FileCheck {
        FileCheck {
            path: PathBuf::from("src/lib.rs"),
            kind,
            reports: vec![FileReport {
                analyzer: "type-safety".to_string(),
                category: MetricCategory::Quality,
                report: AnalyzerReport::new(75.0).with_issues(issues),
            }],
            failures: Vec::new(),
        }
    }

    fn issue(severity: Severity, message: &str) -> Issue {
        Issue {
            severity,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_classify() {
        let config = WatcherConfig::default();
        assert_eq!(classify(Path::new("src/main.rs"), &config), FileKind::Source);
        assert_eq!(classify(Path::new("web/App.TSX"), &config), FileKind::Source);
        assert_eq!(classify(Path::new("Cargo.toml"), &config), FileKind::Manifest);
        assert_eq!(classify(Path::new("app/package.json"), &config), FileKind::Manifest);
        assert_eq!(classify(Path::new("notes.md"), &config), FileKind::Other);
        assert_eq!(classify(Path::new("Makefile"), &config), FileKind::Other);
    }

    #[test]
    fn test_discover_skips_excluded_directories() {
        let dir = create_test_tree();
        let discovery = discover(dir.path(), &WatcherConfig::default());

        let relative: Vec<PathBuf> = discovery
            .files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("Cargo.toml"),
                PathBuf::from("src/api/mod.rs"),
                PathBuf::from("src/lib.rs"),
            ]
        );
        assert_eq!(discovery.skipped_dirs, 0);
    }

    #[test]
    fn test_discover_missing_root() {
        let dir = TempDir::new().unwrap();
        let discovery = discover(&dir.path().join("missing"), &WatcherConfig::default());
        assert!(discovery.files.is_empty());
        assert_eq!(discovery.skipped_dirs, 1);
    }

    #[test]
    fn test_change_event_severity() {
        let change = FileChange {
            path: PathBuf::from("src/lib.rs"),
            change: ChangeKind::Modified,
        };

        let clean = change_event(&change, &create_test_check(FileKind::Source, vec![]));
        assert_eq!(clean.severity, EventSeverity::Info);
        assert_eq!(clean.event_type, EventType::Metric);

        let warning = change_event(
            &change,
            &create_test_check(FileKind::Source, vec![issue(Severity::Low, "naming")]),
        );
        assert_eq!(warning.severity, EventSeverity::Warning);
        assert_eq!(warning.event_type, EventType::Violation);

        let error = change_event(
            &change,
            &create_test_check(
                FileKind::Source,
                vec![issue(Severity::Medium, "naming"), issue(Severity::High, "unsafe cast")],
            ),
        );
        assert_eq!(error.severity, EventSeverity::Error);

        let critical = change_event(
            &change,
            &create_test_check(
                FileKind::Source,
                vec![issue(Severity::High, "cast"), issue(Severity::Critical, "cycle")],
            ),
        );
        assert_eq!(critical.severity, EventSeverity::Critical);
        assert_eq!(critical.source, "src/lib.rs");
        assert!(critical.tags.contains(&"source".to_string()));
        assert!(critical.tags.contains(&"type-safety".to_string()));
    }

    #[test]
    fn test_change_event_without_reports() {
        let change = FileChange {
            path: PathBuf::from("Cargo.toml"),
            change: ChangeKind::Modified,
        };
        let check = FileCheck {
            path: PathBuf::from("Cargo.toml"),
            kind: FileKind::Manifest,
            reports: Vec::new(),
            failures: Vec::new(),
        };

        let event = change_event(&change, &check);
        assert_eq!(event.severity, EventSeverity::Info);
        assert_eq!(event.category, MetricCategory::Security);
    }

    #[tokio::test]
    async fn test_watcher_reports_modifications() {
        let dir = create_test_tree();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut watcher =
            FileChangeWatcher::start(dir.path(), &WatcherConfig::default(), tx).unwrap();
        assert_eq!(watcher.stats(), WatchStats { watched: 3, failed: 0 });

        let target = dir.path().join("src/lib.rs");
        fs::write(&target, "pub mod api;\npub mod core;\n").unwrap();

        let change = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no change notification")
            .unwrap();
        assert_eq!(change.path.file_name(), target.file_name());

        watcher.stop();
        assert!(!watcher.is_running());
        watcher.stop();
    }
}
