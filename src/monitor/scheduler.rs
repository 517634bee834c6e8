use crate::collectors::{Analyzer, AnalyzerFailure, MetricCollector, ProcessProbe};
use crate::config::Config;
use crate::error::MonitorError;
use crate::events::{
    ArchitectureMetric, MetricHistoryEntry, MonitoringAlert, MonitoringEvent, Threshold,
    Timestamp,
};
use crate::export::{self, ExportFormat};
use crate::monitor::coordinator::{self, CoordinatorHandle};
use crate::monitor::dashboard::{self, DashboardSnapshot};
use crate::monitor::notification::{MonitorNotification, NOTIFICATION_CAPACITY};
use crate::monitor::state::MonitorState;
use crate::triggers::{
    change_event, classify, ChangeKind, FileChange, FileChangeWatcher, FileKind, WatchStats,
};
use chrono::Utc;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Poll period while `stop()` waits for in-flight cycles
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Result of one full collection cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub metrics: Vec<ArchitectureMetric>,
    pub alerts: Vec<MonitoringAlert>,
    /// Names of the analyzers that produced no metric
    pub failed_analyzers: Vec<String>,
    pub duration: Duration,
}

/// Marks a cycle or file check as in flight for as long as it lives
struct InFlight<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    /// Enter unconditionally
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self { counter }
    }

    /// Enter only when nothing else is in flight
    fn try_enter_idle(counter: &'a AtomicUsize) -> Option<Self> {
        counter
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { counter })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

/// State shared between the control surface and background tasks
struct MonitorInner {
    config: Config,
    collector: MetricCollector,
    probe: ProcessProbe,
    coordinator: CoordinatorHandle,
    notifier: broadcast::Sender<MonitorNotification>,
    in_flight: AtomicUsize,
    watched_files: AtomicUsize,
    failed_watches: AtomicUsize,
}

/// Background work owned by a running monitor
struct RunningTasks {
    shutdown: watch::Sender<bool>,
    timer: JoinHandle<()>,
    file_task: Option<JoinHandle<()>>,
    watcher: Option<FileChangeWatcher>,
}

/// Continuous architectural-health monitor
///
/// Drives periodic collection cycles and reactive file checks into a single
/// coordinator that owns history, alerts, events and thresholds. All methods
/// take `&self`, so a monitor can be shared behind an `Arc`.
pub struct Monitor {
    inner: Arc<MonitorInner>,
    running: Mutex<Option<RunningTasks>>,
}

impl Monitor {
    /// Create a monitor and spawn its coordinator
    ///
    /// Must be called from within a Tokio runtime. Nothing is scheduled until
    /// [`Monitor::start`] is called.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `analyzers` - Analyzers invoked on every cycle, in reporting order
    pub fn new(config: Config, analyzers: Vec<Arc<dyn Analyzer>>) -> Self {
        let mut collector =
            MetricCollector::new(config.monitor.root.clone(), config.monitor.analyzer_timeout())
                .with_default_threshold(config.default_threshold);
        for analyzer in analyzers {
            collector.register(analyzer);
        }

        let (notifier, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        let (coordinator, _task) = coordinator::spawn(MonitorState::new(&config), notifier.clone());

        info!(
            "Monitor created for {} with {} analyzers",
            config.monitor.root.display(),
            collector.analyzer_count()
        );

        Self {
            inner: Arc::new(MonitorInner {
                probe: ProcessProbe::new(config.monitor.memory_budget_mb),
                config,
                collector,
                coordinator,
                notifier,
                in_flight: AtomicUsize::new(0),
                watched_files: AtomicUsize::new(0),
                failed_watches: AtomicUsize::new(0),
            }),
            running: Mutex::new(None),
        }
    }

    /// Arm the file watcher and periodic timer, then run one cycle
    ///
    /// Calling `start` on a running monitor logs a warning and does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error only if the immediate cycle cannot reach the
    /// coordinator; the monitor stays armed in that case.
    pub async fn start(&self) -> Result<(), MonitorError> {
        {
            let mut running = self.running.lock().await;
            if running.is_some() {
                warn!("Monitor is already running, ignoring start request");
                return Ok(());
            }

            let (shutdown, shutdown_rx) = watch::channel(false);
            let (watcher, file_task) = self.arm_watcher(shutdown_rx.clone()).await;
            let timer = tokio::spawn(timer_loop(self.inner.clone(), shutdown_rx));

            *running = Some(RunningTasks {
                shutdown,
                timer,
                file_task,
                watcher,
            });
        }

        info!(
            "Monitoring started: interval {:?}, {} files watched",
            self.inner.config.monitor.interval(),
            self.inner.watched_files.load(Ordering::Relaxed)
        );
        self.inner.notify(MonitorNotification::MonitoringStarted {
            timestamp: Utc::now(),
        });

        let _guard = InFlight::enter(&self.inner.in_flight);
        self.inner.run_cycle().await.map(|_| ())
    }

    async fn arm_watcher(
        &self,
        shutdown: watch::Receiver<bool>,
    ) -> (Option<FileChangeWatcher>, Option<JoinHandle<()>>) {
        let config = &self.inner.config;
        if !config.watcher.enabled {
            debug!("File watching disabled");
            return (None, None);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let root = config.monitor.root.clone();
        let watcher_config = config.watcher.clone();
        let started = tokio::task::spawn_blocking(move || {
            FileChangeWatcher::start(&root, &watcher_config, tx)
        })
        .await;

        match started {
            Ok(Ok(watcher)) => {
                let stats = watcher.stats();
                self.inner.watched_files.store(stats.watched, Ordering::Relaxed);
                self.inner.failed_watches.store(stats.failed, Ordering::Relaxed);
                let task = tokio::spawn(file_loop(self.inner.clone(), rx, shutdown));
                (Some(watcher), Some(task))
            }
            Ok(Err(e)) => {
                warn!("File watching unavailable, continuing with periodic cycles only: {}", e);
                (None, None)
            }
            Err(e) => {
                error!("File watcher setup task failed: {}", e);
                (None, None)
            }
        }
    }

    /// Disarm the timer and file subscriptions and wait for in-flight work
    ///
    /// Calling `stop` on a stopped monitor does nothing.
    pub async fn stop(&self) {
        let Some(mut tasks) = self.running.lock().await.take() else {
            debug!("Monitor is not running, ignoring stop request");
            return;
        };

        let _ = tasks.shutdown.send(true);
        if let Some(watcher) = tasks.watcher.as_mut() {
            watcher.stop();
        }
        if let Err(e) = tasks.timer.await {
            error!("Timer task ended abnormally: {}", e);
        }
        if let Some(file_task) = tasks.file_task {
            if let Err(e) = file_task.await {
                error!("File change task ended abnormally: {}", e);
            }
        }
        while self.inner.in_flight.load(Ordering::Acquire) > 0 {
            tokio::time::sleep(DRAIN_POLL).await;
        }

        self.inner.watched_files.store(0, Ordering::Relaxed);
        self.inner.failed_watches.store(0, Ordering::Relaxed);
        info!("Monitoring stopped");
        self.inner.notify(MonitorNotification::MonitoringStopped {
            timestamp: Utc::now(),
        });
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Run one full collection cycle now
    ///
    /// Unlike a timer tick, an explicit call is never dropped.
    pub async fn run_cycle(&self) -> Result<CycleReport, MonitorError> {
        let _guard = InFlight::enter(&self.inner.in_flight);
        self.inner.run_cycle().await
    }

    /// Check a single file change as the watcher would
    ///
    /// # Returns
    ///
    /// The recorded event, or `None` for ignored files and removals
    pub async fn check_file_change(
        &self,
        change: FileChange,
    ) -> Result<Option<MonitoringEvent>, MonitorError> {
        self.inner.check_file_change(change).await
    }

    /// Assemble a fresh dashboard snapshot
    ///
    /// Runs one collection pass that is neither recorded into history nor
    /// checked against thresholds, and merges in the auxiliary metrics.
    pub async fn get_dashboard(&self) -> Result<DashboardSnapshot, MonitorError> {
        let inner = &self.inner;
        let (inputs, thresholds, issues) = inner.coordinator.dashboard_inputs().await?;

        let collection = inner.collector.collect(&inputs.history, &thresholds).await;
        inner.report_failures(&collection.failures);

        let mut metrics = collection.metrics;
        metrics.extend(inner.probe.auxiliary_metrics(inner.watch_stats(), issues));

        Ok(dashboard::assemble(metrics, inputs, |category| {
            inner.config.health_weight(category)
        }))
    }

    /// Render the dashboard in a named format (json, csv or xml)
    pub async fn export_dashboard(&self, format: &str) -> Result<String, MonitorError> {
        let format: ExportFormat = format.parse()?;
        let snapshot = self.get_dashboard().await?;
        Ok(export::export_dashboard(&snapshot, format)?)
    }

    /// Render the stored history of one metric in a named format
    pub async fn export_metric_history(
        &self,
        name: &str,
        since_hours: Option<f64>,
        format: &str,
    ) -> Result<String, MonitorError> {
        let format: ExportFormat = format.parse()?;
        let metrics: Vec<ArchitectureMetric> = self
            .get_metric_history(name, since_hours)
            .await?
            .into_iter()
            .map(|entry| entry.metric)
            .collect();
        Ok(export::export_metrics(&metrics, format)?)
    }

    /// Resolve an open alert
    ///
    /// # Returns
    ///
    /// `false` if the alert is unknown or already resolved
    pub async fn resolve_alert(&self, id: &str, resolved_by: &str) -> Result<bool, MonitorError> {
        self.inner.coordinator.resolve_alert(id, resolved_by).await
    }

    pub async fn set_alert_threshold(
        &self,
        name: &str,
        warning: f64,
        critical: f64,
    ) -> Result<(), MonitorError> {
        self.inner
            .coordinator
            .set_threshold(name, Threshold::new(warning, critical))
            .await
    }

    pub async fn get_metric_history(
        &self,
        name: &str,
        since_hours: Option<f64>,
    ) -> Result<Vec<MetricHistoryEntry>, MonitorError> {
        self.inner.coordinator.metric_history(name, since_hours).await
    }

    pub async fn get_events_in_range(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<MonitoringEvent>, MonitorError> {
        self.inner.coordinator.events_in_range(from, to).await
    }

    pub async fn get_active_alerts(&self) -> Result<Vec<MonitoringAlert>, MonitorError> {
        self.inner.coordinator.active_alerts().await
    }

    pub async fn get_alert(&self, id: &str) -> Result<Option<MonitoringAlert>, MonitorError> {
        self.inner.coordinator.alert(id).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorNotification> {
        self.inner.notifier.subscribe()
    }

    pub fn watch_stats(&self) -> WatchStats {
        self.inner.watch_stats()
    }
}

impl MonitorInner {
    /// Publish a notification; having no subscribers is fine
    fn notify(&self, notification: MonitorNotification) {
        let _ = self.notifier.send(notification);
    }

    fn watch_stats(&self) -> WatchStats {
        WatchStats {
            watched: self.watched_files.load(Ordering::Relaxed),
            failed: self.failed_watches.load(Ordering::Relaxed),
        }
    }

    fn report_failures(&self, failures: &[AnalyzerFailure]) {
        for failure in failures {
            self.notify(MonitorNotification::AnalysisError {
                analyzer: failure.analyzer.clone(),
                message: failure.error.to_string(),
                timestamp: Utc::now(),
            });
        }
    }

    /// Collect, check thresholds, append to history and announce completion
    ///
    /// Callers hold an [`InFlight`] guard for the duration.
    async fn run_cycle(&self) -> Result<CycleReport, MonitorError> {
        let (history, thresholds) = self.coordinator.cycle_inputs().await?;
        let collection = self.collector.collect(&history, &thresholds).await;
        self.report_failures(&collection.failures);

        let metrics = collection.metrics;
        let alerts = self.coordinator.record_cycle(metrics.clone()).await?;
        let report = CycleReport {
            metrics,
            alerts,
            failed_analyzers: collection
                .failures
                .iter()
                .map(|f| f.analyzer.clone())
                .collect(),
            duration: collection.duration,
        };

        debug!(
            "Cycle complete: {} metrics, {} alerts, {} failures",
            report.metrics.len(),
            report.alerts.len(),
            report.failed_analyzers.len()
        );
        self.notify(MonitorNotification::PeriodicAnalysisComplete {
            metrics: report.metrics.len(),
            alerts_raised: report.alerts.len(),
            failures: report.failed_analyzers.len(),
            duration_ms: report.duration.as_millis() as u64,
            timestamp: Utc::now(),
        });
        Ok(report)
    }

    async fn check_file_change(
        &self,
        change: FileChange,
    ) -> Result<Option<MonitoringEvent>, MonitorError> {
        let kind = classify(&change.path, &self.config.watcher);
        if kind == FileKind::Other {
            debug!("Ignoring change to {}", change.path.display());
            return Ok(None);
        }
        if change.change == ChangeKind::Removed {
            info!("Watched file removed: {}", change.path.display());
            return Ok(None);
        }

        let _guard = InFlight::enter(&self.in_flight);
        let check = self.collector.check_file(&change.path, kind).await;
        self.report_failures(&check.failures);

        let event = change_event(&change, &check);
        debug!(
            "File check for {} produced a {} event",
            change.path.display(),
            event.severity.as_str()
        );
        self.coordinator.record_event(event.clone()).await?;
        Ok(Some(event))
    }
}

/// Periodic trigger; a tick is dropped while any cycle is in flight
///
/// Shutdown wins over a tick that became ready at the same time.
async fn timer_loop(inner: Arc<MonitorInner>, mut shutdown: watch::Receiver<bool>) {
    let period = inner.config.monitor.interval();
    // start() runs the first cycle itself
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                if *shutdown.borrow() {
                    break;
                }
                let Some(_guard) = InFlight::try_enter_idle(&inner.in_flight) else {
                    debug!("Cycle already in flight, dropping timer tick");
                    continue;
                };
                if let Err(e) = inner.run_cycle().await {
                    error!("Periodic cycle failed: {}", e);
                }
            }
        }
    }
    debug!("Timer loop stopped");
}

/// Reactive trigger fed by the file watcher
async fn file_loop(
    inner: Arc<MonitorInner>,
    mut changes: mpsc::UnboundedReceiver<FileChange>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => break,
            change = changes.recv() => {
                let Some(change) = change else {
                    break;
                };
                if *shutdown.borrow() {
                    break;
                }
                if let Err(e) = inner.check_file_change(change).await {
                    error!("File check failed: {}", e);
                }
            }
        }
    }
    debug!("File change loop stopped");
}
