use anyhow::{Context, Result};
use archwatch::collectors::{Analyzer, CommandAnalyzer};
use archwatch::config::Config;
use archwatch::error::ConfigError;
use archwatch::monitor::{Monitor, MonitorNotification};
use clap::{Parser, Subcommand};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Command-line arguments for the architecture health monitor
#[derive(Parser)]
#[command(
    name = "archwatch",
    about = "Continuous architectural-health monitoring",
    long_about = "Periodically and reactively runs architecture analyzers over a codebase, \
                  keeps bounded metric history, raises threshold and violation alerts, and \
                  reports trends through a health dashboard."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Monitor continuously until interrupted
    Run,

    /// Print a single dashboard snapshot
    Dashboard {
        /// Output format: json, csv or xml
        #[arg(short, long, default_value = "json")]
        format: String,
    },
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in load_config
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

/// Load configuration from file or use defaults
///
/// Missing or unreadable files and invalid contents are reported and replaced
/// by the default configuration.
fn load_config(config_path: Option<&Path>) -> Config {
    let Some(path) = config_path else {
        info!("Using default configuration");
        return Config::default();
    };

    info!("Loading configuration from: {}", path.display());
    match Config::from_file(path) {
        Ok(config) => config,
        Err(ConfigError::ReadError(e)) => {
            warn!(
                "Configuration file not found or unreadable ({}), using defaults",
                e
            );
            Config::default()
        }
        Err(e) => {
            error!("Configuration error in '{}': {}", path.display(), e);
            warn!("Using default configuration due to invalid config file");
            Config::default()
        }
    }
}

/// Build the external analyzers listed in the configuration
fn build_analyzers(config: &Config) -> Vec<Arc<dyn Analyzer>> {
    config
        .analyzers
        .iter()
        .map(|a| {
            let analyzer = CommandAnalyzer::new(
                a.name.clone(),
                a.category,
                a.command.clone(),
                a.args.clone(),
            )
            .with_description(a.description.clone())
            .with_scope(a.scope);
            Arc::new(analyzer) as Arc<dyn Analyzer>
        })
        .collect()
}

fn log_notification(notification: &MonitorNotification) {
    match notification {
        MonitorNotification::MonitoringStarted { .. } => info!("Monitoring started"),
        MonitorNotification::MonitoringStopped { .. } => info!("Monitoring stopped"),
        MonitorNotification::PeriodicAnalysisComplete {
            metrics,
            alerts_raised,
            failures,
            duration_ms,
            ..
        } => info!(
            "Analysis complete: {} metrics, {} new alerts, {} analyzer failures in {}ms",
            metrics, alerts_raised, failures, duration_ms
        ),
        MonitorNotification::ThresholdViolation { alert, .. } => warn!(
            "[{}] {}: {}",
            alert.severity.as_str(),
            alert.title,
            alert.description
        ),
        MonitorNotification::ViolationAlert { alert, event, .. } => warn!(
            "[{}] {}: {}",
            alert.severity.as_str(),
            alert.title,
            event.message
        ),
        MonitorNotification::AlertResolved { alert, .. } => info!(
            "Alert {} resolved by {}",
            alert.id,
            alert.resolved_by.as_deref().unwrap_or("unknown")
        ),
        MonitorNotification::AnalysisError {
            analyzer, message, ..
        } => error!("Analyzer {} failed: {}", analyzer, message),
    }
}

/// Log notifications until the monitor goes away
async fn log_notifications(mut notifications: broadcast::Receiver<MonitorNotification>) {
    loop {
        match notifications.recv().await {
            Ok(notification) => log_notification(&notification),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!("Notification logger lagged, {} notifications missed", missed)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("Notification logger stopped");
}

async fn run(monitor: Monitor) -> Result<()> {
    let logger = tokio::spawn(log_notifications(monitor.subscribe()));

    let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        info!("Received interrupt signal (SIGINT), shutting down gracefully...");
        if shutdown_tx.send(()).is_err() {
            error!("Failed to send shutdown signal");
        }
    })
    .context("Error setting SIGINT handler for graceful shutdown")?;

    monitor.start().await.context("Failed to start monitoring")?;
    info!("Monitor is running. Press Ctrl+C to stop.");

    shutdown_rx.recv().await;
    monitor.stop().await;

    drop(monitor);
    if let Err(e) = logger.await {
        error!("Notification logger ended abnormally: {}", e);
    }
    info!("Shutdown complete");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    if let Err(e) = cli.validate() {
        anyhow::bail!("Invalid arguments: {}", e);
    }

    let config = load_config(cli.config.as_deref());
    let analyzers = build_analyzers(&config);
    if analyzers.is_empty() {
        warn!("No analyzers configured; only auxiliary metrics will be reported");
    }
    let monitor = Monitor::new(config, analyzers);

    match cli.command {
        Command::Run => run(monitor).await,
        Command::Dashboard { format } => {
            let output = monitor
                .export_dashboard(&format)
                .await
                .context("Failed to build dashboard")?;
            println!("{}", output);
            Ok(())
        }
    }
}
