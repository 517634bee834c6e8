/// Error types for the monitor
pub mod error;

/// Core data types: metrics, events, alerts and thresholds
pub mod events;

/// Bounded metric history and event log
pub mod aggregator;

/// Threshold and violation alerts
pub mod alerts;

/// Trend statistics and forecasting
pub mod analysis;

/// Analyzers, metric collection and auxiliary probes
pub mod collectors;

/// File discovery and change notifications
pub mod triggers;

/// Monitor scheduling, coordination and dashboards
pub mod monitor;

/// Configuration management
pub mod config;

/// Dashboard and metric export formats
pub mod export;

// Re-export commonly used types
pub use config::Config;
pub use error::{AnalyzerError, ConfigError, ExportError, MonitorError, WatchError};
pub use monitor::{DashboardSnapshot, Monitor, MonitorNotification};
