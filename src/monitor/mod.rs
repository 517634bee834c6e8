/// Single-writer coordinator task and its command channel
pub mod coordinator;

/// Dashboard snapshot assembly
pub mod dashboard;

/// Broadcast notifications
pub mod notification;

/// Monitor lifecycle, triggers and control surface
pub mod scheduler;

/// Mutable monitor state owned by the coordinator
pub mod state;

pub use dashboard::{DashboardSnapshot, DashboardTrends, TrendBucket};
pub use notification::MonitorNotification;
pub use scheduler::{CycleReport, Monitor};
pub use state::MonitorState;
