//! Single-writer owner of the monitor state
//!
//! The coordinator task holds the only mutable reference to [`MonitorState`].
//! Timer, file and control-surface callers send it commands and receive
//! point-in-time copies through oneshot replies.

use crate::aggregator::HistoryStore;
use crate::collectors::IssueCounts;
use crate::error::MonitorError;
use crate::events::{
    ArchitectureMetric, MetricHistoryEntry, MonitoringAlert, MonitoringEvent, Threshold,
    Timestamp,
};
use crate::monitor::dashboard::DashboardInputs;
use crate::monitor::notification::MonitorNotification;
use crate::monitor::state::MonitorState;
use chrono::Utc;
use log::{debug, info};
use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

/// Pending commands before senders wait
pub const COMMAND_CAPACITY: usize = 64;

/// Messages handled by the coordinator task
#[derive(Debug)]
pub enum Command {
    /// History and thresholds needed to run a collection
    CycleInputs {
        reply: oneshot::Sender<(HistoryStore, HashMap<String, Threshold>)>,
    },
    RecordCycle {
        metrics: Vec<ArchitectureMetric>,
        reply: oneshot::Sender<Vec<MonitoringAlert>>,
    },
    RecordEvent {
        event: MonitoringEvent,
        reply: oneshot::Sender<Option<MonitoringAlert>>,
    },
    ResolveAlert {
        id: String,
        resolved_by: String,
        reply: oneshot::Sender<bool>,
    },
    SetThreshold {
        name: String,
        threshold: Threshold,
        reply: oneshot::Sender<Result<(), MonitorError>>,
    },
    DashboardInputs {
        reply: oneshot::Sender<(DashboardInputs, HashMap<String, Threshold>, IssueCounts)>,
    },
    MetricHistory {
        name: String,
        since_hours: Option<f64>,
        reply: oneshot::Sender<Vec<MetricHistoryEntry>>,
    },
    EventsInRange {
        from: Timestamp,
        to: Timestamp,
        reply: oneshot::Sender<Vec<MonitoringEvent>>,
    },
    ActiveAlerts {
        reply: oneshot::Sender<Vec<MonitoringAlert>>,
    },
    Alert {
        id: String,
        reply: oneshot::Sender<Option<MonitoringAlert>>,
    },
}

/// Spawn the coordinator task
///
/// The task ends once every [`CoordinatorHandle`] has been dropped.
pub fn spawn(
    state: MonitorState,
    notifier: broadcast::Sender<MonitorNotification>,
) -> (CoordinatorHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
    let task = tokio::spawn(run(state, rx, notifier));
    (CoordinatorHandle { tx }, task)
}

async fn run(
    mut state: MonitorState,
    mut rx: mpsc::Receiver<Command>,
    notifier: broadcast::Sender<MonitorNotification>,
) {
    debug!("Coordinator started");
    while let Some(command) = rx.recv().await {
        handle(&mut state, command, &notifier);
    }
    info!("Coordinator stopped");
}

/// Apply one command; replies to callers that went away are dropped
fn handle(
    state: &mut MonitorState,
    command: Command,
    notifier: &broadcast::Sender<MonitorNotification>,
) {
    match command {
        Command::CycleInputs { reply } => {
            let _ = reply.send((state.history().clone(), state.thresholds().clone()));
        }
        Command::RecordCycle { metrics, reply } => {
            let raised = state.record_cycle(metrics);
            for alert in &raised {
                let _ = notifier.send(MonitorNotification::ThresholdViolation {
                    alert: alert.clone(),
                    timestamp: Utc::now(),
                });
            }
            let _ = reply.send(raised);
        }
        Command::RecordEvent { event, reply } => {
            let alert = state.record_event(event.clone());
            if let Some(alert) = &alert {
                let _ = notifier.send(MonitorNotification::ViolationAlert {
                    alert: alert.clone(),
                    event,
                    timestamp: Utc::now(),
                });
            }
            let _ = reply.send(alert);
        }
        Command::ResolveAlert {
            id,
            resolved_by,
            reply,
        } => {
            let resolved = state.resolve_alert(&id, &resolved_by);
            if let Some(alert) = &resolved {
                let _ = notifier.send(MonitorNotification::AlertResolved {
                    alert: alert.clone(),
                    timestamp: Utc::now(),
                });
            }
            let _ = reply.send(resolved.is_some());
        }
        Command::SetThreshold {
            name,
            threshold,
            reply,
        } => {
            let _ = reply.send(state.set_threshold(&name, threshold));
        }
        Command::DashboardInputs { reply } => {
            let _ = reply.send((
                state.dashboard_inputs(),
                state.thresholds().clone(),
                state.recent_issue_counts(),
            ));
        }
        Command::MetricHistory {
            name,
            since_hours,
            reply,
        } => {
            let _ = reply.send(state.metric_history(&name, since_hours));
        }
        Command::EventsInRange { from, to, reply } => {
            let _ = reply.send(state.events_in_range(from, to));
        }
        Command::ActiveAlerts { reply } => {
            let _ = reply.send(state.active_alerts());
        }
        Command::Alert { id, reply } => {
            let _ = reply.send(state.alert(&id));
        }
    }
}

/// Cloneable sending side of the coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, MonitorError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| MonitorError::ChannelClosed)?;
        response.await.map_err(|_| MonitorError::ChannelClosed)
    }

    pub async fn cycle_inputs(
        &self,
    ) -> Result<(HistoryStore, HashMap<String, Threshold>), MonitorError> {
        self.request(|reply| Command::CycleInputs { reply }).await
    }

    pub async fn record_cycle(
        &self,
        metrics: Vec<ArchitectureMetric>,
    ) -> Result<Vec<MonitoringAlert>, MonitorError> {
        self.request(|reply| Command::RecordCycle { metrics, reply })
            .await
    }

    pub async fn record_event(
        &self,
        event: MonitoringEvent,
    ) -> Result<Option<MonitoringAlert>, MonitorError> {
        self.request(|reply| Command::RecordEvent { event, reply })
            .await
    }

    pub async fn resolve_alert(&self, id: &str, resolved_by: &str) -> Result<bool, MonitorError> {
        self.request(|reply| Command::ResolveAlert {
            id: id.to_string(),
            resolved_by: resolved_by.to_string(),
            reply,
        })
        .await
    }

    pub async fn set_threshold(&self, name: &str, threshold: Threshold) -> Result<(), MonitorError> {
        self.request(|reply| Command::SetThreshold {
            name: name.to_string(),
            threshold,
            reply,
        })
        .await?
    }

    pub async fn dashboard_inputs(
        &self,
    ) -> Result<(DashboardInputs, HashMap<String, Threshold>, IssueCounts), MonitorError> {
        self.request(|reply| Command::DashboardInputs { reply })
            .await
    }

    pub async fn metric_history(
        &self,
        name: &str,
        since_hours: Option<f64>,
    ) -> Result<Vec<MetricHistoryEntry>, MonitorError> {
        self.request(|reply| Command::MetricHistory {
            name: name.to_string(),
            since_hours,
            reply,
        })
        .await
    }

    pub async fn events_in_range(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<MonitoringEvent>, MonitorError> {
        self.request(|reply| Command::EventsInRange { from, to, reply })
            .await
    }

    pub async fn active_alerts(&self) -> Result<Vec<MonitoringAlert>, MonitorError> {
        self.request(|reply| Command::ActiveAlerts { reply }).await
    }

    pub async fn alert(&self, id: &str) -> Result<Option<MonitoringAlert>, MonitorError> {
        self.request(|reply| Command::Alert {
            id: id.to_string(),
            reply,
        })
        .await
    }
}
