/// Bounded metric history and event log
pub mod event_log;
pub mod history_store;

pub use event_log::EventLog;
pub use history_store::HistoryStore;
