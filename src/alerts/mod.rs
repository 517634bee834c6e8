/// Alert registry with one-way alert lifecycle
pub mod alert_registry;

pub use alert_registry::AlertRegistry;
