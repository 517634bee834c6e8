/// Statistical trend analysis over metric histories
pub mod trend;

pub use trend::{analyze, HealthBand, TrendAnalysis};
