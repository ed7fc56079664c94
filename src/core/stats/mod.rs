//! Value statistics over raw and canonical documents

pub mod collector;
pub mod statistics;

pub use collector::StatisticsCollector;
pub use statistics::{FieldStatistics, Statistics, StatisticsFormat};
