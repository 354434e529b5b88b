//! Accuracy assessment against simulated ground truth

pub mod accuracy;

pub use accuracy::{AccuracyMonitor, AccuracyStatistics, PositionError};
