//! Estimate-versus-ground-truth accuracy tracking
//!
//! Simulated records carry the generator's true position. Comparing each fix
//! against it gives a live view of how ranging noise and anchor geometry
//! translate into position error.

use crate::core::Point3;
use std::collections::VecDeque;

/// Default number of errors retained for statistics
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// Largest configurable history
pub const MAX_HISTORY_SIZE: usize = 1_000_000;

/// Position error metrics for one fix
#[derive(Debug, Clone, PartialEq)]
pub struct PositionError {
    pub tag_id: String,
    pub true_position: Point3,
    pub estimated_position: Point3,
    pub error_vector: Point3,
    /// Meters
    pub error_magnitude: f64,
    /// XY error (meters)
    pub horizontal_error: f64,
    /// |Z| error (meters)
    pub vertical_error: f64,
}

impl PositionError {
    pub fn new(tag_id: &str, true_position: Point3, estimated_position: Point3) -> Self {
        let error_vector = estimated_position - true_position;
        Self {
            tag_id: tag_id.to_string(),
            true_position,
            estimated_position,
            error_vector,
            error_magnitude: error_vector.norm(),
            horizontal_error: (error_vector.x.powi(2) + error_vector.y.powi(2)).sqrt(),
            vertical_error: error_vector.z.abs(),
        }
    }
}

/// Accuracy statistics over the retained history
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccuracyStatistics {
    pub mean_error: f64,
    pub std_dev_error: f64,
    pub error_95_percentile: f64,
    pub rmse: f64,
    pub mean_horizontal_error: f64,
    pub mean_vertical_error: f64,
    pub max_error: f64,
    pub min_error: f64,
    pub sample_count: usize,
}

/// Bounded history of position errors
#[derive(Debug, Clone)]
pub struct AccuracyMonitor {
    history: VecDeque<PositionError>,
    max_history_size: usize,
    total_samples: u64,
}

impl Default for AccuracyMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl AccuracyMonitor {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(max_history_size.min(DEFAULT_HISTORY_SIZE)),
            max_history_size: max_history_size.max(1),
            total_samples: 0,
        }
    }

    /// Record one fix against its ground truth
    pub fn record(&mut self, tag_id: &str, true_position: Point3, estimated_position: Point3) -> &PositionError {
        self.history
            .push_back(PositionError::new(tag_id, true_position, estimated_position));
        self.total_samples += 1;

        while self.history.len() > self.max_history_size {
            self.history.pop_front();
        }
        // Non-empty after push
        &self.history[self.history.len() - 1]
    }

    pub fn history(&self) -> impl Iterator<Item = &PositionError> {
        self.history.iter()
    }

    /// Samples recorded over the monitor's lifetime, including evicted ones
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    pub fn statistics(&self) -> AccuracyStatistics {
        Self::summarize(self.history.iter())
    }

    /// Statistics restricted to one tag
    pub fn statistics_for(&self, tag_id: &str) -> AccuracyStatistics {
        Self::summarize(self.history.iter().filter(|e| e.tag_id == tag_id))
    }

    fn summarize<'a>(errors: impl Iterator<Item = &'a PositionError>) -> AccuracyStatistics {
        let errors: Vec<&PositionError> = errors.collect();
        if errors.is_empty() {
            return AccuracyStatistics::default();
        }

        let n = errors.len() as f64;
        let magnitudes: Vec<f64> = errors.iter().map(|e| e.error_magnitude).collect();

        let mean_error = magnitudes.iter().sum::<f64>() / n;
        let rmse = (magnitudes.iter().map(|m| m.powi(2)).sum::<f64>() / n).sqrt();
        let variance = magnitudes.iter().map(|m| (m - mean_error).powi(2)).sum::<f64>() / n;

        let mean_horizontal_error = errors.iter().map(|e| e.horizontal_error).sum::<f64>() / n;
        let mean_vertical_error = errors.iter().map(|e| e.vertical_error).sum::<f64>() / n;

        let max_error = magnitudes.iter().copied().fold(0.0, f64::max);
        let min_error = magnitudes.iter().copied().fold(f64::INFINITY, f64::min);

        let mut sorted = magnitudes.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let index_95 = ((n * 0.95).ceil() as usize).saturating_sub(1).min(sorted.len() - 1);

        AccuracyStatistics {
            mean_error,
            std_dev_error: variance.sqrt(),
            error_95_percentile: sorted[index_95],
            rmse,
            mean_horizontal_error,
            mean_vertical_error,
            max_error,
            min_error,
            sample_count: errors.len(),
        }
    }
}
