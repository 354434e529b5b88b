//! Estimator session: datagrams in, tracks out

use crate::algorithms::MultilaterationSolver;
use crate::core::{AnchorRegistry, Fix, PositionEstimate};
use crate::processing::MeasurementCodec;
use crate::tracking::TrackManager;
use crate::transport::MeasurementTransport;
use crate::utils::config::{ConfigError, SystemConfig};
use crate::validation::AccuracyMonitor;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Running counters for one tracker session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    pub records_received: u64,
    pub records_dropped: u64,
    pub fixes: u64,
    pub no_fixes: u64,
    pub transport_errors: u64,
}

/// Owns everything the estimator needs for one run
pub struct PositionTracker {
    registry: Arc<AnchorRegistry>,
    solver: MultilaterationSolver,
    codec: MeasurementCodec,
    tracks: TrackManager,
    accuracy: AccuracyMonitor,
    stats: TrackerStats,
}

impl PositionTracker {
    pub fn new(registry: Arc<AnchorRegistry>, trail_length: usize) -> Self {
        Self {
            registry,
            solver: MultilaterationSolver::new(),
            codec: MeasurementCodec::new(),
            tracks: TrackManager::new(trail_length),
            accuracy: AccuracyMonitor::default(),
            stats: TrackerStats::default(),
        }
    }

    pub fn from_config(config: &SystemConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = Arc::new(config.registry()?);

        let mut tracker = Self::new(registry, config.trail_length)
            .with_solver(MultilaterationSolver::new().with_rank_tolerance(config.rank_tolerance))
            .with_accuracy_monitor(AccuracyMonitor::new(config.accuracy_history));
        tracker.codec = MeasurementCodec::new().with_distance_decimals(config.distance_decimals);
        Ok(tracker)
    }

    pub fn with_solver(mut self, solver: MultilaterationSolver) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_accuracy_monitor(mut self, accuracy: AccuracyMonitor) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn registry(&self) -> &AnchorRegistry {
        &self.registry
    }

    pub fn tracks(&self) -> &TrackManager {
        &self.tracks
    }

    pub fn accuracy(&self) -> &AccuracyMonitor {
        &self.accuracy
    }

    pub fn stats(&self) -> TrackerStats {
        self.stats
    }

    /// Decode, solve and record one datagram
    ///
    /// Malformed records are logged and dropped; they never reach a track.
    pub fn ingest(&mut self, bytes: &[u8]) -> Option<PositionEstimate> {
        self.stats.records_received += 1;

        let measurement = match self.codec.decode(bytes) {
            Ok(measurement) => measurement,
            Err(e) => {
                self.stats.records_dropped += 1;
                warn!(error = %e, len = bytes.len(), "dropping malformed record");
                return None;
            }
        };

        let estimate = self.solver.estimate(measurement, &self.registry);
        self.tracks.update(&estimate.tag_id, &estimate);

        match &estimate.fix {
            Fix::Position(solution) => {
                self.stats.fixes += 1;
                let p = solution.position;
                info!(
                    tag = %estimate.tag_id,
                    x = p.x,
                    y = p.y,
                    z = p.z,
                    residual = solution.residual_rms,
                    "position fix"
                );

                if let Some(truth) = estimate.source.true_position {
                    let error = self.accuracy.record(&estimate.tag_id, truth, p);
                    debug!(tag = %estimate.tag_id, error_m = error.error_magnitude, "fix error");
                }
            }
            Fix::NoFix(reason) => {
                self.stats.no_fixes += 1;
                debug!(tag = %estimate.tag_id, %reason, "no fix");
            }
        }

        Some(estimate)
    }

    /// One receive attempt; timeouts and transport failures yield `None`
    pub fn poll<T: MeasurementTransport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Option<PositionEstimate> {
        match transport.receive() {
            Ok(Some(bytes)) => self.ingest(&bytes),
            Ok(None) => None,
            Err(e) => {
                self.stats.transport_errors += 1;
                warn!(error = %e, strategy = ?e.recovery_strategy(), "receive failed");
                None
            }
        }
    }

    /// Poll until `should_stop` returns true
    pub fn run<T, F>(&mut self, transport: &mut T, mut should_stop: F)
    where
        T: MeasurementTransport + ?Sized,
        F: FnMut(&Self) -> bool,
    {
        info!(anchors = self.registry.len(), "tracker started");
        while !should_stop(self) {
            self.poll(transport);
        }
        info!(
            received = self.stats.records_received,
            fixes = self.stats.fixes,
            "tracker stopped"
        );
    }
}
