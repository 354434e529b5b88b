//! Tick-driven synthetic measurement generator

use crate::core::{AnchorRegistry, Measurement, DEFAULT_TICK_MS};
use crate::simulation::motion::{MotionModel, SimulatedTag};
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::trace;

/// Produces one measurement per simulated tag per tick
pub struct MeasurementGenerator<R = StdRng> {
    registry: Arc<AnchorRegistry>,
    tags: Vec<SimulatedTag>,
    model: MotionModel<R>,
    tick: Duration,
    start_ms: u64,
    ticks: u64,
}

impl<R: Rng> MeasurementGenerator<R> {
    pub fn new(registry: Arc<AnchorRegistry>, tags: Vec<SimulatedTag>, model: MotionModel<R>) -> Self {
        let start_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            registry,
            tags,
            model,
            tick: Duration::from_millis(DEFAULT_TICK_MS),
            start_ms,
            ticks: 0,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Override the wall-clock origin of generated timestamps
    pub fn with_start_time(mut self, start_ms: u64) -> Self {
        self.start_ms = start_ms;
        self
    }

    pub fn tick_period(&self) -> Duration {
        self.tick
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tags(&self) -> &[SimulatedTag] {
        &self.tags
    }

    pub fn registry(&self) -> &AnchorRegistry {
        &self.registry
    }

    /// Advance every tag one tick and range it against every anchor
    pub fn tick(&mut self) -> Vec<Measurement> {
        self.ticks += 1;
        let dt = self.tick.as_secs_f64();
        let timestamp_ms = self.start_ms + self.ticks * self.tick.as_millis() as u64;

        let mut measurements = Vec::with_capacity(self.tags.len());
        for tag in self.tags.iter_mut() {
            self.model.advance(tag, dt);

            let mut measurement =
                Measurement::new(tag.id.clone(), timestamp_ms).with_true_position(tag.position);
            for (anchor_id, anchor_pos) in self.registry.iter() {
                let distance = self.model.range_with_noise(anchor_pos, &tag.position);
                measurement.ranges.insert(anchor_id.to_string(), distance);
            }

            trace!(
                tag = %tag.id,
                x = tag.position.x,
                y = tag.position.y,
                z = tag.position.z,
                "simulated position"
            );
            measurements.push(measurement);
        }
        measurements
    }
}
