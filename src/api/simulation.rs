//! Generator session: simulated tags out to a transport

use crate::processing::MeasurementCodec;
use crate::simulation::{MeasurementGenerator, MotionModel, MotionPattern};
use crate::transport::MeasurementTransport;
use crate::utils::config::{ConfigError, SystemConfig};
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Drives a measurement generator, one encoded datagram per tag per tick
pub struct Simulation<R = StdRng> {
    generator: MeasurementGenerator<R>,
    codec: MeasurementCodec,
    sent: u64,
    send_failures: u64,
}

impl Simulation<StdRng> {
    /// Seeded session over the configured anchors, optionally limited to the first `tags`
    pub fn from_config(
        config: &SystemConfig,
        pattern: MotionPattern,
        tags: Option<usize>,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = Arc::new(config.registry()?);
        let model = MotionModel::seeded(pattern, config.room, config.range_noise_std_m, seed)?;
        let generator = MeasurementGenerator::new(registry, config.simulated_tags(tags), model)
            .with_tick(config.tick());
        let codec = MeasurementCodec::new().with_distance_decimals(config.distance_decimals);

        Ok(Self::new(generator, codec))
    }
}

impl<R: Rng> Simulation<R> {
    pub fn new(generator: MeasurementGenerator<R>, codec: MeasurementCodec) -> Self {
        Self {
            generator,
            codec,
            sent: 0,
            send_failures: 0,
        }
    }

    pub fn generator(&self) -> &MeasurementGenerator<R> {
        &self.generator
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn send_failures(&self) -> u64 {
        self.send_failures
    }

    /// Run one tick and send every record; returns how many were sent
    pub fn step<T: MeasurementTransport + ?Sized>(&mut self, transport: &mut T) -> usize {
        let mut sent = 0;
        for measurement in self.generator.tick() {
            let payload = match self.codec.encode(&measurement) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(tag = %measurement.tag_id, error = %e, "skipping unencodable record");
                    continue;
                }
            };

            match transport.send(&payload) {
                Ok(()) => sent += 1,
                Err(e) if e.is_recoverable() => {
                    self.send_failures += 1;
                    warn!(tag = %measurement.tag_id, error = %e, "send failed");
                }
                Err(e) => {
                    self.send_failures += 1;
                    error!(tag = %measurement.tag_id, error = %e, "send failed, transport unusable");
                }
            }
        }

        self.sent += sent as u64;
        debug!(tick = self.generator.ticks(), sent, "tick complete");
        sent
    }

    /// Step every tick period, forever when `ticks` is `None`
    pub fn run<T: MeasurementTransport + ?Sized>(&mut self, transport: &mut T, ticks: Option<u64>) {
        let period = self.generator.tick_period();
        info!(
            tags = self.generator.tags().len(),
            anchors = self.generator.registry().len(),
            period_ms = period.as_millis() as u64,
            "simulation started"
        );

        let mut remaining = ticks;
        let mut deadline = Instant::now();
        while remaining != Some(0) {
            self.step(transport);
            if let Some(n) = remaining.as_mut() {
                *n -= 1;
                if *n == 0 {
                    break;
                }
            }

            deadline += period;
            let now = Instant::now();
            if deadline <= now {
                // Overran the tick; restart the schedule rather than burst
                deadline = now;
                continue;
            }
            thread::sleep(deadline - now);
        }

        info!(sent = self.sent, failures = self.send_failures, "simulation finished");
    }
}
