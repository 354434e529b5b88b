//! Ground-truth tag motion and ranging noise

use crate::core::Point3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Random-walk step bounds per tick (meters)
const WALK_STEP_XY: f64 = 0.2;
const WALK_STEP_Z: f64 = 0.1;

/// Errors raised while building a motion model
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionError {
    #[error("noise standard deviation must be finite and non-negative, got {0}")]
    InvalidNoise(f64),
    #[error("invalid room bounds: {0}")]
    InvalidRoom(String),
    #[error("unknown movement pattern '{0}' (expected circle or random)")]
    UnknownPattern(String),
}

/// How simulated tags move between ticks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionPattern {
    /// Circle in XY with Z swinging on the same phase
    #[default]
    #[serde(alias = "orbit")]
    Circle,
    /// Bounded uniform random walk
    #[serde(alias = "random-walk")]
    Random,
}

impl fmt::Display for MotionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionPattern::Circle => write!(f, "circle"),
            MotionPattern::Random => write!(f, "random"),
        }
    }
}

impl FromStr for MotionPattern {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "circle" | "orbit" => Ok(MotionPattern::Circle),
            "random" | "random-walk" => Ok(MotionPattern::Random),
            other => Err(MotionError::UnknownPattern(other.to_string())),
        }
    }
}

/// Horizontal extent of the simulated room (meters)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoomBounds {
    pub x: (f64, f64),
    pub y: (f64, f64),
}

impl Default for RoomBounds {
    fn default() -> Self {
        Self {
            x: (0.0, 8.0),
            y: (0.0, 6.0),
        }
    }
}

impl RoomBounds {
    pub fn validate(&self) -> Result<(), MotionError> {
        for (axis, (lo, hi)) in [("x", self.x), ("y", self.y)] {
            if !(lo.is_finite() && hi.is_finite()) || lo > hi {
                return Err(MotionError::InvalidRoom(format!(
                    "{} range [{}, {}]",
                    axis, lo, hi
                )));
            }
        }
        Ok(())
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x.0 && x <= self.x.1 && y >= self.y.0 && y <= self.y.1
    }
}

/// Generator-side tag with its ground-truth state
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedTag {
    pub id: String,
    pub position: Point3,
    pub orbit_center: Point3,
    pub orbit_radius: f64,
    /// Orbit phase (radians)
    pub angle: f64,
    /// Radians per second
    pub angular_speed: f64,
    /// Allowed Z interval (min, max)
    pub height_range: (f64, f64),
}

impl SimulatedTag {
    /// Tag starting at its orbit center
    pub fn new(
        id: impl Into<String>,
        orbit_center: Point3,
        orbit_radius: f64,
        angle: f64,
        angular_speed: f64,
        height_range: (f64, f64),
    ) -> Self {
        Self {
            id: id.into(),
            position: orbit_center,
            orbit_center,
            orbit_radius,
            angle,
            angular_speed,
            height_range,
        }
    }

    /// Three tags of the reference deployment
    pub fn reference_tags() -> Vec<Self> {
        vec![
            Self::new("T1", Point3::new(4.0, 3.0, 1.5), 2.0, 0.0, 2.0, (1.0, 2.0)),
            Self::new("T2", Point3::new(2.0, 2.0, 1.0), 1.5, PI, 1.5, (0.5, 1.5)),
            Self::new("T3", Point3::new(6.0, 4.0, 0.5), 1.0, PI / 2.0, 3.0, (0.0, 1.0)),
        ]
    }
}

/// Euclidean distance between two points
pub fn true_range(a: &Point3, b: &Point3) -> f64 {
    (a - b).norm()
}

/// Moves tags and produces noisy ranges from a single random source
#[derive(Debug, Clone)]
pub struct MotionModel<R = StdRng> {
    pattern: MotionPattern,
    room: RoomBounds,
    noise: Normal<f64>,
    step_xy: Uniform<f64>,
    step_z: Uniform<f64>,
    rng: R,
}

impl MotionModel<StdRng> {
    /// Model with a reproducible random source
    pub fn seeded(
        pattern: MotionPattern,
        room: RoomBounds,
        noise_std_dev: f64,
        seed: u64,
    ) -> Result<Self, MotionError> {
        Self::with_rng(pattern, room, noise_std_dev, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> MotionModel<R> {
    pub fn with_rng(
        pattern: MotionPattern,
        room: RoomBounds,
        noise_std_dev: f64,
        rng: R,
    ) -> Result<Self, MotionError> {
        if !noise_std_dev.is_finite() || noise_std_dev < 0.0 {
            return Err(MotionError::InvalidNoise(noise_std_dev));
        }
        room.validate()?;
        let noise =
            Normal::new(0.0, noise_std_dev).map_err(|_| MotionError::InvalidNoise(noise_std_dev))?;

        Ok(Self {
            pattern,
            room,
            noise,
            step_xy: Uniform::new_inclusive(-WALK_STEP_XY, WALK_STEP_XY),
            step_z: Uniform::new_inclusive(-WALK_STEP_Z, WALK_STEP_Z),
            rng,
        })
    }

    pub fn pattern(&self) -> MotionPattern {
        self.pattern
    }

    pub fn room(&self) -> &RoomBounds {
        &self.room
    }

    pub fn noise_std_dev(&self) -> f64 {
        self.noise.std_dev()
    }

    /// Move a tag's ground truth forward by `dt` seconds
    pub fn advance(&mut self, tag: &mut SimulatedTag, dt: f64) {
        match self.pattern {
            MotionPattern::Circle => Self::orbit(tag, dt),
            MotionPattern::Random => self.random_walk(tag),
        }
    }

    /// Ground-truth range plus zero-mean Gaussian noise, floored at zero
    pub fn range_with_noise(&mut self, anchor: &Point3, tag: &Point3) -> f64 {
        let distance = true_range(anchor, tag) + self.noise.sample(&mut self.rng);
        distance.max(0.0)
    }

    fn orbit(tag: &mut SimulatedTag, dt: f64) {
        tag.angle += tag.angular_speed * dt;

        tag.position.x = tag.orbit_center.x + tag.orbit_radius * tag.angle.cos();
        tag.position.y = tag.orbit_center.y + tag.orbit_radius * tag.angle.sin();

        // Z shares the XY phase: one full swing per orbit
        let (z_min, z_max) = tag.height_range;
        let z_mid = (z_min + z_max) / 2.0;
        let z_amplitude = (z_max - z_min) / 2.0;
        tag.position.z = z_mid + z_amplitude * tag.angle.sin();
    }

    fn random_walk(&mut self, tag: &mut SimulatedTag) {
        tag.position.x += self.step_xy.sample(&mut self.rng);
        tag.position.y += self.step_xy.sample(&mut self.rng);
        tag.position.z += self.step_z.sample(&mut self.rng);

        let (z_min, z_max) = tag.height_range;
        tag.position.x = tag.position.x.clamp(self.room.x.0, self.room.x.1);
        tag.position.y = tag.position.y.clamp(self.room.y.0, self.room.y.1);
        tag.position.z = tag.position.z.clamp(z_min, z_max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_standard_deviation_matches_configuration() {
        let sigma = 0.1;
        let mut model =
            MotionModel::seeded(MotionPattern::Circle, RoomBounds::default(), sigma, 1234).unwrap();
        let anchor = Point3::new(0.0, 0.0, 0.0);
        let tag = Point3::new(4.0, 3.0, 1.5);
        let truth = true_range(&anchor, &tag);

        let n = 10_000;
        let errors: Vec<f64> = (0..n)
            .map(|_| model.range_with_noise(&anchor, &tag) - truth)
            .collect();
        let mean = errors.iter().sum::<f64>() / n as f64;
        let variance = errors.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        let std_dev = variance.sqrt();

        println!("Noise sample mean={:.5}, std={:.5}", mean, std_dev);
        assert!(((std_dev - sigma) / sigma).abs() < 0.05);
        assert!(mean.abs() < 0.01);
    }

    #[test]
    fn test_noise_is_independent_across_anchors() {
        let mut model =
            MotionModel::seeded(MotionPattern::Circle, RoomBounds::default(), 0.1, 99).unwrap();
        let a1 = Point3::new(0.0, 0.0, 0.0);
        let a2 = Point3::new(8.0, 0.0, 0.0);
        let tag = Point3::new(4.0, 3.0, 1.5);
        let t1 = true_range(&a1, &tag);
        let t2 = true_range(&a2, &tag);

        let n = 10_000;
        let pairs: Vec<(f64, f64)> = (0..n)
            .map(|_| {
                (
                    model.range_with_noise(&a1, &tag) - t1,
                    model.range_with_noise(&a2, &tag) - t2,
                )
            })
            .collect();
        let covariance = pairs.iter().map(|(e1, e2)| e1 * e2).sum::<f64>() / n as f64;
        let correlation = covariance / (0.1 * 0.1);

        assert!(correlation.abs() < 0.05, "correlation {}", correlation);
    }

    #[test]
    fn test_zero_noise_gives_exact_range() {
        let mut model =
            MotionModel::seeded(MotionPattern::Circle, RoomBounds::default(), 0.0, 5).unwrap();
        let anchor = Point3::new(8.0, 0.0, 0.0);
        let tag = Point3::new(4.0, 3.0, 0.0);
        assert!((model.range_with_noise(&anchor, &tag) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_noisy_range_never_negative() {
        let mut model =
            MotionModel::seeded(MotionPattern::Circle, RoomBounds::default(), 0.5, 11).unwrap();
        let at_anchor = Point3::new(1.0, 1.0, 1.0);
        for _ in 0..1000 {
            assert!(model.range_with_noise(&at_anchor, &at_anchor) >= 0.0);
        }
    }

    #[test]
    fn test_invalid_noise_rejected() {
        assert_eq!(
            MotionModel::seeded(MotionPattern::Circle, RoomBounds::default(), -0.1, 0).unwrap_err(),
            MotionError::InvalidNoise(-0.1)
        );
        assert!(MotionModel::seeded(MotionPattern::Circle, RoomBounds::default(), f64::NAN, 0)
            .is_err());
    }

    #[test]
    fn test_random_walk_stays_in_bounds() {
        let room = RoomBounds::default();
        let mut model = MotionModel::seeded(MotionPattern::Random, room, 0.1, 42).unwrap();
        let mut tags = SimulatedTag::reference_tags();

        for _ in 0..10_000 {
            for tag in tags.iter_mut() {
                let before = tag.position;
                model.advance(tag, 0.1);

                let step = tag.position - before;
                assert!(step.x.abs() <= WALK_STEP_XY + 1e-12);
                assert!(step.y.abs() <= WALK_STEP_XY + 1e-12);
                assert!(step.z.abs() <= WALK_STEP_Z + 1e-12);

                let (z_min, z_max) = tag.height_range;
                assert!(room.contains(tag.position.x, tag.position.y));
                assert!(tag.position.z >= z_min && tag.position.z <= z_max);
            }
        }
    }

    #[test]
    fn test_orbit_couples_height_to_phase() {
        let mut model =
            MotionModel::seeded(MotionPattern::Circle, RoomBounds::default(), 0.0, 0).unwrap();
        let mut tag = SimulatedTag::reference_tags().remove(0);

        for _ in 0..200 {
            model.advance(&mut tag, 0.1);

            let offset = tag.position - tag.orbit_center;
            let radius = (offset.x.powi(2) + offset.y.powi(2)).sqrt();
            assert!((radius - tag.orbit_radius).abs() < 1e-9);

            // z_mid + z_amp * sin(angle), with sin(angle) = dy / r
            let sin_phase = offset.y / tag.orbit_radius;
            let expected_z = 1.5 + 0.5 * sin_phase;
            assert!((tag.position.z - expected_z).abs() < 1e-9);
            assert!(tag.position.z >= 1.0 - 1e-12 && tag.position.z <= 2.0 + 1e-12);
        }
    }

    #[test]
    fn test_orbit_angle_advances_with_dt() {
        let mut model =
            MotionModel::seeded(MotionPattern::Circle, RoomBounds::default(), 0.0, 0).unwrap();
        let mut tag = SimulatedTag::new("T", Point3::new(0.0, 0.0, 1.0), 1.0, 0.0, PI, (0.0, 2.0));

        // Half a second at pi rad/s is a quarter turn
        model.advance(&mut tag, 0.5);
        assert!((tag.angle - PI / 2.0).abs() < 1e-12);
        assert!(tag.position.x.abs() < 1e-12);
        assert!((tag.position.y - 1.0).abs() < 1e-12);
        assert!((tag.position.z - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_pattern_parsing() {
        assert_eq!("circle".parse::<MotionPattern>(), Ok(MotionPattern::Circle));
        assert_eq!("Random".parse::<MotionPattern>(), Ok(MotionPattern::Random));
        assert_eq!("orbit".parse::<MotionPattern>(), Ok(MotionPattern::Circle));
        assert!("zigzag".parse::<MotionPattern>().is_err());
        assert_eq!(MotionPattern::default(), MotionPattern::Circle);
    }
}
