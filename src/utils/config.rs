use crate::core::{
    Anchor, AnchorRegistry, Point3, RegistryError, DEFAULT_PORT, DEFAULT_RANGE_NOISE_STD_M,
    DEFAULT_RECEIVE_TIMEOUT_MS, DEFAULT_TICK_MS, DEFAULT_TRAIL_LENGTH, MAX_TRAIL_LENGTH,
    MIN_ANCHORS_3D,
};
use crate::processing::codec::{DEFAULT_DISTANCE_DECIMALS, MAX_DISTANCE_DECIMALS};
use crate::simulation::{MotionError, RoomBounds, SimulatedTag};
use crate::validation::accuracy::{DEFAULT_HISTORY_SIZE, MAX_HISTORY_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// System-wide configuration shared by estimator and generator
///
/// Both sides must be started with the same anchor table; the wire format
/// does not carry anchor positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Anchor survey
    pub anchors: Vec<AnchorConfig>,
    /// UDP port used by both sides
    pub port: u16,
    /// Estimator receive timeout (milliseconds)
    pub receive_timeout_ms: u64,
    /// Generator tick period (milliseconds)
    pub tick_ms: u64,
    /// Standard deviation of simulated ranging noise (meters)
    pub range_noise_std_m: f64,
    /// Random-walk room extent
    pub room: RoomBounds,
    /// Positions kept per tag trail
    pub trail_length: usize,
    /// Errors kept by the accuracy monitor
    pub accuracy_history: usize,
    /// Wire precision of distances, `null` for full precision
    pub distance_decimals: Option<u32>,
    /// Relative singular value threshold for rank detection
    pub rank_tolerance: f64,
    /// Simulated tags
    pub tags: Vec<TagConfig>,
}

/// Individual anchor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorConfig {
    pub id: String,
    /// (x, y, z) in meters
    pub position: [f64; 3],
}

/// Simulated tag configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagConfig {
    pub id: String,
    /// Orbit center and starting position (meters)
    pub center: [f64; 3],
    pub radius: f64,
    /// Starting phase (radians)
    #[serde(default)]
    pub angle: f64,
    /// Radians per second
    pub angular_speed: f64,
    /// (min, max) Z in meters
    pub height_range: (f64, f64),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {parameter} = {value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    #[error("configuration file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("anchor table error: {0}")]
    Registry(#[from] RegistryError),
    #[error("motion model error: {0}")]
    Motion(#[from] MotionError),
}

impl Default for SystemConfig {
    fn default() -> Self {
        let anchors = AnchorRegistry::reference_room()
            .iter()
            .map(|(id, pos)| AnchorConfig {
                id: id.to_string(),
                position: [pos.x, pos.y, pos.z],
            })
            .collect();
        let tags = SimulatedTag::reference_tags().iter().map(TagConfig::from).collect();

        Self {
            anchors,
            port: DEFAULT_PORT,
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
            tick_ms: DEFAULT_TICK_MS,
            range_noise_std_m: DEFAULT_RANGE_NOISE_STD_M,
            room: RoomBounds::default(),
            trail_length: DEFAULT_TRAIL_LENGTH,
            accuracy_history: DEFAULT_HISTORY_SIZE,
            distance_decimals: Some(DEFAULT_DISTANCE_DECIMALS),
            rank_tolerance: 1e-9,
            tags,
        }
    }
}

impl From<&SimulatedTag> for TagConfig {
    fn from(tag: &SimulatedTag) -> Self {
        Self {
            id: tag.id.clone(),
            center: [tag.orbit_center.x, tag.orbit_center.y, tag.orbit_center.z],
            radius: tag.orbit_radius,
            angle: tag.angle,
            angular_speed: tag.angular_speed,
            height_range: tag.height_range,
        }
    }
}

impl TagConfig {
    pub fn to_simulated_tag(&self) -> SimulatedTag {
        SimulatedTag::new(
            self.id.clone(),
            Point3::new(self.center[0], self.center[1], self.center[2]),
            self.radius,
            self.angle,
            self.angular_speed,
            self.height_range,
        )
    }
}

fn invalid(parameter: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter: parameter.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl SystemConfig {
    /// Load and validate a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SystemConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.anchors.len() < MIN_ANCHORS_3D {
            return Err(invalid(
                "anchors",
                self.anchors.len(),
                "at least 4 anchors are required for a 3D fix",
            ));
        }
        self.registry()?;

        if self.port == 0 {
            return Err(invalid("port", self.port, "must be non-zero"));
        }
        if self.receive_timeout_ms == 0 {
            return Err(invalid("receive_timeout_ms", 0, "must be positive"));
        }
        if self.tick_ms == 0 {
            return Err(invalid("tick_ms", 0, "must be positive"));
        }
        if !self.range_noise_std_m.is_finite() || self.range_noise_std_m < 0.0 {
            return Err(MotionError::InvalidNoise(self.range_noise_std_m).into());
        }
        self.room.validate()?;
        if !(1..=MAX_TRAIL_LENGTH).contains(&self.trail_length) {
            return Err(invalid("trail_length", self.trail_length, "must be between 1 and 100000"));
        }
        if !(1..=MAX_HISTORY_SIZE).contains(&self.accuracy_history) {
            return Err(invalid(
                "accuracy_history",
                self.accuracy_history,
                "must be between 1 and 1000000",
            ));
        }
        if let Some(decimals) = self.distance_decimals {
            if decimals > MAX_DISTANCE_DECIMALS {
                return Err(invalid("distance_decimals", decimals, "must be at most 15"));
            }
        }
        if !(self.rank_tolerance.is_finite() && self.rank_tolerance > 0.0) {
            return Err(invalid("rank_tolerance", self.rank_tolerance, "must be positive"));
        }

        let mut seen = HashSet::new();
        for tag in &self.tags {
            if tag.id.is_empty() || !seen.insert(tag.id.as_str()) {
                return Err(invalid("tags.id", &tag.id, "must be non-empty and unique"));
            }
            let (z_min, z_max) = tag.height_range;
            if !(z_min.is_finite() && z_max.is_finite()) || z_min > z_max {
                return Err(invalid(
                    "tags.height_range",
                    format!("({}, {})", z_min, z_max),
                    "min must not exceed max",
                ));
            }
            if !tag.radius.is_finite() || tag.radius < 0.0 {
                return Err(invalid("tags.radius", tag.radius, "must be finite and non-negative"));
            }
            if !tag.center.iter().all(|c| c.is_finite())
                || !tag.angle.is_finite()
                || !tag.angular_speed.is_finite()
            {
                return Err(invalid("tags", &tag.id, "orbit parameters must be finite"));
            }
        }

        Ok(())
    }

    pub fn registry(&self) -> Result<AnchorRegistry, RegistryError> {
        AnchorRegistry::new(self.anchors.iter().map(|a| {
            Anchor::new(a.id.clone(), a.position[0], a.position[1], a.position[2])
        }))
    }

    /// The first `count` configured tags, or all when `None`
    pub fn simulated_tags(&self, count: Option<usize>) -> Vec<SimulatedTag> {
        let count = count.unwrap_or(self.tags.len());
        self.tags
            .iter()
            .take(count)
            .map(TagConfig::to_simulated_tag)
            .collect()
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }
}
