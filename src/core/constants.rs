//! Physical constants and system parameters

/// Speed of light in vacuum (m/s), used to derive time-of-flight from range
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Minimum number of anchor ranges for a 3D fix
pub const MIN_ANCHORS_3D: usize = 4;

/// Default number of positions kept in a tag's trail
pub const DEFAULT_TRAIL_LENGTH: usize = 50;

/// Largest configurable trail
pub const MAX_TRAIL_LENGTH: usize = 100_000;

/// Well-known UDP port shared by generator and estimator
pub const DEFAULT_PORT: u16 = 12345;

/// Generator tick period (milliseconds)
pub const DEFAULT_TICK_MS: u64 = 100;

/// Estimator receive timeout (milliseconds)
pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 100;

/// Standard deviation of simulated ranging noise (meters)
pub const DEFAULT_RANGE_NOISE_STD_M: f64 = 0.1;
