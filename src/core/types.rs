//! Core data types for the positioning system

use crate::core::constants::SPEED_OF_LIGHT;
use nalgebra::Vector3;
use std::collections::BTreeMap;
use std::fmt;

/// Cartesian position in meters (x, y, z)
pub type Point3 = Vector3<f64>;

/// Time of flight (seconds) of a radio range in meters
pub fn time_of_flight(distance: f64) -> f64 {
    distance / SPEED_OF_LIGHT
}

/// Fixed ranging anchor with a surveyed position
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub id: String,
    pub position: Point3,
}

impl Anchor {
    pub fn new(id: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            id: id.into(),
            position: Point3::new(x, y, z),
        }
    }
}

/// One packet worth of ranges from a single tag
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub tag_id: String,
    /// Distance in meters keyed by anchor id
    pub ranges: BTreeMap<String, f64>,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
    /// Ground truth, only present on simulated data
    pub true_position: Option<Point3>,
}

impl Measurement {
    pub fn new(tag_id: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            tag_id: tag_id.into(),
            ranges: BTreeMap::new(),
            timestamp_ms,
            true_position: None,
        }
    }

    pub fn with_range(mut self, anchor_id: impl Into<String>, distance: f64) -> Self {
        self.ranges.insert(anchor_id.into(), distance);
        self
    }

    pub fn with_true_position(mut self, position: Point3) -> Self {
        self.true_position = Some(position);
        self
    }
}

/// Why a measurement could not be turned into a position
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoFixReason {
    /// Fewer usable ranges than a 3D solve needs
    InsufficientAnchors { usable: usize, required: usize },
    /// Anchor geometry relative to the reference is rank deficient
    DegenerateGeometry { rank: usize },
    /// Solver produced NaN or infinite coordinates
    NonFinite,
}

impl fmt::Display for NoFixReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoFixReason::InsufficientAnchors { usable, required } => {
                write!(f, "{} usable anchor ranges, {} required", usable, required)
            }
            NoFixReason::DegenerateGeometry { rank } => {
                write!(f, "degenerate anchor geometry (rank {})", rank)
            }
            NoFixReason::NonFinite => write!(f, "non-finite solution"),
        }
    }
}

/// Least-squares solution with quality information
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    pub position: Point3,
    /// RMS residual of the linearized system
    pub residual_rms: f64,
    pub anchors_used: usize,
}

/// Outcome of a single solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fix {
    Position(Solution),
    NoFix(NoFixReason),
}

impl Fix {
    pub fn position(&self) -> Option<Point3> {
        match self {
            Fix::Position(solution) => Some(solution.position),
            Fix::NoFix(_) => None,
        }
    }

    pub fn is_fix(&self) -> bool {
        matches!(self, Fix::Position(_))
    }
}

/// Solver output for one measurement
#[derive(Debug, Clone, PartialEq)]
pub struct PositionEstimate {
    pub tag_id: String,
    pub fix: Fix,
    pub source: Measurement,
}

impl PositionEstimate {
    pub fn position(&self) -> Option<Point3> {
        self.fix.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_of_flight() {
        assert!((time_of_flight(SPEED_OF_LIGHT) - 1.0).abs() < 1e-15);
        assert!((time_of_flight(3.0) - 1.000_692_286e-8).abs() < 1e-15);
    }

    #[test]
    fn test_measurement_builder() {
        let m = Measurement::new("T1", 10)
            .with_range("A2", 2.0)
            .with_range("A1", 1.0)
            .with_range("A2", 3.0);
        let ids: Vec<&String> = m.ranges.keys().collect();
        assert_eq!(ids, vec!["A1", "A2"]);
        assert_eq!(m.ranges["A2"], 3.0);
    }

    #[test]
    fn test_no_fix_display() {
        let reason = NoFixReason::InsufficientAnchors { usable: 3, required: 4 };
        assert_eq!(reason.to_string(), "3 usable anchor ranges, 4 required");
        assert!(!Fix::NoFix(reason).is_fix());
    }
}
