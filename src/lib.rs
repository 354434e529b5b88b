//! UWB Positioning System
//!
//! Indoor positioning from Ultra-Wideband ranging: a multilateration engine
//! turns per-anchor distances into 3D fixes, a track manager keeps a bounded
//! trail per tag, and a simulator produces noisy ranging records for
//! development without hardware.

pub mod core;
pub mod algorithms;
pub mod tracking;
pub mod simulation;
pub mod processing;
pub mod transport;
pub mod validation;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use core::{
    Anchor, AnchorRegistry, Fix, Measurement, NoFixReason, Point3, PositionEstimate, Solution,
};
pub use algorithms::MultilaterationSolver;
pub use tracking::{TrackManager, TrackSnapshot};
pub use simulation::{MeasurementGenerator, MotionModel, MotionPattern, SimulatedTag};
pub use processing::{CodecError, MeasurementCodec};
pub use transport::{LoopbackTransport, MeasurementTransport, UdpTransport};
pub use validation::{AccuracyMonitor, AccuracyStatistics};
pub use utils::{ConfigError, SystemConfig};
pub use api::{PositionTracker, Simulation};
