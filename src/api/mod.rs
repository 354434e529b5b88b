//! Session APIs
//!
//! A [`PositionTracker`] consumes wire records and maintains tracks; a
//! [`Simulation`] produces them. Both are generic over the transport so the
//! same sessions run over UDP or an in-process loopback.

pub mod simulation;
pub mod tracker;

pub use simulation::Simulation;
pub use tracker::{PositionTracker, TrackerStats};
