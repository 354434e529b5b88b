//! Synthetic ranging data for exercising the estimator

pub mod motion;
pub mod generator;

pub use motion::{
    true_range, MotionError, MotionModel, MotionPattern, RoomBounds, SimulatedTag,
};
pub use generator::MeasurementGenerator;
