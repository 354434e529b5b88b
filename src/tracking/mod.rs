//! Per-tag track state for renderers

pub mod track;
pub mod manager;

pub use track::{Track, TrackColor, TrackSnapshot};
pub use manager::TrackManager;
