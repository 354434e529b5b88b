//! Core types, constants and the anchor registry

pub mod types;
pub mod constants;
pub mod anchors;

pub use types::*;
pub use constants::*;
pub use anchors::{AnchorRegistry, RegistryError};
