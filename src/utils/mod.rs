//! Utility modules for configuration

pub mod config;

pub use config::{AnchorConfig, ConfigError, SystemConfig, TagConfig};
