//! Configuration, logging and runtime assembly for the agent binary.
pub mod builder;
pub mod config;
pub mod logging;

pub use builder::AgentBuilder;
pub use config::{AgentConfig, ConfigError};
pub use logging::setup_logging;
