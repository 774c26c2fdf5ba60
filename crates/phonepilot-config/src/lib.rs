//! # phonepilot-config
//!
//! Configuration schema and loader for `phonepilot.toml`.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{
    AgentEndpointConfig, DeviceConfig, LoggingConfig, PilotConfig, SessionConfig,
};
