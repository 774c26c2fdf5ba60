//! # phonepilot-runtime
//!
//! The session runtime: the cancellable step loop against the remote
//! automation agent, its parallel pre-flight checks, the output collector
//! that reassembles the agent's fragmented text stream, and the
//! `SessionController` facade the caller drives.

pub mod agent;
pub mod collector;
pub mod controller;
pub mod executor;

pub use agent::{AgentStep, HttpStepAgent, StepAgent};
pub use collector::OutputCollector;
pub use controller::{SessionController, StartRequest, StatusSnapshot};
pub use executor::{RunRequest, StepExecutor};
