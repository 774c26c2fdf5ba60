//! # phonepilot-core
//!
//! Core types and error taxonomy for the phonepilot device session controller.
//! This crate defines the shared vocabulary used by every other crate in the workspace.

pub mod error;
pub mod event;
pub mod types;

pub use error::{PilotError, PrepCheck, Result};
pub use event::{EventSender, SessionEvent};
pub use types::*;
