//! # phonepilot-device
//!
//! Device discovery and control across the three supported backends:
//! the `adb` USB/TCP bridge, the `hdc` alternate bridge, and a
//! WebDriver-style remote endpoint.
//!
//! # Requirements
//!
//! The bridge executables must be installed and on PATH (or configured with
//! explicit paths). On macOS: `brew install android-platform-tools`.

pub mod adb;
pub mod backend;
pub mod catalog;
pub mod hdc;
pub mod remote;
pub mod wake;

pub use adb::AdbBridge;
pub use backend::{Backend, ShellOutput};
pub use catalog::{DeviceCatalog, ListingSnapshot, parse_listing};
pub use hdc::HdcBridge;
pub use remote::RemoteEndpoint;
pub use wake::{WakeOptions, ensure_awake_and_unlocked, escape_input_text, parse_wake_state};
