//! # phonepilot-cli
//!
//! Command-line interface for the phonepilot session controller.
//!
//! ## Commands
//!
//! - `phonepilot devices` — List devices with best-effort info
//! - `phonepilot run` — Run an automation task on a device
//! - `phonepilot wake` — Wake and unlock a device's screen
//! - `phonepilot connect` — Connect to a device over TCP (adb)
//! - `phonepilot restart-server` — Restart the adb bridge server
//! - `phonepilot install-keyboard` — Install the automation keyboard
//! - `phonepilot config` — Show current configuration
//! - `phonepilot doctor` — Audit configuration

pub mod commands;

pub use commands::Cli;
