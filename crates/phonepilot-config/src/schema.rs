use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use phonepilot_core::{BackendKind, SwipeGesture};

/// Root configuration — maps to `phonepilot.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    pub agent: AgentEndpointConfig,
    pub device: DeviceConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

// ── Agent endpoint ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentEndpointConfig {
    /// Base URL of the remote automation agent's API.
    pub base_url: String,
    /// Model identifier passed through to the agent.
    pub model: String,
    /// API key; falls back to the PHONEPILOT_API_KEY env var.
    pub api_key: Option<String>,
}

impl Default for AgentEndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "https://open.bigmodel.cn/api/paas/v4".into(),
            model: "autoglm-phone".into(),
            api_key: None,
        }
    }
}

// ── Device backends ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Which backend to drive by default.
    pub backend: BackendKind,
    /// Bridge executable paths. Bare names resolve through PATH.
    pub adb_path: PathBuf,
    pub hdc_path: PathBuf,
    /// Base URL of the WebDriver-style remote endpoint.
    pub remote_url: Option<String>,
    /// Lock-screen password typed during unlock (spaces are escaped).
    pub unlock_password: Option<String>,
    /// Unlock swipe gesture; None skips the swipe.
    pub unlock_swipe: Option<SwipeGesture>,
    /// Timeout for a full device listing call.
    pub list_timeout_secs: u64,
    /// Timeout for one shell invocation on the device.
    pub shell_timeout_secs: u64,
    /// Timeout per best-effort info sub-query.
    pub info_timeout_secs: u64,
    /// Timeout for a TCP connect to a remote bridge device.
    pub connect_timeout_secs: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Adb,
            adb_path: PathBuf::from("adb"),
            hdc_path: PathBuf::from("hdc"),
            remote_url: None,
            unlock_password: None,
            unlock_swipe: Some(SwipeGesture::default()),
            list_timeout_secs: 10,
            shell_timeout_secs: 10,
            info_timeout_secs: 5,
            connect_timeout_secs: 15,
        }
    }
}

// ── Session ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum step calls per run before the run completes with the
    /// step-limit condition. Must be at least 1.
    pub max_steps: u32,
    /// Timeout for the device-readiness pre-flight check.
    pub prep_timeout_secs: u64,
    /// Timeout for the agent endpoint connectivity probe.
    pub probe_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_steps: 200,
            prep_timeout_secs: 15,
            probe_timeout_secs: 5,
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive for tracing-subscriber, e.g. "info" or
    /// "phonepilot_runtime=debug,info".
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl PilotConfig {
    /// Validate the config. Returns human-readable warnings for conditions
    /// worth surfacing; returns Err for conditions that make a run
    /// impossible.
    pub fn validate(&self) -> Result<Vec<String>, String> {
        if self.session.max_steps < 1 {
            return Err("session.max_steps must be at least 1".into());
        }
        if self.agent.base_url.trim().is_empty() {
            return Err("agent.base_url must not be empty".into());
        }

        let mut warnings = Vec::new();
        if self.agent.api_key.is_none() {
            warnings.push(
                "agent.api_key is not set — the endpoint probe will likely be rejected".into(),
            );
        }
        if self.device.backend == BackendKind::Remote && self.device.remote_url.is_none() {
            warnings.push(
                "device.backend is 'remote' but device.remote_url is not set".into(),
            );
        }
        Ok(warnings)
    }
}
