use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::BackendKind;

/// Which pre-flight check failed. The two checks run independently and a
/// failure report must never conflate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrepCheck {
    /// Backend reachable, target device present and authorized.
    Device,
    /// Remote agent endpoint answered the connectivity probe.
    Endpoint,
}

impl std::fmt::Display for PrepCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrepCheck::Device => write!(f, "device readiness"),
            PrepCheck::Endpoint => write!(f, "agent endpoint"),
        }
    }
}

/// Unified error type for the entire phonepilot runtime.
#[derive(Error, Debug)]
pub enum PilotError {
    // ── Backend errors ─────────────────────────────────────────
    #[error("{backend} bridge unavailable: {reason}")]
    BackendUnavailable {
        backend: BackendKind,
        reason: String,
    },

    #[error("{backend} call timed out after {timeout_secs}s")]
    BackendTimeout {
        backend: BackendKind,
        timeout_secs: u64,
    },

    // ── Discovery errors ───────────────────────────────────────
    #[error("malformed listing: {0}")]
    Parse(String),

    // ── Session errors ─────────────────────────────────────────
    #[error("wake/unlock did not succeed: {0}")]
    WakeFailed(String),

    #[error("pre-flight check failed ({check}): {reason}")]
    PrepFailed { check: PrepCheck, reason: String },

    #[error("step execution failed: {0}")]
    StepFailed(String),

    #[error("a session is already running")]
    AlreadyRunning,

    /// Terminal, not a failure — the run was cancelled at a step boundary.
    #[error("run cancelled")]
    Cancelled,

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl PilotError {
    /// Advisory errors are absorbed into empty/partial results and surfaced
    /// as display text, never as run-fatal failures.
    pub fn is_advisory(&self) -> bool {
        matches!(
            self,
            PilotError::BackendUnavailable { .. }
                | PilotError::BackendTimeout { .. }
                | PilotError::Parse(_)
                | PilotError::WakeFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PilotError>;
