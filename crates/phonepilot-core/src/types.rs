use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one start-to-terminal run.
pub type RunId = Uuid;

/// The interchangeable device-control transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// USB/TCP device bridge (`adb`-style).
    Adb,
    /// Alternate OS-specific device bridge (`hdc`-style).
    Hdc,
    /// WebDriver-style remote endpoint.
    Remote,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Adb => write!(f, "adb"),
            BackendKind::Hdc => write!(f, "hdc"),
            BackendKind::Remote => write!(f, "remote"),
        }
    }
}

/// Connection status of a listed device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Device,
    Offline,
    Unauthorized,
    Unknown,
}

impl DeviceStatus {
    /// Fixed mapping from the bridge's verbatim status string.
    pub fn from_listing(raw: &str) -> Self {
        match raw {
            "device" => DeviceStatus::Device,
            "offline" => DeviceStatus::Offline,
            "unauthorized" => DeviceStatus::Unauthorized,
            _ => DeviceStatus::Unknown,
        }
    }
}

/// Best-effort per-device properties. A missing field never invalidates
/// the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub model: Option<String>,
    pub os_version: Option<String>,
    pub manufacturer: Option<String>,
    pub ip: Option<String>,
}

impl DeviceInfo {
    pub fn is_empty(&self) -> bool {
        self.model.is_none()
            && self.os_version.is_none()
            && self.manufacturer.is_none()
            && self.ip.is_none()
    }
}

/// One device in a listing snapshot. Immutable value object, recreated on
/// every refresh — there is no cross-refresh identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Backend-scoped serial / target ID, unique within one snapshot.
    pub id: String,
    pub backend: BackendKind,
    pub status: DeviceStatus,
    pub info: Option<DeviceInfo>,
}

impl DeviceRecord {
    pub fn new(id: impl Into<String>, backend: BackendKind, status: DeviceStatus) -> Self {
        Self {
            id: id.into(),
            backend,
            status,
            info: None,
        }
    }
}

/// A swipe gesture in screen coordinates, used for unlock patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeGesture {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
    pub duration_ms: u32,
}

impl Default for SwipeGesture {
    fn default() -> Self {
        // Bottom-to-middle swipe on a 1080x1920 layout.
        Self {
            x1: 540,
            y1: 1600,
            x2: 540,
            y2: 800,
            duration_ms: 300,
        }
    }
}

/// Screen wakefulness as reported by a power-state probe. Transient,
/// recomputed on every probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WakeState {
    Unknown,
    Awake,
    Asleep,
}

/// Result of one step call into the remote automation agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// 1-based step index within the run.
    pub index: u32,
    pub message: String,
    /// The only success terminal signal.
    pub finished: bool,
}

/// Lifecycle of one run. Transitions are one-directional; no state is
/// re-entered within a single run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    #[default]
    Idle,
    Preparing,
    Running,
    Stopping,
    Stopped,
    Completed,
    Failed,
}

impl ExecutionState {
    /// States from which a new run may be started.
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            ExecutionState::Idle
                | ExecutionState::Stopped
                | ExecutionState::Completed
                | ExecutionState::Failed
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Stopped | ExecutionState::Completed | ExecutionState::Failed
        )
    }
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionState::Idle => "idle",
            ExecutionState::Preparing => "preparing",
            ExecutionState::Running => "running",
            ExecutionState::Stopping => "stopping",
            ExecutionState::Stopped => "stopped",
            ExecutionState::Completed => "completed",
            ExecutionState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Terminal result of one run. The step-limit case is a distinct success
/// condition, never a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    CompletedWithLimit,
    Stopped,
    Failed,
}

impl RunOutcome {
    /// Exit-code convention of the surrounding process layer:
    /// 0 success, -1 failure, -2 user-cancelled.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed | RunOutcome::CompletedWithLimit => 0,
            RunOutcome::Failed => -1,
            RunOutcome::Stopped => -2,
        }
    }

    pub fn terminal_state(&self) -> ExecutionState {
        match self {
            RunOutcome::Completed | RunOutcome::CompletedWithLimit => ExecutionState::Completed,
            RunOutcome::Failed => ExecutionState::Failed,
            RunOutcome::Stopped => ExecutionState::Stopped,
        }
    }
}
