use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use phonepilot_core::{BackendKind, DeviceInfo, PilotError, Result};

/// Captured output of one shell invocation on the device.
#[derive(Debug, Clone)]
pub struct ShellOutput {
    pub stdout: String,
    pub exit_code: i32,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A device-control transport.
///
/// Listing and shell errors are typed (`BackendUnavailable`, `BackendTimeout`)
/// so the catalog can absorb them into advisory text; `fetch_info` is
/// best-effort by contract and never fails.
#[async_trait]
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Raw listing text as emitted by the bridge tool. Parsing is the
    /// catalog's job — this call does no interpretation.
    async fn list_devices(&self, timeout: Duration) -> Result<String>;

    /// Generic escape hatch used by wake/unlock and keyboard-style
    /// operations.
    async fn run_shell(
        &self,
        device_id: &str,
        command: &str,
        timeout: Duration,
    ) -> Result<ShellOutput>;

    /// Best-effort per-device properties. Each sub-query failure leaves its
    /// field unset; the call itself never fails.
    async fn fetch_info(&self, device_id: &str) -> DeviceInfo;
}

/// On Windows every bridge invocation must be spawned without a console
/// window, or each shell call flashes a cmd box over the UI.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Run a bridge executable with captured, console-suppressed output and a
/// hard deadline.
pub(crate) async fn run_tool(
    program: &Path,
    args: &[&str],
    timeout: Duration,
    kind: BackendKind,
) -> Result<ShellOutput> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| PilotError::BackendTimeout {
            backend: kind,
            timeout_secs: timeout.as_secs(),
        })?
        .map_err(|e| PilotError::BackendUnavailable {
            backend: kind,
            reason: format!("failed to invoke {}: {e}", program.display()),
        })?;

    Ok(ShellOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}
