//! USB/TCP device bridge (`adb`).
//!
//! Listing, per-device property probes, shell escape hatch, plus the
//! connection-management extras the desktop caller exposes: TCP connect,
//! server restart, and input-method keyboard installation.

use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

use phonepilot_core::{BackendKind, DeviceInfo, Result};

use crate::backend::{Backend, ShellOutput, run_tool};

/// Package/component of the automation input method.
const ADB_KEYBOARD_IME: &str = "com.android.adbkeyboard/.AdbIME";

fn inet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"inet (\d+\.\d+\.\d+\.\d+)").unwrap())
}

/// `adb` bridge. One instance serves every device the server knows about;
/// per-device calls pass the serial via `-s`.
pub struct AdbBridge {
    adb_path: PathBuf,
    info_timeout: Duration,
}

impl AdbBridge {
    pub fn new(adb_path: impl Into<PathBuf>) -> Self {
        Self {
            adb_path: adb_path.into(),
            info_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_info_timeout(mut self, timeout: Duration) -> Self {
        self.info_timeout = timeout;
        self
    }

    async fn adb(&self, args: &[&str], timeout: Duration) -> Result<ShellOutput> {
        run_tool(&self.adb_path, args, timeout, BackendKind::Adb).await
    }

    /// One best-effort property probe; failures collapse to None.
    async fn getprop(&self, device_id: &str, key: &str) -> Option<String> {
        let out = self
            .adb(&["-s", device_id, "shell", "getprop", key], self.info_timeout)
            .await
            .ok()?;
        if !out.success() {
            return None;
        }
        let value = out.stdout.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    /// Connect to a device listening on `ip:port`.
    pub async fn connect(&self, addr: &str, timeout: Duration) -> Result<String> {
        let out = self.adb(&["connect", addr], timeout).await?;
        debug!(addr, exit_code = out.exit_code, "adb connect");
        Ok(out.stdout.trim().to_string())
    }

    /// Kill and restart the bridge server — the recovery path for offline
    /// or stuck device entries.
    pub async fn restart_server(&self) -> Result<()> {
        self.adb(&["kill-server"], Duration::from_secs(5)).await?;
        self.adb(&["start-server"], Duration::from_secs(5)).await?;
        Ok(())
    }

    /// Install the automation keyboard APK and make it the active input
    /// method. The install itself must succeed; the two IME switches are
    /// best-effort and reported back as warnings.
    pub async fn install_keyboard(&self, device_id: &str, apk: &Path) -> Result<Vec<String>> {
        let apk_str = apk.to_string_lossy();
        let install = self
            .adb(
                &["-s", device_id, "install", "-r", &apk_str],
                Duration::from_secs(60),
            )
            .await?;
        if !install.success() {
            return Err(phonepilot_core::PilotError::BackendUnavailable {
                backend: BackendKind::Adb,
                reason: format!("keyboard install failed: {}", install.stdout.trim()),
            });
        }

        let mut warnings = Vec::new();
        let enable = self
            .run_shell(
                device_id,
                &format!("ime enable {ADB_KEYBOARD_IME}"),
                Duration::from_secs(10),
            )
            .await;
        match enable {
            Ok(out) if out.success() => {
                let select = self
                    .run_shell(
                        device_id,
                        &format!("ime set {ADB_KEYBOARD_IME}"),
                        Duration::from_secs(10),
                    )
                    .await;
                match select {
                    Ok(out) if out.success() => {}
                    _ => warnings.push(
                        "keyboard installed but could not be selected — set it manually".into(),
                    ),
                }
            }
            _ => warnings
                .push("keyboard installed but could not be enabled — enable it manually".into()),
        }
        Ok(warnings)
    }
}

#[async_trait]
impl Backend for AdbBridge {
    fn kind(&self) -> BackendKind {
        BackendKind::Adb
    }

    async fn list_devices(&self, timeout: Duration) -> Result<String> {
        Ok(self.adb(&["devices"], timeout).await?.stdout)
    }

    async fn run_shell(
        &self,
        device_id: &str,
        command: &str,
        timeout: Duration,
    ) -> Result<ShellOutput> {
        self.adb(&["-s", device_id, "shell", command], timeout).await
    }

    async fn fetch_info(&self, device_id: &str) -> DeviceInfo {
        let ip_args = ["-s", device_id, "shell", "ip", "addr", "show", "wlan0"];
        let (model, os_version, manufacturer, ip_out) = tokio::join!(
            self.getprop(device_id, "ro.product.model"),
            self.getprop(device_id, "ro.build.version.release"),
            self.getprop(device_id, "ro.product.manufacturer"),
            self.adb(&ip_args, self.info_timeout),
        );

        let ip = match ip_out {
            Ok(out) if out.success() => inet_re()
                .captures(&out.stdout)
                .map(|c| c[1].to_string()),
            _ => {
                warn!(device = device_id, "wlan0 address probe failed");
                None
            }
        };

        DeviceInfo {
            model,
            os_version,
            manufacturer,
            ip,
        }
    }
}
