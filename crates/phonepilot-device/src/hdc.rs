//! Alternate OS-specific device bridge (`hdc`).
//!
//! Same contract as the adb bridge with the bridge tool's own verbs:
//! `list targets` for discovery (with the literal `[Empty]` sentinel when
//! nothing is attached) and `-t <id> shell` for command execution.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use phonepilot_core::{BackendKind, DeviceInfo, Result};

use crate::backend::{Backend, ShellOutput, run_tool};

pub struct HdcBridge {
    hdc_path: PathBuf,
    info_timeout: Duration,
}

impl HdcBridge {
    pub fn new(hdc_path: impl Into<PathBuf>) -> Self {
        Self {
            hdc_path: hdc_path.into(),
            info_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_info_timeout(mut self, timeout: Duration) -> Self {
        self.info_timeout = timeout;
        self
    }

    async fn hdc(&self, args: &[&str], timeout: Duration) -> Result<ShellOutput> {
        run_tool(&self.hdc_path, args, timeout, BackendKind::Hdc).await
    }

    /// System-parameter probe, the bridge's `getprop` equivalent.
    async fn param(&self, device_id: &str, key: &str) -> Option<String> {
        let out = self
            .hdc(
                &["-t", device_id, "shell", "param", "get", key],
                self.info_timeout,
            )
            .await
            .ok()?;
        if !out.success() {
            return None;
        }
        let value = out.stdout.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

#[async_trait]
impl Backend for HdcBridge {
    fn kind(&self) -> BackendKind {
        BackendKind::Hdc
    }

    async fn list_devices(&self, timeout: Duration) -> Result<String> {
        Ok(self.hdc(&["list", "targets"], timeout).await?.stdout)
    }

    async fn run_shell(
        &self,
        device_id: &str,
        command: &str,
        timeout: Duration,
    ) -> Result<ShellOutput> {
        self.hdc(&["-t", device_id, "shell", command], timeout).await
    }

    async fn fetch_info(&self, device_id: &str) -> DeviceInfo {
        let (model, os_version, manufacturer) = tokio::join!(
            self.param(device_id, "const.product.model"),
            self.param(device_id, "const.product.software.version"),
            self.param(device_id, "const.product.manufacturer"),
        );

        // No reliable wlan probe on this bridge; leave ip unset.
        DeviceInfo {
            model,
            os_version,
            manufacturer,
            ip: None,
        }
    }
}
