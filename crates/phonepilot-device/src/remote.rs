//! WebDriver-style remote endpoint backend.
//!
//! Discovery and shell execution go over HTTP against an automation server
//! (Appium-compatible). The listing is normalized to plain ID lines so the
//! catalog can parse it under the same rule as the alternate bridge.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use phonepilot_core::{BackendKind, DeviceInfo, PilotError, Result};

use crate::backend::{Backend, ShellOutput};

pub struct RemoteEndpoint {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn map_err(&self, e: reqwest::Error, timeout: Duration) -> PilotError {
        if e.is_timeout() {
            PilotError::BackendTimeout {
                backend: BackendKind::Remote,
                timeout_secs: timeout.as_secs(),
            }
        } else {
            PilotError::BackendUnavailable {
                backend: BackendKind::Remote,
                reason: format!("{}: {e}", self.base_url),
            }
        }
    }

    async fn get_json(&self, path: &str, timeout: Duration) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| self.map_err(e, timeout))?;
        resp.json::<Value>()
            .await
            .map_err(|e| self.map_err(e, timeout))
    }
}

#[async_trait]
impl Backend for RemoteEndpoint {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn list_devices(&self, timeout: Duration) -> Result<String> {
        let body = self.get_json("/sessions", timeout).await?;
        let ids: Vec<&str> = body
            .get("value")
            .and_then(Value::as_array)
            .map(|sessions| {
                sessions
                    .iter()
                    .filter_map(|s| s.get("id").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();
        debug!(count = ids.len(), "remote endpoint listing");
        Ok(ids.join("\n"))
    }

    async fn run_shell(
        &self,
        device_id: &str,
        command: &str,
        timeout: Duration,
    ) -> Result<ShellOutput> {
        let url = format!("{}/session/{device_id}/execute/sync", self.base_url);
        let payload = json!({
            "script": "mobile: shell",
            "args": [{ "command": command }],
        });
        let resp = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.map_err(e, timeout))?;
        let status_ok = resp.status().is_success();
        let body: Value = resp.json().await.map_err(|e| self.map_err(e, timeout))?;
        let stdout = body
            .get("value")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(ShellOutput {
            stdout,
            exit_code: if status_ok { 0 } else { 1 },
        })
    }

    async fn fetch_info(&self, device_id: &str) -> DeviceInfo {
        // Session capabilities carry the same properties the bridges probe
        // via shell; any missing key just leaves its field unset.
        let caps = match self
            .get_json(&format!("/session/{device_id}"), Duration::from_secs(5))
            .await
        {
            Ok(body) => body
                .get("value")
                .and_then(|v| v.get("capabilities"))
                .cloned()
                .unwrap_or(Value::Null),
            Err(_) => Value::Null,
        };

        let field = |key: &str| {
            caps.get(key)
                .and_then(Value::as_str)
                .map(|s| s.to_string())
        };

        DeviceInfo {
            model: field("deviceModel"),
            os_version: field("platformVersion"),
            manufacturer: field("deviceManufacturer"),
            ip: field("deviceAddress"),
        }
    }
}
