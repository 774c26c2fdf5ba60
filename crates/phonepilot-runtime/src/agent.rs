//! The remote automation agent, seen from this side as an opaque step
//! function plus a connectivity probe.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use phonepilot_config::AgentEndpointConfig;
use phonepilot_core::{PilotError, PrepCheck, Result};

use crate::collector::OutputCollector;

/// What one step call produced. The executor assigns the step index.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentStep {
    pub message: String,
    pub finished: bool,
}

/// The remote agent's step function.
///
/// `step` is an intentionally unbounded blocking call — cancellation is
/// cooperative and happens between calls, never during one. Streamed text
/// produced while the call runs goes through the collector.
#[async_trait]
pub trait StepAgent: Send + Sync {
    /// Lightweight reachability probe against the configured API, used as
    /// one of the two pre-flight checks.
    async fn probe(&self, timeout: Duration) -> Result<()>;

    /// Advance the task by one step. `task` is Some only on the first call
    /// of a run; continuations pass None.
    async fn step(&mut self, task: Option<&str>, out: &mut OutputCollector)
    -> Result<AgentStep>;
}

/// HTTP implementation against the agent service's step route.
pub struct HttpStepAgent {
    base_url: String,
    model: String,
    api_key: Option<String>,
    /// Session token the service hands back on the first step so
    /// continuations resume the same task.
    session: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct StepResponse {
    message: String,
    #[serde(default)]
    finished: bool,
    #[serde(default)]
    session: Option<String>,
    /// Free-form progress text the agent streamed while acting.
    #[serde(default)]
    output: Option<String>,
}

impl HttpStepAgent {
    pub fn new(config: &AgentEndpointConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            session: None,
            client: reqwest::Client::new(),
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }
}

#[async_trait]
impl StepAgent for HttpStepAgent {
    async fn probe(&self, timeout: Duration) -> Result<()> {
        let url = format!("{}/models", self.base_url);
        let resp = self
            .authorize(self.client.get(&url).timeout(timeout))
            .send()
            .await
            .map_err(|e| PilotError::PrepFailed {
                check: PrepCheck::Endpoint,
                reason: if e.is_timeout() {
                    format!("probe timed out after {}s", timeout.as_secs())
                } else {
                    format!("endpoint unreachable: {e}")
                },
            })?;
        // Any HTTP answer proves the endpoint is alive; auth problems
        // surface on the first real step call.
        debug!(status = %resp.status(), "agent endpoint probe answered");
        Ok(())
    }

    async fn step(
        &mut self,
        task: Option<&str>,
        out: &mut OutputCollector,
    ) -> Result<AgentStep> {
        let url = format!("{}/step", self.base_url);
        let payload = serde_json::json!({
            "model": self.model,
            "task": task,
            "session": self.session,
        });

        // No timeout: the step call blocks for as long as the agent works.
        let resp = self
            .authorize(self.client.post(&url).json(&payload))
            .send()
            .await
            .map_err(|e| PilotError::StepFailed(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(PilotError::StepFailed(format!(
                "agent returned {}",
                resp.status()
            )));
        }
        let body: StepResponse = resp
            .json()
            .await
            .map_err(|e| PilotError::StepFailed(format!("malformed step response: {e}")))?;

        if let Some(text) = &body.output {
            out.write(text);
        }
        if body.session.is_some() {
            self.session = body.session;
        }

        Ok(AgentStep {
            message: body.message,
            finished: body.finished,
        })
    }
}
