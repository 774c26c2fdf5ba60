//! The run worker: pre-flight checks, wake/unlock, and the cancellable
//! step loop.
//!
//! Cancellation is cooperative. The token is checked at step boundaries
//! only; a step call already in flight runs to completion and its result
//! is discarded. Whatever outcome the loop reaches, the executor emits a
//! final `Finished` event and records it in the shared status snapshot.

use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use phonepilot_core::{
    DeviceStatus, EventSender, ExecutionState, PilotError, PrepCheck, Result, RunId, RunOutcome,
    SessionEvent, StepResult,
};
use phonepilot_device::{Backend, WakeOptions, ensure_awake_and_unlocked, parse_listing};

use crate::agent::StepAgent;
use crate::collector::OutputCollector;
use crate::controller::StatusSnapshot;

/// Everything one run needs, fixed at start time.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub run_id: RunId,
    pub device_id: String,
    pub task: String,
    pub max_steps: u32,
    pub wake: WakeOptions,
    pub prep_timeout: Duration,
    pub probe_timeout: Duration,
}

pub struct StepExecutor {
    backend: Arc<dyn Backend>,
    events: EventSender,
    cancel: CancellationToken,
    status: Arc<Mutex<StatusSnapshot>>,
}

impl StepExecutor {
    pub fn new(
        backend: Arc<dyn Backend>,
        events: EventSender,
        cancel: CancellationToken,
        status: Arc<Mutex<StatusSnapshot>>,
    ) -> Self {
        Self {
            backend,
            events,
            cancel,
            status,
        }
    }

    /// Drive one run to its terminal state.
    pub async fn run<A: StepAgent>(self, mut agent: A, req: RunRequest) -> RunOutcome {
        if let Err(e) = self.preflight(&agent, &req).await {
            return self.fail(req.run_id, e);
        }

        if self.cancel.is_cancelled() {
            self.set_state(req.run_id, ExecutionState::Stopping);
            return self.finish(req.run_id, RunOutcome::Stopped);
        }

        // Wake/unlock is advisory: a screen that stays dark is reported,
        // not fatal.
        if !ensure_awake_and_unlocked(self.backend.as_ref(), &req.device_id, &req.wake).await {
            self.warn(req.run_id, "screen could not be verified awake; continuing");
        }

        self.set_state(req.run_id, ExecutionState::Running);

        let mut out = OutputCollector::new(req.run_id, self.events.clone(), self.cancel.clone());
        let mut index: u32 = 0;
        let mut task = Some(req.task.as_str());

        let outcome = loop {
            if self.cancel.is_cancelled() {
                self.set_state(req.run_id, ExecutionState::Stopping);
                break RunOutcome::Stopped;
            }

            index += 1;
            let step = match agent.step(task.take(), &mut out).await {
                Ok(step) => step,
                Err(e) => {
                    out.flush();
                    warn!(run = %req.run_id, step = index, error = %e, "step call failed");
                    self.status.lock().last_error = Some(e.to_string());
                    break RunOutcome::Failed;
                }
            };

            // A result arriving after a stop request is discarded.
            if self.cancel.is_cancelled() {
                self.set_state(req.run_id, ExecutionState::Stopping);
                break RunOutcome::Stopped;
            }

            let result = StepResult {
                index,
                message: step.message,
                finished: step.finished,
            };
            out.write(&format!("step {}: {}\n", result.index, result.message));
            self.status.lock().last_step = Some(result.clone());
            let _ = self.events.send(SessionEvent::Step {
                run_id: req.run_id,
                result,
            });

            if step.finished {
                out.flush();
                break RunOutcome::Completed;
            }
            if index >= req.max_steps {
                info!(run = %req.run_id, max_steps = req.max_steps, "step limit reached");
                out.flush();
                break RunOutcome::CompletedWithLimit;
            }
        };

        self.finish(req.run_id, outcome)
    }

    /// Both checks run concurrently; each failure names its check. Device
    /// readiness is reported first when both fail.
    async fn preflight<A: StepAgent>(&self, agent: &A, req: &RunRequest) -> Result<()> {
        let (device, endpoint) = tokio::join!(
            self.check_device(&req.device_id, req.prep_timeout),
            agent.probe(req.probe_timeout),
        );
        device?;
        endpoint?;
        Ok(())
    }

    async fn check_device(&self, device_id: &str, timeout: Duration) -> Result<()> {
        let raw = self
            .backend
            .list_devices(timeout)
            .await
            .map_err(|e| PilotError::PrepFailed {
                check: PrepCheck::Device,
                reason: e.to_string(),
            })?;
        let listed = parse_listing(self.backend.kind(), &raw);
        match listed.iter().find(|d| d.id == device_id) {
            Some(d) if d.status == DeviceStatus::Device => Ok(()),
            Some(d) => Err(PilotError::PrepFailed {
                check: PrepCheck::Device,
                reason: format!("device {device_id} is {:?}", d.status),
            }),
            None => Err(PilotError::PrepFailed {
                check: PrepCheck::Device,
                reason: format!("device {device_id} not listed"),
            }),
        }
    }

    fn fail(&self, run_id: RunId, error: PilotError) -> RunOutcome {
        warn!(run = %run_id, error = %error, "run failed before the step loop");
        self.status.lock().last_error = Some(error.to_string());
        self.finish(run_id, RunOutcome::Failed)
    }

    fn finish(&self, run_id: RunId, outcome: RunOutcome) -> RunOutcome {
        {
            let mut status = self.status.lock();
            status.outcome = Some(outcome);
        }
        self.set_state(run_id, outcome.terminal_state());
        let _ = self.events.send(SessionEvent::Finished { run_id, outcome });
        outcome
    }

    fn set_state(&self, run_id: RunId, state: ExecutionState) {
        self.status.lock().state = state;
        let _ = self.events.send(SessionEvent::StateChanged { run_id, state });
    }

    fn warn(&self, run_id: RunId, message: &str) {
        warn!(run = %run_id, "{message}");
        let _ = self.events.send(SessionEvent::Warning {
            run_id,
            message: message.to_string(),
        });
    }
}
