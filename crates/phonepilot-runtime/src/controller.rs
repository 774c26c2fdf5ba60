//! The session facade: one active run at a time, non-blocking start,
//! idempotent stop, and a cloneable status snapshot.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use phonepilot_config::PilotConfig;
use phonepilot_core::{
    EventSender, ExecutionState, PilotError, Result, RunId, RunOutcome, SessionEvent, StepResult,
};
use phonepilot_device::{Backend, WakeOptions};

use crate::agent::StepAgent;
use crate::executor::{RunRequest, StepExecutor};

/// What to run. Everything else comes from config at controller build time.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub device_id: String,
    pub task: String,
}

/// Point-in-time view of the controller. Cheap to clone, safe to read from
/// any thread; updated by the run worker as the run progresses.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusSnapshot {
    pub run_id: Option<RunId>,
    pub state: ExecutionState,
    pub last_step: Option<StepResult>,
    pub last_error: Option<String>,
    pub outcome: Option<RunOutcome>,
    pub started_at: Option<DateTime<Utc>>,
}

/// Single-run session controller over one backend.
///
/// `start` returns as soon as the worker is spawned; progress arrives on
/// the event channel. `stop` only requests cancellation — the worker
/// observes it at the next step boundary.
pub struct SessionController {
    backend: Arc<dyn Backend>,
    events: EventSender,
    wake: WakeOptions,
    max_steps: u32,
    prep_timeout: Duration,
    probe_timeout: Duration,
    status: Arc<Mutex<StatusSnapshot>>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<RunOutcome>>,
}

impl SessionController {
    pub fn new(backend: Arc<dyn Backend>, events: EventSender, config: &PilotConfig) -> Self {
        Self {
            backend,
            events,
            wake: WakeOptions {
                swipe: config.device.unlock_swipe,
                password: config.device.unlock_password.clone(),
            },
            max_steps: config.session.max_steps,
            prep_timeout: Duration::from_secs(config.session.prep_timeout_secs),
            probe_timeout: Duration::from_secs(config.session.probe_timeout_secs),
            status: Arc::new(Mutex::new(StatusSnapshot::default())),
            cancel: CancellationToken::new(),
            worker: None,
        }
    }

    /// Start a run. Fails with `AlreadyRunning` while a run is in a
    /// non-terminal state; the active run is left untouched.
    pub fn start<A>(&mut self, agent: A, request: StartRequest) -> Result<RunId>
    where
        A: StepAgent + 'static,
    {
        // Config validation enforces this at load time, but the limit can
        // be overridden per invocation; re-check at the last gate.
        if self.max_steps < 1 {
            return Err(PilotError::Config(
                "session.max_steps must be at least 1".into(),
            ));
        }

        let run_id = Uuid::new_v4();
        {
            let mut status = self.status.lock();
            if !status.state.can_start() {
                return Err(PilotError::AlreadyRunning);
            }
            *status = StatusSnapshot {
                run_id: Some(run_id),
                state: ExecutionState::Preparing,
                started_at: Some(Utc::now()),
                ..StatusSnapshot::default()
            };
        }
        let _ = self.events.send(SessionEvent::StateChanged {
            run_id,
            state: ExecutionState::Preparing,
        });

        // Fresh token per run so an earlier stop cannot leak into this one.
        self.cancel = CancellationToken::new();

        let req = RunRequest {
            run_id,
            device_id: request.device_id,
            task: request.task,
            max_steps: self.max_steps,
            wake: self.wake.clone(),
            prep_timeout: self.prep_timeout,
            probe_timeout: self.probe_timeout,
        };
        let executor = StepExecutor::new(
            Arc::clone(&self.backend),
            self.events.clone(),
            self.cancel.clone(),
            Arc::clone(&self.status),
        );

        info!(run = %run_id, device = %req.device_id, "starting session run");
        self.worker = Some(tokio::spawn(executor.run(agent, req)));
        Ok(run_id)
    }

    /// Request cancellation of the active run. Idempotent; a no-op when
    /// nothing is running.
    pub fn stop(&self) {
        if !self.status.lock().state.is_terminal() {
            info!("stop requested");
        }
        self.cancel.cancel();
    }

    pub fn status(&self) -> StatusSnapshot {
        self.status.lock().clone()
    }

    /// Await the active worker, if any, and return its outcome.
    pub async fn join(&mut self) -> Option<RunOutcome> {
        let handle = self.worker.take()?;
        match handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(error = %e, "run worker aborted");
                // The worker died before reaching its own terminal path,
                // so the event stream still owes the caller an ending.
                let run_id = {
                    let mut status = self.status.lock();
                    status.state = ExecutionState::Failed;
                    status.outcome = Some(RunOutcome::Failed);
                    status.last_error = Some(e.to_string());
                    status.run_id
                };
                if let Some(run_id) = run_id {
                    let _ = self.events.send(SessionEvent::StateChanged {
                        run_id,
                        state: ExecutionState::Failed,
                    });
                    let _ = self.events.send(SessionEvent::Finished {
                        run_id,
                        outcome: RunOutcome::Failed,
                    });
                }
                Some(RunOutcome::Failed)
            }
        }
    }
}
