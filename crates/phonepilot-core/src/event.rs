use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::types::{ExecutionState, RunId, RunOutcome, StepResult};

/// Messages flowing from the run worker to the caller's dispatch loop.
///
/// This channel is the only place session state crosses threads: the worker
/// never touches caller-owned state directly, and the caller (UI, log file,
/// test harness) consumes events on its own thread at its own pace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A flushed chunk of the agent's streamed text output.
    Output { run_id: RunId, text: String },

    /// The run moved to a new lifecycle state.
    StateChanged {
        run_id: RunId,
        state: ExecutionState,
    },

    /// One step call returned.
    Step { run_id: RunId, result: StepResult },

    /// Non-fatal advisory (wake failure, partial device info, ...).
    Warning { run_id: RunId, message: String },

    /// The run reached its terminal state.
    Finished { run_id: RunId, outcome: RunOutcome },
}

/// Sender half handed to the run worker; the caller keeps the receiver.
pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
