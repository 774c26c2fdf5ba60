//! Line/time-boundary buffering for the agent's fragmented text stream.
//!
//! The remote agent may emit output character-by-character. Forwarding every
//! fragment as its own event would flood the single-threaded consumer, so
//! fragments accumulate here and go out as one `SessionEvent::Output` per
//! flush boundary. One collector instance per run; it is not safe for
//! concurrent writers.

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use phonepilot_core::{EventSender, RunId, SessionEvent};

/// Minimum quiet time before a length-based flush fires.
const FLUSH_INTERVAL_MS: u128 = 50;
/// Minimum buffered length for a time-based flush.
const FLUSH_MIN_LEN: usize = 10;

pub struct OutputCollector {
    run_id: RunId,
    tx: EventSender,
    cancel: CancellationToken,
    buf: String,
    last_flush: Instant,
}

impl OutputCollector {
    pub fn new(run_id: RunId, tx: EventSender, cancel: CancellationToken) -> Self {
        Self {
            run_id,
            tx,
            cancel,
            buf: String::new(),
            last_flush: Instant::now(),
        }
    }

    /// Append a fragment and flush if a boundary was reached.
    ///
    /// Once the cancellation token fires this becomes a no-op: the fragment
    /// is dropped along with anything already buffered. That silent cutoff
    /// mirrors the behavior automation front-ends rely on for an immediate
    /// stop; an explicit `flush` still emits whatever survives.
    pub fn write(&mut self, fragment: &str) {
        if self.cancel.is_cancelled() {
            return;
        }
        if fragment.is_empty() {
            return;
        }
        self.buf.push_str(fragment);

        let has_newline = self.buf.contains('\n');
        let stale = self.last_flush.elapsed().as_millis() > FLUSH_INTERVAL_MS
            && self.buf.len() > FLUSH_MIN_LEN;
        if has_newline || stale {
            self.emit();
        }
    }

    /// Unconditionally emit any remaining buffered text. Called at step/run
    /// completion so a trailing partial line is not lost.
    pub fn flush(&mut self) {
        if !self.buf.is_empty() {
            self.emit();
        }
    }

    fn emit(&mut self) {
        let text = std::mem::take(&mut self.buf);
        let _ = self.tx.send(SessionEvent::Output {
            run_id: self.run_id,
            text,
        });
        self.last_flush = Instant::now();
    }
}
