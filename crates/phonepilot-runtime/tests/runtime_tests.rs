#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::{Notify, mpsc};
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    use phonepilot_config::PilotConfig;
    use phonepilot_core::{
        BackendKind, DeviceInfo, ExecutionState, PilotError, PrepCheck, Result, RunOutcome,
        SessionEvent,
    };
    use phonepilot_device::{Backend, ShellOutput, WakeOptions};
    use phonepilot_runtime::controller::StatusSnapshot;
    use phonepilot_runtime::executor::{RunRequest, StepExecutor};
    use phonepilot_runtime::{AgentStep, OutputCollector, SessionController, StartRequest, StepAgent};

    // ── Fakes ──────────────────────────────────────────────────

    struct FakeBackend {
        listing: String,
    }

    impl FakeBackend {
        fn with_device(id: &str) -> Arc<Self> {
            Arc::new(Self {
                listing: format!("List of devices attached\n{id}\tdevice\n"),
            })
        }

        fn with_listing(listing: &str) -> Arc<Self> {
            Arc::new(Self {
                listing: listing.to_string(),
            })
        }
    }

    #[async_trait]
    impl Backend for FakeBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Adb
        }

        async fn list_devices(&self, _timeout: Duration) -> Result<String> {
            Ok(self.listing.clone())
        }

        async fn run_shell(
            &self,
            _device_id: &str,
            command: &str,
            _timeout: Duration,
        ) -> Result<ShellOutput> {
            let stdout = if command.starts_with("dumpsys power") {
                "mWakefulness=Awake".to_string()
            } else {
                String::new()
            };
            Ok(ShellOutput {
                stdout,
                exit_code: 0,
            })
        }

        async fn fetch_info(&self, _device_id: &str) -> DeviceInfo {
            DeviceInfo::default()
        }
    }

    #[derive(Default)]
    struct FakeAgent {
        calls: Arc<AtomicU32>,
        /// Whether each call carried the initial task text.
        task_flags: Arc<Mutex<Vec<bool>>>,
        finish_at: Option<u32>,
        fail_at: Option<u32>,
        panic_at: Option<u32>,
        probe_error: bool,
        /// Each step waits for one permit before returning.
        gate: Option<Arc<Notify>>,
        /// Token to cancel from inside the step call, simulating a stop
        /// request racing an in-flight step.
        cancel_during_step: Option<CancellationToken>,
    }

    #[async_trait]
    impl StepAgent for FakeAgent {
        async fn probe(&self, _timeout: Duration) -> Result<()> {
            if self.probe_error {
                return Err(PilotError::PrepFailed {
                    check: PrepCheck::Endpoint,
                    reason: "probe refused".into(),
                });
            }
            Ok(())
        }

        async fn step(
            &mut self,
            task: Option<&str>,
            _out: &mut OutputCollector,
        ) -> Result<AgentStep> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.task_flags.lock().unwrap().push(task.is_some());

            if let Some(token) = &self.cancel_during_step {
                token.cancel();
            }
            if self.panic_at == Some(n) {
                panic!("agent blew up");
            }
            if self.fail_at == Some(n) {
                return Err(PilotError::StepFailed("boom".into()));
            }
            Ok(AgentStep {
                message: format!("did thing {n}"),
                finished: self.finish_at == Some(n),
            })
        }
    }

    fn request(device_id: &str, max_steps: u32) -> RunRequest {
        RunRequest {
            run_id: Uuid::new_v4(),
            device_id: device_id.to_string(),
            task: "book a table".to_string(),
            max_steps,
            wake: WakeOptions::default(),
            prep_timeout: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(5),
        }
    }

    struct Harness {
        executor: StepExecutor,
        cancel: CancellationToken,
        status: Arc<parking_lot::Mutex<StatusSnapshot>>,
        rx: mpsc::UnboundedReceiver<SessionEvent>,
    }

    fn harness(backend: Arc<FakeBackend>) -> Harness {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let status = Arc::new(parking_lot::Mutex::new(StatusSnapshot::default()));
        let executor = StepExecutor::new(backend, tx, cancel.clone(), Arc::clone(&status));
        Harness {
            executor,
            cancel,
            status,
            rx,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    // ── Output collector ───────────────────────────────────────

    fn collector() -> (OutputCollector, mpsc::UnboundedReceiver<SessionEvent>, CancellationToken)
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        (
            OutputCollector::new(Uuid::new_v4(), tx, cancel.clone()),
            rx,
            cancel,
        )
    }

    fn output_text(event: Option<SessionEvent>) -> String {
        match event {
            Some(SessionEvent::Output { text, .. }) => text,
            other => panic!("expected output event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_collector_flushes_whole_buffer_on_newline() {
        let (mut out, mut rx, _cancel) = collector();
        out.write("abc\ndef");
        assert_eq!(output_text(rx.recv().await), "abc\ndef");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_collector_buffers_partial_line_until_flush() {
        let (mut out, mut rx, _cancel) = collector();
        out.write("abc\n");
        assert_eq!(output_text(rx.recv().await), "abc\n");

        out.write("def");
        assert!(rx.try_recv().is_err());
        out.flush();
        assert_eq!(output_text(rx.recv().await), "def");
    }

    #[tokio::test(start_paused = true)]
    async fn test_collector_time_and_length_flush() {
        let (mut out, mut rx, _cancel) = collector();
        out.write("abc");
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_millis(60)).await;
        // Still under the length threshold.
        out.write("de");
        assert!(rx.try_recv().is_err());

        out.write("fghijklmnop");
        assert_eq!(output_text(rx.recv().await), "abcdefghijklmnop");
    }

    #[tokio::test]
    async fn test_collector_drops_writes_after_cancel() {
        let (mut out, mut rx, cancel) = collector();
        cancel.cancel();
        out.write("lost\n");
        assert!(rx.try_recv().is_err());
    }

    // ── Step executor ──────────────────────────────────────────

    #[tokio::test]
    async fn test_step_limit_is_a_success() {
        let mut h = harness(FakeBackend::with_device("A"));
        let agent = FakeAgent::default();
        let calls = Arc::clone(&agent.calls);

        let outcome = h.executor.run(agent, request("A", 3)).await;
        assert_eq!(outcome, RunOutcome::CompletedWithLimit);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let status = h.status.lock().clone();
        assert_eq!(status.state, ExecutionState::Completed);
        assert_eq!(status.outcome, Some(RunOutcome::CompletedWithLimit));

        let events = drain(&mut h.rx);
        let steps = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Step { .. }))
            .count();
        assert_eq!(steps, 3);
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::Finished {
                outcome: RunOutcome::CompletedWithLimit,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_finished_flag_completes_the_run() {
        let mut h = harness(FakeBackend::with_device("A"));
        let agent = FakeAgent {
            finish_at: Some(2),
            ..FakeAgent::default()
        };
        let calls = Arc::clone(&agent.calls);
        let task_flags = Arc::clone(&agent.task_flags);

        let outcome = h.executor.run(agent, request("A", 100)).await;
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // The task text goes only with the first call.
        assert_eq!(*task_flags.lock().unwrap(), vec![true, false]);

        let status = h.status.lock().clone();
        assert_eq!(status.last_step.unwrap().index, 2);
    }

    #[tokio::test]
    async fn test_step_error_fails_without_retry() {
        let h = harness(FakeBackend::with_device("A"));
        let agent = FakeAgent {
            fail_at: Some(1),
            ..FakeAgent::default()
        };
        let calls = Arc::clone(&agent.calls);

        let outcome = h.executor.run(agent, request("A", 10)).await;
        assert_eq!(outcome, RunOutcome::Failed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(h.status.lock().last_error.as_ref().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_missing_device_fails_the_device_check() {
        let h = harness(FakeBackend::with_listing("List of devices attached\nB\toffline\n"));
        let agent = FakeAgent::default();
        let calls = Arc::clone(&agent.calls);

        let outcome = h.executor.run(agent, request("B", 10)).await;
        assert_eq!(outcome, RunOutcome::Failed);
        // The step loop never starts.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let error = h.status.lock().last_error.clone().unwrap();
        assert!(error.contains("device readiness"), "got: {error}");
    }

    #[tokio::test]
    async fn test_probe_failure_names_the_endpoint_check() {
        let h = harness(FakeBackend::with_device("A"));
        let agent = FakeAgent {
            probe_error: true,
            ..FakeAgent::default()
        };

        let outcome = h.executor.run(agent, request("A", 10)).await;
        assert_eq!(outcome, RunOutcome::Failed);
        let error = h.status.lock().last_error.clone().unwrap();
        assert!(error.contains("agent endpoint"), "got: {error}");
    }

    #[tokio::test]
    async fn test_stop_discards_the_inflight_result() {
        let mut h = harness(FakeBackend::with_device("A"));
        let agent = FakeAgent {
            cancel_during_step: Some(h.cancel.clone()),
            ..FakeAgent::default()
        };
        let calls = Arc::clone(&agent.calls);

        let outcome = h.executor.run(agent, request("A", 10)).await;
        assert_eq!(outcome, RunOutcome::Stopped);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let events = drain(&mut h.rx);
        // The in-flight result never surfaces as a step event.
        assert!(!events.iter().any(|e| matches!(e, SessionEvent::Step { .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::StateChanged {
                state: ExecutionState::Stopping,
                ..
            }
        )));
        assert_eq!(h.status.lock().state, ExecutionState::Stopped);
    }

    #[tokio::test]
    async fn test_cancel_before_the_loop_passes_through_stopping() {
        let mut h = harness(FakeBackend::with_device("A"));
        h.cancel.cancel();

        let agent = FakeAgent::default();
        let calls = Arc::clone(&agent.calls);

        let outcome = h.executor.run(agent, request("A", 10)).await;
        assert_eq!(outcome, RunOutcome::Stopped);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let events = drain(&mut h.rx);
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::StateChanged {
                state: ExecutionState::Stopping,
                ..
            }
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::Finished {
                outcome: RunOutcome::Stopped,
                ..
            }
        )));
    }

    // ── Session controller ─────────────────────────────────────

    #[tokio::test]
    async fn test_zero_step_limit_is_rejected_at_start() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut config = PilotConfig::default();
        config.session.max_steps = 0;
        let mut controller =
            SessionController::new(FakeBackend::with_device("A"), tx, &config);

        let result = controller.start(
            FakeAgent::default(),
            StartRequest {
                device_id: "A".into(),
                task: "never".into(),
            },
        );
        assert!(matches!(result, Err(PilotError::Config(_))));
        // The rejection leaves the controller startable.
        assert!(controller.status().state.can_start());
        assert_eq!(controller.join().await, None);
    }

    #[tokio::test]
    async fn test_worker_panic_still_finishes_the_run() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut controller =
            SessionController::new(FakeBackend::with_device("A"), tx, &PilotConfig::default());

        controller
            .start(
                FakeAgent {
                    panic_at: Some(1),
                    ..FakeAgent::default()
                },
                StartRequest {
                    device_id: "A".into(),
                    task: "explosive".into(),
                },
            )
            .unwrap();

        assert_eq!(controller.join().await, Some(RunOutcome::Failed));
        let status = controller.status();
        assert_eq!(status.state, ExecutionState::Failed);
        assert_eq!(status.outcome, Some(RunOutcome::Failed));
        assert!(status.last_error.is_some());

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::Finished {
                outcome: RunOutcome::Failed,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_start_while_running_is_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut controller =
            SessionController::new(FakeBackend::with_device("A"), tx, &PilotConfig::default());

        let gate = Arc::new(Notify::new());
        let agent = FakeAgent {
            finish_at: Some(1),
            gate: Some(Arc::clone(&gate)),
            ..FakeAgent::default()
        };
        controller
            .start(
                agent,
                StartRequest {
                    device_id: "A".into(),
                    task: "first".into(),
                },
            )
            .unwrap();

        // The first run holds the controller until its gate opens.
        let second = controller.start(
            FakeAgent::default(),
            StartRequest {
                device_id: "A".into(),
                task: "second".into(),
            },
        );
        assert!(matches!(second, Err(PilotError::AlreadyRunning)));

        gate.notify_one();
        assert_eq!(controller.join().await, Some(RunOutcome::Completed));
        assert!(controller.status().state.can_start());
    }

    #[tokio::test]
    async fn test_stop_is_observed_at_the_step_boundary() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut controller =
            SessionController::new(FakeBackend::with_device("A"), tx, &PilotConfig::default());

        let gate = Arc::new(Notify::new());
        let agent = FakeAgent {
            gate: Some(Arc::clone(&gate)),
            ..FakeAgent::default()
        };
        let calls = Arc::clone(&agent.calls);
        controller
            .start(
                agent,
                StartRequest {
                    device_id: "A".into(),
                    task: "long task".into(),
                },
            )
            .unwrap();

        controller.stop();
        gate.notify_one();

        assert_eq!(controller.join().await, Some(RunOutcome::Stopped));
        assert!(calls.load(Ordering::SeqCst) <= 1);
        let status = controller.status();
        assert_eq!(status.state, ExecutionState::Stopped);
        assert_eq!(status.outcome, Some(RunOutcome::Stopped));
    }

    #[tokio::test]
    async fn test_status_snapshot_after_completed_run() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut controller =
            SessionController::new(FakeBackend::with_device("A"), tx, &PilotConfig::default());

        let run_id = controller
            .start(
                FakeAgent {
                    finish_at: Some(1),
                    ..FakeAgent::default()
                },
                StartRequest {
                    device_id: "A".into(),
                    task: "quick".into(),
                },
            )
            .unwrap();

        assert_eq!(controller.join().await, Some(RunOutcome::Completed));
        let status = controller.status();
        assert_eq!(status.run_id, Some(run_id));
        assert_eq!(status.state, ExecutionState::Completed);
        assert_eq!(status.outcome, Some(RunOutcome::Completed));
        assert_eq!(status.last_step.unwrap().index, 1);
        assert!(status.started_at.is_some());
    }
}
