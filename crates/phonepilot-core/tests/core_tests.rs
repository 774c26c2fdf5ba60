#[cfg(test)]
mod tests {
    use phonepilot_core::*;

    // ── Lifecycle state machine ────────────────────────────────

    #[test]
    fn test_can_start_from_idle_and_terminal_states() {
        assert!(ExecutionState::Idle.can_start());
        assert!(ExecutionState::Stopped.can_start());
        assert!(ExecutionState::Completed.can_start());
        assert!(ExecutionState::Failed.can_start());

        assert!(!ExecutionState::Preparing.can_start());
        assert!(!ExecutionState::Running.can_start());
        assert!(!ExecutionState::Stopping.can_start());
    }

    #[test]
    fn test_terminal_states() {
        assert!(ExecutionState::Stopped.is_terminal());
        assert!(ExecutionState::Completed.is_terminal());
        assert!(ExecutionState::Failed.is_terminal());
        assert!(!ExecutionState::Idle.is_terminal());
        assert!(!ExecutionState::Running.is_terminal());
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(RunOutcome::Completed.exit_code(), 0);
        assert_eq!(RunOutcome::CompletedWithLimit.exit_code(), 0);
        assert_eq!(RunOutcome::Failed.exit_code(), -1);
        assert_eq!(RunOutcome::Stopped.exit_code(), -2);
    }

    #[test]
    fn test_outcome_terminal_state() {
        assert_eq!(
            RunOutcome::CompletedWithLimit.terminal_state(),
            ExecutionState::Completed
        );
        assert_eq!(RunOutcome::Failed.terminal_state(), ExecutionState::Failed);
        assert_eq!(RunOutcome::Stopped.terminal_state(), ExecutionState::Stopped);
    }

    // ── Device types ───────────────────────────────────────────

    #[test]
    fn test_device_status_from_listing() {
        assert_eq!(DeviceStatus::from_listing("device"), DeviceStatus::Device);
        assert_eq!(DeviceStatus::from_listing("offline"), DeviceStatus::Offline);
        assert_eq!(
            DeviceStatus::from_listing("unauthorized"),
            DeviceStatus::Unauthorized
        );
        assert_eq!(
            DeviceStatus::from_listing("recovery"),
            DeviceStatus::Unknown
        );
    }

    #[test]
    fn test_device_info_is_empty() {
        assert!(DeviceInfo::default().is_empty());
        let info = DeviceInfo {
            model: Some("Pixel 8".into()),
            ..DeviceInfo::default()
        };
        assert!(!info.is_empty());
    }

    #[test]
    fn test_default_swipe_gesture() {
        let swipe = SwipeGesture::default();
        assert_eq!((swipe.x1, swipe.y1), (540, 1600));
        assert_eq!((swipe.x2, swipe.y2), (540, 800));
        assert_eq!(swipe.duration_ms, 300);
    }

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::Adb.to_string(), "adb");
        assert_eq!(BackendKind::Hdc.to_string(), "hdc");
        assert_eq!(BackendKind::Remote.to_string(), "remote");
    }

    // ── Events ─────────────────────────────────────────────────

    #[test]
    fn test_session_event_serde_tagging() {
        let event = SessionEvent::Finished {
            run_id: uuid::Uuid::nil(),
            outcome: RunOutcome::CompletedWithLimit,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "finished");
        assert_eq!(json["outcome"], "completed_with_limit");

        let restored: SessionEvent = serde_json::from_value(json).unwrap();
        match restored {
            SessionEvent::Finished { outcome, .. } => {
                assert_eq!(outcome, RunOutcome::CompletedWithLimit)
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    // ── Errors ─────────────────────────────────────────────────

    #[test]
    fn test_prep_failed_names_the_check() {
        let device = PilotError::PrepFailed {
            check: PrepCheck::Device,
            reason: "not listed".into(),
        };
        let endpoint = PilotError::PrepFailed {
            check: PrepCheck::Endpoint,
            reason: "timed out".into(),
        };
        assert!(device.to_string().contains("device readiness"));
        assert!(endpoint.to_string().contains("agent endpoint"));
    }

    #[test]
    fn test_advisory_errors() {
        assert!(
            PilotError::BackendTimeout {
                backend: BackendKind::Adb,
                timeout_secs: 10
            }
            .is_advisory()
        );
        assert!(PilotError::WakeFailed("still dark".into()).is_advisory());
        assert!(!PilotError::StepFailed("boom".into()).is_advisory());
        assert!(!PilotError::AlreadyRunning.is_advisory());
    }
}
