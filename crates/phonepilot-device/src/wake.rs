//! Screen wake/unlock state machine.
//!
//! Probes the device's power state and, when the screen is off, walks a
//! fixed wake → unlock → verify sequence up to three times. A device that
//! stays asleep is a warning for the caller, never a fatal error — runs
//! proceed regardless.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use phonepilot_core::{SwipeGesture, WakeState};

use crate::backend::Backend;

const WAKE_ATTEMPTS: u32 = 3;
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const KEY_TIMEOUT: Duration = Duration::from_secs(10);

// Key codes injected during the sequence.
const KEY_WAKEUP: u32 = 224;
const KEY_MENU: u32 = 82;
const KEY_ENTER: u32 = 66;
const KEY_POWER: u32 = 26;

/// Optional unlock inputs. Both are skipped when unset.
#[derive(Debug, Clone, Default)]
pub struct WakeOptions {
    pub swipe: Option<SwipeGesture>,
    pub password: Option<String>,
}

/// Classify a power-state dump. Ordered fallback rules, first match wins:
/// explicit wakefulness field, explicit screen-on boolean, display power
/// state, `awake` substring, then the fail-safe Asleep default for empty
/// or unparseable output.
pub fn parse_wake_state(raw: &str) -> WakeState {
    for line in raw.lines() {
        if let Some(value) = field_value(line, "mWakefulness=") {
            return if value.eq_ignore_ascii_case("awake") {
                WakeState::Awake
            } else {
                WakeState::Asleep
            };
        }
    }

    for line in raw.lines() {
        if let Some(value) = field_value(line, "mScreenOn=") {
            return if value.eq_ignore_ascii_case("true") {
                WakeState::Awake
            } else {
                WakeState::Asleep
            };
        }
    }

    for line in raw.lines() {
        if let Some(value) = field_value(line, "Display Power: state=") {
            return if value.eq_ignore_ascii_case("off") {
                WakeState::Asleep
            } else {
                WakeState::Awake
            };
        }
    }

    if raw.to_ascii_lowercase().contains("awake") {
        return WakeState::Awake;
    }

    WakeState::Asleep
}

fn field_value<'a>(line: &'a str, field: &str) -> Option<&'a str> {
    let start = line.find(field)? + field.len();
    let rest = &line[start..];
    let end = rest
        .find(|c: char| c.is_whitespace() || c == ',')
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Escape text for the shell's `input text` encoding: spaces become `%s`.
pub fn escape_input_text(text: &str) -> String {
    text.replace(' ', "%s")
}

/// Probe the device and, if asleep, try to wake and unlock it.
///
/// Returns the final wakefulness as a bool. `false` means the screen could
/// not be verified awake — surface it as a warning and continue.
pub async fn ensure_awake_and_unlocked(
    backend: &dyn Backend,
    device_id: &str,
    opts: &WakeOptions,
) -> bool {
    if probe(backend, device_id).await == WakeState::Awake {
        debug!(device = device_id, "screen already awake");
        return true;
    }

    for attempt in 1..=WAKE_ATTEMPTS {
        info!(device = device_id, attempt, "attempting wake/unlock");

        key_event(backend, device_id, KEY_WAKEUP).await;
        sleep(Duration::from_millis(400)).await;

        key_event(backend, device_id, KEY_MENU).await;
        sleep(Duration::from_millis(400)).await;

        if let Some(swipe) = &opts.swipe {
            let cmd = format!(
                "input swipe {} {} {} {} {}",
                swipe.x1, swipe.y1, swipe.x2, swipe.y2, swipe.duration_ms
            );
            let _ = backend.run_shell(device_id, &cmd, KEY_TIMEOUT).await;
            sleep(Duration::from_millis(500)).await;
        }

        if let Some(password) = &opts.password {
            let cmd = format!("input text {}", escape_input_text(password));
            let _ = backend.run_shell(device_id, &cmd, KEY_TIMEOUT).await;
            sleep(Duration::from_millis(300)).await;

            key_event(backend, device_id, KEY_ENTER).await;
            sleep(Duration::from_millis(600)).await;
        }

        if probe(backend, device_id).await == WakeState::Awake {
            return true;
        }

        // Short power-key press as a fallback before the next attempt.
        key_event(backend, device_id, KEY_POWER).await;
        sleep(Duration::from_millis(600)).await;
    }

    let awake = probe(backend, device_id).await == WakeState::Awake;
    if !awake {
        warn!(device = device_id, "device still asleep after {WAKE_ATTEMPTS} attempts");
    }
    awake
}

async fn probe(backend: &dyn Backend, device_id: &str) -> WakeState {
    match backend
        .run_shell(device_id, "dumpsys power", PROBE_TIMEOUT)
        .await
    {
        Ok(out) => parse_wake_state(&out.stdout),
        // Fail-safe: an unanswerable probe reads as Asleep.
        Err(_) => WakeState::Asleep,
    }
}

async fn key_event(backend: &dyn Backend, device_id: &str, code: u32) {
    let _ = backend
        .run_shell(device_id, &format!("input keyevent {code}"), KEY_TIMEOUT)
        .await;
}
