//! The `run` command: drive one task to its terminal state, streaming the
//! agent's output to stdout, and exit with the run's outcome code.

use std::io::Write;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use phonepilot_config::PilotConfig;
use phonepilot_core::{DeviceStatus, PilotError, SessionEvent};
use phonepilot_device::DeviceCatalog;
use phonepilot_runtime::{HttpStepAgent, SessionController, StartRequest};

pub(super) async fn cmd_run(
    mut config: PilotConfig,
    task: String,
    device: Option<String>,
    max_steps: Option<u32>,
) -> phonepilot_core::Result<()> {
    if let Some(n) = max_steps {
        config.session.max_steps = n;
        // The loader validated the file; the override needs its own pass.
        config
            .validate()
            .map_err(PilotError::Config)?;
    }

    let backend = super::build_backend(&config)?;

    // Resolve the target: explicit ID, or the first connected device.
    let device_id = match device {
        Some(id) => id,
        None => {
            let catalog = DeviceCatalog::new(backend.clone())
                .with_list_timeout(Duration::from_secs(config.device.list_timeout_secs));
            let snapshot = catalog.refresh().await;
            snapshot
                .devices
                .iter()
                .find(|d| d.status == DeviceStatus::Device)
                .map(|d| d.id.clone())
                .ok_or_else(|| PilotError::Config("no connected device found".into()))?
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut controller = SessionController::new(backend, tx, &config);
    let agent = HttpStepAgent::new(&config.agent);

    println!("📱 Running on {device_id}: {task}");
    controller.start(agent, StartRequest { device_id, task })?;

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                SessionEvent::Output { text, .. } => {
                    print!("{text}");
                    let _ = std::io::stdout().flush();
                }
                SessionEvent::Warning { message, .. } => eprintln!("⚠️  {message}"),
                SessionEvent::StateChanged { state, .. } => debug!(%state, "state changed"),
                SessionEvent::Step { .. } => {}
                SessionEvent::Finished { outcome, .. } => {
                    println!();
                    println!("Run finished: {outcome:?}");
                }
            }
        }
    });

    // First ctrl-c requests a graceful stop at the next step boundary.
    let outcome = tokio::select! {
        outcome = controller.join() => outcome,
        _ = tokio::signal::ctrl_c() => None,
    };
    let outcome = match outcome {
        Some(outcome) => outcome,
        None => {
            eprintln!("⏹  Stopping at the next step boundary...");
            controller.stop();
            controller.join().await.unwrap_or(phonepilot_core::RunOutcome::Stopped)
        }
    };

    drop(controller);
    let _ = printer.await;

    std::process::exit(outcome.exit_code());
}
