//! Bridge maintenance commands: wake, TCP connect, server restart, and
//! keyboard installation. The latter three are adb-specific and always use
//! the configured adb path regardless of the active backend.

use std::path::PathBuf;
use std::time::Duration;

use phonepilot_config::PilotConfig;
use phonepilot_device::{AdbBridge, WakeOptions, ensure_awake_and_unlocked};

fn adb(config: &PilotConfig) -> AdbBridge {
    AdbBridge::new(&config.device.adb_path)
        .with_info_timeout(Duration::from_secs(config.device.info_timeout_secs))
}

pub(super) async fn cmd_wake(config: &PilotConfig, device: String) -> phonepilot_core::Result<()> {
    let backend = super::build_backend(config)?;
    let opts = WakeOptions {
        swipe: config.device.unlock_swipe,
        password: config.device.unlock_password.clone(),
    };
    if ensure_awake_and_unlocked(backend.as_ref(), &device, &opts).await {
        println!("✅ {device} is awake");
    } else {
        println!("⚠️  {device} could not be verified awake");
    }
    Ok(())
}

pub(super) async fn cmd_connect(config: &PilotConfig, addr: String) -> phonepilot_core::Result<()> {
    let timeout = Duration::from_secs(config.device.connect_timeout_secs);
    let reply = adb(config).connect(&addr, timeout).await?;
    println!("{reply}");
    Ok(())
}

pub(super) async fn cmd_restart_server(config: &PilotConfig) -> phonepilot_core::Result<()> {
    adb(config).restart_server().await?;
    println!("✅ adb server restarted");
    Ok(())
}

pub(super) async fn cmd_install_keyboard(
    config: &PilotConfig,
    device: String,
    apk: PathBuf,
) -> phonepilot_core::Result<()> {
    let warnings = adb(config).install_keyboard(&device, &apk).await?;
    println!("✅ automation keyboard installed on {device}");
    for w in warnings {
        println!("⚠️  {w}");
    }
    Ok(())
}
