use phonepilot_config::PilotConfig;
use phonepilot_device::DeviceCatalog;
use std::time::Duration;

pub(super) async fn cmd_devices(config: &PilotConfig, json: bool) -> phonepilot_core::Result<()> {
    let backend = super::build_backend(config)?;
    let catalog = DeviceCatalog::new(backend)
        .with_list_timeout(Duration::from_secs(config.device.list_timeout_secs));
    let snapshot = catalog.refresh().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.devices)?);
        if let Some(advisory) = &snapshot.advisory {
            eprintln!("⚠️  {advisory}");
        }
        return Ok(());
    }

    if let Some(advisory) = &snapshot.advisory {
        println!("⚠️  {advisory}");
        return Ok(());
    }
    if snapshot.devices.is_empty() {
        println!("No devices found on the {} backend", config.device.backend);
        return Ok(());
    }

    println!(
        "{:<24} {:<14} {:<20} {:<10} {:<16} {}",
        "ID", "STATUS", "MODEL", "OS", "MANUFACTURER", "IP"
    );
    for device in &snapshot.devices {
        let info = device.info.clone().unwrap_or_default();
        let dash = || "-".to_string();
        println!(
            "{:<24} {:<14} {:<20} {:<10} {:<16} {}",
            device.id,
            format!("{:?}", device.status).to_lowercase(),
            info.model.unwrap_or_else(dash),
            info.os_version.unwrap_or_else(dash),
            info.manufacturer.unwrap_or_else(dash),
            info.ip.unwrap_or_else(dash),
        );
    }
    Ok(())
}
