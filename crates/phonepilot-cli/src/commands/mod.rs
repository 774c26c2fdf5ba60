use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::path::PathBuf;
use std::sync::Arc;

use phonepilot_config::{ConfigLoader, PilotConfig};
use phonepilot_core::{BackendKind, PilotError};
use phonepilot_device::{AdbBridge, Backend, HdcBridge, RemoteEndpoint};

mod bridge;
mod devices;
mod run;

/// 📱 Phonepilot — device session controller for AI-driven phone automation
#[derive(Parser)]
#[command(name = "phonepilot", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to phonepilot.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List devices on the configured backend
    Devices {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run an automation task on a device
    Run {
        /// The task in natural language
        task: String,

        /// Device ID (defaults to the first connected device)
        #[arg(short, long)]
        device: Option<String>,

        /// Override the configured step limit
        #[arg(long)]
        max_steps: Option<u32>,
    },
    /// Wake and unlock a device's screen
    Wake {
        /// Device ID
        device: String,
    },
    /// Connect to a device listening on ip:port (adb backend)
    Connect {
        /// Address, e.g. 192.168.1.50:5555
        addr: String,
    },
    /// Kill and restart the adb bridge server
    RestartServer,
    /// Install the automation keyboard APK and select it as input method
    InstallKeyboard {
        /// Device ID
        device: String,
        /// Path to the keyboard APK
        apk: PathBuf,
    },
    /// Show current configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Audit configuration for problems
    Doctor,
    /// Generate shell completions for bash, zsh, or fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Build the configured backend.
fn build_backend(config: &PilotConfig) -> phonepilot_core::Result<Arc<dyn Backend>> {
    let info_timeout = std::time::Duration::from_secs(config.device.info_timeout_secs);
    match config.device.backend {
        BackendKind::Adb => Ok(Arc::new(
            AdbBridge::new(&config.device.adb_path).with_info_timeout(info_timeout),
        )),
        BackendKind::Hdc => Ok(Arc::new(
            HdcBridge::new(&config.device.hdc_path).with_info_timeout(info_timeout),
        )),
        BackendKind::Remote => {
            let url = config.device.remote_url.as_deref().ok_or_else(|| {
                PilotError::Config("device.backend is 'remote' but device.remote_url is not set".into())
            })?;
            Ok(Arc::new(RemoteEndpoint::new(url)))
        }
    }
}

impl Cli {
    pub async fn run(self) -> phonepilot_core::Result<()> {
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let config = config_loader.get();

        // Resolve log level: --verbose > --quiet > --log-level > config
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            self.log_level.as_deref().unwrap_or(&config.logging.level)
        };

        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
            )
            .with_target(false)
            .init();

        match self.command {
            Commands::Devices { json } => devices::cmd_devices(&config, json).await,
            Commands::Run {
                task,
                device,
                max_steps,
            } => run::cmd_run(config, task, device, max_steps).await,
            Commands::Wake { device } => bridge::cmd_wake(&config, device).await,
            Commands::Connect { addr } => bridge::cmd_connect(&config, addr).await,
            Commands::RestartServer => bridge::cmd_restart_server(&config).await,
            Commands::InstallKeyboard { device, apk } => {
                bridge::cmd_install_keyboard(&config, device, apk).await
            }
            Commands::Config { json } => Self::cmd_config(&config, json),
            Commands::Doctor => Self::cmd_doctor(&config),
            Commands::Completions { shell } => Self::cmd_completions(shell),
        }
    }

    fn cmd_config(config: &PilotConfig, json: bool) -> phonepilot_core::Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(config)
                    .map_err(|e| PilotError::Config(e.to_string()))?
            );
        }
        Ok(())
    }

    fn cmd_doctor(config: &PilotConfig) -> phonepilot_core::Result<()> {
        println!("🩺 Phonepilot Doctor — Configuration Audit");
        println!();

        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    println!("  ⚠️  {w}");
                }
                if warnings.is_empty() {
                    println!("  ✅ No problems found");
                } else {
                    println!();
                    println!("  {} warning(s)", warnings.len());
                }
            }
            Err(e) => {
                println!("  ❌ {e}");
            }
        }
        Ok(())
    }

    fn cmd_completions(shell: Shell) -> phonepilot_core::Result<()> {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "phonepilot", &mut std::io::stdout());
        Ok(())
    }
}
