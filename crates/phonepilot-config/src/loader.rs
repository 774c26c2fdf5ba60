use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::schema::PilotConfig;

/// Loads the phonepilot configuration and hands out read snapshots.
pub struct ConfigLoader {
    config: Arc<RwLock<PilotConfig>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > PHONEPILOT_CONFIG env >
    /// ~/.phonepilot/phonepilot.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("PHONEPILOT_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".phonepilot")
            .join("phonepilot.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> phonepilot_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            let raw = std::fs::read_to_string(&config_path)?;
            toml::from_str::<PilotConfig>(&raw).map_err(|e| {
                phonepilot_core::PilotError::Config(format!(
                    "failed to parse {}: {}",
                    config_path.display(),
                    e
                ))
            })?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            PilotConfig::default()
        };

        let config = Self::apply_env_overrides(config);

        // Validate config — log warnings, fail on errors
        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(phonepilot_core::PilotError::Config(e));
            }
        }

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Get a read snapshot of the current config.
    pub fn get(&self) -> PilotConfig {
        self.config.read().clone()
    }

    /// Path the config was resolved from.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply env var overrides. The config file takes priority for the API
    /// key; the env var is the fallback.
    pub fn apply_env_overrides(mut config: PilotConfig) -> PilotConfig {
        if let Ok(v) = std::env::var("PHONEPILOT_BASE_URL") {
            config.agent.base_url = v;
        }
        if let Ok(v) = std::env::var("PHONEPILOT_MODEL") {
            config.agent.model = v;
        }
        if let Ok(v) = std::env::var("PHONEPILOT_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("PHONEPILOT_MAX_STEPS") {
            if let Ok(steps) = v.parse::<u32>() {
                config.session.max_steps = steps;
            }
        }
        if config.agent.api_key.is_none() {
            if let Ok(v) = std::env::var("PHONEPILOT_API_KEY") {
                config.agent.api_key = Some(v);
            }
        }
        config
    }

    /// Reload the config from disk.
    pub fn reload(&self) -> phonepilot_core::Result<()> {
        if !self.config_path.exists() {
            return Err(phonepilot_core::PilotError::Config(format!(
                "config file not found: {}",
                self.config_path.display()
            )));
        }
        let raw = std::fs::read_to_string(&self.config_path)?;
        let new_config = toml::from_str::<PilotConfig>(&raw).map_err(|e| {
            phonepilot_core::PilotError::Config(format!(
                "failed to parse {}: {}",
                self.config_path.display(),
                e
            ))
        })?;
        let new_config = Self::apply_env_overrides(new_config);
        *self.config.write() = new_config;
        info!("configuration reloaded");
        Ok(())
    }
}
