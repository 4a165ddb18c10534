//! Application-level configuration loading, including the default prize tier set.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::draw::{PrizeTier, TierId};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "LUCKY_REEL_BACK_CONFIG_PATH";
/// Default location of the persisted event state document.
const DEFAULT_DATA_PATH: &str = "data/event.json";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    data_path: PathBuf,
    tiers: Vec<PrizeTier>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        tiers = app_config.tiers.len(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Path of the persisted event state document.
    pub fn data_path(&self) -> &PathBuf {
        &self.data_path
    }

    /// Prize tiers used when the store holds no tier configuration yet.
    pub fn default_tiers(&self) -> &[PrizeTier] {
        &self.tiers
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            tiers: default_tiers(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    data_path: Option<PathBuf>,
    #[serde(default)]
    tiers: Option<Vec<RawTier>>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            data_path: value
                .data_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH)),
            tiers: value
                .tiers
                .map(|tiers| tiers.into_iter().map(Into::into).collect())
                .unwrap_or_else(default_tiers),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single prize tier inside the configuration file.
struct RawTier {
    id: TierId,
    name: String,
    quota: u32,
}

impl From<RawTier> for PrizeTier {
    fn from(value: RawTier) -> Self {
        Self {
            id: value.id,
            display_name: value.name,
            quota: value.quota,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in tier set shipped with the binary.
fn default_tiers() -> Vec<PrizeTier> {
    vec![
        PrizeTier {
            id: TierId::Special,
            display_name: "Special Prize".into(),
            quota: 1,
        },
        PrizeTier {
            id: TierId::First,
            display_name: "First Prize".into(),
            quota: 2,
        },
        PrizeTier {
            id: TierId::Second,
            display_name: "Second Prize".into(),
            quota: 5,
        },
        PrizeTier {
            id: TierId::Third,
            display_name: "Third Prize".into(),
            quota: 20,
        },
    ]
}
