//! Minimal configuration loading for camgate.
//!
//! # Configuration Philosophy
//!
//! - **Infrastructure** (`InfraConfig`): things fixed for the life of the
//!   process - the save directory, bind address, public media prefix, telemetry.
//!
//! - **Bootstrap** (`BootstrapConfig`): fallback values for the device core,
//!   used when the device cannot report its own state.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/camgate/config.toml` (system)
//! 2. `~/.config/camgate/config.toml` (user)
//! 3. `./camgate.toml` or the `--config` path (local override)
//! 4. Environment variables (`CAMGATE_*`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! save_dir = "~/.local/share/camgate/media"
//!
//! [bind]
//! http_host = "localhost"
//! http_port = 9091
//!
//! [media]
//! public_prefix = "http://localhost:8080/media"
//!
//! [telemetry]
//! otlp_endpoint = "127.0.0.1:4317"
//! log_level = "info"
//!
//! [bootstrap.defaults]
//! function_mode = "normal_image"
//!
//! [bootstrap.defaults.exposure]
//! bias = 0
//! shutter_speed = 0.008333
//! iso = 800
//! exposure_mode = "auto"
//!
//! [bootstrap.defaults.capture]
//! contrast = 64
//! saturation = 64
//! brightness = 0
//! sharpness = 3
//! white_balance = "auto"
//! ```

pub mod bootstrap;
pub mod infra;
pub mod loader;

pub use bootstrap::{BootstrapConfig, CaptureDefaults, DefaultsConfig, ExposureDefaults};
pub use infra::{BindConfig, InfraConfig, MediaConfig, PathsConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, expand_path, ConfigSources};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete camgate configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CamConfig {
    /// Infrastructure - cannot change at runtime.
    #[serde(flatten)]
    pub infra: InfraConfig,

    /// Bootstrap - fallback values for the device core.
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl CamConfig {
    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in loader::discover_config_files_with_override(config_path) {
            let table = loader::load_table(&path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path);
        }

        let origin = sources
            .files
            .last()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("<defaults>"));
        let mut config = loader::config_from_table(merged, &origin)?;

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to a TOML string.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        let body = toml::to_string_pretty(self)?;
        Ok(format!("# camgate configuration\n\n{}", body))
    }
}
