//! Infrastructure configuration - things that cannot change at runtime.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Filesystem paths used by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory that downloaded device files are materialized into.
    /// Default: ~/.local/share/camgate/media
    #[serde(default = "PathsConfig::default_save_dir")]
    pub save_dir: PathBuf,
}

impl PathsConfig {
    fn default_save_dir() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".local/share/camgate/media"))
            .unwrap_or_else(|| PathBuf::from("media"))
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            save_dir: Self::default_save_dir(),
        }
    }
}

/// Network bind address for the HTTP surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindConfig {
    /// Host or IP to bind.
    /// Default: localhost
    #[serde(default = "BindConfig::default_http_host")]
    pub http_host: String,

    /// HTTP port for the API and health endpoints.
    /// Default: 9091
    #[serde(default = "BindConfig::default_http_port")]
    pub http_port: u16,
}

impl BindConfig {
    fn default_http_host() -> String {
        "localhost".to_string()
    }

    fn default_http_port() -> u16 {
        9091
    }
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            http_host: Self::default_http_host(),
            http_port: Self::default_http_port(),
        }
    }
}

/// How materialized media is exposed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Prefix joined with a file's base name to build its public locator.
    /// Usually the mount point of a static file server in front of `save_dir`.
    /// Default: /media
    #[serde(default = "MediaConfig::default_public_prefix")]
    pub public_prefix: String,
}

impl MediaConfig {
    fn default_public_prefix() -> String {
        "/media".to_string()
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            public_prefix: Self::default_public_prefix(),
        }
    }
}

/// Telemetry and observability configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// OTLP gRPC endpoint for span export. Empty disables export.
    /// Default: "" (disabled)
    #[serde(default)]
    pub otlp_endpoint: String,

    /// Log level (trace, debug, info, warn, error) or a full EnvFilter directive.
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: String::new(),
            log_level: Self::default_log_level(),
        }
    }
}

/// All infrastructure settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfraConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub bind: BindConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bind() {
        let bind = BindConfig::default();
        assert_eq!(bind.http_host, "localhost");
        assert_eq!(bind.http_port, 9091);
    }

    #[test]
    fn test_otlp_disabled_by_default() {
        assert!(TelemetryConfig::default().otlp_endpoint.is_empty());
    }
}
