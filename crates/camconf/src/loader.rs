//! Config file discovery, loading, and environment variable overlay.

use crate::{CamConfig, ConfigError};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/camgate/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("camgate/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("camgate.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a config file into a raw TOML table.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_table(&contents, path)
}

fn parse_table(contents: &str, path: &Path) -> Result<toml::Table, ConfigError> {
    contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Merge `overlay` into `base`, recursing into nested tables.
///
/// Scalars and arrays in `overlay` replace the value in `base`.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Build a typed config from a merged table. Missing keys take compiled defaults.
pub fn config_from_table(table: toml::Table, origin: &Path) -> Result<CamConfig, ConfigError> {
    let mut config: CamConfig =
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;

    // Paths from files may use ~ or $VAR prefixes
    config.infra.paths.save_dir = expand_path(&config.infra.paths.save_dir.to_string_lossy());
    Ok(config)
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut CamConfig, sources: &mut ConfigSources) {
    if let Ok(v) = env::var("CAMGATE_SAVE_DIR") {
        config.infra.paths.save_dir = expand_path(&v);
        sources.env_overrides.push("CAMGATE_SAVE_DIR".to_string());
    }

    if let Ok(v) = env::var("CAMGATE_HTTP_HOST") {
        config.infra.bind.http_host = v;
        sources.env_overrides.push("CAMGATE_HTTP_HOST".to_string());
    }
    if let Ok(v) = env::var("CAMGATE_HTTP_PORT") {
        if let Ok(port) = v.parse() {
            config.infra.bind.http_port = port;
            sources.env_overrides.push("CAMGATE_HTTP_PORT".to_string());
        }
    }

    if let Ok(v) = env::var("CAMGATE_PUBLIC_PREFIX") {
        config.infra.media.public_prefix = v;
        sources.env_overrides.push("CAMGATE_PUBLIC_PREFIX".to_string());
    }

    if let Ok(v) = env::var("CAMGATE_OTLP_ENDPOINT") {
        config.infra.telemetry.otlp_endpoint = v;
        sources.env_overrides.push("CAMGATE_OTLP_ENDPOINT".to_string());
    }
    if let Ok(v) = env::var("CAMGATE_LOG_LEVEL") {
        config.infra.telemetry.log_level = v;
        sources.env_overrides.push("CAMGATE_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Ok(v) = env::var("RUST_LOG") {
        config.infra.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }

    if let Ok(v) = env::var("CAMGATE_FUNCTION_MODE") {
        config.bootstrap.defaults.function_mode = v;
        sources.env_overrides.push("CAMGATE_FUNCTION_MODE".to_string());
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // Handle $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> CamConfig {
        let table = parse_table(toml, Path::new("test.toml")).unwrap();
        config_from_table(table, Path::new("test.toml")).unwrap()
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/test/path");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_absolute() {
        let expanded = expand_path("/absolute/path");
        assert_eq!(expanded, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_discover_config_files() {
        let _files = discover_config_files();
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = parse(
            r#"
[paths]
save_dir = "/custom/media"
"#,
        );
        assert_eq!(config.infra.paths.save_dir, PathBuf::from("/custom/media"));
        assert_eq!(config.infra.bind.http_port, 9091);
        assert_eq!(config.bootstrap.defaults.exposure.iso, 800);
    }

    #[test]
    fn test_parse_full_toml() {
        let config = parse(
            r#"
[paths]
save_dir = "/data/camgate"

[bind]
http_host = "0.0.0.0"
http_port = 9000

[media]
public_prefix = "http://nginx.local/media"

[telemetry]
log_level = "debug"

[bootstrap.defaults]
function_mode = "normal_video"

[bootstrap.defaults.exposure]
iso = 400
exposure_mode = "manual"

[bootstrap.defaults.capture]
white_balance = "4000k"
"#,
        );

        assert_eq!(config.infra.paths.save_dir, PathBuf::from("/data/camgate"));
        assert_eq!(config.infra.bind.http_host, "0.0.0.0");
        assert_eq!(config.infra.bind.http_port, 9000);
        assert_eq!(config.infra.media.public_prefix, "http://nginx.local/media");
        assert_eq!(config.infra.telemetry.log_level, "debug");
        assert_eq!(config.bootstrap.defaults.function_mode, "normal_video");
        assert_eq!(config.bootstrap.defaults.exposure.iso, 400);
        assert_eq!(config.bootstrap.defaults.exposure.bias, 0);
        assert_eq!(config.bootstrap.defaults.exposure.exposure_mode, "manual");
        assert_eq!(config.bootstrap.defaults.capture.white_balance, "4000k");
        assert_eq!(config.bootstrap.defaults.capture.contrast, 64);
    }

    #[test]
    fn test_merge_tables_nested_keys_survive() {
        let mut base = parse_table(
            r#"
[bind]
http_host = "0.0.0.0"
http_port = 9000
"#,
            Path::new("base.toml"),
        )
        .unwrap();
        let overlay = parse_table(
            r#"
[bind]
http_port = 9100
"#,
            Path::new("overlay.toml"),
        )
        .unwrap();

        merge_tables(&mut base, overlay);
        let config = config_from_table(base, Path::new("merged")).unwrap();
        assert_eq!(config.infra.bind.http_host, "0.0.0.0");
        assert_eq!(config.infra.bind.http_port, 9100);
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = parse_table("[bind\nhttp_port = 1", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_load_table_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("camgate.toml");
        std::fs::write(&path, "[media]\npublic_prefix = \"/files\"\n").unwrap();

        let table = load_table(&path).unwrap();
        let config = config_from_table(table, &path).unwrap();
        assert_eq!(config.infra.media.public_prefix, "/files");
    }
}
