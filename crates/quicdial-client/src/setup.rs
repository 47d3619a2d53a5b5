//! Config file loading.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Load configuration from the given path, or the default location.
pub fn load_config(path: Option<&str>) -> Result<ClientConfig, ClientError> {
    let config_path = match path {
        Some(p) => PathBuf::from(p),
        None => default_config_path(),
    };
    load_config_from(&config_path)
}

/// Load configuration from `path`; a missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<ClientConfig, ClientError> {
    if !path.exists() {
        info!(path = %path.display(), "no config file found, using defaults");
        return Ok(ClientConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ClientError::Config(format!("failed to read config: {e}")))?;
    let config: ClientConfig = toml::from_str(&content)
        .map_err(|e| ClientError::Config(format!("failed to parse config: {e}")))?;
    info!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Get the default config directory path.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("quicdial")
}

fn default_config_path() -> PathBuf {
    config_dir().join("client.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use quicdial_types::VersionNumber;

    fn scratch_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("quicdial-{}-{name}", std::process::id()))
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = load_config_from(&scratch_file("does-not-exist.toml")).unwrap();
        assert_eq!(config.handshake_timeout_ms, 10_000);
    }

    #[test]
    fn loads_file() {
        let path = scratch_file("client.toml");
        std::fs::write(&path, "versions = [\"TLS\"]\nidle_timeout_ms = 5000\n").unwrap();
        let config = load_config(path.to_str()).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.versions, vec![VersionNumber::TLS]);
        assert_eq!(config.idle_timeout_ms, 5000);
    }

    #[test]
    fn parse_error_is_reported() {
        let path = scratch_file("broken.toml");
        std::fs::write(&path, "versions = [\"Q3x9\"]\n").unwrap();
        let err = load_config_from(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(err.to_string().contains("failed to parse config"));
    }
}
