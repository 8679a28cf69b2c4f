//! CLI configuration handling.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use passkeep_core::{ClientConfig, StoreBackend};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Path to the configuration file that was loaded.
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory for the session file.
    pub data_dir: PathBuf,

    /// Logging level used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Where the session is persisted.
    pub store: StoreBackend,

    /// Backend connection settings.
    pub client: ClientConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".passkeep"));

        Self {
            config_path: PathBuf::new(),
            data_dir,
            log_level: "info".to_string(),
            store: StoreBackend::default(),
            client: ClientConfig::default(),
        }
    }
}

/// Load configuration from `path`, or the default location when `None`.
///
/// A missing file yields defaults. The data directory is created.
pub fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path(),
    };

    let mut config = if config_path.exists() {
        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", config_path))?
    } else {
        CliConfig::default()
    };

    config
        .client
        .validate()
        .with_context(|| format!("Invalid client settings in {:?}", config_path))?;
    config.config_path = config_path;

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", config.data_dir))?;

    Ok(config)
}

fn default_config_path() -> PathBuf {
    project_dirs()
        .map(|d| d.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("passkeep.toml"))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "passkeep", "passkeep")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_yields_defaults() {
        let loaded: CliConfig = toml::from_str("").unwrap();

        assert_eq!(loaded.log_level, "info");
        assert_eq!(loaded.data_dir, CliConfig::default().data_dir);
        assert_eq!(loaded.store, StoreBackend::Keyring);
        assert_eq!(loaded.client, ClientConfig::default());
    }

    #[test]
    fn test_partial_file_overrides_and_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let data_dir = dir.path().join("sessions");
        std::fs::write(
            &path,
            format!(
                r#"
store = "file"
data_dir = {:?}

[client]
base_url = "https://books.example.com/api/"
request_timeout_secs = 10

[client.endpoints]
login = "v2/auth/login"
"#,
                data_dir
            ),
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.config_path, path);
        assert_eq!(config.store, StoreBackend::File);
        assert!(data_dir.is_dir());
        assert_eq!(config.client.base_url, "https://books.example.com/api/");
        assert_eq!(config.client.request_timeout_secs, 10);
        assert_eq!(config.client.endpoints.login, "v2/auth/login");
        assert_eq!(config.client.endpoints.logout, "auth/logout");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[client]\ncold_load_timeout_secs = 0\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Invalid client settings"), "{}", err);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "store = [").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
