use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frame::DEFAULT_ROUTE;
use crate::routes::DEFAULT_MANIFEST_PATH;
use crate::translation::{DEFAULT_LOCALE_STEM, DEFAULT_VERSION_PATH};

pub const CONFIG_ENV: &str = "SHIMFRAME_CONFIG";
const CONFIG_FILE: &str = "shimframe.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShimConfig {
    /// URL or local directory holding the UI bundle.
    pub bundle_root: String,
    pub manifest_path: String,
    pub version_path: String,
    pub locale_stem: String,
    pub default_route: String,
    pub probe_timeout_ms: u64,
    pub server_addr: Option<SocketAddr>,
    pub watch: bool,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            bundle_root: String::from("."),
            manifest_path: DEFAULT_MANIFEST_PATH.to_string(),
            version_path: DEFAULT_VERSION_PATH.to_string(),
            locale_stem: DEFAULT_LOCALE_STEM.to_string(),
            default_route: DEFAULT_ROUTE.to_string(),
            probe_timeout_ms: 250,
            server_addr: None,
            watch: false,
        }
    }
}

impl ShimConfig {
    /// Load from `path`; a missing file gives the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            tracing::debug!(target: "config", path = %path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let config: ShimConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// `--config`, then `SHIMFRAME_CONFIG`, then the per-user config dir.
    pub fn resolve_path(cli: Option<PathBuf>) -> Option<PathBuf> {
        cli.or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .or_else(default_path)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "Shimframe", "Shimframe")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_default() {
        let config = ShimConfig::load(None).unwrap();
        assert_eq!(config, ShimConfig::default());
        assert_eq!(config.manifest_path, "hbui/routes.json");
        assert_eq!(config.probe_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ShimConfig::load(Some(&dir.path().join("absent.yaml"))).unwrap();
        assert_eq!(config, ShimConfig::default());
    }

    #[test]
    fn loads_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "bundle_root: http://localhost:8000/\nprobe_timeout_ms: 40\nserver_addr: 127.0.0.1:4455\nwatch: true"
        )
        .unwrap();

        let config = ShimConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.bundle_root, "http://localhost:8000/");
        assert_eq!(config.probe_timeout(), Duration::from_millis(40));
        assert_eq!(config.server_addr, Some("127.0.0.1:4455".parse().unwrap()));
        assert!(config.watch);
        assert_eq!(config.default_route, "/badger/mainMenu");
    }

    #[test]
    fn rejects_malformed_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "probe_timeout_ms: [not, a, number]").unwrap();
        assert!(matches!(
            ShimConfig::load(Some(file.path())),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn cli_path_wins() {
        let cli = PathBuf::from("/tmp/explicit.yaml");
        assert_eq!(ShimConfig::resolve_path(Some(cli.clone())), Some(cli));
    }
}
