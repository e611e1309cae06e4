//! Bridge configuration
//!
//! TOML-based, every key optional:
//!
//! ```toml
//! [host]
//! analyser_class = "nl/nr8/licencescanner/Analyser"
//! rect_layout = "legacy"
//!
//! [logging]
//! filter = "info"
//! color = true
//! ```

use crate::codec::RectLayout;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "LSCAN_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Host-side contract settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Class whose native methods are registered on load
    #[serde(default = "default_analyser_class")]
    pub analyser_class: String,

    /// Field layout of host rectangles
    #[serde(default)]
    pub rect_layout: RectLayout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directives
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Colored component prefix
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_analyser_class() -> String {
    "nl/nr8/licencescanner/Analyser".to_string()
}
fn default_filter() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            analyser_class: default_analyser_class(),
            rect_layout: RectLayout::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            color: true,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Per-user config location, if the platform has one
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("lscan").join("config.toml"))
    }

    /// Resolve the config file to use: an explicit path, then `LSCAN_CONFIG`,
    /// then the per-user location if it exists
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        Self::default_path().filter(|p| p.is_file())
    }

    /// Load from [`BridgeConfig::locate`], falling back to defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match Self::locate(explicit) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_for_missing_sections() {
        let config = BridgeConfig::from_toml("").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.host.analyser_class, "nl/nr8/licencescanner/Analyser");
        assert_eq!(config.host.rect_layout, RectLayout::Legacy);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_partial_section() {
        let config = BridgeConfig::from_toml(
            r#"
            [host]
            rect_layout = "edges"
            "#,
        )
        .unwrap();
        assert_eq!(config.host.rect_layout, RectLayout::Edges);
        assert_eq!(config.host.analyser_class, "nl/nr8/licencescanner/Analyser");
        assert!(config.logging.color);
    }

    #[test]
    fn test_unknown_layout_is_rejected() {
        let err = BridgeConfig::from_toml("[host]\nrect_layout = \"diagonal\"\n").unwrap_err();
        assert!(format!("{:#}", err).contains("diagonal"));
    }

    #[test]
    fn test_from_file_round_trip() {
        let mut config = BridgeConfig::default();
        config.logging.filter = "lscan_bridge=debug".into();
        config.host.analyser_class = "com/example/Scanner".into();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml().unwrap().as_bytes()).unwrap();

        let loaded = BridgeConfig::load(Some(file.path())).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BridgeConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
