use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{InstanceError, Result};
use crate::instance::write_atomic;

pub const SETTINGS_FILE: &str = "settings.toml";

/// Global launcher settings, stored as TOML in the config directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    /// Capture options.txt into mcconfig.json after the game exits
    pub auto_capture_settings: bool,
    /// Write mcconfig.json game settings into options.txt before launching
    pub auto_apply_settings: bool,
    pub window: Option<WindowConfig>,
    pub java: Option<JavaConfig>,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            auto_capture_settings: true,
            auto_apply_settings: true,
            window: None,
            java: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowConfig {
    pub width: u64,
    pub height: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 854,
            height: 480,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct JavaConfig {
    /// Explicit java executable; empty means auto-detect
    pub path: String,
    /// Initial heap in MiB
    pub min_memory: u64,
    /// Maximum heap in MiB
    pub max_memory: u64,
    /// Extra JVM flags, whitespace separated
    pub arguments: String,
}

impl Default for JavaConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            min_memory: 512,
            max_memory: 2048,
            arguments: String::new(),
        }
    }
}

impl LauncherSettings {
    /// Load settings; a missing or unreadable file yields defaults
    pub async fn load(path: &Path) -> Self {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not read {}: {}. Using defaults", path.display(), e);
                }
                return Self::default();
            }
        };

        match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                warn!("Could not parse {}: {}. Using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)
            .context("Failed to serialize settings to TOML")
            .map_err(|e| InstanceError::SettingsWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")
                .map_err(|e| InstanceError::SettingsWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }

        write_atomic(path, toml.as_bytes())
            .await
            .map_err(|e| InstanceError::SettingsWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })
    }

    pub fn window(&self) -> WindowConfig {
        self.window.clone().unwrap_or_default()
    }

    pub fn java(&self) -> JavaConfig {
        self.java.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_roundtrip_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let settings = LauncherSettings {
            auto_capture_settings: false,
            auto_apply_settings: true,
            window: Some(WindowConfig {
                width: 1920,
                height: 1080,
            }),
            java: Some(JavaConfig {
                path: "/usr/bin/java".to_string(),
                min_memory: 1024,
                max_memory: 4096,
                arguments: "-XX:+UseZGC".to_string(),
            }),
        };

        settings.save(&path).await.unwrap();
        assert_eq!(LauncherSettings::load(&path).await, settings);
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let settings = LauncherSettings::load(&dir.path().join(SETTINGS_FILE)).await;
        assert_eq!(settings, LauncherSettings::default());
        assert_eq!(settings.window().width, 854);
        assert_eq!(settings.java().max_memory, 2048);
    }

    #[tokio::test]
    async fn test_corrupt_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "invalid toml content [[[").unwrap();
        assert_eq!(LauncherSettings::load(&path).await, LauncherSettings::default());
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "auto_capture_settings = false\n\n[java]\nmax_memory = 6144\n").unwrap();

        let settings = LauncherSettings::load(&path).await;
        assert!(!settings.auto_capture_settings);
        assert!(settings.auto_apply_settings);
        assert_eq!(settings.java().max_memory, 6144);
        assert_eq!(settings.java().min_memory, 512);
    }
}
