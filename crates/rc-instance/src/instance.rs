use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::{InstanceError, Result};

pub const INSTANCE_FILE: &str = "mcconfig.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceKind {
    #[default]
    Client,
    Server,
}

/// The `mcconfig.json` record of one installed instance.
///
/// Fields this crate does not interpret are kept in `extra` and written back
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: InstanceKind,
    #[serde(default)]
    pub mod_loader: Option<String>,
    /// Base runtime version, e.g. `1.21.1`
    pub minecraft_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loader_version: Option<String>,
    /// Selected descriptor id; the overlay id for modded instances
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub mods: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub game_settings: BTreeMap<String, serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl InstanceRecord {
    pub fn new(name: impl Into<String>, minecraft_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: InstanceKind::Client,
            mod_loader: Some("vanilla".to_string()),
            minecraft_version: minecraft_version.into(),
            loader_version: None,
            version_id: None,
            mods: Vec::new(),
            game_settings: BTreeMap::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Descriptor id to launch; falls back to the base version
    pub fn descriptor_id(&self) -> &str {
        self.version_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.minecraft_version)
    }

    pub fn is_server(&self) -> bool {
        self.kind == InstanceKind::Server
    }

    #[instrument(level = "debug")]
    pub async fn load(instance_dir: &Path) -> Result<Self> {
        let file_path = instance_dir.join(INSTANCE_FILE);
        if tokio::fs::metadata(&file_path).await.is_err() {
            return Err(InstanceError::InstanceFileNotFound {
                path: instance_dir.to_path_buf(),
            });
        }

        let content = tokio::fs::read(&file_path)
            .await
            .context("Failed to read mcconfig.json")
            .map_err(|e| InstanceError::InstanceFileReadFailed {
                path: file_path.clone(),
                source: e,
            })?;

        let record: Self = serde_json::from_slice(&content)
            .context("Failed to parse mcconfig.json")
            .map_err(|e| InstanceError::InstanceParsingFailed {
                path: file_path.clone(),
                source: e,
            })?;

        debug!("Loaded instance '{}' from {}", record.name, file_path.display());
        Ok(record)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn save(&self, instance_dir: &Path) -> Result<()> {
        let file_path = instance_dir.join(INSTANCE_FILE);
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize instance")
            .map_err(|e| InstanceError::InstanceFileWriteFailed {
                path: file_path.clone(),
                source: e,
            })?;

        write_atomic(&file_path, json.as_bytes())
            .await
            .map_err(|e| InstanceError::InstanceFileWriteFailed {
                path: file_path.clone(),
                source: e,
            })
    }
}

/// Directory layout of an installed instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceLayout {
    root: PathBuf,
}

impl InstanceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn natives_dir(&self) -> PathBuf {
        self.root.join("natives")
    }

    pub fn options_file(&self) -> PathBuf {
        self.root.join("options.txt")
    }
}

pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", temp_path.display()))?;
    tokio::fs::rename(&temp_path, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_instance_success() {
        let temp_dir = tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join(INSTANCE_FILE),
            r#"{
                "configVersion": "0.3.0",
                "name": "Modded Fabric",
                "type": "client",
                "modLoader": "fabric",
                "minecraftVersion": "1.21.1",
                "loaderVersion": "0.16.9",
                "versionId": "fabric-loader-0.16.9-1.21.1",
                "createdAt": "2024-06-01T12:00:00.000Z",
                "mods": [{"projectId": "P7dR8mSH", "fileName": "fabric-api.jar"}]
            }"#,
        )
        .unwrap();

        let record = InstanceRecord::load(temp_dir.path()).await.unwrap();
        assert_eq!(record.name, "Modded Fabric");
        assert_eq!(record.descriptor_id(), "fabric-loader-0.16.9-1.21.1");
        assert!(!record.is_server());
        assert_eq!(record.mods.len(), 1);
        assert_eq!(record.extra["configVersion"], "0.3.0");
    }

    #[tokio::test]
    async fn test_save_keeps_unknown_fields() {
        let temp_dir = tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join(INSTANCE_FILE),
            r#"{"name":"x","type":"server","minecraftVersion":"1.20.4","createdAt":"yesterday"}"#,
        )
        .unwrap();

        let mut record = InstanceRecord::load(temp_dir.path()).await.unwrap();
        assert!(record.is_server());
        assert_eq!(record.descriptor_id(), "1.20.4");
        record
            .game_settings
            .insert("fov".to_string(), serde_json::json!(90));
        record.save(temp_dir.path()).await.unwrap();

        let raw: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(temp_dir.path().join(INSTANCE_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(raw["createdAt"], "yesterday");
        assert_eq!(raw["gameSettings"]["fov"], 90);
        assert_eq!(raw["type"], "server");
    }

    #[tokio::test]
    async fn test_load_instance_nonexistent() {
        let temp_dir = tempdir().unwrap();
        let result = InstanceRecord::load(temp_dir.path()).await;
        assert!(matches!(result, Err(InstanceError::InstanceFileNotFound { .. })));
    }

    #[tokio::test]
    async fn test_load_instance_invalid_json() {
        let temp_dir = tempdir().unwrap();
        let file = temp_dir.path().join(INSTANCE_FILE);
        std::fs::write(&file, "invalid json content {{{").unwrap();

        match InstanceRecord::load(temp_dir.path()).await {
            Err(InstanceError::InstanceParsingFailed { path, .. }) => assert_eq!(path, file),
            other => panic!("Expected InstanceParsingFailed error, got {other:?}"),
        }
    }

    #[test]
    fn test_layout_paths() {
        let layout = InstanceLayout::new("/games/pack");
        assert_eq!(layout.libraries_dir(), PathBuf::from("/games/pack/libraries"));
        assert_eq!(layout.natives_dir(), PathBuf::from("/games/pack/natives"));
        assert_eq!(layout.options_file(), PathBuf::from("/games/pack/options.txt"));
    }
}
