use serde::{Deserialize, Deserializer};

use crate::maven::MavenCoordinate;
use crate::rules::{self, OsName, PlatformRule};

/// Repository used for libraries that name neither an artifact nor a base URL
pub const DEFAULT_LIBRARY_REPOSITORY: &str = "https://maven.fabricmc.net";

/// A parsed version JSON: one launchable build.
///
/// The two argument layouts (structured `arguments` and the legacy
/// `minecraftArguments` string) are resolved into [`LaunchArguments`] once,
/// at parse time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawDescriptor")]
pub struct RuntimeDescriptor {
    pub id: String,
    pub inherits_from: Option<String>,
    pub main_class: Option<String>,
    /// `release`, `snapshot`, ...
    pub version_type: Option<String>,
    pub libraries: Vec<Library>,
    pub arguments: LaunchArguments,
    pub asset_index_id: Option<String>,
}

impl RuntimeDescriptor {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchArguments {
    Structured {
        jvm: Vec<ArgEntry>,
        game: Vec<ArgEntry>,
    },
    /// Pre-1.13 single space-delimited game argument string
    Legacy(String),
}

impl Default for LaunchArguments {
    fn default() -> Self {
        Self::Structured {
            jvm: Vec::new(),
            game: Vec::new(),
        }
    }
}

impl LaunchArguments {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Structured { jvm, game } => jvm.is_empty() && game.is_empty(),
            Self::Legacy(s) => s.trim().is_empty(),
        }
    }
}

/// One element of `arguments.jvm` / `arguments.game`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ArgEntry {
    Plain(String),
    Conditional {
        #[serde(default)]
        rules: Vec<PlatformRule>,
        #[serde(rename = "value", deserialize_with = "one_or_many")]
        values: Vec<String>,
    },
}

impl ArgEntry {
    pub fn plain(template: impl Into<String>) -> Self {
        Self::Plain(template.into())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Library {
    /// Maven coordinate, `group:artifact:version[:classifier]`
    #[serde(rename = "name", default)]
    pub coordinate: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    /// Repository base for coordinate-only libraries
    #[serde(rename = "url", default)]
    pub base_repository_url: Option<String>,
    #[serde(rename = "rules", default)]
    pub platform_rules: Vec<PlatformRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<Artifact>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Artifact {
    pub path: String,
    #[serde(default)]
    pub url: String,
}

impl Library {
    pub fn from_coordinate(coordinate: impl Into<String>) -> Self {
        Self {
            coordinate: coordinate.into(),
            ..Self::default()
        }
    }

    pub fn direct_artifact(&self) -> Option<&Artifact> {
        self.downloads.as_ref().and_then(|d| d.artifact.as_ref())
    }

    pub fn applies_to(&self, os: OsName) -> bool {
        rules::allows(&self.platform_rules, os)
    }

    /// Path relative to the libraries root, `/`-separated.
    ///
    /// The direct artifact path wins over the coordinate mapping.
    pub fn relative_path(&self) -> Option<String> {
        if let Some(artifact) = self.direct_artifact()
            && !artifact.path.is_empty()
        {
            return Some(artifact.path.clone());
        }
        MavenCoordinate::parse(&self.coordinate).map(|c| c.relative_path())
    }

    /// Where the library would be fetched from
    pub fn download_url(&self) -> Option<String> {
        if let Some(artifact) = self.direct_artifact()
            && !artifact.url.is_empty()
        {
            return Some(artifact.url.clone());
        }
        let coordinate = MavenCoordinate::parse(&self.coordinate)?;
        let repository = self
            .base_repository_url
            .as_deref()
            .unwrap_or(DEFAULT_LIBRARY_REPOSITORY);
        Some(coordinate.url(repository))
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    #[serde(default)]
    id: String,
    #[serde(default)]
    inherits_from: Option<String>,
    #[serde(default)]
    main_class: Option<String>,
    #[serde(default, rename = "type")]
    version_type: Option<String>,
    #[serde(default)]
    libraries: Vec<Library>,
    #[serde(default)]
    arguments: Option<RawArguments>,
    #[serde(default)]
    minecraft_arguments: Option<String>,
    #[serde(default)]
    asset_index: Option<RawAssetIndex>,
    #[serde(default)]
    assets: Option<String>,
}

#[derive(Deserialize)]
struct RawArguments {
    #[serde(default)]
    jvm: Vec<ArgEntry>,
    #[serde(default)]
    game: Vec<ArgEntry>,
}

#[derive(Deserialize)]
struct RawAssetIndex {
    id: String,
}

impl From<RawDescriptor> for RuntimeDescriptor {
    fn from(raw: RawDescriptor) -> Self {
        let arguments = match (raw.arguments, raw.minecraft_arguments) {
            (Some(args), _) => LaunchArguments::Structured {
                jvm: args.jvm,
                game: args.game,
            },
            (None, Some(legacy)) => LaunchArguments::Legacy(legacy),
            (None, None) => LaunchArguments::default(),
        };

        Self {
            id: raw.id,
            inherits_from: raw.inherits_from.filter(|s| !s.is_empty()),
            main_class: raw.main_class.filter(|s| !s.is_empty()),
            version_type: raw.version_type,
            libraries: raw.libraries,
            arguments,
            asset_index_id: raw.assets.or(raw.asset_index.map(|a| a.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleAction;

    #[test]
    fn test_structured_descriptor() {
        let d = RuntimeDescriptor::from_json(
            r#"{
                "id": "1.21.1",
                "type": "release",
                "mainClass": "net.minecraft.client.main.Main",
                "assetIndex": { "id": "17", "url": "https://example.invalid/17.json" },
                "arguments": {
                    "game": ["--username", "${auth_player_name}",
                             {"rules": [{"action": "allow", "features": {"is_demo_user": true}}], "value": "--demo"}],
                    "jvm": [{"rules": [{"action": "allow", "os": {"name": "osx"}}], "value": ["-XstartOnFirstThread"]},
                            "-cp", "${classpath}"]
                },
                "libraries": [
                    {"name": "com.mojang:brigadier:1.3.10",
                     "downloads": {"artifact": {"path": "com/mojang/brigadier/1.3.10/brigadier-1.3.10.jar",
                                                "url": "https://libraries.minecraft.net/com/mojang/brigadier/1.3.10/brigadier-1.3.10.jar",
                                                "sha1": "x", "size": 1}}}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(d.main_class.as_deref(), Some("net.minecraft.client.main.Main"));
        assert_eq!(d.asset_index_id.as_deref(), Some("17"));
        assert_eq!(d.version_type.as_deref(), Some("release"));
        let LaunchArguments::Structured { jvm, game } = &d.arguments else {
            panic!("expected structured arguments");
        };
        assert_eq!(game[0], ArgEntry::plain("--username"));
        match &game[2] {
            ArgEntry::Conditional { rules, values } => {
                assert!(rules[0].requires_feature());
                assert_eq!(values, &vec!["--demo".to_string()]);
            }
            other => panic!("unexpected entry {other:?}"),
        }
        match &jvm[0] {
            ArgEntry::Conditional { rules, values } => {
                assert_eq!(rules[0].action, RuleAction::Allow);
                assert_eq!(values.len(), 1);
            }
            other => panic!("unexpected entry {other:?}"),
        }
        assert_eq!(
            d.libraries[0].relative_path().as_deref(),
            Some("com/mojang/brigadier/1.3.10/brigadier-1.3.10.jar")
        );
    }

    #[test]
    fn test_legacy_descriptor() {
        let d = RuntimeDescriptor::from_json(
            r#"{
                "id": "1.8.9",
                "mainClass": "net.minecraft.client.main.Main",
                "assets": "1.8",
                "minecraftArguments": "--username ${auth_player_name} --version ${version_name}"
            }"#,
        )
        .unwrap();

        assert_eq!(d.asset_index_id.as_deref(), Some("1.8"));
        assert!(matches!(d.arguments, LaunchArguments::Legacy(ref s) if s.starts_with("--username")));
    }

    #[test]
    fn test_overlay_descriptor_without_arguments() {
        let d = RuntimeDescriptor::from_json(
            r#"{
                "id": "fabric-loader-0.16.9-1.21.1",
                "inheritsFrom": "1.21.1",
                "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
                "libraries": [{"name": "net.fabricmc:fabric-loader:0.16.9", "url": "https://maven.fabricmc.net/"}]
            }"#,
        )
        .unwrap();

        assert_eq!(d.inherits_from.as_deref(), Some("1.21.1"));
        assert!(d.arguments.is_empty());
        assert_eq!(
            d.libraries[0].download_url().as_deref(),
            Some("https://maven.fabricmc.net/net/fabricmc/fabric-loader/0.16.9/fabric-loader-0.16.9.jar")
        );
    }

    #[test]
    fn test_library_without_repository_uses_default() {
        let lib = Library::from_coordinate("org.ow2.asm:asm:9.9");
        assert_eq!(
            lib.download_url().as_deref(),
            Some("https://maven.fabricmc.net/org/ow2/asm/asm/9.9/asm-9.9.jar")
        );
        assert!(Library::from_coordinate("broken").relative_path().is_none());
    }
}
