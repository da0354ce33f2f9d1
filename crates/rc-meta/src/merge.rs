use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::descriptor::{LaunchArguments, RuntimeDescriptor};
use crate::errors::{MetaError, Result};

/// Loads descriptors by id
#[async_trait::async_trait]
pub trait DescriptorSource: Send + Sync {
    /// `Ok(None)` when no descriptor with this id exists
    async fn load(&self, id: &str) -> Result<Option<RuntimeDescriptor>>;

    /// Where the descriptor for `id` is expected, for diagnostics
    fn location(&self, id: &str) -> PathBuf;
}

/// Descriptors stored as `<root>/versions/<id>/<id>.json`
#[derive(Debug, Clone)]
pub struct VersionsDirectory {
    root: PathBuf,
}

impl VersionsDirectory {
    /// `install_root` is the directory that contains `versions/`
    pub fn new(install_root: impl AsRef<Path>) -> Self {
        Self {
            root: install_root.as_ref().join("versions"),
        }
    }

    /// Packaged game jar of a base version, `<root>/versions/<id>/<id>.jar`
    pub fn jar_path(&self, id: &str) -> PathBuf {
        self.root.join(id).join(format!("{id}.jar"))
    }
}

#[async_trait::async_trait]
impl DescriptorSource for VersionsDirectory {
    #[instrument(skip(self))]
    async fn load(&self, id: &str) -> Result<Option<RuntimeDescriptor>> {
        let path = self.location(id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No descriptor at {}", path.display());
                return Ok(None);
            }
            Err(source) => return Err(MetaError::DescriptorRead { path, source }),
        };

        let mut descriptor = RuntimeDescriptor::from_json(&content)
            .map_err(|source| MetaError::DescriptorParse { path: path.clone(), source })?;
        if descriptor.id.is_empty() {
            descriptor.id = id.to_string();
        }
        Ok(Some(descriptor))
    }

    fn location(&self, id: &str) -> PathBuf {
        self.root.join(id).join(format!("{id}.json"))
    }
}

/// In-memory descriptor source
#[derive(Debug, Clone, Default)]
pub struct StaticDescriptors {
    descriptors: HashMap<String, RuntimeDescriptor>,
}

impl StaticDescriptors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, descriptor: RuntimeDescriptor) -> Self {
        self.descriptors.insert(descriptor.id.clone(), descriptor);
        self
    }
}

#[async_trait::async_trait]
impl DescriptorSource for StaticDescriptors {
    async fn load(&self, id: &str) -> Result<Option<RuntimeDescriptor>> {
        Ok(self.descriptors.get(id).cloned())
    }

    fn location(&self, id: &str) -> PathBuf {
        PathBuf::from(format!("<memory>/{id}"))
    }
}

/// Load `id` and, if it inherits from a parent, merge the two.
///
/// Inheritance is single-level: the parent's own `inherits_from` is ignored.
#[instrument(skip(source))]
pub async fn resolve(id: &str, source: &dyn DescriptorSource) -> Result<RuntimeDescriptor> {
    let child = source
        .load(id)
        .await?
        .ok_or_else(|| MetaError::DescriptorMissing {
            id: id.to_string(),
            expected: source.location(id),
        })?;

    let Some(parent_id) = child.inherits_from.clone() else {
        return Ok(child);
    };

    let parent = source
        .load(&parent_id)
        .await?
        .ok_or_else(|| MetaError::DescriptorMissing {
            id: parent_id.clone(),
            expected: source.location(&parent_id),
        })?;

    if parent.inherits_from.is_some() {
        warn!(
            "Descriptor '{}' inherits from '{}', which itself inherits; only one level is merged",
            id, parent_id
        );
    }

    debug!("Merging '{}' onto parent '{}'", id, parent_id);
    Ok(merge(child, parent))
}

/// Merge an overlay descriptor onto its parent.
///
/// - libraries: child's, then parent's
/// - JVM arguments: parent's, then child's
/// - game arguments: child's, then parent's
///
/// The two argument lists merge in opposite orders. This matches the
/// behaviour launchers have shipped with and is kept as-is.
///
/// A structured parent always yields structured arguments; a legacy
/// string on the child is dropped in that case.
pub fn merge(child: RuntimeDescriptor, parent: RuntimeDescriptor) -> RuntimeDescriptor {
    let mut libraries = child.libraries;
    libraries.extend(parent.libraries);

    let arguments = match (child.arguments, parent.arguments) {
        (
            LaunchArguments::Structured {
                jvm: child_jvm,
                game: child_game,
            },
            LaunchArguments::Structured {
                jvm: parent_jvm,
                game: parent_game,
            },
        ) => {
            let mut jvm = parent_jvm;
            jvm.extend(child_jvm);
            let mut game = child_game;
            game.extend(parent_game);
            LaunchArguments::Structured { jvm, game }
        }
        (LaunchArguments::Legacy(_), parent_args @ LaunchArguments::Structured { .. }) => parent_args,
        (child_args, parent_args) if child_args.is_empty() => parent_args,
        (child_args, _) => child_args,
    };

    RuntimeDescriptor {
        id: child.id,
        inherits_from: child.inherits_from,
        main_class: child.main_class.or(parent.main_class),
        version_type: child.version_type.or(parent.version_type),
        libraries,
        arguments,
        asset_index_id: child.asset_index_id.or(parent.asset_index_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ArgEntry, Library};
    use tempfile::TempDir;

    fn structured(id: &str, jvm: &[&str], game: &[&str]) -> RuntimeDescriptor {
        RuntimeDescriptor {
            id: id.to_string(),
            arguments: LaunchArguments::Structured {
                jvm: jvm.iter().map(|s| ArgEntry::plain(*s)).collect(),
                game: game.iter().map(|s| ArgEntry::plain(*s)).collect(),
            },
            ..RuntimeDescriptor::default()
        }
    }

    fn names(libraries: &[Library]) -> Vec<&str> {
        libraries.iter().map(|l| l.coordinate.as_str()).collect()
    }

    #[test]
    fn test_libraries_child_first() {
        let mut child = structured("overlay", &[], &[]);
        child.libraries = vec![Library::from_coordinate("A"), Library::from_coordinate("B")];
        let mut parent = structured("base", &[], &[]);
        parent.libraries = vec![Library::from_coordinate("C"), Library::from_coordinate("D")];

        let merged = merge(child, parent);
        assert_eq!(names(&merged.libraries), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_argument_merge_order_is_asymmetric() {
        let child = structured("overlay", &["j1"], &["g1"]);
        let parent = structured("base", &["j0"], &["g0"]);

        let merged = merge(child, parent);
        let LaunchArguments::Structured { jvm, game } = merged.arguments else {
            panic!("expected structured arguments");
        };
        assert_eq!(jvm, vec![ArgEntry::plain("j0"), ArgEntry::plain("j1")]);
        assert_eq!(game, vec![ArgEntry::plain("g1"), ArgEntry::plain("g0")]);
    }

    #[test]
    fn test_scalar_fields_prefer_child() {
        let mut child = structured("overlay", &[], &[]);
        child.main_class = Some("Knot".to_string());
        let mut parent = structured("base", &[], &[]);
        parent.main_class = Some("Main".to_string());
        parent.asset_index_id = Some("17".to_string());
        parent.version_type = Some("release".to_string());

        let merged = merge(child, parent);
        assert_eq!(merged.id, "overlay");
        assert_eq!(merged.main_class.as_deref(), Some("Knot"));
        assert_eq!(merged.asset_index_id.as_deref(), Some("17"));
        assert_eq!(merged.version_type.as_deref(), Some("release"));
    }

    #[test]
    fn test_child_without_arguments_takes_legacy_parent() {
        let child = structured("overlay", &[], &[]);
        let mut parent = structured("base", &[], &[]);
        parent.arguments = LaunchArguments::Legacy("--username ${auth_player_name}".to_string());

        let merged = merge(child, parent);
        assert!(matches!(merged.arguments, LaunchArguments::Legacy(_)));
    }

    #[test]
    fn test_legacy_child_under_structured_parent_uses_parent_arguments() {
        let mut child = structured("overlay", &[], &[]);
        child.arguments = LaunchArguments::Legacy("--tweakClass x".to_string());
        let parent = structured("base", &["j0"], &["g0"]);

        let merged = merge(child, parent);
        assert_eq!(
            merged.arguments,
            LaunchArguments::Structured {
                jvm: vec![ArgEntry::plain("j0")],
                game: vec![ArgEntry::plain("g0")],
            }
        );
    }

    #[test]
    fn test_legacy_child_over_legacy_parent_wins() {
        let mut child = structured("overlay", &[], &[]);
        child.arguments = LaunchArguments::Legacy("--tweakClass x".to_string());
        let mut parent = structured("base", &[], &[]);
        parent.arguments = LaunchArguments::Legacy("--username ${auth_player_name}".to_string());

        let merged = merge(child, parent);
        assert_eq!(merged.arguments, LaunchArguments::Legacy("--tweakClass x".to_string()));
    }

    #[tokio::test]
    async fn test_resolve_from_versions_directory() {
        let temp = TempDir::new().unwrap();
        let versions = temp.path().join("versions");
        std::fs::create_dir_all(versions.join("1.21.1")).unwrap();
        std::fs::create_dir_all(versions.join("fabric")).unwrap();
        std::fs::write(
            versions.join("1.21.1/1.21.1.json"),
            r#"{"id":"1.21.1","mainClass":"Main","assetIndex":{"id":"17"},
                "libraries":[{"name":"c:c:1"}],
                "arguments":{"jvm":["j0"],"game":["g0"]}}"#,
        )
        .unwrap();
        std::fs::write(
            versions.join("fabric/fabric.json"),
            r#"{"id":"fabric","inheritsFrom":"1.21.1","mainClass":"Knot",
                "libraries":[{"name":"a:a:1"}],
                "arguments":{"jvm":["j1"],"game":["g1"]}}"#,
        )
        .unwrap();

        let source = VersionsDirectory::new(temp.path());
        let resolved = resolve("fabric", &source).await.unwrap();
        assert_eq!(names(&resolved.libraries), vec!["a:a:1", "c:c:1"]);
        assert_eq!(resolved.main_class.as_deref(), Some("Knot"));
        assert_eq!(resolved.asset_index_id.as_deref(), Some("17"));
    }

    #[tokio::test]
    async fn test_resolve_missing_parent() {
        let mut child = structured("overlay", &[], &[]);
        child.inherits_from = Some("base".to_string());
        let source = StaticDescriptors::new().with(child);

        let err = resolve("overlay", &source).await.unwrap_err();
        assert!(matches!(err, MetaError::DescriptorMissing { ref id, .. } if id == "base"));
    }

    #[tokio::test]
    async fn test_resolve_corrupt_descriptor() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("versions/bad");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("bad.json"), "{").unwrap();

        let err = resolve("bad", &VersionsDirectory::new(temp.path())).await.unwrap_err();
        assert!(matches!(err, MetaError::DescriptorParse { .. }));
    }
}
