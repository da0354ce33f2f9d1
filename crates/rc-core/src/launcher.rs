use std::path::Path;

use rc_auth::{Credential, CredentialStore, SessionManager};
use rc_instance::{InstanceLayout, InstanceRecord, JavaConfig, LauncherSettings, game_settings};
use rc_meta::{
    DescriptorSource, LaunchArguments, MetaError, OsName, RuntimeDescriptor, VersionsDirectory,
};
use tracing::{debug, info, instrument, warn};

use crate::arguments::{self, LaunchVariables};
use crate::classpath::Classpath;
use crate::errors::{LaunchError, Result};
use crate::hooks::{CaptureGameSettings, PostExitHook};
use crate::java;
use crate::process::{LaunchCommand, ProcessRunner};

pub const LAUNCHER_NAME: &str = "rauncher";
pub const OFFLINE_PLAYER: &str = "Player";

const G1_FLAGS: &[&str] = &[
    "-XX:+UnlockExperimentalVMOptions",
    "-XX:+UseG1GC",
    "-XX:G1NewSizePercent=20",
    "-XX:G1ReservePercent=20",
    "-XX:MaxGCPauseMillis=50",
    "-XX:G1HeapRegionSize=32M",
];

/// Supplies the credential to launch with
#[async_trait::async_trait]
pub trait CredentialSource: Send + Sync {
    /// A currently valid credential, or `None` when the user must log in
    async fn current_credential(&self) -> Option<Credential>;
}

#[async_trait::async_trait]
impl<S: CredentialStore> CredentialSource for SessionManager<S> {
    async fn current_credential(&self) -> Option<Credential> {
        self.current_valid().await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Launch with the offline placeholder identity
    pub offline: bool,
}

/// A fully resolved launch that has not been started yet
#[derive(Debug, Clone)]
pub struct PreparedLaunch {
    pub record: InstanceRecord,
    pub credential: Credential,
    pub descriptor_id: String,
    pub command: LaunchCommand,
    pub missing_libraries: usize,
}

impl PreparedLaunch {
    /// Command line for logs, with the access token masked
    pub fn command_line(&self) -> String {
        self.command.render_for_log(&[&self.credential.access_token])
    }
}

/// Turns an installed instance into a running game process
pub struct LaunchOrchestrator<R> {
    settings: LauncherSettings,
    runner: R,
    hooks: Vec<Box<dyn PostExitHook>>,
    os: OsName,
}

impl<R: ProcessRunner> LaunchOrchestrator<R> {
    /// The settings-capture hook is installed when `auto_capture_settings` is on
    pub fn new(settings: LauncherSettings, runner: R) -> Self {
        let mut hooks: Vec<Box<dyn PostExitHook>> = Vec::new();
        if settings.auto_capture_settings {
            hooks.push(Box::new(CaptureGameSettings::default()));
        }
        Self {
            settings,
            runner,
            hooks,
            os: OsName::current(),
        }
    }

    pub fn with_hook(mut self, hook: impl PostExitHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn with_os(mut self, os: OsName) -> Self {
        self.os = os;
        self
    }

    pub fn settings(&self) -> &LauncherSettings {
        &self.settings
    }

    /// Resolve everything needed to start the instance without starting it
    #[instrument(skip(self, credentials))]
    pub async fn prepare(
        &self,
        instance_dir: &Path,
        credentials: &dyn CredentialSource,
        options: LaunchOptions,
    ) -> Result<PreparedLaunch> {
        let record = InstanceRecord::load(instance_dir).await?;
        if record.is_server() {
            return Err(LaunchError::ServerInstance { name: record.name });
        }

        let credential = if options.offline {
            info!("Launching in offline mode");
            Credential::offline(OFFLINE_PLAYER)
        } else {
            credentials
                .current_credential()
                .await
                .ok_or(LaunchError::NotLoggedIn)?
        };

        let layout = InstanceLayout::new(instance_dir);
        let versions = VersionsDirectory::new(instance_dir);
        let descriptor = resolve_descriptor(&record, &versions).await?;
        let main_class = descriptor
            .main_class
            .clone()
            .ok_or_else(|| LaunchError::MainClassMissing { id: descriptor.id.clone() })?;

        let game_jar = versions.jar_path(&record.minecraft_version);
        if !game_jar.is_file() {
            return Err(LaunchError::BaseArtifactMissing { path: game_jar });
        }

        let mut classpath = Classpath::build(&layout.libraries_dir(), &descriptor, self.os);
        classpath.push(game_jar);
        let missing_libraries = classpath.missing().len();
        if missing_libraries > 0 {
            warn!("{} libraries are missing; the game may fail to start", missing_libraries);
        }

        let natives_dir = layout.natives_dir();
        tokio::fs::create_dir_all(&natives_dir).await?;

        let classpath_string = classpath.joined(self.os);
        let variables = self.variables(&record, &descriptor, &credential, &layout, &classpath_string);

        let java_config = self.settings.java();
        let heap_defaults = JavaConfig::default();
        let mut args = vec![
            format!("-Djava.library.path={}", natives_dir.to_string_lossy()),
            heap_flag("-Xmx", java_config.max_memory, heap_defaults.max_memory),
            heap_flag("-Xms", java_config.min_memory, heap_defaults.min_memory),
        ];
        args.extend(G1_FLAGS.iter().map(|flag| flag.to_string()));
        args.extend(java_config.arguments.split_whitespace().map(str::to_string));

        let game_args = match &descriptor.arguments {
            LaunchArguments::Structured { jvm, game } => {
                args.extend(arguments::strip_managed_jvm_args(arguments::render(
                    jvm, &variables, self.os,
                )));
                arguments::render(game, &variables, self.os)
            }
            LaunchArguments::Legacy(line) => arguments::render_legacy(line, &variables),
        };

        args.push("-cp".to_string());
        args.push(classpath_string);
        args.push(main_class);
        args.extend(game_args);

        let command = LaunchCommand {
            program: java::find_java(Some(java_config.path.as_str())),
            args,
            working_dir: instance_dir.to_path_buf(),
        };

        Ok(PreparedLaunch {
            descriptor_id: descriptor.id.clone(),
            record,
            credential,
            command,
            missing_libraries,
        })
    }

    /// Prepare, start the game, wait for it and run the post-exit hooks.
    ///
    /// Returns the game's exit code.
    #[instrument(skip(self, credentials))]
    pub async fn launch(
        &self,
        instance_dir: &Path,
        credentials: &dyn CredentialSource,
        options: LaunchOptions,
    ) -> Result<Option<i32>> {
        let prepared = self.prepare(instance_dir, credentials, options).await?;
        self.run(instance_dir, &prepared).await
    }

    /// Start an already prepared launch
    pub async fn run(&self, instance_dir: &Path, prepared: &PreparedLaunch) -> Result<Option<i32>> {
        if self.settings.auto_apply_settings {
            match game_settings::apply(instance_dir, &prepared.record).await {
                Ok(0) => {}
                Ok(count) => debug!("Applied {} saved game settings to options.txt", count),
                Err(e) => warn!("Could not apply saved game settings: {}", e),
            }
        }

        info!(
            "Launching '{}' ({}) as {}",
            prepared.record.name, prepared.descriptor_id, prepared.credential.display_name
        );
        debug!("Command: {}", prepared.command_line());

        let exit_code = self.runner.run(&prepared.command).await?;

        for hook in &self.hooks {
            hook.after_exit(instance_dir, exit_code).await;
        }
        Ok(exit_code)
    }

    fn variables(
        &self,
        record: &InstanceRecord,
        descriptor: &RuntimeDescriptor,
        credential: &Credential,
        layout: &InstanceLayout,
        classpath: &str,
    ) -> LaunchVariables {
        let window = self.settings.window();
        let mut vars = LaunchVariables::new();
        vars.set("auth_player_name", credential.display_name.as_str())
            .set("auth_uuid", credential.identity.as_str())
            .set("auth_access_token", credential.access_token.as_str())
            .set("auth_xuid", "")
            .set("user_type", "msa")
            .set("clientid", "")
            .set("user_properties", "{}")
            .set("version_name", record.descriptor_id())
            .set(
                "version_type",
                descriptor.version_type.as_deref().unwrap_or("release"),
            )
            .set_path("game_directory", layout.root())
            .set_path("assets_root", &layout.assets_dir())
            .set(
                "assets_index_name",
                descriptor
                    .asset_index_id
                    .as_deref()
                    .unwrap_or(&record.minecraft_version),
            )
            .set_path("natives_directory", &layout.natives_dir())
            .set_path("library_directory", &layout.libraries_dir())
            .set("launcher_name", LAUNCHER_NAME)
            .set("launcher_version", env!("CARGO_PKG_VERSION"))
            .set("classpath", classpath)
            .set("classpath_separator", self.os.classpath_separator())
            .set("resolution_width", window.width.to_string())
            .set("resolution_height", window.height.to_string());
        vars
    }
}

/// The recorded descriptor, or the base version when no overlay is installed
async fn resolve_descriptor(
    record: &InstanceRecord,
    source: &dyn DescriptorSource,
) -> Result<RuntimeDescriptor> {
    let id = record.descriptor_id();
    match rc_meta::resolve(id, source).await {
        Ok(descriptor) => Ok(descriptor),
        Err(MetaError::DescriptorMissing { id: missing, expected })
            if missing == id && id != record.minecraft_version =>
        {
            warn!("No descriptor for '{}', falling back to '{}'", id, record.minecraft_version);
            rc_meta::resolve(&record.minecraft_version, source)
                .await
                .map_err(|e| match e {
                    MetaError::DescriptorMissing { .. } => LaunchError::DescriptorMissing {
                        id: id.to_string(),
                        expected,
                    },
                    other => other.into(),
                })
        }
        Err(e) => Err(e.into()),
    }
}

/// An unset (zero) heap size falls back to `default`
fn heap_flag(flag: &str, mebibytes: u64, default: u64) -> String {
    let mebibytes = if mebibytes == 0 { default } else { mebibytes };
    if mebibytes > 0 && mebibytes % 1024 == 0 {
        format!("{flag}{}G", mebibytes / 1024)
    } else {
        format!("{flag}{mebibytes}M")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use chrono::Utc;
    use rc_instance::InstanceKind;
    use tempfile::{TempDir, tempdir};

    #[derive(Clone, Default)]
    struct RecordingRunner {
        runs: Arc<Mutex<Vec<LaunchCommand>>>,
    }

    #[async_trait::async_trait]
    impl ProcessRunner for RecordingRunner {
        async fn run(&self, command: &LaunchCommand) -> Result<Option<i32>> {
            self.runs.lock().unwrap().push(command.clone());
            Ok(Some(0))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingHook {
        exits: Arc<Mutex<Vec<Option<i32>>>>,
    }

    #[async_trait::async_trait]
    impl PostExitHook for RecordingHook {
        async fn after_exit(&self, _instance_dir: &Path, exit_code: Option<i32>) {
            self.exits.lock().unwrap().push(exit_code);
        }
    }

    struct FixedCredential(Option<Credential>);

    #[async_trait::async_trait]
    impl CredentialSource for FixedCredential {
        async fn current_credential(&self) -> Option<Credential> {
            self.0.clone()
        }
    }

    fn steve() -> FixedCredential {
        FixedCredential(Some(Credential {
            identity: "069a79f444e94726a5befca90e38aaf5".to_string(),
            display_name: "Steve".to_string(),
            access_token: "mc-access-token".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Utc::now().timestamp_millis() + 3_600_000,
            authenticated_at: Utc::now(),
            refreshed_at: None,
        }))
    }

    fn quiet_settings() -> LauncherSettings {
        LauncherSettings {
            auto_capture_settings: false,
            auto_apply_settings: false,
            ..LauncherSettings::default()
        }
    }

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    /// Fabric overlay on 1.21.1 with one library from each descriptor on disk
    async fn fabric_instance() -> TempDir {
        let dir = tempdir().unwrap();
        let root = dir.path();

        let mut record = InstanceRecord::new("Fabric Pack", "1.21.1");
        record.version_id = Some("fabric-loader-0.16.9-1.21.1".to_string());
        record.save(root).await.unwrap();

        write(
            root,
            "versions/1.21.1/1.21.1.json",
            r#"{
                "id": "1.21.1",
                "type": "release",
                "mainClass": "net.minecraft.client.main.Main",
                "assetIndex": {"id": "17"},
                "arguments": {
                    "game": ["--username", "${auth_player_name}", "--assetIndex", "${assets_index_name}"],
                    "jvm": [
                        {"rules": [{"action": "allow", "os": {"name": "osx"}}], "value": ["-XstartOnFirstThread"]},
                        "-Djava.library.path=${natives_directory}",
                        "-cp",
                        "${classpath}"
                    ]
                },
                "libraries": [
                    {"name": "org.lwjgl:lwjgl:3.3.3", "downloads": {"artifact": {"path": "org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3.jar", "url": "https://libraries.minecraft.net/org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3.jar"}}}
                ]
            }"#,
        );
        write(root, "versions/1.21.1/1.21.1.jar", "jar");
        write(
            root,
            "versions/fabric-loader-0.16.9-1.21.1/fabric-loader-0.16.9-1.21.1.json",
            r#"{
                "id": "fabric-loader-0.16.9-1.21.1",
                "inheritsFrom": "1.21.1",
                "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
                "arguments": {"game": [], "jvm": ["-DFabricMcEmu= net.minecraft.client.main.Main "]},
                "libraries": [{"name": "net.fabricmc:fabric-loader:0.16.9", "url": "https://maven.fabricmc.net/"}]
            }"#,
        );
        write(root, "libraries/org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3.jar", "jar");
        write(
            root,
            "libraries/net/fabricmc/fabric-loader/0.16.9/fabric-loader-0.16.9.jar",
            "jar",
        );
        dir
    }

    #[tokio::test]
    async fn test_prepare_orders_arguments() {
        let dir = fabric_instance().await;
        let root = dir.path();
        let orchestrator = LaunchOrchestrator::new(quiet_settings(), RecordingRunner::default())
            .with_os(OsName::Linux);

        let prepared = orchestrator
            .prepare(root, &steve(), LaunchOptions::default())
            .await
            .unwrap();
        let args = &prepared.command.args;

        assert_eq!(prepared.descriptor_id, "fabric-loader-0.16.9-1.21.1");
        assert_eq!(prepared.command.working_dir, root);
        assert_eq!(args[0], format!("-Djava.library.path={}", root.join("natives").display()));
        assert_eq!(args[1], "-Xmx2G");
        assert_eq!(args[2], "-Xms512M");
        assert_eq!(&args[3..9], G1_FLAGS);
        assert_eq!(args[9], "-DFabricMcEmu= net.minecraft.client.main.Main ");
        assert_eq!(args.iter().filter(|a| a.starts_with("-Djava.library.path")).count(), 1);
        assert!(!args.iter().any(|a| a == "-XstartOnFirstThread"));

        let cp = args.iter().position(|a| a == "-cp").unwrap();
        assert_eq!(args.iter().filter(|a| *a == "-cp").count(), 1);
        let entries: Vec<&str> = args[cp + 1].split(':').collect();
        assert!(entries[0].ends_with("fabric-loader-0.16.9.jar"));
        assert!(entries[1].ends_with("lwjgl-3.3.3.jar"));
        assert!(entries[2].ends_with("versions/1.21.1/1.21.1.jar"));

        assert_eq!(args[cp + 2], "net.fabricmc.loader.impl.launch.knot.KnotClient");
        assert_eq!(&args[cp + 3..], ["--username", "Steve", "--assetIndex", "17"]);
        assert!(root.join("natives").is_dir());
        assert!(!prepared.command_line().contains("mc-access-token"));
    }

    #[tokio::test]
    async fn test_launch_runs_process_once() {
        let dir = fabric_instance().await;
        let runner = RecordingRunner::default();
        let orchestrator = LaunchOrchestrator::new(quiet_settings(), runner.clone());

        let code = orchestrator
            .launch(dir.path(), &steve(), LaunchOptions::default())
            .await
            .unwrap();

        assert_eq!(code, Some(0));
        assert_eq!(runner.runs.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_extra_hook_sees_exit_code() {
        let dir = fabric_instance().await;
        let hook = RecordingHook::default();
        let orchestrator = LaunchOrchestrator::new(quiet_settings(), RecordingRunner::default())
            .with_hook(hook.clone());

        orchestrator
            .launch(dir.path(), &steve(), LaunchOptions::default())
            .await
            .unwrap();
        assert_eq!(*hook.exits.lock().unwrap(), vec![Some(0)]);

        std::fs::remove_file(dir.path().join("versions/1.21.1/1.21.1.jar")).unwrap();
        assert!(
            orchestrator
                .launch(dir.path(), &steve(), LaunchOptions::default())
                .await
                .is_err()
        );
        assert_eq!(hook.exits.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_heap_settings_use_defaults() {
        let dir = fabric_instance().await;
        let settings = LauncherSettings {
            java: Some(JavaConfig {
                min_memory: 0,
                max_memory: 0,
                ..JavaConfig::default()
            }),
            ..quiet_settings()
        };
        let orchestrator = LaunchOrchestrator::new(settings, RecordingRunner::default());

        let prepared = orchestrator
            .prepare(dir.path(), &steve(), LaunchOptions::default())
            .await
            .unwrap();
        assert_eq!(prepared.command.args[1], "-Xmx2G");
        assert_eq!(prepared.command.args[2], "-Xms512M");
    }

    #[tokio::test]
    async fn test_server_instance_is_rejected_before_spawn() {
        let dir = fabric_instance().await;
        let mut record = InstanceRecord::load(dir.path()).await.unwrap();
        record.kind = InstanceKind::Server;
        record.save(dir.path()).await.unwrap();

        let runner = RecordingRunner::default();
        let orchestrator = LaunchOrchestrator::new(quiet_settings(), runner.clone());
        for offline in [false, true] {
            let err = orchestrator
                .launch(dir.path(), &FixedCredential(None), LaunchOptions { offline })
                .await
                .unwrap_err();
            assert!(matches!(err, LaunchError::ServerInstance { .. }));
        }
        assert!(runner.runs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_not_logged_in_and_offline_placeholder() {
        let dir = fabric_instance().await;
        let orchestrator = LaunchOrchestrator::new(quiet_settings(), RecordingRunner::default());

        let err = orchestrator
            .prepare(dir.path(), &FixedCredential(None), LaunchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchError::NotLoggedIn));

        let prepared = orchestrator
            .prepare(dir.path(), &FixedCredential(None), LaunchOptions { offline: true })
            .await
            .unwrap();
        assert_eq!(prepared.credential.display_name, OFFLINE_PLAYER);
        assert!(prepared.command.args.iter().any(|a| a == "Player"));
    }

    #[tokio::test]
    async fn test_falls_back_to_base_descriptor() {
        let dir = fabric_instance().await;
        std::fs::remove_dir_all(dir.path().join("versions/fabric-loader-0.16.9-1.21.1")).unwrap();
        let orchestrator = LaunchOrchestrator::new(quiet_settings(), RecordingRunner::default());

        let prepared = orchestrator
            .prepare(dir.path(), &steve(), LaunchOptions::default())
            .await
            .unwrap();
        assert_eq!(prepared.descriptor_id, "1.21.1");
        assert!(prepared.command.args.iter().any(|a| a == "net.minecraft.client.main.Main"));
    }

    #[tokio::test]
    async fn test_descriptor_missing() {
        let dir = fabric_instance().await;
        std::fs::remove_dir_all(dir.path().join("versions")).unwrap();
        let orchestrator = LaunchOrchestrator::new(quiet_settings(), RecordingRunner::default());

        let err = orchestrator
            .prepare(dir.path(), &steve(), LaunchOptions::default())
            .await
            .unwrap_err();
        match err {
            LaunchError::DescriptorMissing { id, expected } => {
                assert_eq!(id, "fabric-loader-0.16.9-1.21.1");
                assert!(expected.ends_with("fabric-loader-0.16.9-1.21.1.json"));
            }
            other => panic!("Expected DescriptorMissing, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_base_artifact_missing() {
        let dir = fabric_instance().await;
        std::fs::remove_file(dir.path().join("versions/1.21.1/1.21.1.jar")).unwrap();
        let runner = RecordingRunner::default();
        let orchestrator = LaunchOrchestrator::new(quiet_settings(), runner.clone());

        let err = orchestrator
            .launch(dir.path(), &steve(), LaunchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchError::BaseArtifactMissing { .. }));
        assert!(runner.runs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_settings_applied_and_captured_around_run() {
        let dir = fabric_instance().await;
        let mut record = InstanceRecord::load(dir.path()).await.unwrap();
        record
            .game_settings
            .insert("renderDistance".to_string(), serde_json::json!(16));
        record.save(dir.path()).await.unwrap();

        let settings = LauncherSettings {
            java: Some(JavaConfig {
                max_memory: 3000,
                ..JavaConfig::default()
            }),
            ..LauncherSettings::default()
        };
        let runner = RecordingRunner::default();
        let orchestrator = LaunchOrchestrator::new(settings, runner.clone());

        orchestrator
            .launch(dir.path(), &steve(), LaunchOptions::default())
            .await
            .unwrap();

        let options = std::fs::read_to_string(dir.path().join("options.txt")).unwrap();
        assert!(options.contains("renderDistance:16"));
        assert!(runner.runs.lock().unwrap()[0].args.contains(&"-Xmx3000M".to_string()));

        let captured = InstanceRecord::load(dir.path()).await.unwrap();
        assert_eq!(captured.game_settings["renderDistance"], serde_json::json!(16));
    }

    #[test]
    fn test_heap_flag() {
        assert_eq!(heap_flag("-Xmx", 2048, 1024), "-Xmx2G");
        assert_eq!(heap_flag("-Xms", 512, 1024), "-Xms512M");
        assert_eq!(heap_flag("-Xmx", 0, 2048), "-Xmx2G");
        assert_eq!(heap_flag("-Xms", 0, 512), "-Xms512M");
    }
}
