use std::path::Path;

use rc_instance::InstanceError;
use rc_instance::game_settings::{self, DEFAULT_IGNORED};
use tracing::{debug, info, warn};

/// Runs after the game process has exited.
///
/// Hooks cannot fail the launch; problems are logged.
#[async_trait::async_trait]
pub trait PostExitHook: Send + Sync {
    async fn after_exit(&self, instance_dir: &Path, exit_code: Option<i32>);
}

/// Copies `options.txt` back into `mcconfig.json`
#[derive(Debug, Clone)]
pub struct CaptureGameSettings {
    ignore: Vec<String>,
}

impl Default for CaptureGameSettings {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORED.iter().map(|s| s.to_string()).collect())
    }
}

impl CaptureGameSettings {
    pub fn new(ignore: Vec<String>) -> Self {
        Self { ignore }
    }
}

#[async_trait::async_trait]
impl PostExitHook for CaptureGameSettings {
    async fn after_exit(&self, instance_dir: &Path, _exit_code: Option<i32>) {
        let ignore: Vec<&str> = self.ignore.iter().map(String::as_str).collect();
        match game_settings::capture(instance_dir, &ignore).await {
            Ok(0) => debug!("No game settings to capture"),
            Ok(count) => info!("Saved {} game settings to mcconfig.json", count),
            Err(InstanceError::OptionsFileNotFound { .. }) => {
                debug!("Game wrote no options.txt, nothing captured")
            }
            Err(e) => warn!("Could not capture game settings: {}", e),
        }
    }
}
