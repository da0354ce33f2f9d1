use std::path::PathBuf;
use std::process::Stdio;

use tracing::{debug, info, instrument};

use crate::errors::{LaunchError, Result};

/// Everything needed to start the game process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl LaunchCommand {
    /// Shell-style rendering for logs, with every `hidden` value masked
    pub fn render_for_log(&self, hidden: &[&str]) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .map(|arg| {
                let masked = hidden
                    .iter()
                    .filter(|secret| !secret.is_empty())
                    .fold(arg, |acc, secret| acc.replace(secret, "***"));
                shell_escape(&masked)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=' | '*' | '+' | '$' | '{' | '}')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}

/// Starts a [`LaunchCommand`] and waits for it to finish
#[async_trait::async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Exit code of the process, `None` if it was terminated by a signal
    async fn run(&self, command: &LaunchCommand) -> Result<Option<i32>>;
}

/// Runs the game as a child process sharing the launcher's stdio
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait::async_trait]
impl ProcessRunner for SystemRunner {
    #[instrument(skip(self, command), fields(program = %command.program.display()))]
    async fn run(&self, command: &LaunchCommand) -> Result<Option<i32>> {
        let mut child = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        debug!("Spawned process {:?}", child.id());
        let status = child.wait().await?;
        info!("Process exited with {}", status);
        Ok(status.code())
    }
}
