//! Launch resolution: classpath, argument templating and process supervision
//!
//! [`LaunchOrchestrator`] reads an instance's `mcconfig.json`, resolves its
//! version descriptor (merging an overlay onto its base version), builds the
//! classpath and argument vector, then starts the game and waits for it.

pub mod arguments;
pub mod classpath;
pub mod errors;
pub mod hooks;
pub mod java;
pub mod launcher;
pub mod process;

pub use arguments::{LaunchVariables, render, render_legacy, substitute};
pub use classpath::{Classpath, MissingLibrary};
pub use errors::{LaunchError, Result};
pub use hooks::{CaptureGameSettings, PostExitHook};
pub use launcher::{CredentialSource, LaunchOptions, LaunchOrchestrator, PreparedLaunch};
pub use process::{LaunchCommand, ProcessRunner, SystemRunner};
