pub mod config;
mod errors;
pub mod game_settings;
mod instance;

pub use config::{JavaConfig, LauncherSettings, WindowConfig};
pub use errors::{InstanceError, Result};
pub use instance::{INSTANCE_FILE, InstanceKind, InstanceLayout, InstanceRecord};
