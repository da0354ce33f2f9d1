use std::path::PathBuf;

use rc_instance::InstanceError;
use rc_meta::MetaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("'{name}' is a server instance - start it with its own start script")]
    ServerInstance { name: String },

    #[error("Not logged in - run `rauncher login` or pass --offline")]
    NotLoggedIn,

    #[error("Version data for '{id}' not found (expected {})", expected.display())]
    DescriptorMissing { id: String, expected: PathBuf },

    #[error("Version '{id}' declares no main class")]
    MainClassMissing { id: String },

    #[error("Game jar not found at {}", path.display())]
    BaseArtifactMissing { path: PathBuf },

    #[error("Failed to start {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Version metadata error: {0}")]
    Meta(MetaError),

    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MetaError> for LaunchError {
    fn from(err: MetaError) -> Self {
        match err {
            MetaError::DescriptorMissing { id, expected } => Self::DescriptorMissing { id, expected },
            other => Self::Meta(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, LaunchError>;
