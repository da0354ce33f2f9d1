use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("No mcconfig.json found in '{path}' - run inside an instance directory or pass --instance")]
    InstanceFileNotFound { path: PathBuf },

    #[error("Failed to read instance file '{path}': {source}")]
    InstanceFileReadFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to write instance file '{path}': {source}")]
    InstanceFileWriteFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to parse instance file '{path}': {source}")]
    InstanceParsingFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to write settings file '{path}': {source}")]
    SettingsWriteFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("No options.txt in '{path}' - launch the game once to create it")]
    OptionsFileNotFound { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, InstanceError>;
