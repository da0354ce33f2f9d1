use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetaError {
    #[error("Version descriptor '{id}' not found (expected {expected})")]
    DescriptorMissing { id: String, expected: PathBuf },

    #[error("Failed to read descriptor '{path}': {source}")]
    DescriptorRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse descriptor '{path}': {source}")]
    DescriptorParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, MetaError>;
