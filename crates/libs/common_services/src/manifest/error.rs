use crate::irida_client::RemoteError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    /// A forward read whose reverse mate can't be derived from its name.
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("Manifest {path} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("Could not resolve the remote project: {0}")]
    Remote(#[from] RemoteError),

    #[error("Failed to scan read folder: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("I/O error while handling the manifest: {0}")]
    Io(#[from] std::io::Error),
}
