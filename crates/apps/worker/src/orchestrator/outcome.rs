use common_services::database::DbError;
use common_services::manifest::ManifestError;
use common_services::transfer::TransferError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload {0} not found")]
    UploadNotFound(i64),

    #[error("Owner {0} of the upload not found")]
    OwnerNotFound(i32),

    #[error("Upload folder {} does not exist", .0.display())]
    FolderNotFound(PathBuf),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("Transfer exited with code {exit_code}")]
    TransferNonZeroExit { exit_code: i32, details: Vec<String> },

    #[error("Upload exceeded the soft time limit of {}s", .0.as_secs())]
    SoftTimeLimit(Duration),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl UploadError {
    /// Whether running the same upload again later can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::UploadNotFound(_)
                | Self::OwnerNotFound(_)
                | Self::FolderNotFound(_)
                | Self::Manifest(ManifestError::InvalidFileName(_))
        )
    }
}

/// Result of one orchestrator run, before the queue decides what happens next.
#[derive(Debug)]
pub enum UploadOutcome {
    Completed,
    Retryable(UploadError),
    Fatal(UploadError),
}

impl From<Result<(), UploadError>> for UploadOutcome {
    fn from(result: Result<(), UploadError>) -> Self {
        match result {
            Ok(()) => Self::Completed,
            Err(e) if e.is_retryable() => Self::Retryable(e),
            Err(e) => Self::Fatal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_services::irida_client::RemoteError;

    #[test]
    fn classifies_errors() {
        assert!(!UploadError::UploadNotFound(1).is_retryable());
        assert!(
            !UploadError::Manifest(ManifestError::InvalidFileName("x.fastq.gz".to_owned()))
                .is_retryable()
        );
        assert!(
            UploadError::Manifest(ManifestError::Remote(RemoteError::Decode("bad".to_owned())))
                .is_retryable()
        );
        assert!(
            UploadError::TransferNonZeroExit {
                exit_code: 1,
                details: vec![]
            }
            .is_retryable()
        );
        assert!(UploadError::SoftTimeLimit(Duration::from_secs(5)).is_retryable());
    }
}
