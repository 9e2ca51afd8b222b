use crate::database::DbError;
use color_eyre::eyre;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadApiError {
    #[error("Folder name is required.")]
    MissingFolderName,

    #[error("Folder name {0} points outside the upload folder.")]
    InvalidFolderName(String),

    #[error("Selected folder {0} does not exist.")]
    FolderNotFound(String),

    #[error("User {0} not found.")]
    UserNotFound(i32),

    #[error("Upload {0} not found.")]
    UploadNotFound(i64),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("An internal error occurred.")]
    Internal(#[from] eyre::Report),
}

impl From<std::io::Error> for UploadApiError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(eyre::Report::new(err))
    }
}
