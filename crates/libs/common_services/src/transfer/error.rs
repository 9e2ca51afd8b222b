use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Failed to start transfer command `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("I/O error during transfer: {0}")]
    Io(#[from] std::io::Error),
}
