use crate::transfer::{TransferError, TransferEventSink};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub directory: PathBuf,
    pub force: bool,
    pub continue_partial: bool,
    pub upload_mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub exit_code: i32,
    /// The last lines the transport printed.
    pub details: Vec<String>,
}

impl TransferReport {
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// The remote "upload a run" operation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn upload_run(
        &self,
        request: &TransferRequest,
        sink: &dyn TransferEventSink,
    ) -> Result<TransferReport, TransferError>;
}

/// Runs one transfer attempt per call. Retrying is the caller's business.
#[derive(Clone)]
pub struct TransferDriver {
    transport: Arc<dyn Transport>,
    upload_mode: String,
}

impl TransferDriver {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, upload_mode: impl Into<String>) -> Self {
        Self {
            transport,
            upload_mode: upload_mode.into(),
        }
    }

    pub async fn transfer(
        &self,
        directory: &Path,
        force: bool,
        continue_partial: bool,
        sink: &dyn TransferEventSink,
    ) -> Result<TransferReport, TransferError> {
        let request = TransferRequest {
            directory: directory.to_path_buf(),
            force,
            continue_partial,
            upload_mode: self.upload_mode.clone(),
        };
        info!(
            "Starting transfer of {} (force: {force}, continue: {continue_partial}, mode: {})",
            directory.display(),
            self.upload_mode
        );

        let report = self.transport.upload_run(&request, sink).await?;
        if report.succeeded() {
            info!("Transfer of {} finished", directory.display());
        } else {
            warn!(
                "Transfer of {} exited with code {}",
                directory.display(),
                report.exit_code
            );
        }
        Ok(report)
    }
}
