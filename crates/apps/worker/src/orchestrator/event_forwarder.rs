use common_services::notifications::NotificationEmitter;
use common_services::transfer::{TransferEvent, TransferEventSink, TransferLogLevel};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Turns error lines of a running transfer into notifications as they happen.
///
/// `emit` is called synchronously from the transfer loop, so lines are handed to a
/// background task. Dropping the forwarder stops that task.
pub struct EventForwarder {
    tx: mpsc::UnboundedSender<String>,
    task: Option<JoinHandle<()>>,
}

impl EventForwarder {
    #[must_use]
    pub fn start(emitter: NotificationEmitter, user_id: i32, upload_id: i64) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let task = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                emitter.transfer_error(user_id, upload_id, &line).await;
            }
        });
        Self {
            tx,
            task: Some(task),
        }
    }

    /// Delivers what is still buffered, then stops.
    pub async fn finish(mut self) {
        let task = self.task.take();
        // Closes the channel.
        drop(self);
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Transfer event forwarder ended abnormally: {e}");
            }
        }
    }
}

impl TransferEventSink for EventForwarder {
    fn emit(&self, event: TransferEvent) {
        if event.level == TransferLogLevel::Error && self.tx.send(event.message).is_err() {
            warn!("Transfer error line dropped, forwarder already stopped");
        }
    }
}

impl Drop for EventForwarder {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
