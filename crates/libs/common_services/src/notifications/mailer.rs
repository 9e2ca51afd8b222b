use async_trait::async_trait;
use color_eyre::Result;
use common_types::EmailPayload;
use tracing::info;

/// Outbound email delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &EmailPayload) -> Result<()>;
}

/// Writes emails to the log instead of delivering them.
pub struct LogMailer {
    from_address: String,
}

impl LogMailer {
    #[must_use]
    pub fn new(from_address: impl Into<String>) -> Self {
        Self {
            from_address: from_address.into(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &EmailPayload) -> Result<()> {
        info!(
            from = %self.from_address,
            to = %email.recipient,
            subject = %email.subject,
            "📧 {}",
            email.message
        );
        Ok(())
    }
}
