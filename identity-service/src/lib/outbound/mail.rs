use async_trait::async_trait;

use crate::domain::errors::AuthError;
use crate::domain::reset_password::ports::MailSender;

/// Mail sender that writes the message to the log instead of delivering it.
///
/// Stands in for a real transport in development and in the CLI, where the
/// operator copies the link from the output.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMailSender;

#[async_trait]
impl MailSender for LoggingMailSender {
    async fn send_reset_password_email(&self, to: &str, link: &str) -> Result<(), AuthError> {
        tracing::info!(to = %to, link = %link, "Reset password email");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logging_sender_never_fails() {
        let sender = LoggingMailSender;
        assert!(sender
            .send_reset_password_email("alice@example.com", "https://example.com/reset?token=x")
            .await
            .is_ok());
    }
}
