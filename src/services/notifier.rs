//! Delivery of generated credentials to account holders.

use async_trait::async_trait;
use tracing::info;

use crate::config::SmtpConfig;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers a freshly generated password. Failures surface to the caller.
    async fn send_credentials(
        &self,
        recipient_name: &str,
        email: &str,
        username: &str,
        password: &str,
    ) -> anyhow::Result<()>;
}

/// Records deliveries in the log. The password itself is never logged.
pub struct LogNotifier {
    relay: Option<String>,
}

impl LogNotifier {
    #[must_use]
    pub fn new(smtp: &SmtpConfig) -> Self {
        Self {
            relay: Some(smtp.host.clone()).filter(|h| !h.is_empty()),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_credentials(
        &self,
        recipient_name: &str,
        email: &str,
        username: &str,
        password: &str,
    ) -> anyhow::Result<()> {
        if email.trim().is_empty() {
            anyhow::bail!("User {username} has no email address");
        }

        info!(
            event = "credentials_delivered",
            recipient = %recipient_name,
            email = %email,
            username = %username,
            password_len = password.len(),
            relay = self.relay.as_deref().unwrap_or("log"),
            "Credentials delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivery_requires_an_address() {
        let notifier = LogNotifier::new(&SmtpConfig::default());
        assert!(
            notifier
                .send_credentials("Doe John", "", "jdoe", "x")
                .await
                .is_err()
        );
        assert!(
            notifier
                .send_credentials("Doe John", "jdoe@example.com", "jdoe", "x")
                .await
                .is_ok()
        );
    }
}
