use anyhow::Context;
use lettre::{
    transport::smtp::{authentication::Credentials, Error as SmtpError},
    Message, SmtpTransport, Transport,
};
use log::debug;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum SendError {
    /// Usually a wrong address or app password in the config
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("invalid email address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

impl SendError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, SendError::Authentication(_))
    }
}

/// Hands a finished message to the outside world
pub trait Delivery {
    fn deliver(&self, message: &Message) -> Result<(), SendError>;
}

/// Authenticated STARTTLS session to the configured relay
pub fn smtp_transport(config: &Config) -> anyhow::Result<SmtpTransport> {
    debug!(
        "Setting up SMTP relay {}:{} for {}",
        config.smtp_host, config.smtp_port, config.email_address
    );
    let transport = SmtpTransport::starttls_relay(&config.smtp_host)
        .with_context(|| format!("Failed to set up relay to {:?}", config.smtp_host))?
        .port(config.smtp_port)
        .credentials(Credentials::new(
            config.email_address.clone(),
            config.smtp_password(),
        ))
        .build();
    Ok(transport)
}

impl Delivery for SmtpTransport {
    fn deliver(&self, message: &Message) -> Result<(), SendError> {
        self.send(message).map(|_| ()).map_err(classify)
    }
}

fn classify(err: SmtpError) -> SendError {
    if is_authentication_failure(&err) {
        SendError::Authentication(err.to_string())
    } else {
        SendError::Delivery(err.to_string())
    }
}

/// 530/534/535 replies, or the client giving up on every auth mechanism
fn is_authentication_failure(err: &SmtpError) -> bool {
    let by_code = err
        .status()
        .map(|code| matches!(code.to_string().as_str(), "530" | "534" | "535"))
        .unwrap_or(false);
    by_code || (err.is_client() && err.to_string().to_lowercase().contains("authentication"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_is_distinct() {
        let auth = SendError::Authentication("535 5.7.8 Username and Password not accepted".into());
        let other = SendError::Delivery("connection reset".into());
        assert!(auth.is_authentication());
        assert!(!other.is_authentication());
        assert!(auth.to_string().starts_with("authentication failed"));
    }

    #[test]
    fn relay_builds_from_config() {
        let config = crate::config::tests::sample_config();
        assert!(smtp_transport(&config).is_ok());
    }
}
