//! Outbound mail
//!
//! Messages either go to the log (development) or are POSTed as JSON to an
//! HTTP mail API with a bearer key.

use std::time::Duration;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn, debug};
use crate::config::{MailConfig, MailTransport};
use crate::models::user::OtpPurpose;
use crate::utils::errors::{PortalError, Result};
use crate::utils::logging::log_api_error;

/// A plain-text email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Clone)]
#[derive(Debug)]
pub struct Mailer {
    client: Client,
    config: MailConfig,
}

impl Mailer {
    pub fn new(config: MailConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("AlumniPortal/1.0")
            .build()?;

        Ok(Self { client, config })
    }

    pub fn transport(&self) -> MailTransport {
        self.config.transport
    }

    /// Build the message carrying a one-time code
    pub fn otp_message(&self, to: &str, name: &str, purpose: OtpPurpose, code: &str, ttl_minutes: i64) -> MailMessage {
        let (subject, action) = match purpose {
            OtpPurpose::VerifyEmail => ("Verify your email address", "verify your email address"),
            OtpPurpose::ResetPassword => ("Reset your password", "reset your password"),
        };

        let text = format!(
            "Hello {name},\n\nUse the code {code} to {action}. \
             The code expires in {ttl_minutes} minutes.\n\n\
             If you did not request this, you can ignore this email.\n"
        );

        MailMessage {
            from: self.config.from_address.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            text,
        }
    }

    /// Deliver a message with the configured transport
    pub async fn send(&self, message: &MailMessage) -> Result<()> {
        match self.config.transport {
            MailTransport::Log => {
                info!(to = %message.to, subject = %message.subject, body = %message.text, "Mail (log transport)");
                Ok(())
            }
            MailTransport::Http => self.send_http(message).await,
        }
    }

    async fn send_http(&self, message: &MailMessage) -> Result<()> {
        let api_url = self.config.api_url.as_deref().ok_or_else(|| {
            PortalError::Config("mail.api_url is required for the http transport".to_string())
        })?;

        debug!(to = %message.to, url = %api_url, "Sending mail over HTTP");

        let mut request = self.client.post(api_url).json(message);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Mail API request failed");
            PortalError::ServiceUnavailable("mail delivery failed".to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            log_api_error("mail", &status.to_string(), Some(&error_text));
            return Err(PortalError::ServiceUnavailable(format!("mail API returned {status}")));
        }

        info!(to = %message.to, subject = %message.subject, "Mail sent");
        Ok(())
    }
}
