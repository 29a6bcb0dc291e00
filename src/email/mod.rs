//! Outbound transactional email
//!
//! Sends the password-reset link through the MailerSend HTTP API. Delivery
//! is an external collaborator: a failed send surfaces as a gateway error,
//! never as a silent success.

use serde_json::json;
use thiserror::Error;

use crate::config::Config;
use crate::error::ApiError;

const MAILERSEND_ENDPOINT: &str = "https://api.mailersend.com/v1/email";

/// Email delivery errors
#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Email is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Email provider rejected the message: {0}")]
    SendFailed(String),

    #[error("Email request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<EmailError> for ApiError {
    fn from(e: EmailError) -> Self {
        match e {
            EmailError::NotConfigured(what) => {
                ApiError::InternalError(format!("Email is not configured: {}", what))
            }
            EmailError::SendFailed(_) | EmailError::Http(_) => {
                ApiError::ExternalServiceError("Failed to send reset email".to_string())
            }
        }
    }
}

/// MailerSend-backed mailer
pub struct Mailer {
    http: reqwest::Client,
    api_key: Option<String>,
    from: Option<String>,
    from_name: String,
    reset_url: Option<String>,
    reset_ttl_minutes: i64,
}

impl Mailer {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.mailersend_api_key.clone(),
            from: config.email_from.clone(),
            from_name: config
                .email_from_name
                .clone()
                .unwrap_or_else(|| "Support".to_string()),
            reset_url: config.frontend_reset_url.clone(),
            reset_ttl_minutes: config.reset_token_ttl_minutes,
        }
    }

    /// Send the password-reset link for `reset_token` to `to_email`.
    pub async fn send_password_reset(
        &self,
        to_email: &str,
        reset_token: &str,
    ) -> Result<(), EmailError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(EmailError::NotConfigured("MAILERSEND_API_KEY"))?;
        let from = self
            .from
            .as_deref()
            .ok_or(EmailError::NotConfigured("EMAIL_FROM"))?;

        let reset_link = self.build_reset_link(reset_token)?;

        let text_body = format!(
            "You requested a password reset.\n\n\
             Use this link to reset your password: {}\n\n\
             This link expires in {} minutes.",
            reset_link, self.reset_ttl_minutes
        );
        let html_body = format!(
            "<p>You requested a password reset.</p>\
             <p><a href=\"{}\">Reset your password</a></p>\
             <p>This link expires in {} minutes.</p>",
            reset_link, self.reset_ttl_minutes
        );

        let body = json!({
            "from": { "email": from, "name": self.from_name },
            "to": [ { "email": to_email } ],
            "subject": "Reset your password",
            "text": text_body,
            "html": html_body,
        });

        let response = self
            .http
            .post(MAILERSEND_ENDPOINT)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if response.status().is_client_error() || response.status().is_server_error() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, detail = %detail, "MailerSend rejected reset email");
            return Err(EmailError::SendFailed(status.to_string()));
        }

        tracing::info!("Password reset email queued");
        Ok(())
    }

    fn build_reset_link(&self, token: &str) -> Result<String, EmailError> {
        let base = self
            .reset_url
            .as_deref()
            .ok_or(EmailError::NotConfigured("FRONTEND_RESET_URL"))?;
        let separator = if base.contains('?') { '&' } else { '?' };
        Ok(format!("{}{}token={}", base, separator, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer_with_url(url: Option<&str>) -> Mailer {
        Mailer {
            http: reqwest::Client::new(),
            api_key: Some("key".to_string()),
            from: Some("noreply@x.com".to_string()),
            from_name: "Support".to_string(),
            reset_url: url.map(|s| s.to_string()),
            reset_ttl_minutes: 30,
        }
    }

    #[test]
    fn test_reset_link_separator() {
        let plain = mailer_with_url(Some("https://app.x.com/reset"));
        assert_eq!(
            plain.build_reset_link("tok").unwrap(),
            "https://app.x.com/reset?token=tok"
        );

        let with_query = mailer_with_url(Some("https://app.x.com/reset?lang=en"));
        assert_eq!(
            with_query.build_reset_link("tok").unwrap(),
            "https://app.x.com/reset?lang=en&token=tok"
        );
    }

    #[test]
    fn test_unconfigured_reset_url() {
        let mailer = mailer_with_url(None);
        assert!(matches!(
            mailer.build_reset_link("tok"),
            Err(EmailError::NotConfigured("FRONTEND_RESET_URL"))
        ));
    }
}
