//! Outbound email delivery for the usher check-in platform.
//!
//! Sends each attendee their credential after registration, with the
//! rendered QR badge attached. Delivery is strictly best-effort: a failed
//! send never affects the registration itself.

use std::fmt;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use thiserror::Error;

use usher_core::credential::Credential;

/// Default request timeout for mail API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAIL_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Mail client errors.
#[derive(Debug, Error)]
pub enum MailError {
    /// The provided API key was invalid.
    #[error("invalid API key: {reason}")]
    InvalidApiKey { reason: &'static str },
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The mail API rejected the request.
    #[error("mail API error ({status}): {body}")]
    Api { status: u16, body: String },
}

/// Mail API client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
pub struct Mailer {
    http: reqwest::Client,
    api_key: String,
    from: String,
}

impl fmt::Debug for Mailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailer")
            .field("api_key", &"[REDACTED]")
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct MailRequest {
    personalizations: Vec<Personalization>,
    from: Address,
    subject: String,
    content: Vec<Content>,
    attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
struct Personalization {
    to: Vec<Address>,
}

#[derive(Debug, Serialize)]
struct Address {
    email: String,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: String,
}

#[derive(Debug, Serialize)]
struct Attachment {
    content: String,
    filename: String,
    #[serde(rename = "type")]
    content_type: &'static str,
    disposition: &'static str,
}

impl Mailer {
    /// Creates a new mail client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or whitespace-only, or if
    /// the HTTP client fails to build.
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Result<Self, MailError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(MailError::InvalidApiKey {
                reason: "API key cannot be empty",
            });
        }
        if api_key.trim().is_empty() {
            return Err(MailError::InvalidApiKey {
                reason: "API key cannot be whitespace-only",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(MailError::ClientBuild)?;

        Ok(Self {
            http,
            api_key,
            from: from.into(),
        })
    }

    /// Emails an attendee their credential with the badge PNG attached.
    pub async fn send_credential(
        &self,
        to: &str,
        attendee_name: &str,
        event_title: &str,
        credential: &Credential,
        badge_png: &[u8],
    ) -> Result<(), MailError> {
        let request = credential_mail(&self.from, to, attendee_name, event_title, credential, badge_png);

        let response = self
            .http
            .post(MAIL_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                body,
            });
        }
        tracing::info!(to, event = event_title, "credential email sent");
        Ok(())
    }
}

fn credential_mail(
    from: &str,
    to: &str,
    attendee_name: &str,
    event_title: &str,
    credential: &Credential,
    badge_png: &[u8],
) -> MailRequest {
    let html = format!(
        "<p>Hi {attendee_name},</p>\
         <p>You are registered for <strong>{event_title}</strong>. \
         Present the attached QR code at the entrance to check in.</p>\
         <p>If the image does not load, your credential is: <code>{credential}</code></p>"
    );
    MailRequest {
        personalizations: vec![Personalization {
            to: vec![Address {
                email: to.to_string(),
            }],
        }],
        from: Address {
            email: from.to_string(),
        },
        subject: format!("Your ticket for {event_title}"),
        content: vec![Content {
            content_type: "text/html",
            value: html,
        }],
        attachments: vec![Attachment {
            content: BASE64.encode(badge_png),
            filename: "ticket-qr.png".to_string(),
            content_type: "image/png",
            disposition: "attachment",
        }],
    }
}
