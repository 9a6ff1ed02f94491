//! Credential generation and QR badge rendering.
//!
//! A credential is an opaque unique string identifying one registration
//! within one event. Global uniqueness is enforced by the storage layer's
//! unique index; generation only has to make collisions negligible.

use std::fmt;
use std::io::Cursor;

use chrono::Utc;
use image::{ImageFormat, Luma};
use qrcode::QrCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::{EventId, ValidationError};

/// Default badge side length in pixels.
pub const DEFAULT_BADGE_SIZE: u32 = 200;

/// Length of the random suffix appended to generated credentials.
const SUFFIX_LEN: usize = 9;

/// Badge rendering errors.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The credential does not fit in a QR code.
    #[error("credential cannot be QR-encoded: {0}")]
    Qr(#[from] qrcode::types::QrError),
    /// PNG encoding failed.
    #[error("failed to encode badge PNG: {0}")]
    Png(#[from] image::ImageError),
}

/// An opaque unique string identifying one registration within one event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Credential(String);

impl Credential {
    /// Creates a credential from an existing string (e.g. a decoded scan).
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::Empty {
                field: "credential",
            });
        }
        Ok(Self(value))
    }

    /// Derives a fresh credential for a registration on the given event.
    ///
    /// The value combines the event scope, the current millisecond clock,
    /// and a random suffix, so two calls in the same tick still diverge.
    #[must_use]
    pub fn generate(event: &EventId) -> Self {
        let millis = Utc::now().timestamp_millis();
        let entropy = Uuid::new_v4().simple().to_string();
        let suffix = &entropy[..SUFFIX_LEN];
        Self(format!("{event}-{millis}-{suffix}"))
    }

    /// Returns the credential as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Credential {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Credential> for String {
    fn from(credential: Credential) -> Self {
        credential.0
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Credential {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Renders a credential as a scannable QR badge, PNG-encoded.
///
/// The output is at least `size` pixels on each side (the QR module grid is
/// scaled up to fit). Pure function of its inputs; rendering failures never
/// block the underlying check-in transition.
pub fn render_png(credential: &Credential, size: u32) -> Result<Vec<u8>, EncodeError> {
    let code = QrCode::new(credential.as_str().as_bytes())?;
    let badge = code
        .render::<Luma<u8>>()
        .min_dimensions(size, size)
        .build();
    let mut buffer = Cursor::new(Vec::new());
    badge.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_rejects_empty() {
        assert!(Credential::new("").is_err());
        assert!(Credential::new("evt-1-123-abc").is_ok());
    }

    #[test]
    fn generate_scopes_to_event() {
        let event = EventId::new("evt-42").unwrap();
        let credential = Credential::generate(&event);
        assert!(credential.as_str().starts_with("evt-42-"));
    }

    #[test]
    fn generate_diverges_within_one_tick() {
        let event = EventId::new("evt-42").unwrap();
        let a = Credential::generate(&event);
        let b = Credential::generate(&event);
        assert_ne!(a, b);
    }

    #[test]
    fn credential_serde_rejects_empty() {
        let result: Result<Credential, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn render_produces_decodable_png() {
        let credential = Credential::new("evt-1-1700000000000-abc123def").unwrap();
        let png = render_png(&credential, DEFAULT_BADGE_SIZE).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert!(decoded.width() >= DEFAULT_BADGE_SIZE);
        assert!(decoded.height() >= DEFAULT_BADGE_SIZE);
    }

    #[test]
    fn render_is_deterministic() {
        let credential = Credential::new("evt-1-1700000000000-abc123def").unwrap();
        let first = render_png(&credential, 100).unwrap();
        let second = render_png(&credential, 100).unwrap();
        assert_eq!(first, second);
    }
}
