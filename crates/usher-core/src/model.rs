//! Event and registration records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::credential::Credential;
use crate::types::{CheckInStatus, EventId, OrganizerId, RegistrationId, ValidationError};

/// An event that attendees can register for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event.
    pub id: EventId,
    /// The organizer who owns the event and may run check-in for it.
    pub organizer: OrganizerId,
    /// Display title.
    pub title: String,
    /// When the event takes place.
    pub starts_at: DateTime<Utc>,
    /// Venue description.
    pub location: String,
    /// Maximum number of registrations, if limited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    /// When the event was created.
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Creates a new event, validating title, location, and capacity.
    ///
    /// A capacity of zero is rejected; `None` means unlimited.
    pub fn new(
        organizer: OrganizerId,
        title: impl Into<String>,
        starts_at: DateTime<Utc>,
        location: impl Into<String>,
        capacity: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.is_empty() {
            return Err(ValidationError::Empty { field: "title" });
        }
        let location = location.into();
        if location.is_empty() {
            return Err(ValidationError::Empty { field: "location" });
        }
        if let Some(0) = capacity {
            return Err(ValidationError::InvalidCapacity { value: 0 });
        }

        let id = EventId::new(uuid::Uuid::new_v4().to_string())?;
        Ok(Self {
            id,
            organizer,
            title,
            starts_at,
            location,
            capacity,
            created_at: now,
        })
    }
}

/// An attendee's registration for one event.
///
/// A registration belongs to exactly one event for its entire lifetime and
/// carries the credential the attendee presents at the door. `checked_in_at`
/// is set exactly once, when the status moves from pending to checked in,
/// and is never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Unique identifier for this registration.
    pub id: RegistrationId,
    /// The owning event.
    pub event_id: EventId,
    /// Attendee display name.
    pub name: String,
    /// Attendee contact email.
    pub email: String,
    /// Optional phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// The scannable credential identifying this registration.
    pub credential: Credential,
    /// Check-in state.
    pub status: CheckInStatus,
    /// Present iff status is checked in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_in_at: Option<DateTime<Utc>>,
    /// When the attendee registered.
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    /// Creates a pending registration with a freshly generated credential.
    pub fn new(
        event_id: EventId,
        name: impl Into<String>,
        email: impl Into<String>,
        phone: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::Empty { field: "name" });
        }
        let email = email.into();
        validate_email(&email)?;

        let id = RegistrationId::new(uuid::Uuid::new_v4().to_string())?;
        let credential = Credential::generate(&event_id);
        Ok(Self {
            id,
            event_id,
            name,
            email,
            phone,
            credential,
            status: CheckInStatus::Pending,
            checked_in_at: None,
            registered_at: now,
        })
    }
}

/// Minimal shape check: something before and after a single `@`.
fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::Empty { field: "email" });
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ValidationError::InvalidEmail {
            value: email.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn organizer() -> OrganizerId {
        OrganizerId::new("org-1").unwrap()
    }

    #[test]
    fn event_rejects_zero_capacity() {
        let result = Event::new(
            organizer(),
            "RustConf",
            ts("2026-09-01T09:00:00Z"),
            "Main hall",
            Some(0),
            ts("2026-08-01T00:00:00Z"),
        );
        assert_eq!(
            result.unwrap_err(),
            ValidationError::InvalidCapacity { value: 0 }
        );
    }

    #[test]
    fn event_accepts_unlimited_capacity() {
        let event = Event::new(
            organizer(),
            "RustConf",
            ts("2026-09-01T09:00:00Z"),
            "Main hall",
            None,
            ts("2026-08-01T00:00:00Z"),
        )
        .unwrap();
        assert_eq!(event.capacity, None);
        assert_eq!(event.organizer, organizer());
    }

    #[test]
    fn event_rejects_empty_title() {
        let result = Event::new(
            organizer(),
            "",
            ts("2026-09-01T09:00:00Z"),
            "Main hall",
            None,
            ts("2026-08-01T00:00:00Z"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn registration_starts_pending() {
        let event_id = EventId::new("evt-1").unwrap();
        let reg = Registration::new(
            event_id.clone(),
            "Ada",
            "ada@example.com",
            None,
            ts("2026-08-01T00:00:00Z"),
        )
        .unwrap();
        assert_eq!(reg.status, CheckInStatus::Pending);
        assert_eq!(reg.checked_in_at, None);
        assert_eq!(reg.event_id, event_id);
        assert!(reg.credential.as_str().starts_with("evt-1-"));
    }

    #[test]
    fn registration_rejects_bad_email() {
        let event_id = EventId::new("evt-1").unwrap();
        for email in ["", "nodomain@", "@nolocal", "plainstring"] {
            let result = Registration::new(
                event_id.clone(),
                "Ada",
                email,
                None,
                ts("2026-08-01T00:00:00Z"),
            );
            assert!(result.is_err(), "email {email:?} should be rejected");
        }
    }

    #[test]
    fn registration_serde_roundtrip() {
        let reg = Registration::new(
            EventId::new("evt-1").unwrap(),
            "Ada",
            "ada@example.com",
            Some("+1-555-0100".to_string()),
            ts("2026-08-01T00:00:00Z"),
        )
        .unwrap();
        let json = serde_json::to_string(&reg).unwrap();
        let parsed: Registration = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, reg);
    }

    #[test]
    fn pending_registration_omits_checked_in_at() {
        let reg = Registration::new(
            EventId::new("evt-1").unwrap(),
            "Ada",
            "ada@example.com",
            None,
            ts("2026-08-01T00:00:00Z"),
        )
        .unwrap();
        let json = serde_json::to_string(&reg).unwrap();
        assert!(!json.contains("checked_in_at"));
    }
}
