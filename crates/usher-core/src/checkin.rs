//! Check-in outcomes and the storage seam for the state machine.
//!
//! Every processed scan yields exactly one of success, duplicate, or
//! not-found, plus the registration snapshot where one exists. This triple
//! is the stable interface the rest of the application builds on.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::credential::Credential;
use crate::model::Registration;
use crate::types::{EventId, OrganizerId, ValidationError};

/// The tagged result of processing one decoded credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanResult {
    /// First-time check-in; the registration transitioned to checked in.
    Success,
    /// The registration was already checked in; nothing was mutated.
    Duplicate,
    /// No registration matches the credential for this event.
    NotFound,
}

impl ScanResult {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Duplicate => "duplicate",
            Self::NotFound => "not_found",
        }
    }
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScanResult {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "duplicate" => Ok(Self::Duplicate),
            "not_found" => Ok(Self::NotFound),
            _ => Err(ValidationError::InvalidStatus {
                value: s.to_string(),
            }),
        }
    }
}

/// Outcome of one check-in call against the store.
///
/// `Duplicate` carries the stored snapshot with its original check-in
/// timestamp, so a repeat scan is always distinguishable from a first-time
/// success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInOutcome {
    /// The registration transitioned from pending to checked in.
    Success(Registration),
    /// The registration was already checked in; snapshot unchanged.
    Duplicate(Registration),
    /// No registration matches `(event, credential)`.
    NotFound,
}

impl CheckInOutcome {
    #[must_use]
    pub const fn result(&self) -> ScanResult {
        match self {
            Self::Success(_) => ScanResult::Success,
            Self::Duplicate(_) => ScanResult::Duplicate,
            Self::NotFound => ScanResult::NotFound,
        }
    }

    /// The registration snapshot, if the credential resolved to one.
    #[must_use]
    pub const fn registration(&self) -> Option<&Registration> {
        match self {
            Self::Success(registration) | Self::Duplicate(registration) => Some(registration),
            Self::NotFound => None,
        }
    }
}

/// Errors from a check-in call.
#[derive(Debug, Error)]
pub enum CheckInError {
    /// The event does not exist under this organizer. Whether the event is
    /// genuinely absent or owned by someone else is indistinguishable to
    /// the caller.
    #[error("event not found for this organizer")]
    Unauthorized,

    /// Transient storage failure. Safe to retry the whole call: the commit
    /// is a conditional update, so a retry either repeats the transition or
    /// reports a duplicate.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Attendance counts for one event.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceTally {
    /// Total registrations.
    pub total: u64,
    /// Registrations currently checked in.
    pub checked_in: u64,
}

/// The check-in state machine as seen by callers.
///
/// Implementations must commit the pending-to-checked-in transition with a
/// conditional update enforced by the shared storage layer, so that N
/// simultaneous calls against one pending registration yield exactly one
/// `Success` across process and device boundaries, not just within one
/// session.
pub trait CheckIn {
    /// Resolves a decoded credential within an event scope and applies the
    /// single race-safe state transition.
    fn check_in(
        &mut self,
        event: &EventId,
        organizer: &OrganizerId,
        credential: &Credential,
    ) -> Result<CheckInOutcome, CheckInError>;

    /// Attendance counts for the event, ownership-checked.
    fn attendance(
        &self,
        event: &EventId,
        organizer: &OrganizerId,
    ) -> Result<AttendanceTally, CheckInError>;
}

/// One entry in a scan session's history feed.
///
/// Ephemeral: held only in the session controller's bounded in-memory
/// history, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// How the scan resolved.
    pub result: ScanResult,
    /// Snapshot of the registration, absent for `NotFound`.
    pub registration: Option<Registration>,
    /// The credential as scanned, kept for operator display on `NotFound`.
    pub credential: Credential,
    /// When the scan was processed.
    pub at: DateTime<Utc>,
}
