//! Scan session controller.
//!
//! One session binds one event and one organizer for a continuous period of
//! scanning. Decoded credentials from the camera feed or manual entry are
//! sequenced through the check-in store strictly one at a time, and the
//! running tally and recent-outcome history are derived purely from the
//! outcome stream, never tracked as independent truth.

use std::collections::VecDeque;

use chrono::Utc;

use crate::checkin::{AttendanceTally, CheckIn, CheckInError, ScanOutcome};
use crate::credential::Credential;
use crate::types::{EventId, OrganizerId};

/// How many recent outcomes the session keeps for operator display.
pub const HISTORY_CAPACITY: usize = 10;

/// A continuous period of active scanning bound to one event and organizer.
///
/// Holding the store by `&mut` makes the single-flight rule structural:
/// only one check-in call can be outstanding at a time, and camera and
/// manual input cannot race each other because both go through
/// [`ScanSession::process`].
pub struct ScanSession<'a, S: CheckIn> {
    store: &'a mut S,
    event: EventId,
    organizer: OrganizerId,
    tally: AttendanceTally,
    history: VecDeque<ScanOutcome>,
}

impl<'a, S: CheckIn> ScanSession<'a, S> {
    /// Opens a session, refreshing the attendance tally from storage.
    ///
    /// Fails with [`CheckInError::Unauthorized`] when the organizer does not
    /// own the event, so a session can never start against a foreign event.
    pub fn start(
        store: &'a mut S,
        event: EventId,
        organizer: OrganizerId,
    ) -> Result<Self, CheckInError> {
        let tally = store.attendance(&event, &organizer)?;
        tracing::debug!(
            event = %event,
            total = tally.total,
            checked_in = tally.checked_in,
            "scan session started"
        );
        Ok(Self {
            store,
            event,
            organizer,
            tally,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        })
    }

    /// Processes one decoded credential through the check-in state machine.
    ///
    /// The tally is incremented only on success; duplicate and not-found
    /// outcomes leave it untouched. Every processed scan lands in the
    /// history. Transient storage errors leave the session usable (the
    /// caller reports them and resumes); `Unauthorized` is fatal to the
    /// session and must stop it.
    pub fn process(&mut self, credential: Credential) -> Result<ScanOutcome, CheckInError> {
        let outcome = self
            .store
            .check_in(&self.event, &self.organizer, &credential)?;

        let result = outcome.result();
        if result == crate::checkin::ScanResult::Success {
            self.tally.checked_in += 1;
        }
        tracing::info!(event = %self.event, credential = %credential, %result, "scan processed");

        let scan = ScanOutcome {
            result,
            registration: outcome.registration().cloned(),
            credential,
            at: Utc::now(),
        };
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_back();
        }
        self.history.push_front(scan.clone());
        Ok(scan)
    }

    /// The running tally: total at session start, checked-in count updated
    /// locally on success outcomes.
    #[must_use]
    pub const fn tally(&self) -> AttendanceTally {
        self.tally
    }

    /// Recent outcomes, newest first.
    pub fn history(&self) -> impl Iterator<Item = &ScanOutcome> {
        self.history.iter()
    }

    /// The event this session is bound to.
    #[must_use]
    pub const fn event(&self) -> &EventId {
        &self.event
    }
}
