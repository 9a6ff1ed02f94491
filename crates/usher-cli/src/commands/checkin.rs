//! Direct check-in command for a single credential.

use std::io::Write;

use anyhow::{Result, bail};

use usher_core::checkin::{CheckInError, CheckInOutcome};
use usher_core::credential::Credential;
use usher_core::types::{EventId, OrganizerId};
use usher_db::Database;

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    organizer: &OrganizerId,
    event: &str,
    credential: &str,
) -> Result<()> {
    let event = EventId::new(event)?;
    let credential = Credential::new(credential)?;

    match db.check_in(&event, organizer, &credential) {
        Ok(CheckInOutcome::Success(registration)) => {
            writeln!(writer, "Checked in: {} ({})", registration.name, registration.email)?;
        }
        Ok(CheckInOutcome::Duplicate(registration)) => {
            let at = registration
                .checked_in_at
                .map_or_else(|| "unknown time".to_string(), |t| t.to_rfc3339());
            writeln!(writer, "Already checked in: {} at {at}", registration.name)?;
        }
        Ok(CheckInOutcome::NotFound) => {
            writeln!(writer, "No registration matches {credential} for this event")?;
        }
        Err(CheckInError::Unauthorized) => {
            bail!("event {event} not found for this organizer");
        }
        Err(error @ CheckInError::Storage(_)) => {
            bail!("check-in failed, safe to retry: {error}");
        }
    }
    Ok(())
}
