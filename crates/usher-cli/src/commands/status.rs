//! Status command for showing attendance.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use usher_core::checkin::{AttendanceTally, CheckIn};
use usher_core::types::{EventId, OrganizerId};
use usher_db::Database;

#[derive(Serialize)]
struct StatusReport<'a> {
    event: &'a str,
    title: &'a str,
    tally: AttendanceTally,
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    organizer: &OrganizerId,
    event: &str,
    json: bool,
) -> Result<()> {
    let event_id = EventId::new(event)?;
    let event = db
        .get_event(&event_id, organizer)?
        .with_context(|| format!("event {event_id} not found"))?;
    let tally = db.attendance(&event_id, organizer)?;

    if json {
        let report = StatusReport {
            event: event_id.as_str(),
            title: &event.title,
            tally,
        };
        writeln!(writer, "{}", serde_json::to_string(&report)?)?;
        return Ok(());
    }

    writeln!(writer, "{}", event.title)?;
    writeln!(writer, "When: {}", event.starts_at.to_rfc3339())?;
    writeln!(writer, "Where: {}", event.location)?;
    if let Some(capacity) = event.capacity {
        writeln!(writer, "Capacity: {capacity}")?;
    }
    writeln!(writer, "Checked in: {} of {}", tally.checked_in, tally.total)?;
    Ok(())
}
