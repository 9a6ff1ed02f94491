//! Event management commands.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};

use usher_core::model::Event;
use usher_core::types::{EventId, OrganizerId};
use usher_db::Database;

pub fn create(
    db: &mut Database,
    organizer: &OrganizerId,
    title: &str,
    at: &str,
    location: &str,
    capacity: Option<u32>,
    json: bool,
) -> Result<()> {
    let starts_at = parse_timestamp(at, "at")?;
    let event = Event::new(
        organizer.clone(),
        title,
        starts_at,
        location,
        capacity,
        Utc::now(),
    )?;
    db.create_event(&event)?;

    if json {
        println!("{}", serde_json::to_string(&event)?);
    } else {
        println!("Created event {}", event.id);
    }
    Ok(())
}

pub fn list(db: &Database, organizer: &OrganizerId, json: bool) -> Result<()> {
    let events = db.list_events(organizer)?;

    if json {
        for event in events {
            println!("{}", serde_json::to_string(&event)?);
        }
        return Ok(());
    }

    if events.is_empty() {
        println!("No events yet.");
        return Ok(());
    }
    for event in events {
        let capacity = event
            .capacity
            .map_or_else(|| "unlimited".to_string(), |c| c.to_string());
        println!(
            "{}  {}  {}  {} (capacity: {})",
            event.id,
            event.starts_at.to_rfc3339(),
            event.title,
            event.location,
            capacity,
        );
    }
    Ok(())
}

pub fn delete(db: &mut Database, organizer: &OrganizerId, id: &str) -> Result<()> {
    let id = EventId::new(id)?;
    if db.delete_event(&id, organizer)? {
        println!("Deleted event {id} and its registrations");
        Ok(())
    } else {
        bail!("event {id} not found");
    }
}

fn parse_timestamp(s: &str, name: &str) -> Result<DateTime<Utc>> {
    let dt = DateTime::parse_from_rfc3339(s).with_context(|| {
        format!("invalid --{name} timestamp, expected RFC 3339 (e.g., 2026-09-01T09:00:00Z)")
    })?;
    Ok(dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_timestamp_accepts_rfc3339() {
        assert!(parse_timestamp("2026-09-01T09:00:00Z", "at").is_ok());
        assert!(parse_timestamp("tomorrow", "at").is_err());
    }
}
