//! Register command for adding attendees to an event.

use anyhow::{Context, Result, bail};
use chrono::Utc;

use usher_core::credential::{DEFAULT_BADGE_SIZE, render_png};
use usher_core::model::Registration;
use usher_core::types::{EventId, OrganizerId};
use usher_db::{Database, DbError};
use usher_notify::Mailer;

use crate::Config;

/// How many fresh credentials to try if one collides. Collisions are
/// expected to be vanishingly rare; the loop exists so a true collision is
/// invisible to the operator rather than a hard failure.
const CREDENTIAL_ATTEMPTS: u32 = 3;

#[expect(clippy::too_many_arguments, reason = "thin mapping from CLI flags")]
pub fn run(
    db: &mut Database,
    config: &Config,
    organizer: &OrganizerId,
    event: &str,
    name: &str,
    email: &str,
    phone: Option<String>,
    send_email: bool,
    json: bool,
) -> Result<()> {
    let event_id = EventId::new(event)?;
    let event = db
        .get_event(&event_id, organizer)?
        .with_context(|| format!("event {event_id} not found"))?;

    let registration = insert_with_fresh_credential(db, &event_id, name, email, phone)?;

    if json {
        println!("{}", serde_json::to_string(&registration)?);
    } else {
        println!(
            "Registered {} for {} (credential {})",
            registration.name, event.title, registration.credential
        );
    }

    if send_email {
        // Best effort: the registration stands even if the email fails.
        if let Err(error) = send_credential_email(config, &event.title, &registration) {
            tracing::warn!(%error, "credential email failed");
            eprintln!("warning: could not send credential email: {error:#}");
        }
    }

    Ok(())
}

fn insert_with_fresh_credential(
    db: &mut Database,
    event_id: &EventId,
    name: &str,
    email: &str,
    phone: Option<String>,
) -> Result<Registration> {
    for _ in 0..CREDENTIAL_ATTEMPTS {
        let registration =
            Registration::new(event_id.clone(), name, email, phone.clone(), Utc::now())?;
        match db.register(&registration) {
            Ok(()) => return Ok(registration),
            Err(DbError::CredentialTaken) => {
                tracing::debug!("credential collision, regenerating");
            }
            Err(error) => return Err(error.into()),
        }
    }
    bail!("could not find an unused credential after {CREDENTIAL_ATTEMPTS} attempts");
}

fn send_credential_email(
    config: &Config,
    event_title: &str,
    registration: &Registration,
) -> Result<()> {
    let api_key = config
        .mail_api_key
        .as_deref()
        .context("mail_api_key is not configured")?;
    let from = config
        .mail_from
        .as_deref()
        .context("mail_from is not configured")?;

    let badge = render_png(&registration.credential, DEFAULT_BADGE_SIZE)?;
    let mailer = Mailer::new(api_key, from)?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(mailer.send_credential(
        &registration.email,
        &registration.name,
        event_title,
        &registration.credential,
        &badge,
    ))?;
    Ok(())
}
