//! Local organizer identity.
//!
//! Authentication proper is outside this tool; all the check-in core needs
//! is an opaque organizer identity to match against event ownership. That
//! identity is a persistent UUID stored in `organizer.json` in the data
//! directory, created once by `usher init`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use usher_core::types::OrganizerId;

/// Organizer identity stored in `organizer.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizerIdentity {
    /// Persistent opaque identity.
    pub organizer_id: String,
    /// Human-friendly label (e.g., "front-desk").
    pub label: String,
}

impl OrganizerIdentity {
    /// The identity as a validated core type.
    pub fn id(&self) -> Result<OrganizerId> {
        OrganizerId::new(&*self.organizer_id).context("invalid organizer.json identity")
    }
}

/// Returns the path to organizer.json in the data directory.
pub fn organizer_json_path() -> Result<PathBuf> {
    let data_dir =
        crate::config::dirs_data_path().context("could not determine data directory")?;
    Ok(data_dir.join("organizer.json"))
}

/// Loads the organizer identity, failing with a hint if not initialized.
pub fn require_organizer() -> Result<OrganizerIdentity> {
    load_from(&organizer_json_path()?)?
        .context("No organizer identity found. Run 'usher init' first.")
}

fn load_from(path: &Path) -> Result<Option<OrganizerIdentity>> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let identity: OrganizerIdentity =
                serde_json::from_str(&content).context("failed to parse organizer.json")?;
            Ok(Some(identity))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).context("failed to read organizer.json"),
    }
}

/// Creates the organizer identity, or returns the existing one.
///
/// An existing identity keeps its UUID; a new label, when given, replaces
/// the stored one.
pub fn init_organizer(label: Option<&str>) -> Result<OrganizerIdentity> {
    init_at(&organizer_json_path()?, label)
}

pub(crate) fn init_at(path: &Path, label: Option<&str>) -> Result<OrganizerIdentity> {
    if let Some(mut existing) = load_from(path)? {
        if let Some(new_label) = label {
            existing.label = new_label.to_string();
            save_to(path, &existing)?;
        }
        return Ok(existing);
    }

    let default_label = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "organizer".to_string());
    let identity = OrganizerIdentity {
        organizer_id: Uuid::new_v4().to_string(),
        label: label.unwrap_or(&default_label).to_string(),
    };
    save_to(path, &identity)?;
    tracing::info!(organizer = %identity.organizer_id, "organizer identity created");
    Ok(identity)
}

fn save_to(path: &Path, identity: &OrganizerIdentity) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("failed to create data directory")?;
    }
    let json = serde_json::to_string_pretty(identity).context("failed to serialize identity")?;
    std::fs::write(path, json).context("failed to write organizer.json")?;
    Ok(())
}
