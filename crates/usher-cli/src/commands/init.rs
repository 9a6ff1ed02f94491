//! Init command for creating the local organizer identity.

use anyhow::Result;

use crate::identity;

pub fn run(label: Option<&str>) -> Result<()> {
    let organizer = identity::init_organizer(label)?;
    println!("Organizer: {} ({})", organizer.label, organizer.organizer_id);
    Ok(())
}
