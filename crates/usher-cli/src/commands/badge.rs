//! Badge command for rendering a credential as a QR PNG.

use std::path::Path;

use anyhow::{Context, Result};

use usher_core::credential::{Credential, render_png};

pub fn run(credential: &str, out: &Path, size: u32) -> Result<()> {
    let credential = Credential::new(credential)?;
    let png = render_png(&credential, size)?;
    std::fs::write(out, png)
        .with_context(|| format!("failed to write badge to {}", out.display()))?;
    println!("Wrote badge for {} to {}", credential, out.display());
    Ok(())
}
