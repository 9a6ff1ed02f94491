//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Event registration and check-in platform.
///
/// Organizers create events, attendees receive scannable credentials, and
/// scans at the venue check attendees in exactly once.
#[derive(Debug, Parser)]
#[command(name = "usher", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create or show the local organizer identity.
    Init {
        /// Human-friendly label for this organizer.
        #[arg(long)]
        label: Option<String>,
    },

    /// Manage events.
    Event {
        #[command(subcommand)]
        action: EventAction,
    },

    /// Register an attendee for an event.
    Register {
        /// The event ID.
        #[arg(long)]
        event: String,

        /// Attendee display name.
        #[arg(long)]
        name: String,

        /// Attendee contact email.
        #[arg(long)]
        email: String,

        /// Optional phone number.
        #[arg(long)]
        phone: Option<String>,

        /// Email the credential and QR badge to the attendee.
        #[arg(long)]
        send_email: bool,

        /// Output the registration as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Render a credential as a QR badge PNG.
    Badge {
        /// The credential string to encode.
        #[arg(long)]
        credential: String,

        /// Output path.
        #[arg(long, default_value = "ticket-qr.png")]
        out: PathBuf,

        /// Minimum badge side length in pixels.
        #[arg(long, default_value_t = usher_core::credential::DEFAULT_BADGE_SIZE)]
        size: u32,
    },

    /// Check a single credential in directly.
    CheckIn {
        /// The event ID.
        #[arg(long)]
        event: String,

        /// The scanned or typed credential.
        #[arg(long)]
        credential: String,
    },

    /// Run an interactive scan session for an event.
    Scan {
        /// The event ID.
        #[arg(long)]
        event: String,

        /// Directory a capture tool drops frames into; the newest file is
        /// treated as the latest frame.
        #[arg(long, requires = "decoder")]
        frames: Option<PathBuf>,

        /// External decoder command; receives a frame on stdin and prints
        /// the decoded credential, or nothing.
        #[arg(long, requires = "frames")]
        decoder: Option<String>,
    },

    /// Show attendance for an event.
    Status {
        /// The event ID.
        #[arg(long)]
        event: String,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Event management actions.
#[derive(Debug, Subcommand)]
pub enum EventAction {
    /// Create a new event.
    Create {
        /// Event title.
        #[arg(long)]
        title: String,

        /// Schedule time, RFC 3339 (e.g., 2026-09-01T09:00:00Z).
        #[arg(long)]
        at: String,

        /// Venue description.
        #[arg(long)]
        location: String,

        /// Maximum number of registrations.
        #[arg(long)]
        capacity: Option<u32>,

        /// Output the created event as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List your events.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete an event and all of its registrations.
    Delete {
        /// The event ID.
        id: String,
    },
}
