//! Core domain logic for the usher check-in platform.
//!
//! This crate contains the fundamental types and logic for:
//! - The event and registration data model
//! - Credential generation and QR badge rendering
//! - The decoder adapter that turns camera frames into credential text
//! - The scan session controller that sequences check-ins

pub mod capture;
pub mod checkin;
pub mod credential;
pub mod model;
pub mod session;
pub mod types;

pub use capture::{CaptureError, FeedEvent, Frame, FrameDecoder, FrameSource, ScanFeed};
pub use checkin::{AttendanceTally, CheckIn, CheckInError, CheckInOutcome, ScanOutcome, ScanResult};
pub use credential::{Credential, EncodeError, render_png};
pub use model::{Event, Registration};
pub use session::ScanSession;
pub use types::{CheckInStatus, EventId, OrganizerId, RegistrationId, ValidationError};
