//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The capacity was zero.
    #[error("capacity must be a positive integer, got {value}")]
    InvalidCapacity { value: u32 },

    /// The email address has no recognizable shape.
    #[error("invalid email address: {value}")]
    InvalidEmail { value: String },

    /// Invalid check-in status value.
    #[error("invalid check-in status: {value}")]
    InvalidStatus { value: String },
}

/// Whether a registration has been checked in.
///
/// The only transition the platform ever performs is `Pending` to
/// `CheckedIn`. There is no reverse transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInStatus {
    /// Registered but not yet checked in at the venue.
    Pending,
    /// Checked in; terminal for the check-in operation.
    CheckedIn,
}

impl CheckInStatus {
    /// String representation for display and JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::CheckedIn => "checked_in",
        }
    }

    /// Integer representation for database storage.
    #[must_use]
    pub const fn as_flag(&self) -> i64 {
        match self {
            Self::Pending => 0,
            Self::CheckedIn => 1,
        }
    }

    /// Parses the database flag. Any nonzero value counts as checked in.
    #[must_use]
    pub const fn from_flag(flag: i64) -> Self {
        if flag == 0 { Self::Pending } else { Self::CheckedIn }
    }

    #[must_use]
    pub const fn is_checked_in(&self) -> bool {
        matches!(self, Self::CheckedIn)
    }
}

impl fmt::Display for CheckInStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CheckInStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "checked_in" => Ok(Self::CheckedIn),
            _ => Err(ValidationError::InvalidStatus {
                value: s.to_string(),
            }),
        }
    }
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated event identifier.
    ///
    /// Event IDs must be non-empty strings. Uniqueness is enforced at the
    /// database level.
    EventId, "event ID"
);

define_string_id!(
    /// A validated registration identifier.
    RegistrationId, "registration ID"
);

define_string_id!(
    /// An opaque organizer identity.
    ///
    /// How this identity is established (login, local artifact) is outside
    /// the core; here it is only matched against event ownership.
    OrganizerId, "organizer ID"
);
