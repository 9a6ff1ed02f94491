//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// API key for the outbound mail provider.
    pub mail_api_key: Option<String>,
    /// Sender address for credential emails.
    pub mail_from: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("mail_api_key", &self.mail_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("mail_from", &self.mail_from)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("usher.db"),
            mail_api_key: None,
            mail_from: None,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (USHER_*)
        figment = figment.merge(Env::prefixed("USHER_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for usher.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("usher"))
}

/// Returns the platform-specific data directory for usher.
///
/// On Linux: `~/.local/share/usher`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("usher"))
}
