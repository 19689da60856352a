// ⚙️ Runtime configuration
// Everything comes from the environment; unset variables fall back to defaults.

use crate::error::{Result, RsvpError};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "wedding.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_CODE_VALIDITY_MONTHS: u32 = 36;
pub const DEFAULT_CODE_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Listen address for the HTTP server
    pub bind_addr: String,

    /// How long a freshly issued invitation code stays valid
    pub code_validity_months: u32,

    /// Upper bound on code allocation attempts before giving up
    pub code_max_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            code_validity_months: DEFAULT_CODE_VALIDITY_MONTHS,
            code_max_attempts: DEFAULT_CODE_MAX_ATTEMPTS,
        }
    }
}

impl Config {
    /// Read configuration from `WEDDING_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (used by tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(path) = lookup("WEDDING_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(addr) = lookup("WEDDING_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(raw) = lookup("WEDDING_CODE_VALIDITY_MONTHS") {
            config.code_validity_months = parse_positive("WEDDING_CODE_VALIDITY_MONTHS", &raw)?;
        }
        if let Some(raw) = lookup("WEDDING_CODE_MAX_ATTEMPTS") {
            config.code_max_attempts = parse_positive("WEDDING_CODE_MAX_ATTEMPTS", &raw)?;
        }

        Ok(config)
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(RsvpError::InvalidParameter(format!(
            "{} must be a positive integer, got {:?}",
            key, raw
        ))),
    }
}
