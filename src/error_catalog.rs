// 📖 Error Catalog - client-facing messages for error keys
//
// An explicit cache object: callers own it, `refresh()` reloads it from
// the `error_definitions` table and `invalidate()` drops it. Lookups on
// an empty cache fall back to the built-in definitions.

use crate::error::{Result, RsvpError};
use log::debug;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDefinition {
    pub key: String,
    pub status: u16,
    pub message: String,
}

impl ErrorDefinition {
    pub fn new(key: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        ErrorDefinition {
            key: key.into(),
            status,
            message: message.into(),
        }
    }
}

const DEFAULT_DEFINITIONS: &[(&str, u16, &str)] = &[
    ("guest.not_found", 404, "We could not find that guest."),
    ("family_group.not_found", 404, "We could not find that family group."),
    ("family_member.not_found", 404, "We could not find that family member."),
    ("invitation_code.not_found", 404, "We could not find that invitation code."),
    ("rsvp.not_found", 404, "No RSVP has been submitted yet."),
    ("resource.not_found", 404, "The requested resource does not exist."),
    ("invitation_code.invalid", 404, "That invitation code is not valid."),
    ("invitation_code.expired", 410, "That invitation code has expired."),
    ("conflict", 409, "That change conflicts with existing data."),
    ("rsvp.capacity_exceeded", 400, "Too many attendees for this invitation."),
    ("invalid_parameter", 400, "Some of the submitted information is invalid."),
    ("invitation_code.exhausted", 500, "Could not create an invitation code, please retry."),
    ("database_error", 500, "Something went wrong on our side."),
];

/// Insert the built-in definitions, leaving customised rows untouched
pub fn seed_default_definitions(conn: &Connection) -> Result<()> {
    for (key, status, message) in DEFAULT_DEFINITIONS {
        conn.execute(
            "INSERT OR IGNORE INTO error_definitions (key, status, message) VALUES (?1, ?2, ?3)",
            params![key, status, message],
        )?;
    }
    Ok(())
}

pub struct ErrorCatalog {
    definitions: HashMap<String, ErrorDefinition>,
}

impl ErrorCatalog {
    /// Create an empty catalog (lookups use built-in defaults until refreshed)
    pub fn new() -> Self {
        ErrorCatalog {
            definitions: HashMap::new(),
        }
    }

    /// Reload all definitions from the store
    pub fn refresh(&mut self, conn: &Connection) -> Result<usize> {
        let mut stmt = conn.prepare("SELECT key, status, message FROM error_definitions")?;
        let loaded = stmt
            .query_map([], |row| {
                Ok(ErrorDefinition {
                    key: row.get(0)?,
                    status: row.get(1)?,
                    message: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        self.definitions = loaded
            .into_iter()
            .map(|def| (def.key.clone(), def))
            .collect();

        debug!("Error catalog refreshed with {} definitions", self.definitions.len());
        Ok(self.definitions.len())
    }

    /// Drop every cached definition
    pub fn invalidate(&mut self) {
        self.definitions.clear();
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Look up a definition by key
    pub fn get(&self, key: &str) -> ErrorDefinition {
        if let Some(def) = self.definitions.get(key) {
            return def.clone();
        }

        DEFAULT_DEFINITIONS
            .iter()
            .find(|(k, _, _)| *k == key)
            .map(|(k, status, message)| ErrorDefinition::new(*k, *status, *message))
            .unwrap_or_else(|| ErrorDefinition::new(key, 500, "Unexpected error."))
    }

    /// Resolve the client-facing definition for an error
    pub fn describe(&self, error: &RsvpError) -> ErrorDefinition {
        let mut def = self.get(error.key());
        // The status always follows the error itself, the catalog only owns wording.
        def.status = error.status_code();
        def
    }
}

impl Default for ErrorCatalog {
    fn default() -> Self {
        Self::new()
    }
}
