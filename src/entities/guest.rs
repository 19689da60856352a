// 👤 Guest Entity
//
// A guest is identified by a numeric id. Family-group ownership and RSVP
// state live in their own tables and point back here by guest id.

use crate::db::{parse_timestamp, record_event};
use crate::error::{Result, RsvpError};
use anyhow::Context;
use chrono::{DateTime, Utc};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guest {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub plus_one_allowed: bool,
    pub created_at: DateTime<Utc>,
}

impl Guest {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let created_at: String = row.get(6)?;
        Ok(Guest {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            plus_one_allowed: row.get(5)?,
            created_at: parse_timestamp(6, &created_at)?,
        })
    }
}

/// Guest registration payload (also the CSV import row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGuest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub plus_one_allowed: bool,
}

impl NewGuest {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        NewGuest {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: None,
            phone: None,
            plus_one_allowed: false,
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn with_plus_one(mut self) -> Self {
        self.plus_one_allowed = true;
        self
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

// Spreadsheets export booleans in every imaginable way.
fn flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(|s| s.trim().to_lowercase()) {
        None => Ok(false),
        Some(s) => match s.as_str() {
            "" | "false" | "no" | "n" | "0" => Ok(false),
            "true" | "yes" | "y" | "1" => Ok(true),
            other => Err(serde::de::Error::custom(format!(
                "expected yes/no flag, got {:?}",
                other
            ))),
        },
    }
}

const GUEST_COLUMNS: &str =
    "id, first_name, last_name, email, phone, plus_one_allowed, created_at";

/// Register a new guest
///
/// Fails with `Conflict` when another guest already uses the same e-mail.
pub fn insert_guest(conn: &Connection, guest: &NewGuest) -> Result<Guest> {
    let first_name = guest.first_name.trim();
    let last_name = guest.last_name.trim();
    if first_name.is_empty() || last_name.is_empty() {
        return Err(RsvpError::InvalidParameter(
            "guest first and last name are required".to_string(),
        ));
    }

    let now = Utc::now();
    let result = conn.execute(
        "INSERT INTO guests (first_name, last_name, email, phone, plus_one_allowed, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            first_name,
            last_name,
            guest.email,
            guest.phone,
            guest.plus_one_allowed,
            now.to_rfc3339(),
        ],
    );

    match result {
        Ok(_) => get_guest(conn, conn.last_insert_rowid()),
        Err(e) => {
            let err = RsvpError::from(e);
            if err.is_constraint_violation() {
                Err(RsvpError::Conflict(format!(
                    "a guest with email {:?} already exists",
                    guest.email.as_deref().unwrap_or_default()
                )))
            } else {
                Err(err)
            }
        }
    }
}

pub fn find_guest(conn: &Connection, id: i64) -> Result<Option<Guest>> {
    let guest = conn
        .query_row(
            &format!("SELECT {} FROM guests WHERE id = ?1", GUEST_COLUMNS),
            [id],
            Guest::from_row,
        )
        .optional()?;
    Ok(guest)
}

pub fn get_guest(conn: &Connection, id: i64) -> Result<Guest> {
    find_guest(conn, id)?.ok_or_else(|| RsvpError::not_found("guest", id))
}

pub fn list_guests(conn: &Connection) -> Result<Vec<Guest>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM guests ORDER BY last_name, first_name",
        GUEST_COLUMNS
    ))?;
    let guests = stmt
        .query_map([], Guest::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(guests)
}

pub fn update_guest_email(conn: &Connection, id: i64, email: &str) -> Result<Guest> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(RsvpError::InvalidParameter(format!(
            "{:?} is not a valid email address",
            email
        )));
    }

    let updated = conn
        .execute("UPDATE guests SET email = ?1 WHERE id = ?2", params![email, id])
        .map_err(|e| match RsvpError::from(e) {
            err if err.is_constraint_violation() => {
                RsvpError::Conflict(format!("email {:?} belongs to another guest", email))
            }
            err => err,
        })?;
    if updated == 0 {
        return Err(RsvpError::not_found("guest", id));
    }
    get_guest(conn, id)
}

pub fn set_plus_one_allowed(conn: &Connection, id: i64, allowed: bool) -> Result<Guest> {
    let updated = conn.execute(
        "UPDATE guests SET plus_one_allowed = ?1 WHERE id = ?2",
        params![allowed, id],
    )?;
    if updated == 0 {
        return Err(RsvpError::not_found("guest", id));
    }
    get_guest(conn, id)
}

// ============================================================================
// CSV IMPORT
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub inserted: usize,
    pub duplicates: usize,
}

pub fn load_guests_csv(csv_path: &Path) -> anyhow::Result<Vec<NewGuest>> {
    let rdr = csv::Reader::from_path(csv_path).context("Failed to open guest CSV file")?;
    read_guests(rdr)
}

pub fn read_guests<R: std::io::Read>(mut rdr: csv::Reader<R>) -> anyhow::Result<Vec<NewGuest>> {
    let mut guests = Vec::new();
    for (line, result) in rdr.deserialize::<NewGuest>().enumerate() {
        let guest =
            result.with_context(|| format!("Failed to deserialize guest on row {}", line + 1))?;
        guests.push(guest);
    }
    Ok(guests)
}

/// Insert guests, skipping rows whose e-mail is already registered
pub fn import_guests(conn: &Connection, guests: &[NewGuest]) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    for guest in guests {
        match insert_guest(conn, guest) {
            Ok(saved) => {
                stats.inserted += 1;
                record_event(
                    conn,
                    "guest_registered",
                    "guest",
                    &saved.id.to_string(),
                    serde_json::json!({ "source": "csv_import" }),
                );
            }
            Err(RsvpError::Conflict(_)) => stats.duplicates += 1,
            Err(e) => return Err(e),
        }
    }

    info!(
        "Guest import finished: {} inserted, {} duplicates skipped",
        stats.inserted, stats.duplicates
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_conn;

    #[test]
    fn test_insert_and_get() {
        let conn = test_conn();
        let guest = insert_guest(&conn, &NewGuest::new(" Jane ", "Doe").with_plus_one()).unwrap();

        assert_eq!(guest.first_name, "Jane");
        assert!(guest.plus_one_allowed);
        assert_eq!(get_guest(&conn, guest.id).unwrap(), guest);
        assert_eq!(guest.full_name(), "Jane Doe");
    }

    #[test]
    fn test_missing_guest() {
        let conn = test_conn();
        let err = get_guest(&conn, 999).unwrap_err();
        assert_eq!(err.key(), "guest.not_found");
    }

    #[test]
    fn test_duplicate_email_is_conflict() {
        let conn = test_conn();
        insert_guest(&conn, &NewGuest::new("Jane", "Doe").with_email("jane@example.com")).unwrap();
        let err = insert_guest(
            &conn,
            &NewGuest::new("Janet", "Doe").with_email("JANE@example.com"),
        )
        .unwrap_err();
        assert!(matches!(err, RsvpError::Conflict(_)));
    }

    #[test]
    fn test_update_email() {
        let conn = test_conn();
        let guest = insert_guest(&conn, &NewGuest::new("Sam", "Lee")).unwrap();

        let updated = update_guest_email(&conn, guest.id, "sam@example.com").unwrap();
        assert_eq!(updated.email.as_deref(), Some("sam@example.com"));

        assert!(matches!(
            update_guest_email(&conn, guest.id, "not-an-email"),
            Err(RsvpError::InvalidParameter(_))
        ));
        assert!(matches!(
            update_guest_email(&conn, 404, "x@example.com"),
            Err(RsvpError::NotFound { .. })
        ));
    }

    #[test]
    fn test_set_plus_one_allowed() {
        let conn = test_conn();
        let guest = insert_guest(&conn, &NewGuest::new("Sam", "Lee")).unwrap();
        assert!(set_plus_one_allowed(&conn, guest.id, true).unwrap().plus_one_allowed);
    }

    #[test]
    fn test_csv_import_skips_duplicates() {
        let conn = test_conn();
        let data = "\
first_name,last_name,email,phone,plus_one_allowed
Jane,Doe,jane@example.com,,yes
John,Smith,,555-0100,no
Jane,Doe,jane@example.com,,yes
";
        let guests = read_guests(csv::Reader::from_reader(data.as_bytes())).unwrap();
        assert_eq!(guests.len(), 3);
        assert!(guests[0].plus_one_allowed);
        assert_eq!(guests[1].email, None);

        let stats = import_guests(&conn, &guests).unwrap();
        assert_eq!(stats, ImportStats { inserted: 2, duplicates: 1 });

        // Re-importing a registered e-mail is a no-op
        let again = import_guests(&conn, &guests[..1]).unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(list_guests(&conn).unwrap().len(), 2);
    }

    #[test]
    fn test_csv_rejects_bad_flag() {
        let data = "first_name,last_name,email,phone,plus_one_allowed\nA,B,,,maybe\n";
        assert!(read_guests(csv::Reader::from_reader(data.as_bytes())).is_err());
    }
}
