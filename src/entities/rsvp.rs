// 💌 RSVP Entity (one per guest)

use crate::db::parse_timestamp;
use crate::error::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rsvp {
    pub id: i64,
    pub guest_id: i64,
    pub attending: bool,
    pub plus_one: bool,
    pub plus_one_name: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl Rsvp {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let submitted_at: String = row.get(6)?;
        Ok(Rsvp {
            id: row.get(0)?,
            guest_id: row.get(1)?,
            attending: row.get(2)?,
            plus_one: row.get(3)?,
            plus_one_name: row.get(4)?,
            dietary_restrictions: row.get(5)?,
            submitted_at: parse_timestamp(6, &submitted_at)?,
        })
    }
}

/// Values written by an RSVP upsert
#[derive(Debug, Clone, PartialEq)]
pub struct RsvpValues {
    pub attending: bool,
    pub plus_one_name: Option<String>,
    pub dietary_restrictions: Option<String>,
}

/// Result of an upsert; `created` comes from the store, not from inspecting ids
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRsvp {
    pub rsvp: Rsvp,
    pub created: bool,
}

const RSVP_COLUMNS: &str =
    "id, guest_id, attending, plus_one, plus_one_name, dietary_restrictions, submitted_at";

pub fn find_rsvp_for_guest(conn: &Connection, guest_id: i64) -> Result<Option<Rsvp>> {
    let rsvp = conn
        .query_row(
            &format!("SELECT {} FROM rsvps WHERE guest_id = ?1", RSVP_COLUMNS),
            [guest_id],
            Rsvp::from_row,
        )
        .optional()?;
    Ok(rsvp)
}

/// Insert or replace the guest's RSVP
pub fn upsert_rsvp(conn: &Connection, guest_id: i64, values: &RsvpValues) -> Result<SavedRsvp> {
    let now = Utc::now().to_rfc3339();
    let plus_one = values.plus_one_name.is_some();

    let existing: Option<i64> = conn
        .query_row("SELECT id FROM rsvps WHERE guest_id = ?1", [guest_id], |row| {
            row.get(0)
        })
        .optional()?;

    let created = match existing {
        Some(id) => {
            conn.execute(
                "UPDATE rsvps
                 SET attending = ?1, plus_one = ?2, plus_one_name = ?3,
                     dietary_restrictions = ?4, submitted_at = ?5
                 WHERE id = ?6",
                params![
                    values.attending,
                    plus_one,
                    values.plus_one_name,
                    values.dietary_restrictions,
                    now,
                    id,
                ],
            )?;
            false
        }
        None => {
            conn.execute(
                "INSERT INTO rsvps (guest_id, attending, plus_one, plus_one_name,
                                    dietary_restrictions, submitted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    guest_id,
                    values.attending,
                    plus_one,
                    values.plus_one_name,
                    values.dietary_restrictions,
                    now,
                ],
            )?;
            true
        }
    };

    let rsvp = conn.query_row(
        &format!("SELECT {} FROM rsvps WHERE guest_id = ?1", RSVP_COLUMNS),
        [guest_id],
        Rsvp::from_row,
    )?;

    Ok(SavedRsvp { rsvp, created })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::guest::{insert_guest, NewGuest};
    use crate::test_support::test_conn;

    #[test]
    fn test_upsert_reports_created_then_updated() {
        let conn = test_conn();
        let guest = insert_guest(&conn, &NewGuest::new("Ana", "Ruiz")).unwrap();

        let first = upsert_rsvp(
            &conn,
            guest.id,
            &RsvpValues {
                attending: true,
                plus_one_name: Some("Luis".into()),
                dietary_restrictions: None,
            },
        )
        .unwrap();
        assert!(first.created);
        assert!(first.rsvp.plus_one);

        let second = upsert_rsvp(
            &conn,
            guest.id,
            &RsvpValues {
                attending: false,
                plus_one_name: None,
                dietary_restrictions: Some("vegan".into()),
            },
        )
        .unwrap();
        assert!(!second.created);
        assert_eq!(second.rsvp.id, first.rsvp.id);
        assert!(!second.rsvp.plus_one);
        assert_eq!(
            find_rsvp_for_guest(&conn, guest.id).unwrap().unwrap().dietary_restrictions,
            Some("vegan".to_string())
        );
    }
}
