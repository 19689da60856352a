// 👨‍👩‍👧 Family Membership Store
//
// Plain persistence for family groups and their rosters. Capacity and
// matching rules live in the reconciler, not here.

use crate::entities::family::{FamilyGroup, FamilyMember};
use crate::entities::guest::get_guest;
use crate::error::{Result, RsvpError};
use chrono::Utc;
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<FamilyGroup> {
    Ok(FamilyGroup {
        id: row.get(0)?,
        name: row.get(1)?,
        max_attendees: row.get(2)?,
        primary_contact_id: row.get(3)?,
    })
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<FamilyMember> {
    Ok(FamilyMember {
        id: Some(row.get(0)?),
        family_group_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        age_group: row.get(4)?,
        is_attending: row.get(5)?,
        dietary_restrictions: row.get(6)?,
    })
}

/// Create a family group owned by `primary_contact_id`
///
/// A guest can be primary contact of at most one group.
pub fn create_group(
    conn: &Connection,
    name: &str,
    primary_contact_id: i64,
    max_attendees: u32,
) -> Result<FamilyGroup> {
    if max_attendees < 1 {
        return Err(RsvpError::InvalidParameter(
            "max_attendees must be at least 1".to_string(),
        ));
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(RsvpError::InvalidParameter(
            "family group name is required".to_string(),
        ));
    }

    get_guest(conn, primary_contact_id)?;

    if let Some(existing) = find_group_by_primary(conn, primary_contact_id)? {
        return Err(RsvpError::Conflict(format!(
            "guest {} is already primary contact of family group {}",
            primary_contact_id, existing.id
        )));
    }

    conn.execute(
        "INSERT INTO family_groups (name, max_attendees, primary_contact_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![name, max_attendees, primary_contact_id, Utc::now().to_rfc3339()],
    )
    .map_err(|e| match RsvpError::from(e) {
        // Lost a race with a concurrent create for the same guest
        err if err.is_constraint_violation() => RsvpError::Conflict(format!(
            "guest {} is already primary contact of a family group",
            primary_contact_id
        )),
        err => err,
    })?;

    let group = get_group(conn, conn.last_insert_rowid())?;
    info!(
        "Created family group {} ({}) for guest {} with capacity {}",
        group.id, group.name, primary_contact_id, max_attendees
    );
    Ok(group)
}

pub fn find_group(conn: &Connection, id: i64) -> Result<Option<FamilyGroup>> {
    let group = conn
        .query_row(
            "SELECT id, name, max_attendees, primary_contact_id FROM family_groups WHERE id = ?1",
            [id],
            group_from_row,
        )
        .optional()?;
    Ok(group)
}

pub fn get_group(conn: &Connection, id: i64) -> Result<FamilyGroup> {
    find_group(conn, id)?.ok_or_else(|| RsvpError::not_found("family_group", id))
}

pub fn find_group_by_primary(conn: &Connection, guest_id: i64) -> Result<Option<FamilyGroup>> {
    let group = conn
        .query_row(
            "SELECT id, name, max_attendees, primary_contact_id
             FROM family_groups WHERE primary_contact_id = ?1",
            [guest_id],
            group_from_row,
        )
        .optional()?;
    Ok(group)
}

pub fn list_members(conn: &Connection, group_id: i64) -> Result<Vec<FamilyMember>> {
    let mut stmt = conn.prepare(
        "SELECT id, family_group_id, first_name, last_name, age_group, is_attending,
                dietary_restrictions
         FROM family_members
         WHERE family_group_id = ?1
         ORDER BY id",
    )?;
    let members = stmt
        .query_map([group_id], member_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(members)
}

/// Attach a single member to a group (administrative roster seeding)
pub fn add_member(conn: &Connection, member: &FamilyMember) -> Result<FamilyMember> {
    get_group(conn, member.family_group_id)?;
    let mut saved = member.clone();
    saved.id = None;
    save_member(conn, &mut saved)?;
    Ok(saved)
}

/// Persist one member: insert when it has no id, update otherwise
pub fn save_member(conn: &Connection, member: &mut FamilyMember) -> Result<()> {
    match member.id {
        Some(id) => {
            let updated = conn.execute(
                "UPDATE family_members
                 SET first_name = ?1, last_name = ?2, age_group = ?3, is_attending = ?4,
                     dietary_restrictions = ?5
                 WHERE id = ?6 AND family_group_id = ?7",
                params![
                    member.first_name,
                    member.last_name,
                    member.age_group,
                    member.is_attending,
                    member.dietary_restrictions,
                    id,
                    member.family_group_id,
                ],
            )?;
            if updated == 0 {
                return Err(RsvpError::not_found("family_member", id));
            }
        }
        None => {
            conn.execute(
                "INSERT INTO family_members (family_group_id, first_name, last_name, age_group,
                                             is_attending, dietary_restrictions)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    member.family_group_id,
                    member.first_name,
                    member.last_name,
                    member.age_group,
                    member.is_attending,
                    member.dietary_restrictions,
                ],
            )?;
            member.id = Some(conn.last_insert_rowid());
        }
    }
    Ok(())
}

/// Bulk save; new members come back with their assigned ids
pub fn save_members(conn: &Connection, members: &mut [FamilyMember]) -> Result<()> {
    for member in members.iter_mut() {
        save_member(conn, member)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::guest::{insert_guest, NewGuest};
    use crate::test_support::test_conn;

    #[test]
    fn test_create_and_fetch_group() {
        let conn = test_conn();
        let guest = insert_guest(&conn, &NewGuest::new("Maria", "Lopez")).unwrap();

        let group = create_group(&conn, "The Lopez Family", guest.id, 4).unwrap();

        assert_eq!(get_group(&conn, group.id).unwrap(), group);
        assert_eq!(find_group_by_primary(&conn, guest.id).unwrap(), Some(group));
    }

    #[test]
    fn test_primary_contact_owns_one_group() {
        let conn = test_conn();
        let guest = insert_guest(&conn, &NewGuest::new("Maria", "Lopez")).unwrap();
        create_group(&conn, "Lopez", guest.id, 4).unwrap();

        let err = create_group(&conn, "Lopez again", guest.id, 2).unwrap_err();
        assert!(matches!(err, RsvpError::Conflict(_)));
    }

    #[test]
    fn test_group_validation() {
        let conn = test_conn();
        let guest = insert_guest(&conn, &NewGuest::new("Maria", "Lopez")).unwrap();

        assert!(matches!(
            create_group(&conn, "Lopez", guest.id, 0),
            Err(RsvpError::InvalidParameter(_))
        ));
        assert!(matches!(
            create_group(&conn, "Nobody", 999, 2),
            Err(RsvpError::NotFound { entity: "guest", .. })
        ));
        assert!(matches!(
            get_group(&conn, 999),
            Err(RsvpError::NotFound { entity: "family_group", .. })
        ));
    }

    #[test]
    fn test_save_members_assigns_ids_and_updates() {
        let conn = test_conn();
        let guest = insert_guest(&conn, &NewGuest::new("Maria", "Lopez")).unwrap();
        let group = create_group(&conn, "Lopez", guest.id, 4).unwrap();

        let mut members = vec![
            FamilyMember::new(group.id, "Ana", "Lopez", "Adult"),
            FamilyMember::new(group.id, "Tomas", "Lopez", "child"),
        ];
        save_members(&conn, &mut members).unwrap();
        assert!(members.iter().all(|m| m.id.is_some()));

        members[1].is_attending = true;
        members[1].dietary_restrictions = Some("no nuts".into());
        save_members(&conn, &mut members).unwrap();

        let stored = list_members(&conn, group.id).unwrap();
        assert_eq!(stored, members);
    }

    #[test]
    fn test_save_member_rejects_foreign_id() {
        let conn = test_conn();
        let a = insert_guest(&conn, &NewGuest::new("A", "One")).unwrap();
        let b = insert_guest(&conn, &NewGuest::new("B", "Two")).unwrap();
        let group_a = create_group(&conn, "One", a.id, 3).unwrap();
        let group_b = create_group(&conn, "Two", b.id, 3).unwrap();

        let member = add_member(&conn, &FamilyMember::new(group_a.id, "Kid", "One", "child")).unwrap();

        let mut moved = member.clone();
        moved.family_group_id = group_b.id;
        assert!(matches!(
            save_member(&conn, &mut moved),
            Err(RsvpError::NotFound { entity: "family_member", .. })
        ));
    }
}
