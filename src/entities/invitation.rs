// 🎟️ Invitation Code Entity + row-level persistence
//
// Codes look like `WED-XXXXXX`. A guest may own any number of them
// (original + replacements); none are deleted automatically.

use crate::db::parse_timestamp;
use crate::error::{Result, RsvpError};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CODE TYPE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeType {
    /// First code issued to a guest
    Primary,

    /// Re-issued code for a guest who lost or needs a new one
    Replacement,

    /// Any other tag; `normalized` upper-cases it before it is stored
    Other(String),
}

impl CodeType {
    pub fn as_str(&self) -> &str {
        match self {
            CodeType::Primary => "PRIMARY",
            CodeType::Replacement => "REPLACEMENT",
            CodeType::Other(tag) => tag.as_str(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let tag = raw.trim().to_uppercase();
        match tag.as_str() {
            "" => Err(RsvpError::InvalidParameter(
                "code type must not be empty".to_string(),
            )),
            "PRIMARY" => Ok(CodeType::Primary),
            "REPLACEMENT" => Ok(CodeType::Replacement),
            _ => Ok(CodeType::Other(tag)),
        }
    }

    /// Canonical form of a possibly hand-built value (`Other("primary")` is `Primary`)
    pub fn normalized(&self) -> Result<Self> {
        match self {
            CodeType::Other(tag) => Self::parse(tag),
            known => Ok(known.clone()),
        }
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ============================================================================
// INVITATION CODE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvitationCode {
    pub id: i64,
    pub code: String,
    pub guest_id: i64,
    pub code_type: CodeType,
    pub created_at: DateTime<Utc>,
    pub expiry_at: DateTime<Utc>,
    pub used: bool,
}

impl InvitationCode {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry_at
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let code_type: String = row.get(3)?;
        let created_at: String = row.get(4)?;
        let expiry_at: String = row.get(5)?;

        Ok(InvitationCode {
            id: row.get(0)?,
            code: row.get(1)?,
            guest_id: row.get(2)?,
            code_type: CodeType::parse(&code_type).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
            })?,
            created_at: parse_timestamp(4, &created_at)?,
            expiry_at: parse_timestamp(5, &expiry_at)?,
            used: row.get(6)?,
        })
    }
}

/// Unsaved code; `insert_code` turns it into an `InvitationCode`
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvitationCode {
    pub code: String,
    pub guest_id: i64,
    pub code_type: CodeType,
    pub created_at: DateTime<Utc>,
    pub expiry_at: DateTime<Utc>,
}

const CODE_COLUMNS: &str = "id, code, guest_id, code_type, created_at, expiry_at, used";

/// Insert a code; a duplicate code string surfaces as a constraint violation
pub fn insert_code(conn: &Connection, new_code: &NewInvitationCode) -> Result<InvitationCode> {
    conn.execute(
        "INSERT INTO invitation_codes (code, guest_id, code_type, created_at, expiry_at, used)
         VALUES (?1, ?2, ?3, ?4, ?5, 0)",
        params![
            new_code.code,
            new_code.guest_id,
            new_code.code_type.as_str(),
            new_code.created_at.to_rfc3339(),
            new_code.expiry_at.to_rfc3339(),
        ],
    )?;

    Ok(InvitationCode {
        id: conn.last_insert_rowid(),
        code: new_code.code.clone(),
        guest_id: new_code.guest_id,
        code_type: new_code.code_type.clone(),
        created_at: new_code.created_at,
        expiry_at: new_code.expiry_at,
        used: false,
    })
}

pub fn code_exists(conn: &Connection, code: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM invitation_codes WHERE code = ?1",
        [code],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn find_code(conn: &Connection, code: &str) -> Result<Option<InvitationCode>> {
    let found = conn
        .query_row(
            &format!("SELECT {} FROM invitation_codes WHERE code = ?1", CODE_COLUMNS),
            [code],
            InvitationCode::from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn get_codes_for_guest(conn: &Connection, guest_id: i64) -> Result<Vec<InvitationCode>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM invitation_codes WHERE guest_id = ?1 ORDER BY created_at, id",
        CODE_COLUMNS
    ))?;
    let codes = stmt
        .query_map([guest_id], InvitationCode::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(codes)
}

pub fn set_code_used(conn: &Connection, code: &str) -> Result<()> {
    let updated = conn.execute(
        "UPDATE invitation_codes SET used = 1 WHERE code = ?1",
        [code],
    )?;
    if updated == 0 {
        return Err(RsvpError::InvalidCode(code.to_string()));
    }
    Ok(())
}

/// Expire and mark used every code of a guest; returns how many rows changed
pub fn expire_codes_for_guest(
    conn: &Connection,
    guest_id: i64,
    expiry_at: DateTime<Utc>,
) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE invitation_codes SET expiry_at = ?1, used = 1 WHERE guest_id = ?2",
        params![expiry_at.to_rfc3339(), guest_id],
    )?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_type_parse() {
        assert_eq!(CodeType::parse("primary").unwrap(), CodeType::Primary);
        assert_eq!(CodeType::parse("REPLACEMENT").unwrap(), CodeType::Replacement);
        assert_eq!(
            CodeType::parse(" plus_one ").unwrap(),
            CodeType::Other("PLUS_ONE".to_string())
        );
        assert_eq!(CodeType::Other("PLUS_ONE".into()).to_string(), "PLUS_ONE");
    }

    #[test]
    fn test_empty_code_type_is_rejected() {
        assert!(matches!(CodeType::parse(""), Err(RsvpError::InvalidParameter(_))));
        assert!(matches!(CodeType::parse("   "), Err(RsvpError::InvalidParameter(_))));
        assert!(matches!(
            CodeType::Other(String::new()).normalized(),
            Err(RsvpError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_hand_built_tags_are_normalized() {
        assert_eq!(
            CodeType::Other("plus_one".into()).normalized().unwrap(),
            CodeType::Other("PLUS_ONE".into())
        );
        assert_eq!(
            CodeType::Other(" primary ".into()).normalized().unwrap(),
            CodeType::Primary
        );
        assert_eq!(CodeType::Replacement.normalized().unwrap(), CodeType::Replacement);
    }

    #[test]
    fn test_expiry_is_strict() {
        let now = Utc::now();
        let code = InvitationCode {
            id: 1,
            code: "WED-ABC123".to_string(),
            guest_id: 1,
            code_type: CodeType::Primary,
            created_at: now,
            expiry_at: now,
            used: false,
        };
        assert!(!code.is_expired_at(now));
        assert!(code.is_expired_at(now + chrono::Duration::seconds(1)));
    }
}
