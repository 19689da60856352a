// 🎟️ Invitation Registry - issue, validate, expire and replace codes
//
// Allocation is a bounded loop: pre-check, then insert. The UNIQUE(code)
// constraint is the real guard; a violation on insert just costs one
// attempt, so two concurrent issuers can never persist the same code.

use crate::codes::{normalize_code, CodeGenerator};
use crate::config::Config;
use crate::db::record_event;
use crate::entities::guest::{get_guest, Guest};
use crate::entities::invitation::{
    code_exists, expire_codes_for_guest, find_code, get_codes_for_guest, insert_code,
    set_code_used, CodeType, InvitationCode, NewInvitationCode,
};
use crate::error::{Result, RsvpError};
use chrono::{Duration, Months, Utc};
use log::{debug, info, warn};
use rusqlite::Connection;

pub struct InvitationRegistry {
    generator: CodeGenerator,
    validity_months: u32,
    max_attempts: u32,
}

impl InvitationRegistry {
    pub fn new() -> Self {
        Self::with_generator(CodeGenerator::new())
    }

    pub fn with_generator(generator: CodeGenerator) -> Self {
        InvitationRegistry {
            generator,
            validity_months: crate::config::DEFAULT_CODE_VALIDITY_MONTHS,
            max_attempts: crate::config::DEFAULT_CODE_MAX_ATTEMPTS,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        InvitationRegistry {
            generator: CodeGenerator::new(),
            validity_months: config.code_validity_months,
            max_attempts: config.code_max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Issue a fresh, unused code valid for the configured period (3 years by default)
    pub fn issue(&self, conn: &Connection, guest_id: i64, code_type: CodeType) -> Result<InvitationCode> {
        let code_type = code_type.normalized()?;
        let guest = get_guest(conn, guest_id)?;

        for attempt in 1..=self.max_attempts {
            let candidate = self.generator.generate();

            if code_exists(conn, &candidate)? {
                debug!("Code {} already taken (attempt {})", candidate, attempt);
                continue;
            }

            let created_at = Utc::now();
            let expiry_at = created_at
                .checked_add_months(Months::new(self.validity_months))
                .ok_or_else(|| {
                    RsvpError::InvalidParameter(format!(
                        "validity of {} months overflows the calendar",
                        self.validity_months
                    ))
                })?;

            let new_code = NewInvitationCode {
                code: candidate,
                guest_id: guest.id,
                code_type: code_type.clone(),
                created_at,
                expiry_at,
            };

            match insert_code(conn, &new_code) {
                Ok(code) => {
                    info!(
                        "Issued {} code {} for guest {}",
                        code.code_type, code.code, guest.id
                    );
                    record_event(
                        conn,
                        "code_issued",
                        "guest",
                        &guest.id.to_string(),
                        serde_json::json!({
                            "code": code.code,
                            "code_type": code.code_type.as_str(),
                            "expiry_at": code.expiry_at.to_rfc3339(),
                        }),
                    );
                    return Ok(code);
                }
                Err(e) if e.is_constraint_violation() => {
                    warn!(
                        "Code {} collided on insert (attempt {}), retrying",
                        new_code.code, attempt
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(RsvpError::CodeSpaceExhausted {
            attempts: self.max_attempts,
        })
    }

    pub fn issue_replacement(&self, conn: &Connection, guest_id: i64) -> Result<InvitationCode> {
        self.issue(conn, guest_id, CodeType::Replacement)
    }

    /// Resolve a code to its guest
    ///
    /// Expired codes fail; the `used` flag is deliberately not consulted.
    pub fn validate(&self, conn: &Connection, code: &str) -> Result<Guest> {
        let code = normalize_code(code);
        let record = find_code(conn, &code)?.ok_or_else(|| RsvpError::InvalidCode(code.clone()))?;

        if record.is_expired_at(Utc::now()) {
            debug!("Rejected expired code {} for guest {}", code, record.guest_id);
            return Err(RsvpError::ExpiredCode(code));
        }

        get_guest(conn, record.guest_id)
    }

    pub fn mark_used(&self, conn: &Connection, code: &str) -> Result<()> {
        let code = normalize_code(code);
        set_code_used(conn, &code)?;
        record_event(
            conn,
            "code_used",
            "invitation_code",
            &code,
            serde_json::json!({}),
        );
        Ok(())
    }

    /// Every code the guest owns, regardless of expiry or use
    pub fn list_for_guest(&self, conn: &Connection, guest_id: i64) -> Result<Vec<InvitationCode>> {
        get_guest(conn, guest_id)?;
        get_codes_for_guest(conn, guest_id)
    }

    /// Revoke all of a guest's codes: expiry moves to one day ago, `used` is set
    pub fn invalidate_all(&self, conn: &Connection, guest_id: i64) -> Result<usize> {
        get_guest(conn, guest_id)?;
        let revoked = expire_codes_for_guest(conn, guest_id, Utc::now() - Duration::days(1))?;

        info!("Revoked {} codes for guest {}", revoked, guest_id);
        record_event(
            conn,
            "codes_invalidated",
            "guest",
            &guest_id.to_string(),
            serde_json::json!({ "count": revoked }),
        );
        Ok(revoked)
    }
}

impl Default for InvitationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
