// ⚠️ Error taxonomy for the RSVP core
//
// Every surfaced error carries a stable key so the HTTP layer (and any
// other caller) can map it to a client-facing status without parsing
// messages.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RsvpError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid invitation code: {0}")]
    InvalidCode(String),

    #[error("Invitation code expired: {0}")]
    ExpiredCode(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Requested {requested} attendees but family group allows at most {max_attendees}")]
    CapacityExceeded { requested: u32, max_attendees: u32 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Could not allocate a unique invitation code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, RsvpError>;

impl RsvpError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        RsvpError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable key used for client-facing status mapping and catalog lookups
    pub fn key(&self) -> &'static str {
        match self {
            RsvpError::NotFound { entity, .. } => match *entity {
                "guest" => "guest.not_found",
                "family_group" => "family_group.not_found",
                "family_member" => "family_member.not_found",
                "invitation_code" => "invitation_code.not_found",
                "rsvp" => "rsvp.not_found",
                _ => "resource.not_found",
            },
            RsvpError::InvalidCode(_) => "invitation_code.invalid",
            RsvpError::ExpiredCode(_) => "invitation_code.expired",
            RsvpError::Conflict(_) => "conflict",
            RsvpError::CapacityExceeded { .. } => "rsvp.capacity_exceeded",
            RsvpError::InvalidParameter(_) => "invalid_parameter",
            RsvpError::CodeSpaceExhausted { .. } => "invitation_code.exhausted",
            RsvpError::DatabaseError(_) => "database_error",
        }
    }

    /// HTTP status class for this error
    pub fn status_code(&self) -> u16 {
        match self {
            RsvpError::NotFound { .. } | RsvpError::InvalidCode(_) => 404,
            RsvpError::ExpiredCode(_) => 410,
            RsvpError::Conflict(_) => 409,
            RsvpError::CapacityExceeded { .. } | RsvpError::InvalidParameter(_) => 400,
            RsvpError::CodeSpaceExhausted { .. } | RsvpError::DatabaseError(_) => 500,
        }
    }

    /// True when the underlying cause is a SQLite constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            RsvpError::DatabaseError(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_keys_are_stable() {
        assert_eq!(RsvpError::not_found("guest", 7).key(), "guest.not_found");
        assert_eq!(
            RsvpError::not_found("family_member", 3).key(),
            "family_member.not_found"
        );
        assert_eq!(
            RsvpError::InvalidCode("WED-XXXXXX".into()).key(),
            "invitation_code.invalid"
        );
        assert_eq!(
            RsvpError::CapacityExceeded {
                requested: 4,
                max_attendees: 3
            }
            .key(),
            "rsvp.capacity_exceeded"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(RsvpError::not_found("guest", 1).status_code(), 404);
        assert_eq!(RsvpError::ExpiredCode("x".into()).status_code(), 410);
        assert_eq!(RsvpError::Conflict("x".into()).status_code(), 409);
        assert_eq!(
            RsvpError::CapacityExceeded {
                requested: 3,
                max_attendees: 2
            }
            .status_code(),
            400
        );
        assert_eq!(
            RsvpError::DatabaseError(rusqlite::Error::QueryReturnedNoRows).status_code(),
            500
        );
    }

    #[test]
    fn test_capacity_message() {
        let err = RsvpError::CapacityExceeded {
            requested: 4,
            max_attendees: 3,
        };
        assert_eq!(
            err.to_string(),
            "Requested 4 attendees but family group allows at most 3"
        );
    }
}
