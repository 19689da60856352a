// 📧 Notification collaborator
//
// The core only asks for a confirmation to be sent; rendering and
// delivery belong to the implementation behind the trait.

use crate::entities::guest::Guest;
use crate::entities::rsvp::Rsvp;
use log::info;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Guest {0} has no email address")]
    NoRecipient(i64),

    #[error("Failed to send confirmation: {0}")]
    SendFailed(String),
}

pub trait Notifier: Send + Sync {
    fn send_rsvp_confirmation(&self, rsvp: &Rsvp, guest: &Guest) -> Result<(), NotificationError>;
}

/// Logs the confirmation instead of delivering it
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send_rsvp_confirmation(&self, rsvp: &Rsvp, guest: &Guest) -> Result<(), NotificationError> {
        let email = guest
            .email
            .as_deref()
            .ok_or(NotificationError::NoRecipient(guest.id))?;

        info!(
            "RSVP confirmation for {} <{}>: attending={}, plus_one={:?}",
            guest.full_name(),
            email,
            rsvp.attending,
            rsvp.plus_one_name
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn guest(email: Option<&str>) -> Guest {
        Guest {
            id: 3,
            first_name: "Ana".into(),
            last_name: "Ruiz".into(),
            email: email.map(str::to_string),
            phone: None,
            plus_one_allowed: false,
            created_at: Utc::now(),
        }
    }

    fn rsvp() -> Rsvp {
        Rsvp {
            id: 1,
            guest_id: 3,
            attending: true,
            plus_one: false,
            plus_one_name: None,
            dietary_restrictions: None,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn test_log_notifier_requires_email() {
        let notifier = LogNotifier;
        assert!(notifier.send_rsvp_confirmation(&rsvp(), &guest(Some("ana@example.com"))).is_ok());
        assert!(matches!(
            notifier.send_rsvp_confirmation(&rsvp(), &guest(None)),
            Err(NotificationError::NoRecipient(3))
        ));
    }
}
