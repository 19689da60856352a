// 💌 RSVP Orchestrator
//
// Validates the invitation code, classifies the guest, runs the family
// or solo path inside one IMMEDIATE transaction (SQLite grabs the write
// lock up front, so two submissions for the same group serialize), then
// asks the notifier for a confirmation once the data is committed.

use crate::db::record_event;
use crate::entities::family::{FamilyGroup, FamilyMember, MemberEntry};
use crate::entities::guest::{get_guest, update_guest_email, Guest};
use crate::entities::rsvp::{upsert_rsvp, Rsvp, RsvpValues, SavedRsvp};
use crate::error::{Result, RsvpError};
use crate::family::{find_group_by_primary, get_group, list_members, save_members};
use crate::invitations::InvitationRegistry;
use crate::notification::Notifier;
use crate::reconciler::{RsvpReconciler, SkippedEntry};
use log::{debug, info, warn};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuestKind {
    Solo,
    SoloWithPlusOne,
    FamilyPrimary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpSubmission {
    pub code: String,
    pub attending: bool,
    #[serde(default)]
    pub plus_one_name: Option<String>,
    #[serde(default)]
    pub dietary_restrictions: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub members: Vec<MemberEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSummary {
    pub family_group_id: i64,
    pub group_name: String,
    pub max_attendees: u32,

    /// Primary contact + attending members
    pub total_attendees: u32,
    pub members: Vec<FamilyMember>,
    pub skipped: Vec<SkippedEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpOutcome {
    pub guest: Guest,
    pub kind: GuestKind,
    pub rsvp: Rsvp,
    pub created: bool,
    pub roster: Option<RosterSummary>,
    pub notification_sent: bool,
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// A linked family group wins over plus-one eligibility
pub fn classify(conn: &Connection, guest: &Guest) -> Result<(GuestKind, Option<FamilyGroup>)> {
    if let Some(group) = find_group_by_primary(conn, guest.id)? {
        return Ok((GuestKind::FamilyPrimary, Some(group)));
    }
    if guest.plus_one_allowed {
        Ok((GuestKind::SoloWithPlusOne, None))
    } else {
        Ok((GuestKind::Solo, None))
    }
}

fn clean_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

pub struct RsvpOrchestrator {
    registry: InvitationRegistry,
    reconciler: RsvpReconciler,
    notifier: Box<dyn Notifier>,
}

impl RsvpOrchestrator {
    pub fn new(registry: InvitationRegistry, notifier: Box<dyn Notifier>) -> Self {
        RsvpOrchestrator {
            registry,
            reconciler: RsvpReconciler::new(),
            notifier,
        }
    }

    pub fn registry(&self) -> &InvitationRegistry {
        &self.registry
    }

    /// Full code-driven RSVP: validate, classify, reconcile or upsert, notify
    pub fn submit(&self, conn: &mut Connection, submission: &RsvpSubmission) -> Result<RsvpOutcome> {
        // Bad codes are turned away before the write lock is taken
        self.registry.validate(conn, &submission.code)?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Re-read under the lock; the code may have been revoked meanwhile
        let mut guest = self.registry.validate(&tx, &submission.code)?;
        if let Some(email) = clean_text(submission.email.as_deref()) {
            if guest.email.as_deref() != Some(email.as_str()) {
                guest = update_guest_email(&tx, guest.id, &email)?;
            }
        }

        let (kind, group) = classify(&tx, &guest)?;
        debug!("Guest {} classified as {:?}", guest.id, kind);

        let dietary = clean_text(submission.dietary_restrictions.as_deref());
        let (saved, roster) = match group {
            Some(group) => {
                if submission.plus_one_name.is_some() {
                    debug!(
                        "Ignoring plus-one name for family primary {}; members carry extra guests",
                        guest.id
                    );
                }
                let roster = self.reconcile_family(&tx, &group, &submission.members)?;
                let saved = upsert_rsvp(
                    &tx,
                    guest.id,
                    &RsvpValues {
                        attending: submission.attending,
                        plus_one_name: None,
                        dietary_restrictions: dietary,
                    },
                )?;
                (saved, Some(roster))
            }
            None => {
                let saved = self.upsert_solo(
                    &tx,
                    &guest,
                    submission.attending,
                    submission.plus_one_name.as_deref(),
                    dietary.as_deref(),
                )?;
                (saved, None)
            }
        };

        record_event(
            &tx,
            "rsvp_submitted",
            "guest",
            &guest.id.to_string(),
            serde_json::json!({
                "kind": kind,
                "attending": saved.rsvp.attending,
                "created": saved.created,
                "members": roster.as_ref().map(|r| r.members.len()),
            }),
        );

        tx.commit()?;
        info!(
            "RSVP {} for guest {} ({:?}, attending: {})",
            if saved.created { "created" } else { "updated" },
            guest.id,
            kind,
            saved.rsvp.attending
        );

        let notification_sent = self.notify(&saved.rsvp, &guest);

        Ok(RsvpOutcome {
            guest,
            kind,
            rsvp: saved.rsvp,
            created: saved.created,
            roster,
            notification_sent,
        })
    }

    /// Reconcile a family group's roster against a full submission
    pub fn submit_family_rsvp(
        &self,
        conn: &mut Connection,
        family_group_id: i64,
        entries: &[MemberEntry],
    ) -> Result<RosterSummary> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let group = get_group(&tx, family_group_id)?;
        let roster = self.reconcile_family(&tx, &group, entries)?;

        tx.commit()?;
        Ok(roster)
    }

    /// Single-guest RSVP upsert
    pub fn submit_solo_rsvp(
        &self,
        conn: &mut Connection,
        guest_id: i64,
        attending: bool,
        plus_one_name: Option<&str>,
        dietary: Option<&str>,
    ) -> Result<SavedRsvp> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let guest = get_guest(&tx, guest_id)?;
        let saved = self.upsert_solo(&tx, &guest, attending, plus_one_name, dietary)?;
        record_event(
            &tx,
            "rsvp_submitted",
            "guest",
            &guest.id.to_string(),
            serde_json::json!({ "attending": attending, "created": saved.created }),
        );

        tx.commit()?;
        self.notify(&saved.rsvp, &guest);
        Ok(saved)
    }

    fn reconcile_family(
        &self,
        conn: &Connection,
        group: &FamilyGroup,
        entries: &[MemberEntry],
    ) -> Result<RosterSummary> {
        let current = list_members(conn, group.id)?;
        let mut result = self.reconciler.reconcile(group, current, entries)?;

        save_members(conn, &mut result.members)?;

        let attending = result.attending_members();
        let total_attendees = u32::try_from(attending).unwrap_or(u32::MAX).saturating_add(1);

        record_event(
            conn,
            "family_rsvp_reconciled",
            "family_group",
            &group.id.to_string(),
            serde_json::json!({
                "requested": result.requested_attendees,
                "attending_members": attending,
                "skipped": result.skipped.len(),
            }),
        );
        info!(
            "Family group {} reconciled: {} members, {} attending, {} skipped",
            group.id,
            result.members.len(),
            attending,
            result.skipped.len()
        );

        Ok(RosterSummary {
            family_group_id: group.id,
            group_name: group.name.clone(),
            max_attendees: group.max_attendees,
            total_attendees,
            members: result.members,
            skipped: result.skipped,
        })
    }

    fn upsert_solo(
        &self,
        conn: &Connection,
        guest: &Guest,
        attending: bool,
        plus_one_name: Option<&str>,
        dietary: Option<&str>,
    ) -> Result<SavedRsvp> {
        let plus_one_name = clean_text(plus_one_name);
        if plus_one_name.is_some() && !guest.plus_one_allowed {
            return Err(RsvpError::InvalidParameter(format!(
                "guest {} is not allowed a plus-one",
                guest.id
            )));
        }

        upsert_rsvp(
            conn,
            guest.id,
            &RsvpValues {
                attending,
                // A declined invitation cannot bring anyone along
                plus_one_name: if attending { plus_one_name } else { None },
                dietary_restrictions: clean_text(dietary),
            },
        )
    }

    /// Best effort; returns whether the notifier reported success
    fn notify(&self, rsvp: &Rsvp, guest: &Guest) -> bool {
        match self.notifier.send_rsvp_confirmation(rsvp, guest) {
            Ok(()) => true,
            Err(e) => {
                warn!("RSVP confirmation for guest {} not sent: {}", guest.id, e);
                false
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
