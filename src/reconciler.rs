// ⚖️ RSVP Reconciler - merge a family submission into the stored roster
//
// Order matters:
//   1. capacity pre-flight (1 primary contact + attending entries <= max)
//   2. reset every stored member to not attending, dietary cleared
//   3. merge each entry by explicit id, else by case-insensitive name,
//      else as a new member
//
// The submission is a full replacement of attendance intent, so anyone
// left out ends up not attending. Entries that cannot be resolved are
// logged and skipped; their siblings still apply.
//
// Reconciliation is storage-free: the caller loads the roster, calls
// `reconcile`, and persists `Reconciliation::members` in one transaction.

use crate::entities::family::{normalize_age_group, FamilyGroup, FamilyMember, MemberEntry};
use crate::error::{Result, RsvpError};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

// ============================================================================
// RECONCILIATION OUTPUT
// ============================================================================

/// An entry that could not be applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedEntry {
    /// Position in the submitted list
    pub index: usize,
    pub error_key: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Full new roster: every previously stored member plus new ones (id = None)
    pub members: Vec<FamilyMember>,
    pub skipped: Vec<SkippedEntry>,

    /// Primary contact + attending entries, as checked against capacity
    pub requested_attendees: u32,
}

impl Reconciliation {
    pub fn attending_members(&self) -> usize {
        self.members.iter().filter(|m| m.is_attending).count()
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

pub struct RsvpReconciler;

impl RsvpReconciler {
    pub fn new() -> Self {
        RsvpReconciler
    }

    /// 1 (primary contact always counts) + attending entries
    pub fn requested_attendees(&self, entries: &[MemberEntry]) -> u32 {
        let attending = entries.iter().filter(|e| e.is_attending).count();
        u32::try_from(attending).unwrap_or(u32::MAX).saturating_add(1)
    }

    /// Pre-flight check; runs before anything is mutated
    pub fn check_capacity(&self, group: &FamilyGroup, entries: &[MemberEntry]) -> Result<u32> {
        let requested = self.requested_attendees(entries);
        if requested > group.max_attendees {
            return Err(RsvpError::CapacityExceeded {
                requested,
                max_attendees: group.max_attendees,
            });
        }
        Ok(requested)
    }

    /// Compute the group's new roster from its current members and a submission
    pub fn reconcile(
        &self,
        group: &FamilyGroup,
        current: Vec<FamilyMember>,
        entries: &[MemberEntry],
    ) -> Result<Reconciliation> {
        let requested_attendees = self.check_capacity(group, entries)?;

        // Reset pass
        let mut members: Vec<FamilyMember> = current
            .into_iter()
            .filter(|m| m.family_group_id == group.id)
            .map(|mut m| {
                m.is_attending = false;
                m.dietary_restrictions = None;
                m
            })
            .collect();

        // Merge pass
        let mut skipped = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            match self.merge_entry(group, &mut members, entry) {
                Ok(slot) => debug!(
                    "Family group {}: entry {} -> {} (attending: {})",
                    group.id,
                    index,
                    members[slot].full_name(),
                    entry.is_attending
                ),
                Err(e) => {
                    warn!(
                        "Family group {}: skipping entry {} ({} {}): {}",
                        group.id, index, entry.first_name, entry.last_name, e
                    );
                    skipped.push(SkippedEntry {
                        index,
                        error_key: e.key().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(Reconciliation {
            members,
            skipped,
            requested_attendees,
        })
    }

    /// Resolve the target member for one entry and apply it; returns its slot
    fn merge_entry(
        &self,
        group: &FamilyGroup,
        members: &mut Vec<FamilyMember>,
        entry: &MemberEntry,
    ) -> Result<usize> {
        let first_name = entry.first_name.trim();
        let last_name = entry.last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(RsvpError::InvalidParameter(
                "family member first and last name are required".to_string(),
            ));
        }

        let slot = match entry.id {
            Some(id) => members
                .iter()
                .position(|m| m.id == Some(id))
                .ok_or_else(|| RsvpError::not_found("family_member", id))?,
            None => match members
                .iter()
                .position(|m| m.matches_name(first_name, last_name))
            {
                Some(slot) => slot,
                None => {
                    members.push(FamilyMember::new(group.id, first_name, last_name, ""));
                    members.len() - 1
                }
            },
        };

        let member = &mut members[slot];
        member.first_name = first_name.to_string();
        member.last_name = last_name.to_string();
        member.age_group = normalize_age_group(&entry.age_group);
        member.is_attending = entry.is_attending;
        member.dietary_restrictions = entry
            .dietary_restrictions
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(slot)
    }
}

impl Default for RsvpReconciler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn group(max_attendees: u32) -> FamilyGroup {
        FamilyGroup {
            id: 1,
            name: "Smith".to_string(),
            max_attendees,
            primary_contact_id: 10,
        }
    }

    fn stored(id: i64, first: &str, last: &str, attending: bool) -> FamilyMember {
        let mut member = FamilyMember::new(1, first, last, "adult");
        member.id = Some(id);
        member.is_attending = attending;
        if attending {
            member.dietary_restrictions = Some("vegetarian".to_string());
        }
        member
    }

    #[test]
    fn test_capacity_exceeded_is_preflight() {
        let reconciler = RsvpReconciler::new();
        let current = vec![stored(1, "Bob", "Smith", true), stored(2, "Cara", "Smith", false)];
        let entries = vec![
            MemberEntry::new("Bob", "Smith", true),
            MemberEntry::new("Cara", "Smith", true),
            MemberEntry::new("Dan", "Smith", true),
        ];

        let err = reconciler.reconcile(&group(3), current, &entries).unwrap_err();

        assert!(matches!(
            err,
            RsvpError::CapacityExceeded {
                requested: 4,
                max_attendees: 3
            }
        ));
    }

    #[test]
    fn test_capacity_counts_primary_contact() {
        let reconciler = RsvpReconciler::new();
        let entries = vec![MemberEntry::new("Bob", "Smith", true)];

        assert_eq!(reconciler.requested_attendees(&entries), 2);
        assert!(reconciler.check_capacity(&group(2), &entries).is_ok());
        assert!(reconciler.check_capacity(&group(1), &entries).is_err());
        assert_eq!(reconciler.requested_attendees(&[]), 1);
    }

    #[test]
    fn test_omitted_member_is_reset() {
        let reconciler = RsvpReconciler::new();
        let current = vec![stored(1, "Bob", "Smith", true), stored(2, "Cara", "Smith", true)];
        let entries = vec![MemberEntry::new("Cara", "Smith", true)];

        let result = reconciler.reconcile(&group(5), current, &entries).unwrap();

        let bob = &result.members[0];
        assert!(!bob.is_attending);
        assert_eq!(bob.dietary_restrictions, None);
        assert!(result.members[1].is_attending);
        assert_eq!(result.members.len(), 2);
    }

    #[test]
    fn test_name_match_is_case_insensitive() {
        let reconciler = RsvpReconciler::new();
        let current = vec![stored(7, "Jane", "Doe", false)];
        let entries = vec![MemberEntry::new("jane", "DOE", true).with_dietary("gluten free")];

        let result = reconciler.reconcile(&group(3), current, &entries).unwrap();

        assert_eq!(result.members.len(), 1);
        let jane = &result.members[0];
        assert_eq!(jane.id, Some(7));
        assert!(jane.is_attending);
        // Submitted spelling wins
        assert_eq!(jane.first_name, "jane");
        assert_eq!(jane.dietary_restrictions.as_deref(), Some("gluten free"));
    }

    #[test]
    fn test_unknown_id_skips_only_that_entry() {
        let reconciler = RsvpReconciler::new();
        let current = vec![stored(1, "Bob", "Smith", false), stored(2, "Cara", "Smith", false)];
        let entries = vec![
            MemberEntry::new("Bob", "Smith", true).with_id(1),
            MemberEntry::new("Ghost", "Smith", true).with_id(999),
            MemberEntry::new("Dan", "Smith", true),
        ];

        let result = reconciler.reconcile(&group(5), current, &entries).unwrap();

        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].index, 1);
        assert_eq!(result.skipped[0].error_key, "family_member.not_found");

        assert!(result.members[0].is_attending);
        assert!(!result.members[1].is_attending);
        let dan = &result.members[2];
        assert_eq!(dan.id, None);
        assert!(dan.is_attending);
        // Ghost counted toward capacity but is not on the roster
        assert_eq!(result.requested_attendees, 4);
        assert_eq!(result.attending_members(), 2);
    }

    #[test]
    fn test_new_members_are_matched_within_the_same_pass() {
        let reconciler = RsvpReconciler::new();
        let entries = vec![
            MemberEntry::new("Eve", "Smith", false),
            MemberEntry::new("EVE", "smith", true).with_age_group(" Child "),
        ];

        let result = reconciler.reconcile(&group(3), vec![], &entries).unwrap();

        assert_eq!(result.members.len(), 1);
        assert!(result.members[0].is_attending);
        assert_eq!(result.members[0].age_group, "child");
    }

    #[test]
    fn test_blank_name_is_skipped() {
        let reconciler = RsvpReconciler::new();
        let entries = vec![MemberEntry::new("  ", "Smith", false), MemberEntry::new("Ann", "Smith", true)];

        let result = reconciler.reconcile(&group(3), vec![], &entries).unwrap();

        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].error_key, "invalid_parameter");
        assert_eq!(result.members.len(), 1);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let reconciler = RsvpReconciler::new();
        let current = vec![stored(1, "Bob", "Smith", true)];
        let entries = vec![
            MemberEntry::new("Bob", "Smith", false),
            MemberEntry::new("Cara", "Smith", true).with_dietary("vegan"),
        ];

        let first = reconciler.reconcile(&group(4), current, &entries).unwrap();

        // Simulate persistence: new members get ids
        let persisted: Vec<FamilyMember> = first
            .members
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, mut m)| {
                m.id.get_or_insert(100 + i as i64);
                m
            })
            .collect();

        let second = reconciler
            .reconcile(&group(4), persisted.clone(), &entries)
            .unwrap();

        assert_eq!(second.members, persisted);
    }

    #[test]
    fn test_alice_declines_scenario() {
        let reconciler = RsvpReconciler::new();
        let current = vec![stored(1, "Alice", "Smith", true)];
        let entries = vec![MemberEntry::new("Alice", "Smith", false)];

        let result = reconciler.reconcile(&group(2), current, &entries).unwrap();

        assert_eq!(result.requested_attendees, 1);
        assert!(!result.members[0].is_attending);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_members_of_other_groups_are_ignored() {
        let reconciler = RsvpReconciler::new();
        let mut outsider = stored(5, "Zed", "Jones", true);
        outsider.family_group_id = 2;

        let entries = vec![MemberEntry::new("Zed", "Jones", true).with_id(5)];
        let result = reconciler.reconcile(&group(3), vec![outsider], &entries).unwrap();

        assert!(result.members.is_empty());
        assert_eq!(result.skipped.len(), 1);
    }
}
