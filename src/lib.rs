// Wedding RSVP - Core Library
// Exposes all modules for use in the admin CLI, API server, and tests

pub mod error;
pub mod error_catalog;
pub mod config;
pub mod db;
pub mod entities;
pub mod codes;          // Code Generator
pub mod invitations;    // Invitation Registry
pub mod family;         // Family Membership Store
pub mod reconciler;     // RSVP Reconciler
pub mod rsvp;           // RSVP Orchestrator
pub mod notification;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use error::{Result, RsvpError};
pub use error_catalog::{ErrorCatalog, ErrorDefinition};
pub use config::Config;
pub use db::{
    Event,
    open_database, setup_database, insert_event, get_events_for_entity,
};
pub use entities::{
    Guest, NewGuest, ImportStats,
    FamilyGroup, FamilyMember, MemberEntry,
    CodeType, InvitationCode,
    Rsvp, SavedRsvp,
};
pub use entities::guest::{
    insert_guest, get_guest, list_guests, update_guest_email, set_plus_one_allowed,
    load_guests_csv, import_guests,
};
pub use codes::{CodeGenerator, is_well_formed, normalize_code};
pub use invitations::InvitationRegistry;
pub use family::{
    create_group, get_group, find_group_by_primary, list_members, add_member, save_members,
};
pub use reconciler::{RsvpReconciler, Reconciliation, SkippedEntry};
pub use rsvp::{
    RsvpOrchestrator, RsvpSubmission, RsvpOutcome, RosterSummary, GuestKind, classify,
};
pub use notification::{Notifier, LogNotifier, NotificationError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
