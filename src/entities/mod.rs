// Entity Models
//
// Each entity has a stable numeric identity and refers to others only by
// id (guest ← family group ← family member, guest ← code, guest ← RSVP).

pub mod guest;
pub mod family;
pub mod invitation;
pub mod rsvp;

pub use guest::{Guest, ImportStats, NewGuest};
pub use family::{FamilyGroup, FamilyMember, MemberEntry};
pub use invitation::{CodeType, InvitationCode, NewInvitationCode};
pub use rsvp::{Rsvp, RsvpValues, SavedRsvp};
